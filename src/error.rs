//! Error types for the review pipeline
//!
//! Only [`InputError`] and [`ModelError`] abort an evaluation. Ledger and
//! notification failures are absorbed by the pipeline and reported in the
//! returned [`Evaluation`](crate::pipeline::Evaluation).

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// A transaction field outside its declared domain
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InputError {
    #[error("account number must not be empty")]
    MissingAccountNumber,

    #[error("{field} must be a finite number, got {value}")]
    NotFinite { field: &'static str, value: f64 },

    #[error("{field} must be non-negative, got {value}")]
    Negative { field: &'static str, value: f64 },

    #[error("device trust score must be within [0.0, 1.0], got {0}")]
    TrustScoreOutOfRange(f64),
}

/// Classifier failures
#[derive(Debug, Error)]
pub enum ModelError {
    /// The model artifact could not be loaded at startup
    #[error("classifier artifact unavailable at {}: {reason}", path.display())]
    Unavailable { path: PathBuf, reason: String },

    /// The loaded model failed while scoring a record
    #[error("classifier inference failed: {0}")]
    Inference(String),
}

/// Durable append or read of the ledger failed
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ledger encoding error: {0}")]
    Csv(#[from] csv::Error),

    #[error("ledger row {row} is malformed: {reason}")]
    Malformed { row: usize, reason: String },

    #[error("ledger writer lock poisoned")]
    Poisoned,
}

/// A review alert could not be delivered
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("failed to encode alert: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("alert transport failed: {0}")]
    Transport(String),

    #[error("alert delivery timed out after {0:?}")]
    Timeout(Duration),
}

/// Failures that abort a single evaluation before any side effect
#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("invalid transaction: {0}")]
    Input(#[from] InputError),

    #[error(transparent)]
    Model(#[from] ModelError),
}
