//! Fraud Review Pipeline Library
//!
//! Evaluates a transaction against a trained classifier and a fixed set of
//! risk rules, records the verdict in an append-only ledger, and alerts an
//! out-of-band channel when the transaction needs manual review.

pub mod config;
pub mod consumer;
pub mod decision;
pub mod error;
pub mod feature_extractor;
pub mod ledger;
pub mod metrics;
pub mod models;
pub mod notifier;
pub mod pipeline;
pub mod rules;
pub mod types;

pub use config::AppConfig;
pub use decision::DecisionPolicy;
pub use error::{EvaluationError, InputError, LedgerError, ModelError, NotificationError};
pub use ledger::{CsvLedger, Ledger, LedgerEntry};
pub use models::{Classifier, OnnxClassifier};
pub use notifier::{NatsNotifier, Notifier};
pub use pipeline::{Evaluation, ReviewPipeline};
pub use rules::RuleEngine;
pub use types::{FeatureRecord, ModelLabel, ReviewAlert, RuleFinding, Verdict};
