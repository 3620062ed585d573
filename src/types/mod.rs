//! Type definitions for the review pipeline

pub mod alert;
pub mod transaction;
pub mod verdict;

pub use alert::{AlertEnvelope, ReviewAlert};
pub use transaction::FeatureRecord;
pub use verdict::{Action, ModelLabel, RuleFinding, Severity, Verdict};
