//! Classifier collaborator

pub mod inference;
pub mod loader;

pub use inference::OnnxClassifier;
pub use loader::ModelLoader;

use crate::error::ModelError;
use crate::types::{FeatureRecord, ModelLabel};

/// A pre-trained binary predictor.
///
/// Implementations see the full record but must not use `account_number`
/// or `account_holder` as features.
pub trait Classifier: Send + Sync {
    fn predict(&self, record: &FeatureRecord) -> Result<ModelLabel, ModelError>;
}

