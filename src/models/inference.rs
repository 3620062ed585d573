//! ONNX-backed classifier

use crate::error::ModelError;
use crate::feature_extractor::FeatureExtractor;
use crate::models::loader::{LoadedModel, ModelLoader};
use crate::models::Classifier;
use crate::types::{FeatureRecord, ModelLabel};
use ort::value::Tensor;
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;

/// Binary classifier running a pre-trained ONNX model.
///
/// Prefers the exported label output; falls back to comparing the
/// fraud-class probability with `fraud_threshold`.
pub struct OnnxClassifier {
    /// Sessions need exclusive access to run
    model: Mutex<LoadedModel>,
    extractor: FeatureExtractor,
    fraud_threshold: f64,
}

impl OnnxClassifier {
    /// Load the artifact at `path`; fails fast if it is missing or corrupt
    pub fn load<P: AsRef<Path>>(
        path: P,
        onnx_threads: usize,
        fraud_threshold: f64,
    ) -> Result<Self, ModelError> {
        let model = ModelLoader::with_threads(onnx_threads).load(path)?;
        Ok(Self::from_model(model, fraud_threshold))
    }

    pub fn from_model(model: LoadedModel, fraud_threshold: f64) -> Self {
        Self {
            model: Mutex::new(model),
            extractor: FeatureExtractor::new(),
            fraud_threshold,
        }
    }

    pub fn fraud_threshold(&self) -> f64 {
        self.fraud_threshold
    }

    fn run(&self, features: Vec<f32>) -> Result<ModelLabel, ModelError> {
        let shape = vec![1_i64, features.len() as i64];
        let input_tensor = Tensor::from_array((shape, features))
            .map_err(|e| ModelError::Inference(format!("failed to create input tensor: {}", e)))?;

        let mut model = self
            .model
            .lock()
            .map_err(|e| ModelError::Inference(format!("lock error: {}", e)))?;
        let LoadedModel {
            session,
            input_name,
            label_output,
            probability_output,
        } = &mut *model;

        let outputs = session
            .run(ort::inputs![input_name.as_str() => input_tensor])
            .map_err(|e| ModelError::Inference(e.to_string()))?;

        if let Some(output) = label_output.as_deref().and_then(|name| outputs.get(name)) {
            if let Ok((_, data)) = output.try_extract_tensor::<i64>() {
                if let Some(&class) = data.first() {
                    debug!(class = class, "Extracted label output");
                    return Ok(ModelLabel::from_class(class));
                }
            }
        }

        if let Some(output) = probability_output
            .as_deref()
            .and_then(|name| outputs.get(name))
        {
            if let Ok((_, data)) = output.try_extract_tensor::<f32>() {
                if let Some(prob) = fraud_probability(data) {
                    debug!(prob = prob, threshold = self.fraud_threshold, "Extracted probability");
                    return Ok(label_from_probability(prob, self.fraud_threshold));
                }
            }
        }

        Err(ModelError::Inference(
            "could not extract a label or probability from model outputs".to_string(),
        ))
    }
}

impl Classifier for OnnxClassifier {
    fn predict(&self, record: &FeatureRecord) -> Result<ModelLabel, ModelError> {
        self.run(self.extractor.extract(record))
    }
}

/// Fraud-class probability from a `[1, classes]` or `[classes]` tensor
fn fraud_probability(data: &[f32]) -> Option<f64> {
    match data.len() {
        0 => None,
        1 => Some(data[0] as f64),
        _ => Some(data[1] as f64),
    }
}

fn label_from_probability(prob: f64, threshold: f64) -> ModelLabel {
    if prob >= threshold {
        ModelLabel::Fraudulent
    } else {
        ModelLabel::Legitimate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fraud_probability_layouts() {
        assert_eq!(fraud_probability(&[]), None);
        assert_eq!(fraud_probability(&[0.75]), Some(0.75));
        assert_eq!(fraud_probability(&[0.25, 0.75]), Some(0.75));
    }

    #[test]
    fn test_label_from_probability() {
        assert_eq!(label_from_probability(0.5, 0.5), ModelLabel::Fraudulent);
        assert_eq!(label_from_probability(0.49, 0.5), ModelLabel::Legitimate);
        assert_eq!(label_from_probability(0.7, 0.8), ModelLabel::Legitimate);
    }

    #[test]
    fn test_load_missing_model_fails_fast() {
        let result = OnnxClassifier::load("models/missing.onnx", 1, 0.5);
        assert!(matches!(result, Err(ModelError::Unavailable { .. })));
    }
}
