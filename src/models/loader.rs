//! ONNX classifier artifact loader

use crate::error::ModelError;
use ort::session::{builder::GraphOptimizationLevel, Session};
use std::path::Path;
use tracing::info;

/// Loaded ONNX model with metadata
pub struct LoadedModel {
    pub session: Session,
    /// Input name for the feature tensor
    pub input_name: String,
    /// Output holding the predicted class, if the export has one
    pub label_output: Option<String>,
    /// Output holding class probabilities, if the export has one
    pub probability_output: Option<String>,
}

/// Loader for the classifier artifact
pub struct ModelLoader {
    onnx_threads: usize,
}

impl ModelLoader {
    /// Create a loader running sessions with the given intra-op thread count
    pub fn with_threads(onnx_threads: usize) -> Self {
        Self {
            onnx_threads: onnx_threads.max(1),
        }
    }

    /// Load the classifier from file.
    ///
    /// A missing or unreadable artifact is reported as
    /// [`ModelError::Unavailable`] so the service refuses to start.
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<LoadedModel, ModelError> {
        let path = path.as_ref();
        let unavailable = |reason: String| ModelError::Unavailable {
            path: path.to_path_buf(),
            reason,
        };

        if !path.exists() {
            return Err(unavailable("file not found".to_string()));
        }

        info!(path = %path.display(), threads = self.onnx_threads, "Loading classifier");

        let session = Session::builder()
            .map_err(|e| unavailable(format!("failed to create session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| unavailable(format!("failed to set optimization level: {}", e)))?
            .with_intra_threads(self.onnx_threads)
            .map_err(|e| unavailable(format!("failed to set thread count: {}", e)))?
            .commit_from_file(path)
            .map_err(|e| unavailable(e.to_string()))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .ok_or_else(|| unavailable("model declares no inputs".to_string()))?;

        let label_output = session
            .outputs
            .iter()
            .find(|o| o.name.contains("label"))
            .map(|o| o.name.clone());

        let probability_output = session
            .outputs
            .iter()
            .find(|o| o.name.contains("prob"))
            .map(|o| o.name.clone());

        if label_output.is_none() && probability_output.is_none() {
            return Err(unavailable(
                "model has neither a label nor a probability output".to_string(),
            ));
        }

        info!(
            input = %input_name,
            label_output = ?label_output,
            probability_output = ?probability_output,
            "Classifier loaded successfully"
        );

        Ok(LoadedModel {
            session,
            input_name,
            label_output,
            probability_output,
        })
    }
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self { onnx_threads: 1 }
    }
}
