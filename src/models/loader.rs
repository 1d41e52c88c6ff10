//! Model bundle loader

use crate::error::{ScoringError, ScoringResult};
use crate::models::classifier::Classifier;
use crate::models::inference::ModelBundle;
use crate::models::metadata::{ModelKind, ModelMetadata};
use crate::models::onnx::OnnxClassifier;
use crate::models::scaler::StandardScaler;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::info;

pub const LR_MODEL_FILE: &str = "logistic_regression_model.onnx";
pub const RF_MODEL_FILE: &str = "random_forest_model.onnx";
pub const SCALER_FILE: &str = "scaler.json";
pub const METADATA_FILE: &str = "model_metadata.json";
pub const FEATURE_NAMES_FILE: &str = "feature_names.json";

/// Every file a model directory must contain, in load order
pub const REQUIRED_ARTIFACTS: [&str; 5] = [
    LR_MODEL_FILE,
    RF_MODEL_FILE,
    SCALER_FILE,
    METADATA_FILE,
    FEATURE_NAMES_FILE,
];

/// Loader for the model directory
pub struct ModelLoader {
    /// Number of threads for ONNX inference
    onnx_threads: usize,
}

impl ModelLoader {
    /// Create a new model loader with default settings (1 thread)
    pub fn new() -> Self {
        Self::with_threads(1)
    }

    /// Create a new model loader with specified number of threads
    pub fn with_threads(onnx_threads: usize) -> Self {
        Self {
            onnx_threads: onnx_threads.max(1),
        }
    }

    /// Load the full bundle from a directory.
    ///
    /// All artifacts are checked for presence first so that a missing file is
    /// reported by name before any parsing starts.
    pub fn load_bundle<P: AsRef<Path>>(&self, models_dir: P) -> ScoringResult<ModelBundle> {
        let models_dir = models_dir.as_ref();
        check_artifacts(models_dir)?;

        let feature_names: Vec<String> = read_json(models_dir, FEATURE_NAMES_FILE)?;
        let metadata: ModelMetadata = read_json(models_dir, METADATA_FILE)?;
        let scaler: StandardScaler = read_json(models_dir, SCALER_FILE)?;

        let lr = self.load_classifier(models_dir, LR_MODEL_FILE, ModelKind::LogisticRegression)?;
        let rf = self.load_classifier(models_dir, RF_MODEL_FILE, ModelKind::RandomForest)?;

        let bundle = ModelBundle::new(lr, rf, scaler, metadata, feature_names)?;

        info!(
            models_dir = %models_dir.display(),
            features = bundle.feature_count(),
            "Model bundle loaded"
        );

        Ok(bundle)
    }

    fn load_classifier(
        &self,
        models_dir: &Path,
        file_name: &str,
        kind: ModelKind,
    ) -> ScoringResult<Box<dyn Classifier>> {
        let path = models_dir.join(file_name);
        let model = OnnxClassifier::load(&path, kind.short_name(), self.onnx_threads)
            .map_err(|e| ScoringError::invalid_artifact(file_name, format!("{:#}", e)))?;
        Ok(Box::new(model))
    }
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Fail with the first required artifact that does not exist.
pub fn check_artifacts(models_dir: &Path) -> ScoringResult<()> {
    for artifact in REQUIRED_ARTIFACTS {
        let path = artifact_path(models_dir, artifact);
        if !path.is_file() {
            return Err(ScoringError::MissingArtifact {
                artifact: artifact.to_string(),
                path: path.display().to_string(),
            });
        }
    }
    Ok(())
}

fn artifact_path(models_dir: &Path, artifact: &str) -> PathBuf {
    models_dir.join(artifact)
}

fn read_json<T: DeserializeOwned>(models_dir: &Path, artifact: &str) -> ScoringResult<T> {
    let path = artifact_path(models_dir, artifact);
    let content = std::fs::read_to_string(&path)
        .map_err(|e| ScoringError::invalid_artifact(artifact, e.to_string()))?;
    serde_json::from_str(&content).map_err(|e| ScoringError::invalid_artifact(artifact, e.to_string()))
}
