//! Classifiers backed by ONNX Runtime sessions

use crate::error::{ScoringError, ScoringResult};
use crate::models::classifier::{Classifier, ClassifierOutput};
use anyhow::Context;
use ort::memory::Allocator;
use ort::session::{builder::GraphOptimizationLevel, Session, SessionOutputs};
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType, DynValue, Tensor};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

/// A scikit-learn classifier exported to ONNX.
///
/// Running a session needs exclusive access, so it sits behind a mutex; the
/// classifier itself is shared read-only.
pub struct OnnxClassifier {
    name: String,
    session: Mutex<Session>,
    input_name: String,
    probability_output: String,
    label_output: Option<String>,
}

impl OnnxClassifier {
    /// Load a model from file with the given number of intra-op threads.
    pub fn load<P: AsRef<Path>>(path: P, name: &str, onnx_threads: usize) -> anyhow::Result<Self> {
        let path = path.as_ref();

        info!(model = %name, path = %path.display(), threads = onnx_threads, "Loading ONNX model");

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(onnx_threads)?
            .commit_from_file(path)
            .context(format!("Failed to load model from {:?}", path))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "float_input".to_string());

        let label_output = session
            .outputs
            .iter()
            .find(|o| o.name.contains("label"))
            .map(|o| o.name.clone());

        // skl2onnx names the outputs "output_label" and "output_probability"
        let probability_output = session
            .outputs
            .iter()
            .find(|o| o.name.contains("prob"))
            .or_else(|| session.outputs.iter().find(|o| !o.name.contains("label")))
            .map(|o| o.name.clone())
            .unwrap_or_else(|| "probabilities".to_string());

        info!(
            model = %name,
            input = %input_name,
            probability_output = %probability_output,
            label_output = ?label_output,
            "Model loaded successfully"
        );

        Ok(Self {
            name: name.to_string(),
            session: Mutex::new(session),
            input_name,
            probability_output,
            label_output,
        })
    }

    fn run(&self, features: &[f64]) -> ScoringResult<ClassifierOutput> {
        // Prepare input tensor - shape [1, num_features]
        let shape = vec![1_i64, features.len() as i64];
        let data: Vec<f32> = features.iter().map(|&v| v as f32).collect();
        let input_tensor = Tensor::from_array((shape, data))
            .map_err(|e| ScoringError::classifier(&self.name, e))?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| ScoringError::classifier(&self.name, format!("lock error: {}", e)))?;

        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input_tensor])
            .map_err(|e| ScoringError::classifier(&self.name, e))?;

        let probability = self.extract_probability(&outputs)?;
        let label = match self.extract_label(&outputs) {
            Some(label) => label,
            None => u8::from(probability > 0.5),
        };

        debug!(model = %self.name, label = label, probability = probability, "Classifier run complete");

        Ok(ClassifierOutput { label, probability })
    }

    fn extract_label(&self, outputs: &SessionOutputs) -> Option<u8> {
        let output = outputs.get(self.label_output.as_deref()?)?;
        let (_, data) = output.try_extract_tensor::<i64>().ok()?;
        data.first().map(|&label| u8::from(label == 1))
    }

    /// Fraud probability from either a `[batch, classes]` tensor or the
    /// `seq(map(int64, float))` layout produced by ZipMap.
    fn extract_probability(&self, outputs: &SessionOutputs) -> ScoringResult<f64> {
        let output = outputs.get(self.probability_output.as_str()).ok_or_else(|| {
            ScoringError::classifier(
                &self.name,
                format!("output '{}' missing from session results", self.probability_output),
            )
        })?;

        if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
            let dims: Vec<i64> = shape.iter().copied().collect();
            let classes = dims.last().copied().unwrap_or(0);
            let prob = match (classes, data.len()) {
                (c, len) if c >= 2 && len >= 2 => data[1] as f64,
                (_, len) if len >= 1 => data[0] as f64,
                _ => {
                    return Err(ScoringError::classifier(&self.name, "empty probability tensor"));
                }
            };
            return Ok(prob);
        }

        let dtype = output.dtype();
        if DynSequenceValueType::can_downcast(&dtype) {
            return self.extract_from_sequence_map(output);
        }

        Err(ScoringError::classifier(
            &self.name,
            format!("unsupported probability output type {:?}", dtype),
        ))
    }

    fn extract_from_sequence_map(&self, output: &DynValue) -> ScoringResult<f64> {
        let allocator = Allocator::default();

        let sequence = output
            .downcast_ref::<DynSequenceValueType>()
            .map_err(|e| ScoringError::classifier(&self.name, e))?;

        let maps = sequence
            .try_extract_sequence::<DynMapValueType>(&allocator)
            .map_err(|e| ScoringError::classifier(&self.name, e))?;

        // batch size is always 1
        let map_value = maps
            .first()
            .ok_or_else(|| ScoringError::classifier(&self.name, "empty probability sequence"))?;

        let kv_pairs = map_value
            .try_extract_key_values::<i64, f32>()
            .map_err(|e| ScoringError::classifier(&self.name, e))?;

        if let Some((_, prob)) = kv_pairs.iter().find(|(class_id, _)| *class_id == 1) {
            return Ok(*prob as f64);
        }
        if let Some((_, prob)) = kv_pairs.iter().find(|(class_id, _)| *class_id == 0) {
            return Ok(1.0 - *prob as f64);
        }

        Err(ScoringError::classifier(&self.name, "no class probability in output map"))
    }
}

impl Classifier for OnnxClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict(&self, features: &[f64]) -> ScoringResult<u8> {
        Ok(self.run(features)?.label)
    }

    fn predict_proba(&self, features: &[f64]) -> ScoringResult<f64> {
        Ok(self.run(features)?.probability)
    }

    fn classify(&self, features: &[f64]) -> ScoringResult<ClassifierOutput> {
        self.run(features)
    }
}
