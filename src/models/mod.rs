//! Classifiers, scaler and the model bundle that ties them together

pub mod classifier;
pub mod consensus;
pub mod inference;
pub mod loader;
pub mod metadata;
pub mod onnx;
pub mod scaler;

pub use classifier::{Classifier, ClassifierOutput};
pub use consensus::Consensus;
pub use inference::ModelBundle;
pub use loader::ModelLoader;
pub use metadata::{ModelInfo, ModelKind, ModelMetadata, ModelPerformance};
pub use scaler::StandardScaler;
