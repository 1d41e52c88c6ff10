//! Capability interface shared by both fraud classifiers

use crate::error::ScoringResult;
use serde::{Deserialize, Serialize};

/// Label and positive-class probability from one classifier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassifierOutput {
    /// 1 = fraud, 0 = legitimate
    pub label: u8,
    /// Probability of the fraud class (0.0 - 1.0)
    pub probability: f64,
}

/// A trained binary classifier operating on scaled feature vectors.
///
/// Implementations must be safe to call from several tasks at once.
pub trait Classifier: Send + Sync {
    /// Name used in logs and error messages
    fn name(&self) -> &str;

    /// Predicted class label (0 or 1)
    fn predict(&self, features: &[f64]) -> ScoringResult<u8>;

    /// Probability of the positive (fraud) class
    fn predict_proba(&self, features: &[f64]) -> ScoringResult<f64>;

    /// Label and probability together.
    ///
    /// Backends that produce both from one run should override this.
    fn classify(&self, features: &[f64]) -> ScoringResult<ClassifierOutput> {
        Ok(ClassifierOutput {
            label: self.predict(features)?,
            probability: self.predict_proba(features)?,
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Returns the same probability for every input.
    pub struct FixedClassifier {
        pub name: String,
        pub probability: f64,
    }

    impl FixedClassifier {
        pub fn new(name: &str, probability: f64) -> Self {
            Self {
                name: name.to_string(),
                probability,
            }
        }
    }

    impl Classifier for FixedClassifier {
        fn name(&self) -> &str {
            &self.name
        }

        fn predict(&self, _features: &[f64]) -> ScoringResult<u8> {
            Ok(u8::from(self.probability > 0.5))
        }

        fn predict_proba(&self, _features: &[f64]) -> ScoringResult<f64> {
            Ok(self.probability)
        }
    }

    /// Logistic function over a weighted sum of the scaled features.
    pub struct LinearClassifier {
        pub name: String,
        pub weights: Vec<f64>,
        pub bias: f64,
    }

    impl Classifier for LinearClassifier {
        fn name(&self) -> &str {
            &self.name
        }

        fn predict(&self, features: &[f64]) -> ScoringResult<u8> {
            Ok(u8::from(self.predict_proba(features)? > 0.5))
        }

        fn predict_proba(&self, features: &[f64]) -> ScoringResult<f64> {
            let z: f64 = self.bias
                + features
                    .iter()
                    .zip(&self.weights)
                    .map(|(x, w)| x * w)
                    .sum::<f64>();
            Ok(1.0 / (1.0 + (-z).exp()))
        }
    }
}
