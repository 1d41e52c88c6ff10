//! Training metadata shipped alongside the models (display only)

use serde::{Deserialize, Serialize};
use std::fmt;

/// The two classifiers in the bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    LogisticRegression,
    RandomForest,
}

impl ModelKind {
    pub const ALL: [ModelKind; 2] = [ModelKind::LogisticRegression, ModelKind::RandomForest];

    /// Short name used in logs and metric keys
    pub fn short_name(&self) -> &'static str {
        match self {
            ModelKind::LogisticRegression => "lr",
            ModelKind::RandomForest => "rf",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::LogisticRegression => write!(f, "Logistic Regression"),
            ModelKind::RandomForest => write!(f, "Random Forest"),
        }
    }
}

/// Metrics and dataset statistics recorded when the models were trained.
///
/// The first block is always written by training; the rest are optional and
/// default to zero (or absent) when missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub lr_auc: f64,
    pub rf_auc: f64,
    pub lr_f1: f64,
    pub rf_f1: f64,
    pub num_features: usize,
    pub train_samples: u64,
    pub test_samples: u64,
    /// Fraud rate of the training split, in percent
    pub train_fraud_rate: f64,

    #[serde(default)]
    pub lr_accuracy: f64,
    #[serde(default)]
    pub lr_precision: f64,
    #[serde(default)]
    pub lr_recall: f64,
    #[serde(default)]
    pub rf_accuracy: f64,
    #[serde(default)]
    pub rf_precision: f64,
    #[serde(default)]
    pub rf_recall: f64,
    #[serde(default)]
    pub total_samples: Option<u64>,
}

/// Summary shown on the overview page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelInfo {
    pub lr_auc: f64,
    pub rf_auc: f64,
    pub lr_f1: f64,
    pub rf_f1: f64,
    pub train_samples: u64,
    pub test_samples: u64,
    pub num_features: usize,
    pub fraud_rate: f64,
}

/// Test-set metrics for one classifier
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelPerformance {
    pub model: ModelKind,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub auc: f64,
}

impl ModelMetadata {
    pub fn info(&self) -> ModelInfo {
        ModelInfo {
            lr_auc: self.lr_auc,
            rf_auc: self.rf_auc,
            lr_f1: self.lr_f1,
            rf_f1: self.rf_f1,
            train_samples: self.train_samples,
            test_samples: self.test_samples,
            num_features: self.num_features,
            fraud_rate: self.train_fraud_rate,
        }
    }

    pub fn performance(&self, model: ModelKind) -> ModelPerformance {
        match model {
            ModelKind::LogisticRegression => ModelPerformance {
                model,
                accuracy: self.lr_accuracy,
                precision: self.lr_precision,
                recall: self.lr_recall,
                f1: self.lr_f1,
                auc: self.lr_auc,
            },
            ModelKind::RandomForest => ModelPerformance {
                model,
                accuracy: self.rf_accuracy,
                precision: self.rf_precision,
                recall: self.rf_recall,
                f1: self.rf_f1,
                auc: self.rf_auc,
            },
        }
    }
}
