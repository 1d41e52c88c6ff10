//! Prediction results and request rejections

use crate::error::ScoringError;
use crate::models::classifier::ClassifierOutput;
use crate::models::consensus::Consensus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Scores from both classifiers and their consensus for one transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub transaction_id: String,

    /// Logistic-regression label (1 = fraud)
    pub lr_prediction: u8,
    /// Logistic-regression fraud probability
    pub lr_probability: f64,

    /// Random-forest label (1 = fraud)
    pub rf_prediction: u8,
    /// Random-forest fraud probability
    pub rf_probability: f64,

    /// 1 when the consensus score is strictly above 0.5
    pub consensus_prediction: u8,
    /// Mean of the two fraud probabilities
    pub consensus_score: f64,

    pub is_fraud: bool,

    pub timestamp: DateTime<Utc>,
}

impl PredictionResult {
    pub fn new(transaction_id: String, lr: ClassifierOutput, rf: ClassifierOutput) -> Self {
        let consensus = Consensus::from_probabilities(lr.probability, rf.probability);

        Self {
            transaction_id,
            lr_prediction: lr.label,
            lr_probability: lr.probability,
            rf_prediction: rf.label,
            rf_probability: rf.probability,
            consensus_prediction: consensus.label,
            consensus_score: consensus.score,
            is_fraud: consensus.is_fraud(),
            timestamp: Utc::now(),
        }
    }

    pub fn consensus(&self) -> Consensus {
        Consensus {
            score: self.consensus_score,
            label: self.consensus_prediction,
        }
    }

    /// Mean of the two labels: 0.0, 0.5 (models disagree) or 1.0
    pub fn label_vote(&self) -> f64 {
        f64::from(self.lr_prediction + self.rf_prediction) / 2.0
    }

    /// Pretty JSON form, as returned to API callers
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Published instead of a result when a request cannot be scored
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringRejection {
    pub transaction_id: Option<String>,
    /// Machine-readable error kind
    pub code: String,
    pub error: String,
    pub timestamp: DateTime<Utc>,
}

impl ScoringRejection {
    pub fn from_error(transaction_id: Option<String>, error: &ScoringError) -> Self {
        Self {
            transaction_id,
            code: error.code().to_string(),
            error: error.to_string(),
            timestamp: Utc::now(),
        }
    }

    /// Rejection for a payload that is not a valid request at all
    pub fn malformed(reason: impl ToString) -> Self {
        Self {
            transaction_id: None,
            code: "malformed_request".to_string(),
            error: reason.to_string(),
            timestamp: Utc::now(),
        }
    }
}
