//! Consensus between the two classifiers

use serde::{Deserialize, Serialize};

/// Scores strictly above this are labelled fraud; a tie is legitimate.
pub const CONSENSUS_THRESHOLD: f64 = 0.5;

/// Combined decision of the logistic-regression and random-forest models.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Consensus {
    /// Mean of the two fraud probabilities
    pub score: f64,
    /// 1 = fraud, 0 = legitimate
    pub label: u8,
}

impl Consensus {
    /// Average two positive-class probabilities into one decision.
    pub fn from_probabilities(first: f64, second: f64) -> Self {
        let score = (first + second) / 2.0;
        Self {
            score,
            label: consensus_label(score),
        }
    }

    pub fn is_fraud(&self) -> bool {
        self.label == 1
    }
}

/// Label for a consensus score.
pub fn consensus_label(score: f64) -> u8 {
    if score > CONSENSUS_THRESHOLD {
        1
    } else {
        0
    }
}

/// How closely two probabilities agree (1.0 = identical, 0.0 = opposite).
pub fn agreement(first: f64, second: f64) -> f64 {
    1.0 - (first - second).abs().min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_is_mean() {
        let pairs = [(0.1, 0.3), (0.9, 0.75), (0.0, 1.0), (0.333, 0.667)];
        for (a, b) in pairs {
            let consensus = Consensus::from_probabilities(a, b);
            assert!((consensus.score - (a + b) / 2.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_tie_is_legitimate() {
        let consensus = Consensus::from_probabilities(0.8, 0.2);
        assert_eq!(consensus.score, 0.5);
        assert_eq!(consensus.label, 0);
        assert!(!consensus.is_fraud());
    }

    #[test]
    fn test_label_boundary() {
        assert_eq!(consensus_label(0.5), 0);
        assert_eq!(consensus_label(0.5 + f64::EPSILON), 1);
        assert_eq!(consensus_label(0.49), 0);
        assert_eq!(consensus_label(1.0), 1);
    }

    #[test]
    fn test_agreement() {
        assert_eq!(agreement(0.7, 0.7), 1.0);
        assert!((agreement(0.9, 0.1) - 0.2).abs() < 1e-12);
    }
}
