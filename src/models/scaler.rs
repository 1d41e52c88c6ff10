//! Per-feature standardization fitted at training time

use crate::error::{ScoringError, ScoringResult};
use serde::{Deserialize, Serialize};

/// Standard scaler: `scaled[i] = (raw[i] - mean[i]) / scale[i]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    #[serde(alias = "mean_")]
    mean: Vec<f64>,
    #[serde(alias = "scale_")]
    scale: Vec<f64>,
}

impl StandardScaler {
    /// Build a scaler from fitted parameters.
    ///
    /// `feature_names` is only used to name the offending feature in errors
    /// and may be shorter than the parameters.
    pub fn new(mean: Vec<f64>, scale: Vec<f64>, feature_names: &[String]) -> ScoringResult<Self> {
        let scaler = Self { mean, scale };
        scaler.validate(feature_names)?;
        Ok(scaler)
    }

    /// Check parameter lengths and reject zero or non-finite scales.
    pub fn validate(&self, feature_names: &[String]) -> ScoringResult<()> {
        if self.mean.len() != self.scale.len() {
            return Err(ScoringError::invalid_artifact(
                "scaler",
                format!(
                    "mean has {} values but scale has {}",
                    self.mean.len(),
                    self.scale.len()
                ),
            ));
        }

        for (idx, (&mean, &scale)) in self.mean.iter().zip(&self.scale).enumerate() {
            if !mean.is_finite() {
                return Err(ScoringError::invalid_artifact(
                    "scaler",
                    format!("mean for feature '{}' is not finite", feature_label(feature_names, idx)),
                ));
            }
            if is_degenerate(scale) {
                return Err(ScoringError::DegenerateScale {
                    index: idx,
                    feature: feature_label(feature_names, idx),
                    scale,
                });
            }
        }

        Ok(())
    }

    /// Number of features the scaler was fitted on.
    pub fn feature_count(&self) -> usize {
        self.mean.len()
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    pub fn scale(&self) -> &[f64] {
        &self.scale
    }

    /// Standardize a raw feature vector.
    pub fn transform(&self, raw: &[f64], feature_names: &[String]) -> ScoringResult<Vec<f64>> {
        if raw.len() != self.mean.len() {
            return Err(ScoringError::ShapeMismatch {
                expected: self.mean.len(),
                actual: raw.len(),
            });
        }

        raw.iter()
            .zip(self.mean.iter().zip(&self.scale))
            .enumerate()
            .map(|(idx, (&value, (&mean, &scale)))| {
                if !value.is_finite() {
                    return Err(ScoringError::validation(
                        feature_label(feature_names, idx),
                        "value is not finite",
                    ));
                }
                if is_degenerate(scale) {
                    return Err(ScoringError::DegenerateScale {
                        index: idx,
                        feature: feature_label(feature_names, idx),
                        scale,
                    });
                }
                Ok((value - mean) / scale)
            })
            .collect()
    }
}

fn is_degenerate(scale: f64) -> bool {
    !scale.is_finite() || scale.abs() <= f64::EPSILON
}

fn feature_label(feature_names: &[String], idx: usize) -> String {
    feature_names
        .get(idx)
        .cloned()
        .unwrap_or_else(|| format!("feature_{}", idx))
}
