//! Feature assembly for classifier inference.
//!
//! Maps a named (possibly incomplete) transaction onto the fixed-order
//! feature vector the classifiers were trained on.

use crate::error::{ScoringError, ScoringResult};
use serde_json::Value;
use std::collections::HashMap;

/// Column order of the credit-card dataset the bundled models use.
pub const CREDIT_CARD_FEATURES: [&str; 30] = [
    "Time", "V1", "V2", "V3", "V4", "V5", "V6", "V7", "V8", "V9", "V10", "V11", "V12", "V13",
    "V14", "V15", "V16", "V17", "V18", "V19", "V20", "V21", "V22", "V23", "V24", "V25", "V26",
    "V27", "V28", "Amount",
];

/// Builds model input vectors in training column order.
///
/// Features missing from the input default to 0.0; names the models do not
/// know are ignored.
#[derive(Debug, Clone)]
pub struct FeatureAssembler {
    names: Vec<String>,
    positions: HashMap<String, usize>,
}

impl FeatureAssembler {
    /// Create an assembler for the given ordered feature names.
    pub fn new(names: Vec<String>) -> Self {
        let positions = names
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.clone(), idx))
            .collect();
        Self { names, positions }
    }

    /// Assembler for the 30-column credit-card layout.
    pub fn credit_card() -> Self {
        Self::new(CREDIT_CARD_FEATURES.iter().map(|s| s.to_string()).collect())
    }

    /// Assemble a vector from already-numeric values.
    pub fn assemble(&self, values: &HashMap<String, f64>) -> Vec<f64> {
        self.names
            .iter()
            .map(|name| values.get(name).copied().unwrap_or(0.0))
            .collect()
    }

    /// Assemble a vector from loosely typed values (JSON request bodies).
    ///
    /// Numbers and numeric strings are accepted. For known features anything
    /// else fails with a validation error naming the field; unknown names
    /// are skipped without being inspected.
    pub fn assemble_values(&self, values: &HashMap<String, Value>) -> ScoringResult<Vec<f64>> {
        let mut features = vec![0.0; self.names.len()];

        for (name, value) in values {
            let Some(&idx) = self.positions.get(name) else {
                continue;
            };
            features[idx] = coerce_number(name, value)?;
        }

        Ok(features)
    }

    /// Get the number of features produced.
    pub fn feature_count(&self) -> usize {
        self.names.len()
    }

    /// Get feature names in training order.
    pub fn feature_names(&self) -> &[String] {
        &self.names
    }

    /// Position of a feature in the vector, if known.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }
}

impl Default for FeatureAssembler {
    fn default() -> Self {
        Self::credit_card()
    }
}

fn coerce_number(field: &str, value: &Value) -> ScoringResult<f64> {
    let number = match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| ScoringError::validation(field, format!("{} is not representable as f64", n)))?,
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| ScoringError::validation(field, format!("'{}' is not a number", s)))?,
        Value::Null => return Err(ScoringError::validation(field, "value is null")),
        Value::Bool(_) => return Err(ScoringError::validation(field, "expected a number, got a boolean")),
        Value::Array(_) => return Err(ScoringError::validation(field, "expected a number, got an array")),
        Value::Object(_) => return Err(ScoringError::validation(field, "expected a number, got an object")),
    };

    if !number.is_finite() {
        return Err(ScoringError::validation(field, "value is not finite"));
    }
    Ok(number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn small() -> FeatureAssembler {
        FeatureAssembler::new(vec!["Time".into(), "Amount".into(), "V1".into()])
    }

    #[test]
    fn test_assembly_preserves_training_order() {
        let mut input = HashMap::new();
        input.insert("V1".to_string(), 2.0);

        assert_eq!(small().assemble(&input), vec![0.0, 0.0, 2.0]);
    }

    #[test]
    fn test_unknown_features_ignored() {
        let mut input = HashMap::new();
        input.insert("Amount".to_string(), 12.5);
        input.insert("merchant".to_string(), 99.0);

        assert_eq!(small().assemble(&input), vec![0.0, 12.5, 0.0]);
    }

    #[test]
    fn test_assemble_values_coerces_numeric_strings() {
        let mut input = HashMap::new();
        input.insert("Time".to_string(), json!("3600"));
        input.insert("V1".to_string(), json!(-1.5));

        let features = small().assemble_values(&input).unwrap();
        assert_eq!(features, vec![3600.0, 0.0, -1.5]);
    }

    #[test]
    fn test_assemble_values_rejects_non_numeric() {
        let mut input = HashMap::new();
        input.insert("Amount".to_string(), json!("twelve"));

        let err = small().assemble_values(&input).unwrap_err();
        match err {
            ScoringError::Validation { field, .. } => assert_eq!(field, "Amount"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_assemble_values_ignores_bad_unknown_field() {
        let mut input = HashMap::new();
        input.insert("note".to_string(), json!({"free": "text"}));

        assert_eq!(small().assemble_values(&input).unwrap(), vec![0.0; 3]);
    }

    #[test]
    fn test_credit_card_layout() {
        let assembler = FeatureAssembler::credit_card();
        assert_eq!(assembler.feature_count(), 30);
        assert_eq!(assembler.position("Time"), Some(0));
        assert_eq!(assembler.position("V14"), Some(14));
        assert_eq!(assembler.position("Amount"), Some(29));
    }
}
