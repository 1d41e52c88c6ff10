//! Transaction scoring requests

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Features of one transaction, either already ordered or keyed by name
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureInput {
    /// Values in training column order
    Vector(Vec<f64>),
    /// Values keyed by feature name; absent features default to 0.0
    Named(HashMap<String, Value>),
}

/// A request to score one transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRequest {
    /// Caller-supplied identifier; the service assigns one when absent
    #[serde(default, alias = "id")]
    pub transaction_id: Option<String>,

    pub features: FeatureInput,

    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl TransactionRequest {
    /// Request with ordered feature values
    pub fn from_vector(transaction_id: impl Into<String>, features: Vec<f64>) -> Self {
        Self {
            transaction_id: Some(transaction_id.into()),
            features: FeatureInput::Vector(features),
            timestamp: Utc::now(),
        }
    }

    /// Request with named feature values
    pub fn from_named(transaction_id: impl Into<String>, features: HashMap<String, f64>) -> Self {
        Self {
            transaction_id: Some(transaction_id.into()),
            features: FeatureInput::Named(
                features
                    .into_iter()
                    .map(|(name, value)| (name, Value::from(value)))
                    .collect(),
            ),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_request() {
        let req: TransactionRequest =
            serde_json::from_str(r#"{"transaction_id": "TX1", "features": [1.0, 2.5, -3]}"#)
                .unwrap();
        assert_eq!(req.transaction_id.as_deref(), Some("TX1"));
        match req.features {
            FeatureInput::Vector(values) => assert_eq!(values, vec![1.0, 2.5, -3.0]),
            other => panic!("unexpected input: {other:?}"),
        }
    }

    #[test]
    fn test_named_request_without_id() {
        let req: TransactionRequest =
            serde_json::from_str(r#"{"features": {"V1": 2.0, "Amount": "149.62"}}"#).unwrap();
        assert!(req.transaction_id.is_none());
        match req.features {
            FeatureInput::Named(values) => {
                assert_eq!(values.len(), 2);
                assert_eq!(values["Amount"], Value::from("149.62"));
            }
            other => panic!("unexpected input: {other:?}"),
        }
    }

    #[test]
    fn test_request_serialization() {
        let req = TransactionRequest::from_vector("tx_123", vec![0.5; 30]);

        let json = serde_json::to_string(&req).unwrap();
        let deserialized: TransactionRequest = serde_json::from_str(&json).unwrap();

        assert_eq!(req.transaction_id, deserialized.transaction_id);
        assert_eq!(req.timestamp, deserialized.timestamp);
    }
}
