//! NATS subscription and decoding of scoring requests

use crate::types::prediction::ScoringRejection;
use crate::types::transaction::TransactionRequest;
use anyhow::Result;
use async_nats::{Client, Subscriber};
use tracing::info;

/// Receives transaction requests from NATS
pub struct TransactionConsumer {
    client: Client,
    subject: String,
}

impl TransactionConsumer {
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    /// Subscribe to the request subject
    pub async fn subscribe(&self) -> Result<Subscriber> {
        let subscriber = self.client.subscribe(self.subject.clone()).await?;
        info!(subject = %self.subject, "Subscribed to request subject");
        Ok(subscriber)
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }
}

/// Decode a raw message payload.
///
/// A payload that is not a valid request becomes a rejection carrying
/// whatever id could still be read from it.
pub fn decode_request(payload: &[u8]) -> std::result::Result<TransactionRequest, ScoringRejection> {
    serde_json::from_slice::<TransactionRequest>(payload).map_err(|e| {
        let mut rejection = ScoringRejection::malformed(e);
        rejection.transaction_id = salvage_id(payload);
        rejection
    })
}

fn salvage_id(payload: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(payload).ok()?;
    let id = value.get("transaction_id").or_else(|| value.get("id"))?;
    match id {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
