//! NATS publisher for prediction results and rejections

use crate::types::prediction::{PredictionResult, ScoringRejection};
use anyhow::Result;
use async_nats::Client;
use tracing::debug;

/// Publishes scoring outcomes to NATS
#[derive(Clone)]
pub struct ResultProducer {
    client: Client,
    result_subject: String,
    rejection_subject: String,
}

impl ResultProducer {
    pub fn new(client: Client, result_subject: &str, rejection_subject: &str) -> Self {
        Self {
            client,
            result_subject: result_subject.to_string(),
            rejection_subject: rejection_subject.to_string(),
        }
    }

    /// Publish a prediction result
    pub async fn publish_result(&self, result: &PredictionResult) -> Result<()> {
        let payload = serde_json::to_vec(result)?;

        self.client
            .publish(self.result_subject.clone(), payload.into())
            .await?;

        debug!(
            transaction_id = %result.transaction_id,
            consensus_score = result.consensus_score,
            "Published prediction"
        );

        Ok(())
    }

    /// Publish a rejected request
    pub async fn publish_rejection(&self, rejection: &ScoringRejection) -> Result<()> {
        let payload = serde_json::to_vec(rejection)?;

        self.client
            .publish(self.rejection_subject.clone(), payload.into())
            .await?;

        debug!(
            transaction_id = ?rejection.transaction_id,
            code = %rejection.code,
            "Published rejection"
        );

        Ok(())
    }

    pub fn result_subject(&self) -> &str {
        &self.result_subject
    }

    pub fn rejection_subject(&self) -> &str {
        &self.rejection_subject
    }
}
