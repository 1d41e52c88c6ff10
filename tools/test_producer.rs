//! Test Request Producer
//!
//! Publishes random credit-card transactions to NATS for exercising the
//! scoring service.

use fraud_consensus::feature_assembler::CREDIT_CARD_FEATURES;
use fraud_consensus::TransactionRequest;
use rand::Rng;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{info, warn};

/// Random transaction generator
struct RequestGenerator {
    rng: rand::rngs::ThreadRng,
    counter: u64,
}

impl RequestGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
            counter: 0,
        }
    }

    fn next_id(&mut self) -> String {
        self.counter += 1;
        format!("TX{:05}", self.counter)
    }

    /// Full 30-value vector: time of day, PCA components, amount
    fn generate_vector(&mut self) -> TransactionRequest {
        let id = self.next_id();
        let mut features = Vec::with_capacity(CREDIT_CARD_FEATURES.len());
        features.push(self.rng.gen_range(0.0..172_800.0));
        for _ in 1..CREDIT_CARD_FEATURES.len() - 1 {
            features.push(self.rng.gen_range(-3.0..3.0));
        }
        features.push(self.rng.gen_range(1.0..500.0));
        TransactionRequest::from_vector(id, features)
    }

    /// Sparse named request with a handful of strongly shifted components
    fn generate_suspicious(&mut self) -> TransactionRequest {
        let id = self.next_id();
        let mut features = HashMap::new();
        features.insert("Time".to_string(), self.rng.gen_range(0.0..21_600.0));
        features.insert("Amount".to_string(), self.rng.gen_range(1.0..2_500.0));
        for name in ["V3", "V10", "V12", "V14", "V17"] {
            features.insert(name.to_string(), self.rng.gen_range(-10.0..-4.0));
        }
        features.insert("V4".to_string(), self.rng.gen_range(3.0..8.0));
        TransactionRequest::from_named(id, features)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("test_producer=info".parse()?),
        )
        .init();

    info!("Starting test request producer");

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let nats_url = args.get(1).map(|s| s.as_str()).unwrap_or("nats://localhost:4222");
    let subject = args.get(2).map(|s| s.as_str()).unwrap_or("transactions");
    let count: u64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(100);
    let fraud_rate: f64 = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(0.1);
    let delay_ms: u64 = args.get(5).and_then(|s| s.parse().ok()).unwrap_or(100);

    info!(
        nats_url = %nats_url,
        subject = %subject,
        count = count,
        fraud_rate = fraud_rate,
        delay_ms = delay_ms,
        "Configuration loaded"
    );

    let client = match async_nats::connect(nats_url).await {
        Ok(c) => {
            info!("Connected to NATS");
            Some(c)
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to NATS. Running in dry-run mode.");
            None
        }
    };

    let mut generator = RequestGenerator::new();
    let mut rng = rand::thread_rng();
    let mut suspicious_count = 0;

    for i in 0..count {
        let request = if rng.gen_bool(fraud_rate.clamp(0.0, 1.0)) {
            suspicious_count += 1;
            generator.generate_suspicious()
        } else {
            generator.generate_vector()
        };

        match &client {
            Some(client) => {
                let payload = serde_json::to_vec(&request)?;
                client.publish(subject.to_string(), payload.into()).await?;
            }
            None if (i + 1) % 10 == 0 || i == 0 => {
                info!("Sample request {}:\n{}", i + 1, serde_json::to_string_pretty(&request)?);
            }
            None => {}
        }

        if (i + 1) % 10 == 0 {
            info!(
                "Generated {}/{} requests ({} suspicious)",
                i + 1,
                count,
                suspicious_count
            );
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    info!(
        "Completed! Generated {} requests ({} suspicious)",
        count, suspicious_count
    );

    Ok(())
}
