//! Fraud consensus scorer - service entry point
//!
//! Consumes transaction requests from NATS, scores them with both
//! classifiers and publishes the consensus predictions.

use anyhow::{Context, Result};
use fraud_consensus::{
    config::AppConfig,
    consumer::{decode_request, TransactionConsumer},
    logging,
    metrics::{MetricsReporter, ScoringMetrics},
    models::{ModelKind, ModelLoader},
    producer::ResultProducer,
    types::prediction::ScoringRejection,
};
use futures::StreamExt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Optional config path as the only argument
    let config = match std::env::args().nth(1) {
        Some(path) => AppConfig::load_from_path(&path)?,
        None => AppConfig::load()?,
    };

    logging::init(&config.logging, &["fraud_consensus"])?;
    info!("Starting fraud consensus scorer");

    // Load models once; a missing artifact stops startup here
    let loader = ModelLoader::with_threads(config.models.onnx_threads);
    let bundle = loader
        .load_bundle(&config.models.models_dir)
        .with_context(|| format!("Failed to load models from {}", config.models.models_dir))?;
    let bundle = Arc::new(bundle);

    let model_info = bundle.model_info();
    info!(
        features = model_info.num_features,
        train_samples = model_info.train_samples,
        test_samples = model_info.test_samples,
        fraud_rate = model_info.fraud_rate,
        "Model bundle ready"
    );
    for kind in ModelKind::ALL {
        let perf = bundle.performance(kind);
        info!(
            model = %kind,
            auc = perf.auc,
            f1 = perf.f1,
            accuracy = perf.accuracy,
            precision = perf.precision,
            recall = perf.recall,
            "Model performance"
        );
    }

    let metrics = Arc::new(ScoringMetrics::new());

    // Connect to NATS
    let client = async_nats::connect(&config.nats.url).await?;
    info!("Connected to NATS at {}", config.nats.url);

    let consumer = TransactionConsumer::new(client.clone(), &config.nats.transaction_subject);
    let producer = Arc::new(ResultProducer::new(
        client.clone(),
        &config.nats.result_subject,
        &config.nats.rejection_subject,
    ));

    let num_workers = config.pipeline.workers.max(1);
    info!(
        workers = num_workers,
        requests = %consumer.subject(),
        results = %producer.result_subject(),
        rejections = %producer.rejection_subject(),
        "Starting request loop"
    );

    // Semaphore to limit concurrent scoring
    let semaphore = Arc::new(Semaphore::new(num_workers));
    let processed_count = Arc::new(AtomicU64::new(0));

    let reporter = MetricsReporter::new(metrics.clone(), config.pipeline.summary_interval_secs);
    tokio::spawn(reporter.start());

    let mut subscription = consumer.subscribe().await?;

    while let Some(message) = subscription.next().await {
        let permit = semaphore
            .clone()
            .acquire_owned()
            .await
            .context("Worker semaphore closed")?;

        let bundle = bundle.clone();
        let producer = producer.clone();
        let metrics = metrics.clone();
        let processed_count = processed_count.clone();

        tokio::spawn(async move {
            let start_time = Instant::now();

            let request = match decode_request(&message.payload) {
                Ok(request) => request,
                Err(rejection) => {
                    warn!(
                        transaction_id = ?rejection.transaction_id,
                        error = %rejection.error,
                        "Failed to deserialize transaction request"
                    );
                    metrics.record_rejection(&rejection.code);
                    if let Err(e) = producer.publish_rejection(&rejection).await {
                        error!(error = %e, "Failed to publish rejection");
                    }
                    drop(permit);
                    return;
                }
            };

            let fallback_id = uuid::Uuid::new_v4().to_string();

            match bundle.predict_request(&request, &fallback_id) {
                Ok(prediction) => {
                    let processing_time = start_time.elapsed();
                    metrics.record_prediction(processing_time, &prediction);

                    if let Err(e) = producer.publish_result(&prediction).await {
                        error!(
                            transaction_id = %prediction.transaction_id,
                            error = %e,
                            "Failed to publish prediction"
                        );
                    } else if prediction.is_fraud {
                        info!(
                            transaction_id = %prediction.transaction_id,
                            consensus_score = prediction.consensus_score,
                            lr_probability = prediction.lr_probability,
                            rf_probability = prediction.rf_probability,
                            processing_time_us = processing_time.as_micros(),
                            "Fraud predicted"
                        );
                    } else {
                        debug!(
                            transaction_id = %prediction.transaction_id,
                            consensus_score = prediction.consensus_score,
                            processing_time_us = processing_time.as_micros(),
                            "Transaction scored as legitimate"
                        );
                    }

                    let count = processed_count.fetch_add(1, Ordering::Relaxed) + 1;
                    if count % 100 == 0 {
                        let snapshot = metrics.snapshot();
                        info!(
                            processed = count,
                            throughput = format!("{:.1} tx/s", snapshot.throughput),
                            avg_latency_us = snapshot.latency.mean_us,
                            consensus_frauds = snapshot.consensus_frauds,
                            "Processing milestone"
                        );
                    }
                }
                Err(e) => {
                    let transaction_id = request.transaction_id.clone().unwrap_or(fallback_id);
                    warn!(transaction_id = %transaction_id, error = %e, "Request rejected");
                    metrics.record_rejection(e.code());

                    let rejection = ScoringRejection::from_error(Some(transaction_id), &e);
                    if let Err(e) = producer.publish_rejection(&rejection).await {
                        error!(error = %e, "Failed to publish rejection");
                    }
                }
            }

            drop(permit);
        });
    }

    info!("Subscription closed, shutting down");
    metrics.print_summary();

    Ok(())
}
