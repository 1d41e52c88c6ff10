//! Batch CSV scoring
//!
//! Usage: batch_score <models_dir> <input.csv> [output.csv] [abort|skip]
//!
//! Column mapping and the id column come from `config/config.toml` when it
//! exists; the error policy argument overrides the configured one.

use anyhow::{Context, Result};
use fraud_consensus::batch::{read_feature_table, write_results};
use fraud_consensus::config::{AppConfig, BatchErrorPolicy};
use fraud_consensus::logging;
use fraud_consensus::models::{ModelKind, ModelLoader};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::{info, warn};

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        anyhow::bail!("usage: {} <models_dir> <input.csv> [output.csv] [abort|skip]", args[0]);
    }
    let models_dir = &args[1];
    let input = &args[2];
    let output = args.get(3).map(|s| s.as_str()).unwrap_or("fraud_predictions.csv");

    let config = if Path::new("config/config.toml").exists() {
        AppConfig::load()?
    } else {
        AppConfig::default()
    };
    logging::init(&config.logging, &["fraud_consensus", "batch_score"])?;

    let policy: BatchErrorPolicy = match args.get(4) {
        Some(policy) => policy.parse()?,
        None => config.batch.on_error,
    };

    let bundle = ModelLoader::with_threads(config.models.onnx_threads)
        .load_bundle(models_dir)
        .with_context(|| format!("Failed to load models from {}", models_dir))?;

    let info = bundle.model_info();
    info!(
        lr_auc = info.lr_auc,
        rf_auc = info.rf_auc,
        lr_f1 = info.lr_f1,
        rf_f1 = info.rf_f1,
        features = info.num_features,
        fraud_rate = info.fraud_rate,
        "Models loaded"
    );
    for kind in ModelKind::ALL {
        let perf = bundle.performance(kind);
        info!(
            "{}: accuracy={:.4} precision={:.4} recall={:.4} f1={:.4} auc={:.4}",
            kind, perf.accuracy, perf.precision, perf.recall, perf.f1, perf.auc
        );
    }

    let file = File::open(input).with_context(|| format!("Failed to open {}", input))?;
    let table = read_feature_table(
        file,
        bundle.feature_names(),
        config.batch.column_mapping,
        config.batch.id_column.as_deref(),
    )
    .with_context(|| format!("Failed to read features from {}", input))?;
    info!(rows = table.rows.len(), mapping = ?table.mapping, "Loaded transactions");

    let outcome = bundle
        .predict_table(&table, policy)
        .context("Batch prediction failed")?;

    for failure in &outcome.failures {
        warn!(
            row = failure.row,
            transaction_id = %failure.transaction_id,
            error = %failure.error,
            "Row not scored"
        );
    }

    let writer = BufWriter::new(
        File::create(output).with_context(|| format!("Failed to create {}", output))?,
    );
    write_results(writer, &outcome.results)
        .with_context(|| format!("Failed to write results to {}", output))?;

    outcome.summary().log();
    info!(output = %output, "Results written");

    Ok(())
}
