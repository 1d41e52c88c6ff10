//! Configuration management for the fraud scoring service

use anyhow::{Context, Result};
use config::{Config, File};
use serde::Deserialize;
use std::path::Path;

/// What to do when one row of a batch cannot be scored
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BatchErrorPolicy {
    /// Fail the whole batch on the first bad row
    #[default]
    Abort,
    /// Record the failure for that row and keep going
    Skip,
}

impl std::str::FromStr for BatchErrorPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "abort" => Ok(Self::Abort),
            "skip" => Ok(Self::Skip),
            other => anyhow::bail!("unknown batch error policy '{}' (use abort or skip)", other),
        }
    }
}

/// How CSV columns are matched to model features
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ColumnMapping {
    /// By header name when every feature is present, otherwise by position
    #[default]
    Auto,
    /// Every feature name must appear in the header
    ByName,
    /// First N numeric columns, in order
    Positional,
}

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub nats: NatsConfig,
    pub models: ModelsConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// NATS connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NatsConfig {
    /// NATS server URL
    pub url: String,
    /// Subject for incoming transaction requests
    pub transaction_subject: String,
    /// Subject for outgoing prediction results
    pub result_subject: String,
    /// Subject for rejected requests
    #[serde(default = "default_rejection_subject")]
    pub rejection_subject: String,
}

fn default_rejection_subject() -> String {
    "fraud.rejections".to_string()
}

/// Model bundle configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ModelsConfig {
    /// Directory holding the classifier, scaler, metadata and feature-name files
    pub models_dir: String,
    /// Number of threads for ONNX inference per model (default: 1)
    #[serde(default = "default_onnx_threads")]
    pub onnx_threads: usize,
}

fn default_onnx_threads() -> usize {
    1
}

/// Service loop configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Maximum number of requests scored concurrently
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Seconds between metrics summaries
    #[serde(default = "default_summary_interval")]
    pub summary_interval_secs: u64,
}

fn default_workers() -> usize {
    4
}

fn default_summary_interval() -> u64 {
    30
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            summary_interval_secs: default_summary_interval(),
        }
    }
}

/// Batch scoring configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BatchConfig {
    #[serde(default)]
    pub on_error: BatchErrorPolicy,
    #[serde(default)]
    pub column_mapping: ColumnMapping,
    /// CSV column holding transaction ids; generated ids are used when unset
    #[serde(default)]
    pub id_column: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/config.toml")
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            nats: NatsConfig {
                url: "nats://localhost:4222".to_string(),
                transaction_subject: "transactions".to_string(),
                result_subject: "fraud.predictions".to_string(),
                rejection_subject: default_rejection_subject(),
            },
            models: ModelsConfig {
                models_dir: "fraud_detection_models".to_string(),
                onnx_threads: 1,
            },
            pipeline: PipelineConfig::default(),
            batch: BatchConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
