//! Credit-card fraud scoring library
//!
//! Scores transactions with a logistic-regression and a random-forest
//! classifier and combines their fraud probabilities into one consensus
//! decision.

pub mod batch;
pub mod config;
pub mod consumer;
pub mod error;
pub mod feature_assembler;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod producer;
pub mod types;

pub use config::AppConfig;
pub use consumer::TransactionConsumer;
pub use error::{ScoringError, ScoringResult};
pub use feature_assembler::FeatureAssembler;
pub use models::inference::ModelBundle;
pub use models::loader::ModelLoader;
pub use producer::ResultProducer;
pub use types::{prediction::PredictionResult, transaction::TransactionRequest};
