//! Wire types for scoring requests and results

pub mod prediction;
pub mod transaction;

pub use prediction::{PredictionResult, ScoringRejection};
pub use transaction::{FeatureInput, TransactionRequest};
