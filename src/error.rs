//! Error types for model loading and scoring

use thiserror::Error;

/// Result alias used across the scoring library.
pub type ScoringResult<T> = Result<T, ScoringError>;

/// Errors raised while loading the model bundle or scoring a transaction.
///
/// Every variant names the artifact, feature or row it concerns so the
/// caller can report it without extra context.
#[derive(Debug, Error)]
pub enum ScoringError {
    /// A required file is absent from the model directory
    #[error("missing model artifact '{artifact}' (expected at {path})")]
    MissingArtifact { artifact: String, path: String },

    /// A model artifact exists but could not be parsed or is inconsistent
    #[error("invalid model artifact '{artifact}': {reason}")]
    InvalidArtifact { artifact: String, reason: String },

    /// Feature vector length differs from the trained feature count
    #[error("feature vector has {actual} values, expected {expected}")]
    ShapeMismatch { expected: usize, actual: usize },

    /// Scaler has a zero or non-finite scale for a feature
    #[error("scaler has degenerate scale {scale} for feature '{feature}' (index {index})")]
    DegenerateScale {
        index: usize,
        feature: String,
        scale: f64,
    },

    /// Input value could not be used as a number
    #[error("invalid value for '{field}': {reason}")]
    Validation { field: String, reason: String },

    /// A classifier failed to produce a prediction
    #[error("classifier '{model}' failed: {reason}")]
    Classifier { model: String, reason: String },

    /// A batch row failed; carries the row position and its transaction id
    #[error("row {row} ({transaction_id}): {source}")]
    Row {
        row: usize,
        transaction_id: String,
        #[source]
        source: Box<ScoringError>,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScoringError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ScoringError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_artifact(artifact: impl Into<String>, reason: impl Into<String>) -> Self {
        ScoringError::InvalidArtifact {
            artifact: artifact.into(),
            reason: reason.into(),
        }
    }

    pub fn classifier(model: impl Into<String>, reason: impl ToString) -> Self {
        ScoringError::Classifier {
            model: model.into(),
            reason: reason.to_string(),
        }
    }

    /// Short machine-readable code, used in rejection messages.
    pub fn code(&self) -> &'static str {
        match self {
            ScoringError::MissingArtifact { .. } => "missing_artifact",
            ScoringError::InvalidArtifact { .. } => "invalid_artifact",
            ScoringError::ShapeMismatch { .. } => "shape_mismatch",
            ScoringError::DegenerateScale { .. } => "degenerate_scale",
            ScoringError::Validation { .. } => "validation",
            ScoringError::Classifier { .. } => "classifier",
            ScoringError::Row { source, .. } => source.code(),
            ScoringError::Csv(_) => "csv",
            ScoringError::Io(_) => "io",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_artifact_names_file() {
        let err = ScoringError::MissingArtifact {
            artifact: "scaler.json".to_string(),
            path: "models/scaler.json".to_string(),
        };
        assert!(err.to_string().contains("scaler.json"));
        assert_eq!(err.code(), "missing_artifact");
    }

    #[test]
    fn test_row_error_reports_inner_code() {
        let err = ScoringError::Row {
            row: 3,
            transaction_id: "TX00004".to_string(),
            source: Box::new(ScoringError::ShapeMismatch {
                expected: 30,
                actual: 29,
            }),
        };
        assert_eq!(err.code(), "shape_mismatch");
        assert!(err.to_string().contains("TX00004"));
        assert!(err.to_string().contains("expected 30"));
    }
}
