//! Consensus scoring over the loaded model bundle

use crate::batch::{BatchOutcome, CellError, FeatureTable, RowFailure};
use crate::config::BatchErrorPolicy;
use crate::error::{ScoringError, ScoringResult};
use crate::feature_assembler::FeatureAssembler;
use crate::models::classifier::{Classifier, ClassifierOutput};
use crate::models::metadata::{ModelInfo, ModelKind, ModelMetadata, ModelPerformance};
use crate::models::scaler::StandardScaler;
use crate::types::prediction::PredictionResult;
use crate::types::transaction::{FeatureInput, TransactionRequest};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Default id for the row at `idx` (zero based) of a batch: `TX00001`, ...
pub fn default_transaction_id(idx: usize) -> String {
    format!("TX{:05}", idx + 1)
}

/// Both classifiers with the scaler, metadata and feature layout they were
/// trained with.
///
/// Built once at startup and shared read-only; every scoring call borrows it.
pub struct ModelBundle {
    lr: Box<dyn Classifier>,
    rf: Box<dyn Classifier>,
    scaler: StandardScaler,
    metadata: ModelMetadata,
    assembler: FeatureAssembler,
}

impl ModelBundle {
    /// Assemble a bundle, checking that every part agrees on the feature count.
    pub fn new(
        lr: Box<dyn Classifier>,
        rf: Box<dyn Classifier>,
        scaler: StandardScaler,
        metadata: ModelMetadata,
        feature_names: Vec<String>,
    ) -> ScoringResult<Self> {
        if feature_names.is_empty() {
            return Err(ScoringError::invalid_artifact("feature_names", "no feature names"));
        }
        let mut seen = HashSet::with_capacity(feature_names.len());
        if let Some(duplicate) = feature_names.iter().find(|name| !seen.insert(name.as_str())) {
            return Err(ScoringError::invalid_artifact(
                "feature_names",
                format!("feature '{}' is listed more than once", duplicate),
            ));
        }
        if scaler.feature_count() != feature_names.len() {
            return Err(ScoringError::invalid_artifact(
                "scaler",
                format!(
                    "fitted on {} features but {} feature names were given",
                    scaler.feature_count(),
                    feature_names.len()
                ),
            ));
        }
        if metadata.num_features != feature_names.len() {
            return Err(ScoringError::invalid_artifact(
                "model_metadata",
                format!(
                    "num_features is {} but {} feature names were given",
                    metadata.num_features,
                    feature_names.len()
                ),
            ));
        }
        scaler.validate(&feature_names)?;

        Ok(Self {
            lr,
            rf,
            scaler,
            metadata,
            assembler: FeatureAssembler::new(feature_names),
        })
    }

    pub fn feature_count(&self) -> usize {
        self.assembler.feature_count()
    }

    pub fn feature_names(&self) -> &[String] {
        self.assembler.feature_names()
    }

    pub fn assembler(&self) -> &FeatureAssembler {
        &self.assembler
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    pub fn model_info(&self) -> ModelInfo {
        self.metadata.info()
    }

    pub fn performance(&self, model: ModelKind) -> ModelPerformance {
        self.metadata.performance(model)
    }

    /// Scale a raw vector and run both classifiers on it.
    pub fn score(&self, raw: &[f64]) -> ScoringResult<(ClassifierOutput, ClassifierOutput)> {
        let scaled = self.scaler.transform(raw, self.assembler.feature_names())?;
        let lr = self.lr.classify(&scaled)?;
        let rf = self.rf.classify(&scaled)?;
        Ok((lr, rf))
    }

    /// Score one transaction given in training column order.
    pub fn predict_single(&self, features: &[f64], transaction_id: &str) -> ScoringResult<PredictionResult> {
        let (lr, rf) = self.score(features)?;
        let result = PredictionResult::new(transaction_id.to_string(), lr, rf);

        debug!(
            transaction_id = %transaction_id,
            lr_probability = result.lr_probability,
            rf_probability = result.rf_probability,
            consensus_score = result.consensus_score,
            "Transaction scored"
        );

        Ok(result)
    }

    /// Score one transaction given as feature name -> value.
    pub fn predict_from_map(
        &self,
        features: &HashMap<String, f64>,
        transaction_id: &str,
    ) -> ScoringResult<PredictionResult> {
        let vector = self.assembler.assemble(features);
        self.predict_single(&vector, transaction_id)
    }

    /// Score one transaction whose values still need numeric coercion.
    pub fn predict_from_values(
        &self,
        features: &HashMap<String, Value>,
        transaction_id: &str,
    ) -> ScoringResult<PredictionResult> {
        let vector = self.assembler.assemble_values(features)?;
        self.predict_single(&vector, transaction_id)
    }

    /// Score a request, using `transaction_id` when the request carries none.
    pub fn predict_request(
        &self,
        request: &TransactionRequest,
        transaction_id: &str,
    ) -> ScoringResult<PredictionResult> {
        let id = request.transaction_id.as_deref().unwrap_or(transaction_id);
        match &request.features {
            FeatureInput::Vector(values) => self.predict_single(values, id),
            FeatureInput::Named(values) => self.predict_from_values(values, id),
        }
    }

    /// Score rows given in training column order.
    ///
    /// Rows are independent; `ids`, when given, must have one entry per row.
    pub fn predict_batch(
        &self,
        rows: &[Vec<f64>],
        ids: Option<&[String]>,
        policy: BatchErrorPolicy,
    ) -> ScoringResult<BatchOutcome> {
        self.run_batch(rows, ids, policy, |row, id| self.predict_single(row, id))
    }

    /// Score rows given as feature name -> value.
    pub fn predict_batch_named(
        &self,
        rows: &[HashMap<String, f64>],
        ids: Option<&[String]>,
        policy: BatchErrorPolicy,
    ) -> ScoringResult<BatchOutcome> {
        self.run_batch(rows, ids, policy, |row, id| self.predict_from_map(row, id))
    }

    /// Score rows read from CSV; a row with an unreadable cell fails with
    /// that cell's error instead of being scored.
    pub fn predict_table(&self, table: &FeatureTable, policy: BatchErrorPolicy) -> ScoringResult<BatchOutcome> {
        let rows: Vec<(&Vec<f64>, Option<&CellError>)> = table
            .rows
            .iter()
            .enumerate()
            .map(|(idx, row)| (row, table.cell_errors.get(idx).and_then(Option::as_ref)))
            .collect();
        self.run_batch(&rows, table.ids.as_deref(), policy, |(row, cell_error), id| match cell_error {
            Some(cell_error) => Err(cell_error.to_error()),
            None => self.predict_single(row.as_slice(), id),
        })
    }

    fn run_batch<T>(
        &self,
        rows: &[T],
        ids: Option<&[String]>,
        policy: BatchErrorPolicy,
        predict: impl Fn(&T, &str) -> ScoringResult<PredictionResult>,
    ) -> ScoringResult<BatchOutcome> {
        if let Some(ids) = ids {
            if ids.len() != rows.len() {
                return Err(ScoringError::validation(
                    "transaction_ids",
                    format!("{} ids given for {} rows", ids.len(), rows.len()),
                ));
            }
        }

        let mut outcome = BatchOutcome::with_capacity(rows.len());

        for (idx, row) in rows.iter().enumerate() {
            let transaction_id = match ids {
                Some(ids) => ids[idx].clone(),
                None => default_transaction_id(idx),
            };

            match predict(row, &transaction_id) {
                Ok(result) => outcome.results.push(result),
                Err(e) => match policy {
                    BatchErrorPolicy::Abort => {
                        return Err(ScoringError::Row {
                            row: idx,
                            transaction_id,
                            source: Box::new(e),
                        });
                    }
                    BatchErrorPolicy::Skip => {
                        warn!(row = idx, transaction_id = %transaction_id, error = %e, "Skipping batch row");
                        outcome.failures.push(RowFailure {
                            row: idx,
                            transaction_id,
                            code: e.code().to_string(),
                            error: e.to_string(),
                        });
                    }
                },
            }
        }

        Ok(outcome)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::classifier::testing::{FixedClassifier, LinearClassifier};
    use std::sync::Arc;

    pub(crate) fn metadata(num_features: usize) -> ModelMetadata {
        serde_json::from_value(serde_json::json!({
            "lr_auc": 0.97, "rf_auc": 0.95, "lr_f1": 0.71, "rf_f1": 0.85,
            "num_features": num_features,
            "train_samples": 227845, "test_samples": 56962,
            "train_fraud_rate": 0.17,
            "lr_accuracy": 0.999
        }))
        .unwrap()
    }

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("f{}", i)).collect()
    }

    pub(crate) fn linear_bundle(n: usize) -> ModelBundle {
        let scaler = StandardScaler::new(vec![1.0; n], vec![2.0; n], &[]).unwrap();
        let lr = LinearClassifier {
            name: "lr".to_string(),
            weights: vec![0.5; n],
            bias: -1.0,
        };
        let rf = LinearClassifier {
            name: "rf".to_string(),
            weights: (0..n).map(|i| if i % 2 == 0 { 1.0 } else { -0.25 }).collect(),
            bias: 0.2,
        };
        ModelBundle::new(Box::new(lr), Box::new(rf), scaler, metadata(n), names(n)).unwrap()
    }

    fn fixed_bundle(lr_prob: f64, rf_prob: f64) -> ModelBundle {
        let scaler = StandardScaler::new(vec![0.0; 3], vec![1.0; 3], &[]).unwrap();
        ModelBundle::new(
            Box::new(FixedClassifier::new("lr", lr_prob)),
            Box::new(FixedClassifier::new("rf", rf_prob)),
            scaler,
            metadata(3),
            names(3),
        )
        .unwrap()
    }

    #[test]
    fn test_stub_models_tie_breaks_low() {
        let bundle = fixed_bundle(0.8, 0.2);
        let result = bundle.predict_single(&[1.0, 2.0, 3.0], "TX001").unwrap();

        assert_eq!(result.lr_probability, 0.8);
        assert_eq!(result.rf_probability, 0.2);
        assert_eq!(result.consensus_score, 0.5);
        assert_eq!(result.consensus_prediction, 0);
        assert_eq!(result.lr_prediction, 1);
        assert_eq!(result.rf_prediction, 0);
    }

    #[test]
    fn test_consensus_is_mean_of_probabilities() {
        let bundle = linear_bundle(5);
        let result = bundle.predict_single(&[3.0, -1.0, 0.5, 7.0, 2.0], "TX1").unwrap();
        let mean = (result.lr_probability + result.rf_probability) / 2.0;

        assert!((result.consensus_score - mean).abs() < 1e-9);
        assert_eq!(result.consensus_prediction == 1, result.consensus_score > 0.5);
    }

    #[test]
    fn test_classifiers_see_scaled_features() {
        // mean 1, scale 2: raw 3 -> scaled 1; lr = sigmoid(0.5 * 1 * n - 1)
        let bundle = linear_bundle(2);
        let result = bundle.predict_single(&[3.0, 3.0], "TX1").unwrap();
        let expected = 1.0 / (1.0 + (-(0.5 * 2.0 - 1.0_f64)).exp());
        assert!((result.lr_probability - expected).abs() < 1e-12);
    }

    #[test]
    fn test_wrong_length_rejected() {
        let bundle = fixed_bundle(0.1, 0.1);
        let err = bundle.predict_single(&[1.0, 2.0], "TX1").unwrap_err();
        assert!(matches!(
            err,
            ScoringError::ShapeMismatch {
                expected: 3,
                actual: 2
            }
        ));
    }

    #[test]
    fn test_predict_from_map_defaults_missing_to_zero() {
        let bundle = linear_bundle(4);
        let mut named = HashMap::new();
        named.insert("f2".to_string(), 5.0);
        named.insert("unknown".to_string(), 100.0);

        let from_map = bundle.predict_from_map(&named, "TX1").unwrap();
        let from_vec = bundle.predict_single(&[0.0, 0.0, 5.0, 0.0], "TX1").unwrap();

        assert_eq!(from_map.lr_probability, from_vec.lr_probability);
        assert_eq!(from_map.rf_probability, from_vec.rf_probability);
    }

    #[test]
    fn test_predict_request_uses_fallback_id() {
        let bundle = linear_bundle(3);
        let request: TransactionRequest =
            serde_json::from_str(r#"{"features": {"f0": "1.5"}}"#).unwrap();

        let result = bundle.predict_request(&request, "generated").unwrap();
        assert_eq!(result.transaction_id, "generated");
    }

    #[test]
    fn test_predict_request_rejects_bad_value() {
        let bundle = linear_bundle(3);
        let request: TransactionRequest =
            serde_json::from_str(r#"{"transaction_id": "TX7", "features": {"f1": true}}"#).unwrap();

        let err = bundle.predict_request(&request, "unused").unwrap_err();
        assert!(matches!(err, ScoringError::Validation { ref field, .. } if field == "f1"));
    }

    #[test]
    fn test_batch_matches_isolated_predictions() {
        let bundle = linear_bundle(3);
        let rows = vec![
            vec![0.0, 1.0, 2.0],
            vec![9.0, -4.0, 0.3],
            vec![1.0, 1.0, 1.0],
            vec![-7.5, 2.0, 6.0],
        ];

        let outcome = bundle
            .predict_batch(&rows, None, BatchErrorPolicy::Abort)
            .unwrap();

        assert_eq!(outcome.results.len(), rows.len());
        for (idx, (row, batched)) in rows.iter().zip(&outcome.results).enumerate() {
            let single = bundle.predict_single(row, "single").unwrap();
            assert_eq!(batched.transaction_id, default_transaction_id(idx));
            assert_eq!(batched.lr_probability, single.lr_probability);
            assert_eq!(batched.rf_probability, single.rf_probability);
            assert_eq!(batched.consensus_score, single.consensus_score);
        }
    }

    #[test]
    fn test_default_ids_are_zero_padded() {
        assert_eq!(default_transaction_id(0), "TX00001");
        assert_eq!(default_transaction_id(41), "TX00042");
    }

    #[test]
    fn test_batch_aborts_on_first_bad_row() {
        let bundle = linear_bundle(2);
        let rows = vec![vec![1.0, 2.0], vec![1.0], vec![f64::NAN, 0.0]];

        let err = bundle
            .predict_batch(&rows, None, BatchErrorPolicy::Abort)
            .unwrap_err();
        match err {
            ScoringError::Row {
                row,
                transaction_id,
                source,
            } => {
                assert_eq!(row, 1);
                assert_eq!(transaction_id, "TX00002");
                assert!(matches!(*source, ScoringError::ShapeMismatch { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_batch_skip_records_failures() {
        let bundle = linear_bundle(2);
        let rows = vec![vec![1.0, 2.0], vec![1.0], vec![f64::NAN, 0.0], vec![0.0, 0.0]];
        let ids: Vec<String> = ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect();

        let outcome = bundle
            .predict_batch(&rows, Some(&ids), BatchErrorPolicy::Skip)
            .unwrap();

        assert_eq!(outcome.results.len(), 2);
        assert_eq!(outcome.results[1].transaction_id, "d");
        assert_eq!(outcome.failures.len(), 2);
        assert_eq!(outcome.failures[0].transaction_id, "b");
        assert_eq!(outcome.failures[0].code, "shape_mismatch");
        assert_eq!(outcome.failures[1].row, 2);
        assert_eq!(outcome.failures[1].code, "validation");
    }

    #[test]
    fn test_batch_id_count_must_match() {
        let bundle = linear_bundle(2);
        let rows = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
        let ids = vec!["only-one".to_string()];

        let err = bundle
            .predict_batch(&rows, Some(&ids), BatchErrorPolicy::Skip)
            .unwrap_err();
        assert!(matches!(err, ScoringError::Validation { .. }));
    }

    #[test]
    fn test_named_batch() {
        let bundle = linear_bundle(2);
        let mut first = HashMap::new();
        first.insert("f1".to_string(), 4.0);
        let rows = vec![first, HashMap::new()];

        let outcome = bundle
            .predict_batch_named(&rows, None, BatchErrorPolicy::Abort)
            .unwrap();
        let expected = bundle.predict_single(&[0.0, 0.0], "x").unwrap();
        assert_eq!(outcome.results[1].consensus_score, expected.consensus_score);
    }

    #[test]
    fn test_mismatched_parts_rejected() {
        let scaler = StandardScaler::new(vec![0.0; 2], vec![1.0; 2], &[]).unwrap();
        let result = ModelBundle::new(
            Box::new(FixedClassifier::new("lr", 0.1)),
            Box::new(FixedClassifier::new("rf", 0.1)),
            scaler,
            metadata(3),
            names(3),
        );
        assert!(matches!(result, Err(ScoringError::InvalidArtifact { .. })));
    }

    #[test]
    fn test_duplicate_feature_names_rejected() {
        let scaler = StandardScaler::new(vec![0.0; 3], vec![1.0; 3], &[]).unwrap();
        let result = ModelBundle::new(
            Box::new(FixedClassifier::new("lr", 0.1)),
            Box::new(FixedClassifier::new("rf", 0.1)),
            scaler,
            metadata(3),
            vec!["V1".to_string(), "Amount".to_string(), "V1".to_string()],
        );
        match result {
            Err(ScoringError::InvalidArtifact { artifact, reason }) => {
                assert_eq!(artifact, "feature_names");
                assert!(reason.contains("'V1'"));
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("duplicate feature names were accepted"),
        }
    }

    #[test]
    fn test_shared_across_threads() {
        let bundle = Arc::new(fixed_bundle(0.9, 0.6));
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let bundle = bundle.clone();
                std::thread::spawn(move || {
                    bundle
                        .predict_single(&[i as f64, 0.0, 1.0], &format!("TX{}", i))
                        .unwrap()
                })
            })
            .collect();

        for handle in handles {
            let result = handle.join().unwrap();
            assert_eq!(result.consensus_prediction, 1);
        }
    }

    #[test]
    fn test_model_info_and_performance() {
        let bundle = linear_bundle(3);
        let info = bundle.model_info();
        assert_eq!(info.num_features, 3);
        assert_eq!(info.fraud_rate, 0.17);

        let lr = bundle.performance(ModelKind::LogisticRegression);
        assert_eq!(lr.accuracy, 0.999);
        assert_eq!(lr.auc, 0.97);
        assert_eq!(bundle.performance(ModelKind::RandomForest).accuracy, 0.0);
    }
}
