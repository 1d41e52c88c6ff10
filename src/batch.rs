//! Batch scoring: CSV ingestion, result export and summaries

use crate::config::ColumnMapping;
use crate::error::{ScoringError, ScoringResult};
use crate::types::prediction::PredictionResult;
use csv::{ReaderBuilder, StringRecord, Trim, Writer};
use serde::Serialize;
use std::io;
use tracing::{info, warn};

/// Results of a batch run
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    /// Successful predictions, in input order
    pub results: Vec<PredictionResult>,
    /// Rows skipped under the `skip` policy
    pub failures: Vec<RowFailure>,
}

/// A row that could not be scored
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowFailure {
    pub row: usize,
    pub transaction_id: String,
    pub code: String,
    pub error: String,
}

impl BatchOutcome {
    pub fn with_capacity(rows: usize) -> Self {
        Self {
            results: Vec::with_capacity(rows),
            failures: Vec::new(),
        }
    }

    pub fn summary(&self) -> BatchSummary {
        BatchSummary::from_results(&self.results, self.failures.len())
    }
}

/// Fraud counts per model over one batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub scored: usize,
    pub failed: usize,
    pub lr_frauds: usize,
    pub rf_frauds: usize,
    /// Rows whose label vote is above 0.5, i.e. both models flag fraud
    pub consensus_frauds: usize,
    /// Rows whose probability consensus is above 0.5
    pub score_frauds: usize,
}

impl BatchSummary {
    pub fn from_results(results: &[PredictionResult], failed: usize) -> Self {
        Self {
            scored: results.len(),
            failed,
            lr_frauds: results.iter().filter(|r| r.lr_prediction == 1).count(),
            rf_frauds: results.iter().filter(|r| r.rf_prediction == 1).count(),
            consensus_frauds: results.iter().filter(|r| r.label_vote() > 0.5).count(),
            score_frauds: results.iter().filter(|r| r.consensus_prediction == 1).count(),
        }
    }

    /// Share of scored rows, in percent
    pub fn rate(&self, count: usize) -> f64 {
        if self.scored == 0 {
            0.0
        } else {
            count as f64 / self.scored as f64 * 100.0
        }
    }

    pub fn log(&self) {
        info!(scored = self.scored, failed = self.failed, "Batch prediction complete");
        info!(
            "LR frauds detected: {} ({:.1}%)",
            self.lr_frauds,
            self.rate(self.lr_frauds)
        );
        info!(
            "RF frauds detected: {} ({:.1}%)",
            self.rf_frauds,
            self.rate(self.rf_frauds)
        );
        info!(
            "Consensus frauds:   {} ({:.1}%)",
            self.consensus_frauds,
            self.rate(self.consensus_frauds)
        );
        info!(
            "Score consensus:    {} ({:.1}%)",
            self.score_frauds,
            self.rate(self.score_frauds)
        );
    }
}

/// Cell that could not be read as a feature value
#[derive(Debug, Clone, PartialEq)]
pub struct CellError {
    pub feature: String,
    pub reason: String,
}

impl CellError {
    pub fn to_error(&self) -> ScoringError {
        ScoringError::validation(self.feature.as_str(), self.reason.as_str())
    }
}

/// Feature rows read from a CSV file
#[derive(Debug, Clone)]
pub struct FeatureTable {
    /// One vector per record, in model feature order; empty, missing or
    /// unparseable cells are NaN
    pub rows: Vec<Vec<f64>>,
    /// First bad cell of each record, if any
    pub cell_errors: Vec<Option<CellError>>,
    /// Values of the id column, when one was requested
    pub ids: Option<Vec<String>>,
    /// Mapping actually applied (never `Auto`)
    pub mapping: ColumnMapping,
}

/// Read a headered CSV into feature rows.
///
/// `Positional` takes the first N numeric columns (a column is numeric when
/// every non-empty cell parses as a number). `ByName` looks each feature up
/// in the header. `Auto` uses names when the header has all of them.
pub fn read_feature_table<R: io::Read>(
    reader: R,
    feature_names: &[String],
    mapping: ColumnMapping,
    id_column: Option<&str>,
) -> ScoringResult<FeatureTable> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let records: Vec<StringRecord> = rdr.records().collect::<Result<_, _>>()?;

    let id_index = match id_column {
        Some(name) => Some(header_index(&headers, name).ok_or_else(|| {
            ScoringError::validation(name, "id column missing from CSV header")
        })?),
        None => None,
    };

    let has_all_names = feature_names
        .iter()
        .all(|name| header_index(&headers, name).is_some());

    let mapping = match mapping {
        ColumnMapping::Auto if has_all_names => ColumnMapping::ByName,
        ColumnMapping::Auto => {
            warn!(
                features = feature_names.len(),
                "CSV header does not name every feature; matching numeric columns by position"
            );
            ColumnMapping::Positional
        }
        explicit => explicit,
    };

    let columns = match mapping {
        ColumnMapping::ByName => feature_names
            .iter()
            .map(|name| {
                header_index(&headers, name).ok_or_else(|| {
                    ScoringError::validation(name.as_str(), "feature column missing from CSV header")
                })
            })
            .collect::<ScoringResult<Vec<usize>>>()?,
        _ => {
            let numeric: Vec<usize> = (0..headers.len())
                .filter(|&col| Some(col) != id_index && is_numeric_column(&records, col))
                .collect();
            if numeric.len() < feature_names.len() {
                return Err(ScoringError::validation(
                    "columns",
                    format!(
                        "CSV must have at least {} numeric columns, found {}",
                        feature_names.len(),
                        numeric.len()
                    ),
                ));
            }
            numeric[..feature_names.len()].to_vec()
        }
    };

    let mut rows = Vec::with_capacity(records.len());
    let mut cell_errors = Vec::with_capacity(records.len());
    for record in &records {
        let mut first_error = None;
        let row = columns
            .iter()
            .zip(feature_names)
            .map(|(&col, name)| {
                parse_cell(record.get(col)).unwrap_or_else(|reason| {
                    if first_error.is_none() {
                        first_error = Some(CellError {
                            feature: name.clone(),
                            reason,
                        });
                    }
                    f64::NAN
                })
            })
            .collect();
        rows.push(row);
        cell_errors.push(first_error);
    }

    let ids = id_index.map(|col| {
        records
            .iter()
            .map(|record| record.get(col).unwrap_or_default().to_string())
            .collect()
    });

    Ok(FeatureTable {
        rows,
        cell_errors,
        ids,
        mapping,
    })
}

fn header_index(headers: &StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h == name)
}

fn parse_cell(cell: Option<&str>) -> Result<f64, String> {
    match cell {
        None => Err("cell missing from record".to_string()),
        Some("") => Err("cell is empty".to_string()),
        Some(text) => text
            .parse::<f64>()
            .map_err(|_| format!("'{}' is not a number", text)),
    }
}

fn is_numeric_column(records: &[StringRecord], col: usize) -> bool {
    records.iter().all(|record| match record.get(col) {
        Some(cell) if !cell.is_empty() => cell.parse::<f64>().is_ok(),
        _ => true,
    })
}

#[derive(Serialize)]
struct ExportRow {
    #[serde(rename = "LR_Prediction")]
    lr_prediction: u8,
    #[serde(rename = "LR_Fraud_Probability")]
    lr_probability: f64,
    #[serde(rename = "RF_Prediction")]
    rf_prediction: u8,
    #[serde(rename = "RF_Fraud_Probability")]
    rf_probability: f64,
    #[serde(rename = "Consensus")]
    consensus: f64,
}

impl From<&PredictionResult> for ExportRow {
    fn from(result: &PredictionResult) -> Self {
        Self {
            lr_prediction: result.lr_prediction,
            lr_probability: result.lr_probability,
            rf_prediction: result.rf_prediction,
            rf_probability: result.rf_probability,
            consensus: result.label_vote(),
        }
    }
}

/// Write results as CSV (`LR_Prediction, ..., Consensus`), where
/// `Consensus` is the mean of the two labels.
pub fn write_results<W: io::Write>(writer: W, results: &[PredictionResult]) -> ScoringResult<()> {
    let mut wtr = Writer::from_writer(writer);
    if results.is_empty() {
        wtr.write_record([
            "LR_Prediction",
            "LR_Fraud_Probability",
            "RF_Prediction",
            "RF_Fraud_Probability",
            "Consensus",
        ])?;
    }
    for result in results {
        wtr.serialize(ExportRow::from(result))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Results as an in-memory CSV document, ready for download
pub fn results_to_csv(results: &[PredictionResult]) -> ScoringResult<String> {
    let mut buf = Vec::new();
    write_results(&mut buf, results)?;
    String::from_utf8(buf).map_err(|e| ScoringError::Io(io::Error::new(io::ErrorKind::InvalidData, e)))
}
