//! CSV batch input and output.
//!
//! Input files use the training dataset's column headers (JSON-style keys are accepted too).
//! Extra columns are ignored; an `id` column, when present, is carried through to the output.

use crate::constants::ID_COLUMN;
use crate::error::{FieldIssue, ValidationError};
use crate::predictor::BatchPrediction;
use crate::record::{PatientRecord, RawValue};
use crate::schema::{Field, FIELD_COUNT};
use crate::{RiskError, RiskResult};
use serde::Serialize;
use std::io::{Read, Write};

/// A small CSV file in the expected input format.
pub const SAMPLE_CSV: &str = include_str!("../assets/sample_patients.csv");

/// One validated input row.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRow {
    /// Value of the `id` column, if the file has one.
    pub record_id: Option<String>,
    pub record: PatientRecord,
}

/// Parse and validate every row of a CSV file.
///
/// # Errors
///
/// - `RiskError::Validation` if required columns are absent, any row is invalid, or the file
///   has no data rows. All problems are reported together and no rows are returned.
/// - `RiskError::Csv` if the file is not well-formed CSV.
pub fn read_records<R: Read>(reader: R) -> RiskResult<Vec<BatchRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers().map_err(RiskError::Csv)?.clone();
    let mut columns: [Option<usize>; FIELD_COUNT] = [None; FIELD_COUNT];
    let mut id_column = None;
    for (i, header) in headers.iter().enumerate() {
        let header = header.trim_start_matches('\u{feff}');
        if header == ID_COLUMN && id_column.is_none() {
            id_column = Some(i);
        } else if let Some(field) = Field::from_name(header) {
            columns[field.index()].get_or_insert(i);
        }
    }

    let missing: Vec<FieldIssue> = Field::ALL
        .into_iter()
        .filter(|f| columns[f.index()].is_none())
        .map(|f| FieldIssue::new(f.csv_name(), "column is missing"))
        .collect();
    if !missing.is_empty() {
        return Err(ValidationError::new(missing).into());
    }

    let mut rows = Vec::new();
    let mut issues = Vec::new();
    for (row, result) in rdr.records().enumerate() {
        let record = result.map_err(RiskError::Csv)?;
        let parsed = PatientRecord::from_lookup(|field| {
            columns[field.index()]
                .and_then(|i| record.get(i))
                .map_or(RawValue::Missing, RawValue::from_cell)
        });
        match parsed {
            Ok(patient) => rows.push(BatchRow {
                record_id: id_column
                    .and_then(|i| record.get(i))
                    .filter(|v| !v.is_empty())
                    .map(str::to_string),
                record: patient,
            }),
            Err(e) => issues.extend(e.at_row(row).into_issues()),
        }
    }

    if !issues.is_empty() {
        return Err(ValidationError::new(issues).into());
    }
    if rows.is_empty() {
        return Err(ValidationError::input("CSV contains no data rows").into());
    }

    tracing::debug!("Parsed {} CSV rows", rows.len());
    Ok(rows)
}

#[derive(Serialize)]
struct OutputRow {
    id: usize,
    prediction: u8,
    probability: f64,
}

#[derive(Serialize)]
struct OutputRowWithRecordId<'a> {
    id: usize,
    record_id: Option<&'a str>,
    prediction: u8,
    probability: f64,
}

/// Write predictions as CSV with columns `id,prediction,probability`.
///
/// When any prediction carries a `record_id`, a `record_id` column follows `id`.
pub fn write_predictions<W: Write>(writer: W, predictions: &[BatchPrediction]) -> RiskResult<()> {
    let with_record_ids = predictions.iter().any(|p| p.record_id.is_some());
    let mut wtr = csv::Writer::from_writer(writer);
    for p in predictions {
        let written = if with_record_ids {
            wtr.serialize(OutputRowWithRecordId {
                id: p.id,
                record_id: p.record_id.as_deref(),
                prediction: p.prediction,
                probability: p.probability.rounded(),
            })
        } else {
            wtr.serialize(OutputRow {
                id: p.id,
                prediction: p.prediction,
                probability: p.probability.rounded(),
            })
        };
        written.map_err(|e| RiskError::Output(e.into()))?;
    }
    wtr.flush().map_err(RiskError::Output)?;
    Ok(())
}

/// Attach each row's `record_id` to its prediction. Both slices are in input order.
pub fn attach_record_ids(rows: &[BatchRow], predictions: &mut [BatchPrediction]) {
    for (row, prediction) in rows.iter().zip(predictions.iter_mut()) {
        prediction.record_id.clone_from(&row.record_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictor::tests::write_model_dir;
    use crate::predictor::ModelPredictor;
    use risk_types::Probability;

    #[test]
    fn test_sample_csv_parses() {
        let rows = read_records(SAMPLE_CSV.as_bytes()).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].record_id.as_deref(), Some("7746"));
        assert_eq!(rows[1].record.get(Field::Gender), Some(0.0));
        // Third row leaves Stress Level and Activity Days empty for the fill values.
        assert_eq!(rows[2].record.empty_fields().count(), 2);
    }

    #[test]
    fn test_missing_columns_are_listed() {
        let csv = SAMPLE_CSV.replacen(",Troponin,", ",Tropo,", 1).replacen("BMI,", "Weight,", 1);
        let err = read_records(csv.as_bytes()).unwrap_err();
        let RiskError::Validation(v) = err else {
            panic!("expected validation error, got {err:?}");
        };
        let fields: Vec<_> = v.issues().iter().map(|i| i.field.as_str()).collect();
        assert_eq!(fields, vec!["BMI", "Troponin"]);
    }

    #[test]
    fn test_row_errors_name_the_row() {
        let mut lines: Vec<String> = SAMPLE_CSV.lines().map(str::to_string).collect();
        lines[2] = lines[2].replacen(",Female,", ",Unknown,", 1);
        let csv = lines.join("\n");

        let err = read_records(csv.as_bytes()).unwrap_err();
        let RiskError::Validation(v) = err else {
            panic!("expected validation error, got {err:?}");
        };
        assert_eq!(v.issues().len(), 1);
        assert_eq!(v.issues()[0].row, Some(1));
        assert_eq!(v.issues()[0].field, "Gender");
    }

    #[test]
    fn test_header_only_file_is_rejected() {
        let header = SAMPLE_CSV.lines().next().unwrap();
        let err = read_records(header.as_bytes()).unwrap_err();
        assert!(matches!(err, RiskError::Validation(v) if v.to_string().contains("no data rows")));
    }

    #[test]
    fn test_ragged_csv_is_a_csv_error() {
        let csv = format!("{}\n1,2,3\n", SAMPLE_CSV.lines().next().unwrap());
        assert!(matches!(
            read_records(csv.as_bytes()),
            Err(RiskError::Csv(_))
        ));
    }

    #[test]
    fn test_byte_order_mark_is_ignored() {
        let csv = format!("\u{feff}{SAMPLE_CSV}");
        let rows = read_records(csv.as_bytes()).unwrap();
        assert_eq!(rows[0].record_id.as_deref(), Some("7746"));
    }

    #[test]
    fn test_write_predictions() {
        let predictions = vec![
            BatchPrediction {
                id: 0,
                record_id: Some("7746".into()),
                prediction: 1,
                probability: Probability::new(0.61234).unwrap(),
            },
            BatchPrediction {
                id: 1,
                record_id: None,
                prediction: 0,
                probability: Probability::new(0.1).unwrap(),
            },
        ];
        let mut out = Vec::new();
        write_predictions(&mut out, &predictions).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "id,record_id,prediction,probability\n0,7746,1,0.6123\n1,,0,0.1\n"
        );
    }

    #[test]
    fn test_write_predictions_without_record_ids() {
        let predictions = vec![BatchPrediction {
            id: 0,
            record_id: None,
            prediction: 0,
            probability: Probability::new(0.32446).unwrap(),
        }];
        let mut out = Vec::new();
        write_predictions(&mut out, &predictions).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "id,prediction,probability\n0,0,0.3245\n"
        );
    }

    #[test]
    fn test_batch_scoring_of_sample_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let predictor = ModelPredictor::new(write_model_dir(dir.path(), Some("0.4")));
        predictor.load().unwrap();

        let rows = read_records(SAMPLE_CSV.as_bytes()).unwrap();
        let records: Vec<_> = rows.iter().map(|r| r.record.clone()).collect();
        let mut predictions = predictor.predict_batch(&records).unwrap();
        attach_record_ids(&rows, &mut predictions);

        let ids: Vec<_> = predictions.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(predictions[2].record_id.as_deref(), Some("6632"));
    }
}
