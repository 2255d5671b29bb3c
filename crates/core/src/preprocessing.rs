//! Feature preprocessing for the heart-risk model.
//!
//! Turns a validated [`PatientRecord`] into the fixed 43-column vector the forest was trained
//! on: the 25 raw fields in training order followed by the engineered features. The transform
//! is pure arithmetic and deterministic.

use crate::error::ValidationError;
use crate::record::PatientRecord;
use crate::schema::{Field, FEATURE_COUNT, FEATURE_NAMES, FIELD_COUNT};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

/// Replacement values for fillable fields left empty (training-set modes).
#[derive(Debug, Clone, PartialEq)]
pub struct FillValues {
    values: [Option<f64>; FIELD_COUNT],
}

impl Default for FillValues {
    fn default() -> Self {
        let mut values = [None; FIELD_COUNT];
        for (field, value) in [
            (Field::Diabetes, 1.0),
            (Field::FamilyHistory, 0.0),
            (Field::Smoking, 1.0),
            (Field::Obesity, 0.0),
            (Field::AlcoholConsumption, 1.0),
            (Field::PreviousHeartProblems, 1.0),
            (Field::MedicationUse, 0.0),
            (Field::StressLevel, 5.0),
            (Field::PhysicalActivityDaysPerWeek, 3.0),
        ] {
            values[field.index()] = Some(value);
        }
        Self { values }
    }
}

impl FillValues {
    /// Parse a JSON object of `{"<field name>": value}` over the defaults.
    ///
    /// Either field spelling is accepted. Keys that are not fillable fields are ignored with a
    /// warning.
    pub fn from_json_str(json: &str) -> Result<Self, String> {
        let overrides: HashMap<String, f64> =
            serde_json::from_str(json).map_err(|e| e.to_string())?;

        let mut fill = Self::default();
        for (name, value) in overrides {
            match Field::from_name(&name) {
                Some(field) if field.is_fillable() => {
                    if !value.is_finite() {
                        return Err(format!("fill value for '{name}' must be finite"));
                    }
                    fill.values[field.index()] = Some(value);
                }
                _ => tracing::warn!("Ignoring fill value for non-fillable column '{}'", name),
            }
        }
        Ok(fill)
    }

    /// Load fill values from `path`, falling back to the defaults.
    ///
    /// A missing file is normal; an unreadable or malformed one is logged and ignored.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            tracing::debug!(
                "No fill values at {}, using training defaults",
                path.display()
            );
            return Self::default();
        }

        match std::fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|s| Self::from_json_str(&s))
        {
            Ok(fill) => {
                tracing::info!("Loaded fill values from {}", path.display());
                fill
            }
            Err(e) => {
                tracing::warn!(
                    "Could not load fill values from {}: {}; using training defaults",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    pub fn get(&self, field: Field) -> Option<f64> {
        self.values[field.index()]
    }
}

/// Model input for one patient, in [`FEATURE_NAMES`] order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureVector(Vec<f64>);

impl FeatureVector {
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Look a column up by its model name.
    pub fn get(&self, name: &str) -> Option<f64> {
        FEATURE_NAMES
            .iter()
            .position(|n| *n == name)
            .map(|i| self.0[i])
    }
}

#[derive(Debug, Clone, Default)]
pub struct Preprocessor {
    fill_values: FillValues,
}

impl Preprocessor {
    pub fn new(fill_values: FillValues) -> Self {
        Self { fill_values }
    }

    /// Build the model input for one record.
    pub fn transform(&self, record: &PatientRecord) -> FeatureVector {
        let mut base = [0.0; FIELD_COUNT];
        for field in Field::ALL {
            // Non-fillable fields are never empty once validated.
            base[field.index()] = record
                .get(field)
                .or_else(|| self.fill_values.get(field))
                .unwrap_or(0.0);
        }
        let v = |field: Field| base[field.index()];

        let lifestyle_risk = v(Field::Smoking)
            + v(Field::Obesity)
            + v(Field::AlcoholConsumption)
            + (1.0 - v(Field::PhysicalActivityDaysPerWeek) / 7.0);
        let medical_risk =
            v(Field::Diabetes) + v(Field::FamilyHistory) + v(Field::PreviousHeartProblems);
        let systolic = v(Field::SystolicBloodPressure);
        let diastolic = v(Field::DiastolicBloodPressure);

        let engineered = [
            lifestyle_risk,
            medical_risk,
            lifestyle_risk + medical_risk,
            v(Field::Age) * v(Field::Bmi),
            v(Field::Age) * v(Field::Cholesterol),
            v(Field::Cholesterol) + v(Field::Triglycerides),
            systolic - diastolic,
            diastolic + (systolic - diastolic) / 3.0,
            v(Field::CkMb) + v(Field::Troponin),
            v(Field::ExerciseHoursPerWeek) - v(Field::SedentaryHoursPerDay),
            1.0 - (v(Field::SleepHoursPerDay) - 0.5).abs() * 2.0,
            v(Field::Age).powi(2),
            v(Field::Bmi).powi(2),
            v(Field::Cholesterol).powi(2),
            v(Field::Smoking) * v(Field::Diabetes),
            v(Field::Smoking) * v(Field::FamilyHistory),
            v(Field::Obesity) * v(Field::Diabetes),
            v(Field::StressLevel) * v(Field::SedentaryHoursPerDay),
        ];

        let mut features = Vec::with_capacity(FEATURE_COUNT);
        features.extend_from_slice(&base);
        features.extend_from_slice(&engineered);
        debug_assert_eq!(features.len(), FEATURE_COUNT);
        FeatureVector(features)
    }

    /// Build model inputs for a table of records, preserving order.
    pub fn transform_table(&self, records: &[PatientRecord]) -> Vec<FeatureVector> {
        records.iter().map(|r| self.transform(r)).collect()
    }

    /// Validate and transform a raw JSON record in one step.
    pub fn transform_json(&self, value: &Value) -> Result<FeatureVector, ValidationError> {
        PatientRecord::from_json_value(value).map(|record| self.transform(&record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::tests::{sample_patient_json, sample_record};

    fn assert_close(actual: Option<f64>, expected: f64) {
        let actual = actual.expect("feature should exist");
        assert!(
            (actual - expected).abs() < 1e-12,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_transform_produces_model_columns() {
        let features = Preprocessor::default().transform(&sample_record());
        assert_eq!(features.len(), FEATURE_COUNT);
        assert_close(features.get("Age"), 0.45);
        assert_close(features.get("Gender"), 1.0);
        assert_close(features.get("Stress Level"), 6.0);
    }

    #[test]
    fn test_engineered_features() {
        let f = Preprocessor::default().transform(&sample_record());

        // smoking 1 + obesity 0 + alcohol 1 + (1 - 4/7)
        assert_close(f.get("Lifestyle_Risk"), 2.0 + 3.0 / 7.0);
        assert_close(f.get("Medical_Risk"), 1.0);
        assert_close(f.get("Total_Risk_Score"), 3.0 + 3.0 / 7.0);
        assert_close(f.get("Age_BMI"), 0.45 * 0.48);
        assert_close(f.get("Age_Cholesterol"), 0.45 * 0.55);
        assert_close(f.get("Lipid_Total"), 0.55 + 0.33);
        assert_close(f.get("Pulse_Pressure"), 0.52 - 0.6);
        assert_close(f.get("Mean_Arterial_Pressure"), 0.6 + (0.52 - 0.6) / 3.0);
        assert_close(f.get("Cardiac_Biomarkers"), 0.05 + 0.04);
        assert_close(f.get("Activity_Balance"), 0.35 - 0.62);
        assert_close(f.get("Sleep_Quality"), 1.0);
        assert_close(f.get("Age_squared"), 0.45 * 0.45);
        assert_close(f.get("BMI_squared"), 0.48 * 0.48);
        assert_close(f.get("Cholesterol_squared"), 0.55 * 0.55);
        assert_close(f.get("Smoking_Diabetes"), 1.0);
        assert_close(f.get("Smoking_FamilyHistory"), 0.0);
        assert_close(f.get("Obesity_Diabetes"), 0.0);
        assert_close(f.get("Stress_Sedentary"), 6.0 * 0.62);
    }

    #[test]
    fn test_transform_is_deterministic() {
        let pre = Preprocessor::default();
        let record = sample_record();
        let first = pre.transform(&record);
        for _ in 0..10 {
            assert_eq!(pre.transform(&record), first);
        }
    }

    #[test]
    fn test_empty_fillable_fields_use_fill_values() {
        let mut body = sample_patient_json();
        body["Stress_Level"] = Value::Null;
        body["Diabetes"] = Value::Null;

        let features = Preprocessor::default().transform_json(&body).unwrap();
        assert_close(features.get("Stress Level"), 5.0);
        assert_close(features.get("Diabetes"), 1.0);
    }

    #[test]
    fn test_fill_values_override_defaults() {
        let fill =
            FillValues::from_json_str(r#"{"Stress Level": 7, "Smoking": 0, "Age": 0.5}"#).unwrap();
        assert_eq!(fill.get(Field::StressLevel), Some(7.0));
        assert_eq!(fill.get(Field::Smoking), Some(0.0));
        assert_eq!(fill.get(Field::Diabetes), Some(1.0));
        assert_eq!(fill.get(Field::Age), None);
    }

    #[test]
    fn test_fill_values_fall_back_on_bad_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("fill_values.json");
        std::fs::write(&path, "not json").unwrap();

        assert_eq!(FillValues::load_or_default(&path), FillValues::default());
        assert_eq!(
            FillValues::load_or_default(&dir.path().join("absent.json")),
            FillValues::default()
        );
    }

    #[test]
    fn test_transform_table_preserves_order() {
        let pre = Preprocessor::default();
        let mut second = sample_patient_json();
        second["Age"] = serde_json::json!(0.9);
        let records = vec![
            sample_record(),
            PatientRecord::from_json_value(&second).unwrap(),
        ];

        let table = pre.transform_table(&records);
        assert_eq!(table.len(), 2);
        assert_close(table[0].get("Age"), 0.45);
        assert_close(table[1].get("Age"), 0.9);
    }

    #[test]
    fn test_transform_json_reports_validation_errors() {
        let mut body = sample_patient_json();
        body.as_object_mut().unwrap().remove("Troponin");
        let err = Preprocessor::default().transform_json(&body).unwrap_err();
        assert_eq!(err.issues()[0].field, "Troponin");
    }
}
