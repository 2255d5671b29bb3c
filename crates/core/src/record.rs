//! Validated patient records.
//!
//! A [`PatientRecord`] can only be built through validation, so downstream code never sees an
//! out-of-range value. JSON bodies and CSV rows share the same rules through
//! [`PatientRecord::from_lookup`]; every problem is collected before failing so callers get the
//! full list in one response.

use crate::error::{FieldIssue, ValidationError};
use crate::schema::{Field, FieldKind, FIELD_COUNT};
use serde_json::{Map, Value};

/// A raw field value before validation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawValue<'a> {
    /// The key or column is absent.
    Missing,
    /// Present but null or blank.
    Empty,
    Number(f64),
    Text(&'a str),
    /// A JSON value with no sensible numeric reading (array, object).
    Unsupported,
}

impl<'a> RawValue<'a> {
    /// Interpret a CSV cell.
    pub fn from_cell(cell: &'a str) -> Self {
        let cell = cell.trim();
        if cell.is_empty() || cell.eq_ignore_ascii_case("nan") {
            RawValue::Empty
        } else {
            RawValue::Text(cell)
        }
    }

    pub fn from_json(value: &'a Value) -> Self {
        match value {
            Value::Null => RawValue::Empty,
            Value::Bool(b) => RawValue::Number(if *b { 1.0 } else { 0.0 }),
            Value::Number(n) => n.as_f64().map_or(RawValue::Unsupported, RawValue::Number),
            Value::String(s) if s.trim().is_empty() => RawValue::Empty,
            Value::String(s) => RawValue::Text(s.trim()),
            Value::Array(_) | Value::Object(_) => RawValue::Unsupported,
        }
    }
}

/// One patient's validated fields, indexed by [`Field`].
///
/// Only fillable fields may be empty; the preprocessor substitutes the training-set mode.
/// Gender is stored encoded (Female = 0, Male = 1).
#[derive(Debug, Clone, PartialEq)]
pub struct PatientRecord {
    values: [Option<f64>; FIELD_COUNT],
}

impl PatientRecord {
    /// Validate a record from any source by asking `lookup` for each field.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` listing every missing or malformed field.
    pub fn from_lookup<'a, F>(mut lookup: F) -> Result<Self, ValidationError>
    where
        F: FnMut(Field) -> RawValue<'a>,
    {
        let mut values = [None; FIELD_COUNT];
        let mut issues = Vec::new();

        for field in Field::ALL {
            match parse_field(field, lookup(field)) {
                Ok(value) => values[field.index()] = value,
                Err(reason) => issues.push(FieldIssue::new(field.json_key(), reason)),
            }
        }

        if issues.is_empty() {
            Ok(Self { values })
        } else {
            Err(ValidationError::new(issues))
        }
    }

    /// Validate a JSON object. Keys may use the JSON or CSV spelling; unknown keys are ignored.
    pub fn from_json(object: &Map<String, Value>) -> Result<Self, ValidationError> {
        Self::from_lookup(|field| {
            object
                .get(field.json_key())
                .or_else(|| object.get(field.csv_name()))
                .map_or(RawValue::Missing, RawValue::from_json)
        })
    }

    /// Validate any JSON value, rejecting non-objects.
    pub fn from_json_value(value: &Value) -> Result<Self, ValidationError> {
        match value.as_object() {
            Some(object) => Self::from_json(object),
            None => Err(ValidationError::input(
                "patient record must be a JSON object",
            )),
        }
    }

    /// The validated value, or `None` for a fillable field left empty.
    pub fn get(&self, field: Field) -> Option<f64> {
        self.values[field.index()]
    }

    /// Fillable fields that were left empty.
    pub fn empty_fields(&self) -> impl Iterator<Item = Field> + '_ {
        Field::ALL
            .into_iter()
            .filter(|f| self.values[f.index()].is_none())
    }
}

fn parse_field(field: Field, raw: RawValue<'_>) -> Result<Option<f64>, String> {
    let number = match raw {
        RawValue::Missing => return Err("field is missing".into()),
        RawValue::Empty if field.is_fillable() => return Ok(None),
        RawValue::Empty => return Err("value is required".into()),
        RawValue::Unsupported => return Err("expected a number".into()),
        RawValue::Text(text) if field.kind() == FieldKind::Gender => {
            return parse_gender_text(text).map(Some)
        }
        RawValue::Text(text) => text
            .parse::<f64>()
            .map_err(|_| format!("expected a number, got '{text}'"))?,
        RawValue::Number(n) => n,
    };

    if !number.is_finite() {
        return Err("value must be finite".into());
    }

    match field.kind() {
        FieldKind::Continuous => {
            if (0.0..=1.0).contains(&number) {
                Ok(Some(number))
            } else {
                Err(format!("expected a normalised value in [0, 1], got {number}"))
            }
        }
        FieldKind::Binary | FieldKind::Gender => {
            if number == 0.0 || number == 1.0 {
                Ok(Some(number))
            } else {
                Err(format!("expected 0 or 1, got {number}"))
            }
        }
        FieldKind::Ordinal { min, max } => {
            let in_range = number.fract() == 0.0
                && number >= f64::from(min)
                && number <= f64::from(max);
            if in_range {
                Ok(Some(number))
            } else {
                Err(format!(
                    "expected a whole number from {min} to {max}, got {number}"
                ))
            }
        }
    }
}

fn parse_gender_text(text: &str) -> Result<f64, String> {
    if text.eq_ignore_ascii_case("female") {
        return Ok(0.0);
    }
    if text.eq_ignore_ascii_case("male") {
        return Ok(1.0);
    }
    match text.parse::<f64>() {
        Ok(n) if n == 0.0 || n == 1.0 => Ok(n),
        _ => Err(format!("expected \"Male\" or \"Female\", got '{text}'")),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;

    /// A complete, valid request body using JSON keys.
    pub(crate) fn sample_patient_json() -> Value {
        json!({
            "Age": 0.45,
            "Cholesterol": 0.55,
            "Heart_Rate": 0.06,
            "Diabetes": 1,
            "Family_History": 0,
            "Smoking": 1,
            "Obesity": 0,
            "Alcohol_Consumption": 1,
            "Exercise_Hours_Per_Week": 0.35,
            "Diet": 1,
            "Previous_Heart_Problems": 0,
            "Medication_Use": 0,
            "Stress_Level": 6,
            "Sedentary_Hours_Per_Day": 0.62,
            "Income": 0.41,
            "BMI": 0.48,
            "Triglycerides": 0.33,
            "Physical_Activity_Days_Per_Week": 4,
            "Sleep_Hours_Per_Day": 0.5,
            "Blood_Sugar": 0.23,
            "CK_MB": 0.05,
            "Troponin": 0.04,
            "Gender": "Male",
            "Systolic_Blood_Pressure": 0.52,
            "Diastolic_Blood_Pressure": 0.6
        })
    }

    pub(crate) fn sample_record() -> PatientRecord {
        PatientRecord::from_json_value(&sample_patient_json()).unwrap()
    }

    #[test]
    fn test_from_json_accepts_valid_record() {
        let record = sample_record();
        assert_eq!(record.get(Field::Age), Some(0.45));
        assert_eq!(record.get(Field::Gender), Some(1.0));
        assert_eq!(record.get(Field::StressLevel), Some(6.0));
        assert_eq!(record.empty_fields().count(), 0);
    }

    #[test]
    fn test_from_json_accepts_csv_spelling() {
        let mut body = sample_patient_json();
        let object = body.as_object_mut().unwrap();
        let value = object.remove("Heart_Rate").unwrap();
        object.insert("Heart rate".into(), value);

        let record = PatientRecord::from_json(object).unwrap();
        assert_eq!(record.get(Field::HeartRate), Some(0.06));
    }

    #[test]
    fn test_missing_fields_are_all_reported() {
        let mut body = sample_patient_json();
        let object = body.as_object_mut().unwrap();
        object.remove("Age");
        object.remove("Gender");

        let err = PatientRecord::from_json(object).expect_err("should reject missing fields");
        let fields: Vec<_> = err.issues().iter().map(|i| i.field.as_str()).collect();
        assert_eq!(fields, vec!["Age", "Gender"]);
        assert!(err.issues().iter().all(|i| i.reason == "field is missing"));
    }

    #[test]
    fn test_null_fillable_field_is_left_empty() {
        let mut body = sample_patient_json();
        body["Smoking"] = Value::Null;
        body["Stress_Level"] = json!("");

        let record = PatientRecord::from_json_value(&body).unwrap();
        assert_eq!(record.get(Field::Smoking), None);
        assert_eq!(
            record.empty_fields().collect::<Vec<_>>(),
            vec![Field::Smoking, Field::StressLevel]
        );
    }

    #[test]
    fn test_null_required_field_is_rejected() {
        let mut body = sample_patient_json();
        body["BMI"] = Value::Null;

        let err = PatientRecord::from_json_value(&body).unwrap_err();
        assert_eq!(err.issues()[0].field, "BMI");
        assert_eq!(err.issues()[0].reason, "value is required");
    }

    #[test]
    fn test_out_of_range_values_are_rejected() {
        let mut body = sample_patient_json();
        body["Age"] = json!(54);
        body["Diet"] = json!(3);
        body["Stress_Level"] = json!(2.5);
        body["Smoking"] = json!(2);

        let err = PatientRecord::from_json_value(&body).unwrap_err();
        let fields: Vec<_> = err.issues().iter().map(|i| i.field.as_str()).collect();
        assert_eq!(fields, vec!["Age", "Smoking", "Diet", "Stress_Level"]);
    }

    #[test]
    fn test_gender_spellings() {
        for (raw, expected) in [
            (json!("Female"), 0.0),
            (json!("male"), 1.0),
            (json!(0), 0.0),
            (json!("1.0"), 1.0),
        ] {
            let mut body = sample_patient_json();
            body["Gender"] = raw;
            let record = PatientRecord::from_json_value(&body).unwrap();
            assert_eq!(record.get(Field::Gender), Some(expected));
        }

        let mut body = sample_patient_json();
        body["Gender"] = json!("Other");
        assert!(PatientRecord::from_json_value(&body).is_err());
    }

    #[test]
    fn test_numeric_strings_are_parsed() {
        let mut body = sample_patient_json();
        body["Cholesterol"] = json!("0.25");
        body["Diabetes"] = json!(true);

        let record = PatientRecord::from_json_value(&body).unwrap();
        assert_eq!(record.get(Field::Cholesterol), Some(0.25));
        assert_eq!(record.get(Field::Diabetes), Some(1.0));
    }

    #[test]
    fn test_non_object_body_is_rejected() {
        let err = PatientRecord::from_json_value(&json!([1, 2, 3])).unwrap_err();
        assert_eq!(err.issues()[0].field, "input");
    }

    #[test]
    fn test_cell_parsing() {
        assert_eq!(RawValue::from_cell("  "), RawValue::Empty);
        assert_eq!(RawValue::from_cell("NaN"), RawValue::Empty);
        assert_eq!(RawValue::from_cell(" 0.5 "), RawValue::Text("0.5"));
    }
}
