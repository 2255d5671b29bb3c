//! JSON request and response bodies.
//!
//! Conversions from the core types live here so the core crate stays free of wire concerns.

use heart_risk_core::{BatchPrediction, FieldIssue, ModelInfo, PredictionResult, RiskTiers};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Service health, including whether the model is ready.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    /// `healthy` once the model is loaded, `degraded` otherwise.
    #[schema(example = "healthy")]
    pub status: String,
    pub model_loaded: bool,
    pub model_version: Option<String>,
    pub threshold: Option<f64>,
    pub message: String,
}

/// A patient record as accepted by `POST /predict/patient`.
///
/// Continuous fields are pre-normalised to `[0, 1]`. Fillable fields (the binary flags,
/// `Stress_Level`, `Physical_Activity_Days_Per_Week`) may be `null`. The CSV column names
/// (e.g. `Heart rate`) are accepted as keys too.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PatientRecordReq {
    #[serde(rename = "Age")]
    #[schema(example = 0.45)]
    pub age: f64,
    #[serde(rename = "Cholesterol")]
    pub cholesterol: f64,
    #[serde(rename = "Heart_Rate")]
    pub heart_rate: f64,
    #[serde(rename = "Diabetes")]
    pub diabetes: Option<u8>,
    #[serde(rename = "Family_History")]
    pub family_history: Option<u8>,
    #[serde(rename = "Smoking")]
    pub smoking: Option<u8>,
    #[serde(rename = "Obesity")]
    pub obesity: Option<u8>,
    #[serde(rename = "Alcohol_Consumption")]
    pub alcohol_consumption: Option<u8>,
    #[serde(rename = "Exercise_Hours_Per_Week")]
    pub exercise_hours_per_week: f64,
    /// 0, 1 or 2.
    #[serde(rename = "Diet")]
    pub diet: u8,
    #[serde(rename = "Previous_Heart_Problems")]
    pub previous_heart_problems: Option<u8>,
    #[serde(rename = "Medication_Use")]
    pub medication_use: Option<u8>,
    /// 1 to 10.
    #[serde(rename = "Stress_Level")]
    pub stress_level: Option<u8>,
    #[serde(rename = "Sedentary_Hours_Per_Day")]
    pub sedentary_hours_per_day: f64,
    #[serde(rename = "Income")]
    pub income: f64,
    #[serde(rename = "BMI")]
    pub bmi: f64,
    #[serde(rename = "Triglycerides")]
    pub triglycerides: f64,
    /// 0 to 7.
    #[serde(rename = "Physical_Activity_Days_Per_Week")]
    pub physical_activity_days_per_week: Option<u8>,
    #[serde(rename = "Sleep_Hours_Per_Day")]
    pub sleep_hours_per_day: f64,
    #[serde(rename = "Blood_Sugar")]
    pub blood_sugar: f64,
    #[serde(rename = "CK_MB")]
    pub ck_mb: f64,
    #[serde(rename = "Troponin")]
    pub troponin: f64,
    /// `Male` or `Female`.
    #[serde(rename = "Gender")]
    #[schema(example = "Male")]
    pub gender: String,
    #[serde(rename = "Systolic_Blood_Pressure")]
    pub systolic_blood_pressure: f64,
    #[serde(rename = "Diastolic_Blood_Pressure")]
    pub diastolic_blood_pressure: f64,
}

/// Result of a single-patient prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PatientPredictionRes {
    /// 1 when `probability >= threshold_used`.
    pub prediction: u8,
    /// Rounded to four decimals.
    pub probability: f64,
    #[schema(example = "LOW")]
    pub risk_level: String,
    #[schema(example = "32.4%")]
    pub risk_percentage: String,
    pub threshold_used: f64,
}

impl From<&PredictionResult> for PatientPredictionRes {
    fn from(result: &PredictionResult) -> Self {
        Self {
            prediction: result.label,
            probability: result.probability.rounded(),
            risk_level: result.risk_level.to_string(),
            risk_percentage: result.risk_percentage(),
            threshold_used: result.threshold.value(),
        }
    }
}

/// One row of a batch prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CsvPredictionItem {
    /// Zero-based input row index.
    pub id: usize,
    pub prediction: u8,
    pub probability: f64,
    /// The input's `id` column, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
}

/// Result of a CSV batch prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CsvPredictionRes {
    pub predictions: Vec<CsvPredictionItem>,
    pub count: usize,
}

impl From<Vec<BatchPrediction>> for CsvPredictionRes {
    fn from(predictions: Vec<BatchPrediction>) -> Self {
        let predictions: Vec<CsvPredictionItem> = predictions
            .into_iter()
            .map(|p| CsvPredictionItem {
                id: p.id,
                prediction: p.prediction,
                probability: p.probability.rounded(),
                record_id: p.record_id,
            })
            .collect();
        Self {
            count: predictions.len(),
            predictions,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RiskTiersRes {
    pub medium_from: Option<f64>,
    pub high_from: Option<f64>,
}

impl From<RiskTiers> for RiskTiersRes {
    fn from(tiers: RiskTiers) -> Self {
        Self {
            medium_from: tiers.medium_from,
            high_from: tiers.high_from,
        }
    }
}

/// Static metadata about the deployed model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ModelInfoRes {
    #[schema(example = "RandomForestClassifier")]
    pub model_type: String,
    pub version: String,
    pub model_path: String,
    pub threshold: f64,
    pub is_loaded: bool,
    pub n_estimators: usize,
    pub max_depth: usize,
    pub n_features: usize,
    pub feature_names: Vec<String>,
    pub risk_tiers: RiskTiersRes,
    /// RFC 3339 timestamp.
    pub loaded_at: String,
}

impl From<&ModelInfo> for ModelInfoRes {
    fn from(info: &ModelInfo) -> Self {
        Self {
            model_type: info.model_type.clone(),
            version: info.version.clone(),
            model_path: info.model_path.clone(),
            threshold: info.threshold,
            is_loaded: info.is_loaded,
            n_estimators: info.n_estimators,
            max_depth: info.max_depth,
            n_features: info.n_features,
            feature_names: info.feature_names.clone(),
            risk_tiers: info.risk_tiers.into(),
            loaded_at: info.loaded_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FieldIssueRes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row: Option<usize>,
    pub field: String,
    pub reason: String,
}

impl From<FieldIssue> for FieldIssueRes {
    fn from(issue: FieldIssue) -> Self {
        Self {
            row: issue.row,
            field: issue.field,
            reason: issue.reason,
        }
    }
}

/// Body of every non-2xx response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    /// Machine-readable error kind, e.g. `validation_error`.
    pub error: String,
    pub detail: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldIssueRes>,
}
