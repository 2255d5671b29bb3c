use serde::Serialize;
use std::path::PathBuf;

/// A single problem found while validating patient input.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldIssue {
    /// Zero-based input row, for batch input.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<usize>,
    /// Field or column name as the caller spelled it.
    pub field: String,
    pub reason: String,
}

impl FieldIssue {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            row: None,
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.row {
            Some(row) => write!(f, "row {}: {}: {}", row, self.field, self.reason),
            None => write!(f, "{}: {}", self.field, self.reason),
        }
    }
}

/// Patient input rejected before any prediction was made.
///
/// Carries every issue found, not just the first.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid patient data: {}", summarise(.issues))]
pub struct ValidationError {
    issues: Vec<FieldIssue>,
}

fn summarise(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationError {
    pub fn new(issues: Vec<FieldIssue>) -> Self {
        Self { issues }
    }

    /// Error for input that is malformed as a whole rather than field by field.
    pub fn input(reason: impl Into<String>) -> Self {
        Self::new(vec![FieldIssue::new("input", reason)])
    }

    pub fn issues(&self) -> &[FieldIssue] {
        &self.issues
    }

    pub fn into_issues(self) -> Vec<FieldIssue> {
        self.issues
    }

    /// Tags every issue with the batch row it came from.
    pub fn at_row(mut self, row: usize) -> Self {
        for issue in &mut self.issues {
            issue.row = Some(row);
        }
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RiskError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("failed to read CSV input: {0}")]
    Csv(csv::Error),
    #[error("failed to load model from {path}: {reason}", path = path.display())]
    ModelLoad { path: PathBuf, reason: String },
    #[error("model is not loaded")]
    NotLoaded,
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("failed to write predictions: {0}")]
    Output(std::io::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl RiskError {
    pub(crate) fn model_load(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        RiskError::ModelLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

pub type RiskResult<T> = std::result::Result<T, RiskError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_lists_every_issue() {
        let err = ValidationError::new(vec![
            FieldIssue::new("Age", "field is missing"),
            FieldIssue::new("Diet", "expected one of 0, 1, 2"),
        ]);
        let msg = err.to_string();
        assert!(msg.contains("Age: field is missing"));
        assert!(msg.contains("Diet: expected one of 0, 1, 2"));
    }

    #[test]
    fn test_at_row_tags_issues() {
        let err = ValidationError::new(vec![FieldIssue::new("BMI", "not a number")]).at_row(3);
        assert_eq!(err.issues()[0].row, Some(3));
        assert_eq!(err.to_string(), "invalid patient data: row 3: BMI: not a number");
    }

    #[test]
    fn test_model_load_message_names_path() {
        let err = RiskError::model_load("/models/model_v2.json", "file not found");
        assert_eq!(
            err.to_string(),
            "failed to load model from /models/model_v2.json: file not found"
        );
    }
}
