//! Mapping from core errors to HTTP responses.

use api_shared::{ErrorRes, FieldIssueRes};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use heart_risk_core::RiskError;

/// Error returned by every handler; renders as an [`ErrorRes`] body.
#[derive(Debug)]
pub enum ApiError {
    Risk(RiskError),
    BadRequest(String),
    PayloadTooLarge(String),
    NotFound(String),
    Internal(String),
}

impl From<RiskError> for ApiError {
    fn from(err: RiskError) -> Self {
        ApiError::Risk(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Risk(RiskError::Validation(_) | RiskError::Csv(_)) => StatusCode::BAD_REQUEST,
            ApiError::Risk(RiskError::ModelLoad { .. } | RiskError::NotLoaded) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ApiError::Risk(
                RiskError::Inference(_) | RiskError::Output(_) | RiskError::InvalidConfig(_),
            ) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ApiError::Risk(RiskError::Validation(_)) => "validation_error",
            ApiError::Risk(RiskError::Csv(_)) => "invalid_csv",
            ApiError::Risk(RiskError::ModelLoad { .. } | RiskError::NotLoaded) => {
                "model_not_loaded"
            }
            ApiError::BadRequest(_) => "bad_request",
            ApiError::PayloadTooLarge(_) => "payload_too_large",
            ApiError::NotFound(_) => "not_found",
            ApiError::Risk(_) | ApiError::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = self.kind().to_string();

        if status.is_server_error() {
            tracing::error!("Request failed ({}): {:?}", status, self);
        } else {
            tracing::warn!("Request rejected ({}): {:?}", status, self);
        }

        let body = match self {
            ApiError::Risk(RiskError::Validation(v)) => ErrorRes {
                error,
                detail: v.to_string(),
                fields: v.into_issues().into_iter().map(FieldIssueRes::from).collect(),
            },
            // Internal details stay in the log.
            ApiError::Risk(RiskError::Inference(_) | RiskError::Output(_))
            | ApiError::Internal(_) => ErrorRes {
                error,
                detail: "Internal error during prediction".into(),
                fields: Vec::new(),
            },
            ApiError::Risk(e) => ErrorRes {
                error,
                detail: e.to_string(),
                fields: Vec::new(),
            },
            ApiError::BadRequest(detail)
            | ApiError::PayloadTooLarge(detail)
            | ApiError::NotFound(detail) => ErrorRes {
                error,
                detail,
                fields: Vec::new(),
            },
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heart_risk_core::{FieldIssue, ValidationError};

    #[test]
    fn test_status_mapping() {
        let validation = ApiError::from(RiskError::from(ValidationError::new(vec![
            FieldIssue::new("Age", "field is missing"),
        ])));
        assert_eq!(validation.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::from(RiskError::NotLoaded).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::from(RiskError::Inference("boom".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::PayloadTooLarge("too big".into()).status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }
}
