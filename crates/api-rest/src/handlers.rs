//! REST endpoint handlers.

use crate::error::ApiError;
use crate::AppState;
use api_shared::{
    CsvPredictionRes, ErrorRes, HealthRes, HealthService, ModelInfoRes, PatientPredictionRes,
    PatientRecordReq,
};
use axum::{
    extract::{
        multipart::{Multipart, MultipartRejection},
        rejection::JsonRejection,
        Query, State,
    },
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
};
use heart_risk_core::{
    attach_record_ids, read_records, write_predictions, PatientRecord, RiskError, SAMPLE_CSV,
};
use serde::Deserialize;
use serde_json::Value;

const INDEX_HTML: &str = include_str!("../assets/index.html");

/// Landing page listing the endpoints.
pub async fn root() -> Html<&'static str> {
    Html(INDEX_HTML)
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
///
/// Always answers 200 while the process is up. `model_loaded` and `status` report whether
/// prediction endpoints are usable.
#[axum::debug_handler]
pub async fn health(State(state): State<AppState>) -> Json<HealthRes> {
    Json(HealthService::check_health(&state.predictor))
}

#[utoipa::path(
    get,
    path = "/model/info",
    responses(
        (status = 200, description = "Model metadata", body = ModelInfoRes),
        (status = 503, description = "Model not loaded", body = ErrorRes)
    )
)]
/// Static metadata about the deployed model.
///
/// # Errors
/// Returns `503 Service Unavailable` if the model is not loaded.
#[axum::debug_handler]
pub async fn model_info(State(state): State<AppState>) -> Result<Json<ModelInfoRes>, ApiError> {
    let info = state
        .predictor
        .info()
        .ok_or(ApiError::Risk(RiskError::NotLoaded))?;
    Ok(Json(ModelInfoRes::from(info)))
}

#[utoipa::path(
    get,
    path = "/sample",
    responses(
        (status = 200, description = "Sample input file", content_type = "text/csv", body = String)
    )
)]
/// Download a sample CSV in the expected input format.
pub async fn sample() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"sample_patients.csv\"",
            ),
        ],
        SAMPLE_CSV,
    )
}

#[utoipa::path(
    post,
    path = "/predict/patient",
    request_body = PatientRecordReq,
    responses(
        (status = 200, description = "Prediction for one patient", body = PatientPredictionRes),
        (status = 400, description = "Malformed or invalid record", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes),
        (status = 503, description = "Model not loaded", body = ErrorRes)
    )
)]
/// Predict heart-attack risk for a single patient.
///
/// The body is validated as a whole; every missing or malformed field is reported in `fields`.
///
/// # Errors
/// - `400 Bad Request` if the body is not JSON or fails validation.
/// - `503 Service Unavailable` if the model is not loaded.
#[axum::debug_handler]
pub async fn predict_patient(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<PatientPredictionRes>, ApiError> {
    if !state.predictor.is_loaded() {
        return Err(RiskError::NotLoaded.into());
    }
    let Json(body) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let record = PatientRecord::from_json_value(&body).map_err(RiskError::from)?;
    let result = state.predictor.predict_single(&record)?;

    tracing::debug!(
        "Patient prediction: label={} probability={}",
        result.label,
        result.probability
    );
    Ok(Json(PatientPredictionRes::from(&result)))
}

#[derive(Debug, Default, Deserialize)]
pub struct CsvQuery {
    /// `json` (default) or `csv`.
    pub format: Option<String>,
}

enum OutputFormat {
    Json,
    Csv,
}

impl OutputFormat {
    fn parse(value: Option<&str>) -> Result<Self, ApiError> {
        match value.map(str::trim) {
            None | Some("") => Ok(OutputFormat::Json),
            Some(f) if f.eq_ignore_ascii_case("json") => Ok(OutputFormat::Json),
            Some(f) if f.eq_ignore_ascii_case("csv") => Ok(OutputFormat::Csv),
            Some(other) => Err(ApiError::BadRequest(format!(
                "unsupported format '{other}', expected 'json' or 'csv'"
            ))),
        }
    }
}

#[utoipa::path(
    post,
    path = "/predict/csv",
    request_body(
        content = String,
        description = "Multipart form with the CSV file in field `file`",
        content_type = "multipart/form-data"
    ),
    params(
        ("format" = Option<String>, Query, description = "`json` (default) or `csv`")
    ),
    responses(
        (status = 200, description = "Predictions in input order", body = CsvPredictionRes),
        (status = 400, description = "Malformed upload or invalid rows", body = ErrorRes),
        (status = 413, description = "Upload too large", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes),
        (status = 503, description = "Model not loaded", body = ErrorRes)
    )
)]
/// Predict for every row of an uploaded CSV file.
///
/// Each result's `id` is its zero-based row index; an `id` column in the file is echoed back as
/// `record_id`. Any invalid row fails the whole request.
///
/// # Errors
/// - `400 Bad Request` if the upload has no `file` field, is not valid CSV, or has invalid rows.
/// - `413 Payload Too Large` if the upload exceeds the configured limit.
/// - `503 Service Unavailable` if the model is not loaded.
pub async fn predict_csv(
    State(state): State<AppState>,
    Query(query): Query<CsvQuery>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    if !state.predictor.is_loaded() {
        return Err(RiskError::NotLoaded.into());
    }
    let format = OutputFormat::parse(query.format.as_deref())?;
    let mut multipart = multipart.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() == Some("file") {
            upload = Some(field.bytes().await.map_err(multipart_error)?);
            break;
        }
    }
    let Some(bytes) = upload else {
        return Err(ApiError::BadRequest(
            "multipart form must contain a 'file' field".into(),
        ));
    };

    // Parsing and scoring a large file is CPU-bound; keep it off the async workers.
    let predictor = state.predictor.clone();
    let predictions = tokio::task::spawn_blocking(move || {
        let rows = read_records(bytes.as_ref())?;
        let records: Vec<PatientRecord> = rows.iter().map(|r| r.record.clone()).collect();
        let mut predictions = predictor.predict_batch(&records)?;
        attach_record_ids(&rows, &mut predictions);
        Ok::<_, RiskError>(predictions)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("prediction task failed: {e}")))??;

    match format {
        OutputFormat::Json => Ok(Json(CsvPredictionRes::from(predictions)).into_response()),
        OutputFormat::Csv => {
            let mut out = Vec::new();
            write_predictions(&mut out, &predictions)?;
            Ok((
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
                    (
                        header::CONTENT_DISPOSITION,
                        "attachment; filename=\"predictions.csv\"",
                    ),
                ],
                out,
            )
                .into_response())
        }
    }
}

fn multipart_error(err: axum::extract::multipart::MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(err.body_text())
    } else {
        ApiError::BadRequest(err.body_text())
    }
}

/// JSON 404 for unknown routes.
pub async fn not_found() -> ApiError {
    ApiError::NotFound("route not found".into())
}
