//! # API REST
//!
//! REST API for the heart-risk predictor.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (multipart uploads, body limits, CORS, request tracing)
//!
//! Uses `api-shared` for the wire types and `heart-risk-core` for everything else.

#![warn(rust_2018_idioms)]

pub mod error;
pub mod handlers;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use heart_risk_core::ModelPredictor;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use error::ApiError;

/// Application state shared across REST API handlers
#[derive(Clone)]
pub struct AppState {
    pub predictor: Arc<ModelPredictor>,
}

impl AppState {
    pub fn new(predictor: Arc<ModelPredictor>) -> Self {
        Self { predictor }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::model_info,
        handlers::sample,
        handlers::predict_patient,
        handlers::predict_csv,
    ),
    components(schemas(
        api_shared::HealthRes,
        api_shared::PatientRecordReq,
        api_shared::PatientPredictionRes,
        api_shared::CsvPredictionItem,
        api_shared::CsvPredictionRes,
        api_shared::RiskTiersRes,
        api_shared::ModelInfoRes,
        api_shared::FieldIssueRes,
        api_shared::ErrorRes,
    ))
)]
pub struct ApiDoc;

/// Build the REST router.
///
/// `max_upload_bytes` caps every request body, so oversized CSV uploads are answered with 413.
pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/model/info", get(handlers::model_info))
        .route("/sample", get(handlers::sample))
        .route("/predict/patient", post(handlers::predict_patient))
        .route("/predict/csv", post(handlers::predict_csv))
        .route("/predict", post(handlers::predict_csv))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .fallback(handlers::not_found)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the REST API on `addr` until Ctrl-C.
///
/// # Errors
/// Returns an error if the address cannot be bound or the server fails while running.
pub async fn serve(addr: &str, state: AppState, max_upload_bytes: usize) -> anyhow::Result<()> {
    let app = router(state, max_upload_bytes);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("-- Heart risk REST API listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("-- Heart risk REST API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
