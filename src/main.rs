//! Heart-risk service entry point.
//!
//! Loads the model once at startup and serves the REST API. A model that fails to load does not
//! stop the server: `/health` reports `degraded` and prediction endpoints answer 503.
//!
//! # Environment Variables
//! - `HEART_RISK_REST_ADDR`: server address (default: "0.0.0.0:8000")
//! - `HEART_RISK_MODELS_DIR`: directory holding the model files (default: "models")
//! - `HEART_RISK_MODEL_PATH`, `HEART_RISK_THRESHOLD_PATH`, `HEART_RISK_FILL_VALUES_PATH`:
//!   per-file overrides
//! - `HEART_RISK_MAX_UPLOAD_BYTES`: request body cap (default: 10 MiB)
//! - `RUST_LOG`: log filter

use api_rest::AppState;
use heart_risk_core::{config::max_upload_bytes_from_env_value, CoreConfig, ModelPredictor};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("heart_risk_run=info".parse()?)
                .add_directive("heart_risk_core=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("HEART_RISK_REST_ADDR")
        .unwrap_or_else(|_| heart_risk_core::DEFAULT_REST_ADDR.into());
    let max_upload_bytes =
        max_upload_bytes_from_env_value(std::env::var("HEART_RISK_MAX_UPLOAD_BYTES").ok())?;

    let cfg = CoreConfig::from_overrides(
        std::env::var("HEART_RISK_MODELS_DIR").ok(),
        std::env::var("HEART_RISK_MODEL_PATH").ok(),
        std::env::var("HEART_RISK_THRESHOLD_PATH").ok(),
        std::env::var("HEART_RISK_FILL_VALUES_PATH").ok(),
    )?;

    tracing::info!("++ Loading model from {}", cfg.model_path().display());
    let predictor = Arc::new(ModelPredictor::new(cfg));
    match predictor.load() {
        Ok(()) => {
            if let Some(info) = predictor.info() {
                tracing::info!(
                    "++ Model {} loaded: {} trees, threshold {}",
                    info.version,
                    info.n_estimators,
                    info.threshold
                );
            }
        }
        Err(e) => tracing::warn!("Model not loaded, serving in degraded mode: {}", e),
    }

    tracing::info!("++ Starting heart risk REST on {}", rest_addr);
    api_rest::serve(&rest_addr, AppState::new(predictor), max_upload_bytes).await
}
