use crate::types::HealthRes;
use heart_risk_core::ModelPredictor;

/// Health reporting for the REST API.
///
/// The service process stays up when the model fails to load, so health is reported from the
/// predictor's load state rather than from the process being alive.
#[derive(Clone, Default)]
pub struct HealthService;

impl HealthService {
    /// Report readiness for the given predictor.
    ///
    /// # Returns
    /// A `HealthRes` with `status` `healthy` and the model version and threshold once the model
    /// is loaded, or `degraded` with `model_loaded: false` before that.
    pub fn check_health(predictor: &ModelPredictor) -> HealthRes {
        match (predictor.info(), predictor.threshold()) {
            (Some(info), Some(threshold)) => HealthRes {
                status: "healthy".into(),
                model_loaded: true,
                model_version: Some(info.version.clone()),
                threshold: Some(threshold.value()),
                message: "Heart risk API is ready".into(),
            },
            _ => HealthRes {
                status: "degraded".into(),
                model_loaded: false,
                model_version: None,
                threshold: None,
                message: "Model is not loaded; prediction endpoints return 503".into(),
            },
        }
    }
}
