//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into the predictor. The
//! binaries read environment variables; nothing in this crate does, so request handling never
//! depends on process-wide state.

use crate::constants::{
    DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_MODELS_DIR, FILL_VALUES_FILENAME, MODEL_FILENAME,
    THRESHOLD_FILENAME,
};
use crate::{RiskError, RiskResult};
use std::path::{Path, PathBuf};

/// Locations of the deployed model files, resolved at startup.
#[derive(Clone, Debug, PartialEq)]
pub struct CoreConfig {
    model_path: PathBuf,
    threshold_path: PathBuf,
    fill_values_path: PathBuf,
}

impl CoreConfig {
    /// Create a new `CoreConfig` from explicit paths.
    pub fn new(
        model_path: PathBuf,
        threshold_path: PathBuf,
        fill_values_path: PathBuf,
    ) -> RiskResult<Self> {
        for (name, path) in [
            ("model path", &model_path),
            ("threshold path", &threshold_path),
            ("fill values path", &fill_values_path),
        ] {
            if path.as_os_str().is_empty() {
                return Err(RiskError::InvalidConfig(format!("{name} cannot be empty")));
            }
        }

        Ok(Self {
            model_path,
            threshold_path,
            fill_values_path,
        })
    }

    /// Standard file names inside `models_dir`.
    pub fn from_models_dir(models_dir: impl AsRef<Path>) -> Self {
        let dir = models_dir.as_ref();
        Self {
            model_path: dir.join(MODEL_FILENAME),
            threshold_path: dir.join(THRESHOLD_FILENAME),
            fill_values_path: dir.join(FILL_VALUES_FILENAME),
        }
    }

    /// Resolve configuration from optional overrides.
    ///
    /// Blank values count as unset. Individual file overrides win over the directory.
    pub fn from_overrides(
        models_dir: Option<String>,
        model_path: Option<String>,
        threshold_path: Option<String>,
        fill_values_path: Option<String>,
    ) -> RiskResult<Self> {
        let models_dir = non_blank(models_dir).unwrap_or_else(|| DEFAULT_MODELS_DIR.into());
        let defaults = Self::from_models_dir(models_dir);

        Self::new(
            non_blank(model_path)
                .map(PathBuf::from)
                .unwrap_or(defaults.model_path),
            non_blank(threshold_path)
                .map(PathBuf::from)
                .unwrap_or(defaults.threshold_path),
            non_blank(fill_values_path)
                .map(PathBuf::from)
                .unwrap_or(defaults.fill_values_path),
        )
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    pub fn threshold_path(&self) -> &Path {
        &self.threshold_path
    }

    pub fn fill_values_path(&self) -> &Path {
        &self.fill_values_path
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self::from_models_dir(DEFAULT_MODELS_DIR)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse the upload size cap from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns the default of 10 MiB.
pub fn max_upload_bytes_from_env_value(value: Option<String>) -> RiskResult<usize> {
    match non_blank(value) {
        None => Ok(DEFAULT_MAX_UPLOAD_BYTES),
        Some(v) => match v.parse::<usize>() {
            Ok(0) => Err(RiskError::InvalidConfig(
                "max upload bytes must be greater than zero".into(),
            )),
            Ok(n) => Ok(n),
            Err(e) => Err(RiskError::InvalidConfig(format!(
                "max upload bytes '{v}' is not a valid size: {e}"
            ))),
        },
    }
}
