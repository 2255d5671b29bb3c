//! Constants used throughout the heart-risk core crate.
//!
//! This module contains the file names, defaults and dataset column names shared by the
//! predictor, the CSV reader and the binaries.

/// Default directory holding the deployed model files.
pub const DEFAULT_MODELS_DIR: &str = "models";

/// Filename of the exported decision-forest artifact.
pub const MODEL_FILENAME: &str = "model_v2.json";

/// Filename of the decision threshold shipped with the model.
pub const THRESHOLD_FILENAME: &str = "threshold_v2.json";

/// Filename of the training-set modes used to fill empty fields.
pub const FILL_VALUES_FILENAME: &str = "fill_values.json";

/// Default listen address for the REST server.
pub const DEFAULT_REST_ADDR: &str = "0.0.0.0:8000";

/// Default cap on uploaded CSV bodies (10 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Version label reported when the artifact does not carry its own.
pub const DEFAULT_MODEL_VERSION: &str = "V2 (with Feature Engineering)";

/// Model type reported when the artifact does not carry its own.
pub const DEFAULT_MODEL_TYPE: &str = "RandomForestClassifier";

/// Name of the optional identifier column in batch CSV input.
pub const ID_COLUMN: &str = "id";
