//! Model loading and prediction.
//!
//! [`ModelPredictor`] owns the loaded model for the life of the process. Loading happens at most
//! once: concurrent first callers queue on a mutex, and after that every read goes through a
//! lock-free [`OnceLock`]. Prediction is a pure function of the record and the loaded model.

use crate::config::CoreConfig;
use crate::constants::{DEFAULT_MODEL_TYPE, DEFAULT_MODEL_VERSION};
use crate::forest::{Classifier, DecisionForest, ModelArtifact};
use crate::preprocessing::{FillValues, Preprocessor};
use crate::record::PatientRecord;
use crate::schema::FEATURE_COUNT;
use crate::{RiskError, RiskResult};
use chrono::{DateTime, Utc};
use risk_types::{Probability, Threshold};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex, OnceLock};

/// Coarse risk bucket shown to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cut points mapping a probability to a [`RiskLevel`].
///
/// Shipped inside the model artifact. With neither cut point set the tiers follow the label:
/// `HIGH` at or above the decision threshold, `LOW` below it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskTiers {
    /// Start of the `MEDIUM` band. No `MEDIUM` band when unset.
    #[serde(default)]
    pub medium_from: Option<f64>,
    /// Start of the `HIGH` band. Defaults to the decision threshold.
    #[serde(default)]
    pub high_from: Option<f64>,
}

impl RiskTiers {
    pub fn level(&self, probability: Probability, threshold: Threshold) -> RiskLevel {
        let p = probability.value();
        let high_from = self.high_from.unwrap_or(threshold.value());
        if p >= high_from {
            RiskLevel::High
        } else if self.medium_from.is_some_and(|m| p >= m) {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    /// Check the cut points against each other and the threshold.
    pub fn validate(&self, threshold: Threshold) -> Result<(), String> {
        let high_from = self.high_from.unwrap_or(threshold.value());
        for (name, cut) in [("medium_from", self.medium_from), ("high_from", self.high_from)] {
            if let Some(c) = cut {
                if !(c.is_finite() && (0.0..=1.0).contains(&c)) {
                    return Err(format!("risk tier {name} must lie in [0, 1], got {c}"));
                }
            }
        }
        match self.medium_from {
            Some(m) if m >= high_from => Err(format!(
                "risk tier medium_from ({m}) must be below high_from ({high_from})"
            )),
            _ => Ok(()),
        }
    }
}

/// Outcome for a single patient.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PredictionResult {
    /// `1` when `probability >= threshold`.
    pub label: u8,
    pub probability: Probability,
    pub risk_level: RiskLevel,
    pub threshold: Threshold,
}

impl PredictionResult {
    /// Percentage of the unrounded probability, e.g. `"32.4%"` for `0.32446`.
    pub fn risk_percentage(&self) -> String {
        self.probability.as_percentage()
    }
}

/// Outcome for one row of a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchPrediction {
    /// Zero-based input row index.
    pub id: usize,
    /// Value of the input's `id` column, when it had one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
    pub prediction: u8,
    pub probability: Probability,
}

/// Static description of the loaded model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelInfo {
    pub model_type: String,
    pub version: String,
    pub model_path: String,
    pub threshold: f64,
    pub is_loaded: bool,
    pub n_estimators: usize,
    pub max_depth: usize,
    pub n_features: usize,
    pub feature_names: Vec<String>,
    pub risk_tiers: RiskTiers,
    pub loaded_at: DateTime<Utc>,
}

struct LoadedModel {
    classifier: Arc<dyn Classifier>,
    preprocessor: Preprocessor,
    threshold: Threshold,
    tiers: RiskTiers,
    info: ModelInfo,
}

impl LoadedModel {
    fn read(config: &CoreConfig) -> RiskResult<Self> {
        let model_path = config.model_path();
        if !model_path.exists() {
            return Err(RiskError::model_load(
                model_path,
                "model file not found; export the trained forest before starting the service",
            ));
        }

        let artifact = ModelArtifact::read(model_path)?;
        let forest =
            DecisionForest::from_artifact(&artifact).map_err(|e| RiskError::model_load(model_path, e))?;
        tracing::info!(
            "Model loaded from {} ({} trees)",
            model_path.display(),
            forest.n_trees()
        );

        let threshold = read_threshold(config.threshold_path())?;
        let tiers = artifact.risk_tiers.unwrap_or_default();
        tiers
            .validate(threshold)
            .map_err(|e| RiskError::model_load(model_path, e))?;

        let info = ModelInfo {
            model_type: artifact
                .model_type
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL_TYPE.into()),
            version: artifact
                .version
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL_VERSION.into()),
            model_path: model_path.display().to_string(),
            threshold: threshold.value(),
            is_loaded: true,
            n_estimators: artifact
                .n_estimators
                .map_or(forest.n_trees(), |n| n as usize),
            max_depth: artifact
                .max_depth
                .map_or(forest.max_depth(), |d| d as usize),
            n_features: forest.n_features(),
            feature_names: artifact.feature_names.clone(),
            risk_tiers: tiers,
            loaded_at: Utc::now(),
        };

        Ok(Self {
            classifier: Arc::new(forest),
            preprocessor: Preprocessor::new(FillValues::load_or_default(config.fill_values_path())),
            threshold,
            tiers,
            info,
        })
    }
}

/// Read the decision threshold, falling back to the default when the file is absent.
///
/// The file holds either a bare number or `{"threshold": x}`.
pub fn read_threshold(path: &Path) -> RiskResult<Threshold> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ThresholdFile {
        Bare(Threshold),
        Wrapped { threshold: Threshold },
    }

    if !path.exists() {
        tracing::warn!(
            "Threshold file not found at {}, using default {}",
            path.display(),
            Threshold::DEFAULT
        );
        return Ok(Threshold::DEFAULT);
    }

    let raw = std::fs::read_to_string(path).map_err(|e| RiskError::model_load(path, e))?;
    let threshold = match serde_json::from_str::<ThresholdFile>(&raw) {
        Ok(ThresholdFile::Bare(t)) | Ok(ThresholdFile::Wrapped { threshold: t }) => t,
        Err(_) => {
            return Err(RiskError::model_load(
                path,
                "threshold must be a number strictly between 0 and 1, or {\"threshold\": <number>}",
            ))
        }
    };
    tracing::info!("Threshold loaded: {}", threshold);
    Ok(threshold)
}

/// Loads the model once and serves predictions from it.
pub struct ModelPredictor {
    config: CoreConfig,
    model: OnceLock<LoadedModel>,
    load_lock: Mutex<()>,
}

impl ModelPredictor {
    /// An unloaded predictor reading from the paths in `config`.
    pub fn new(config: CoreConfig) -> Self {
        Self {
            config,
            model: OnceLock::new(),
            load_lock: Mutex::new(()),
        }
    }

    /// A predictor that is already loaded with the given parts.
    ///
    /// Useful for embedding a classifier that does not come from a file.
    pub fn with_classifier(
        classifier: Arc<dyn Classifier>,
        preprocessor: Preprocessor,
        threshold: Threshold,
        tiers: RiskTiers,
    ) -> RiskResult<Self> {
        if classifier.n_features() != FEATURE_COUNT {
            return Err(RiskError::InvalidConfig(format!(
                "classifier expects {} features, the preprocessor produces {}",
                classifier.n_features(),
                FEATURE_COUNT
            )));
        }
        let config = CoreConfig::default();
        tiers
            .validate(threshold)
            .map_err(RiskError::InvalidConfig)?;
        let info = ModelInfo {
            model_type: "custom".into(),
            version: DEFAULT_MODEL_VERSION.into(),
            model_path: String::new(),
            threshold: threshold.value(),
            is_loaded: true,
            n_estimators: 0,
            max_depth: 0,
            n_features: classifier.n_features(),
            feature_names: crate::schema::FEATURE_NAMES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            risk_tiers: tiers,
            loaded_at: Utc::now(),
        };

        let predictor = Self::new(config);
        let _ = predictor.model.set(LoadedModel {
            classifier,
            preprocessor,
            threshold,
            tiers,
            info,
        });
        Ok(predictor)
    }

    /// Read the model, threshold and fill values. Does nothing if already loaded.
    ///
    /// # Errors
    ///
    /// Returns `RiskError::ModelLoad` if the model or threshold file is missing or corrupt. The
    /// predictor stays unloaded and `load` may be called again.
    pub fn load(&self) -> RiskResult<()> {
        if self.model.get().is_some() {
            return Ok(());
        }

        // The guard protects no data, so a poisoned lock is still usable.
        let _guard = self
            .load_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if self.model.get().is_some() {
            return Ok(());
        }

        let loaded = LoadedModel::read(&self.config)?;
        let _ = self.model.set(loaded);
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.model.get().is_some()
    }

    fn loaded(&self) -> RiskResult<&LoadedModel> {
        self.model.get().ok_or(RiskError::NotLoaded)
    }

    /// The decision threshold, once loaded.
    pub fn threshold(&self) -> Option<Threshold> {
        self.model.get().map(|m| m.threshold)
    }

    pub fn info(&self) -> Option<&ModelInfo> {
        self.model.get().map(|m| &m.info)
    }

    fn score(&self, model: &LoadedModel, record: &PatientRecord) -> RiskResult<Probability> {
        let features = model.preprocessor.transform(record);
        let raw = model.classifier.predict_proba(features.as_slice())?;
        Probability::new(raw).map_err(|e| RiskError::Inference(e.to_string()))
    }

    /// Predict for one patient.
    ///
    /// # Errors
    ///
    /// `RiskError::NotLoaded` before [`load`](Self::load) has succeeded; `RiskError::Inference`
    /// if the classifier misbehaves.
    pub fn predict_single(&self, record: &PatientRecord) -> RiskResult<PredictionResult> {
        let model = self.loaded()?;
        let probability = self.score(model, record)?;

        Ok(PredictionResult {
            label: model.threshold.classify(probability),
            probability,
            risk_level: model.tiers.level(probability, model.threshold),
            threshold: model.threshold,
        })
    }

    /// Predict for many patients, preserving input order. Each result's `id` is its row index.
    ///
    /// Fails as a whole: no partial results are returned.
    pub fn predict_batch(&self, records: &[PatientRecord]) -> RiskResult<Vec<BatchPrediction>> {
        let model = self.loaded()?;
        let predictions = records
            .iter()
            .enumerate()
            .map(|(id, record)| {
                let probability = self.score(model, record)?;
                Ok(BatchPrediction {
                    id,
                    record_id: None,
                    prediction: model.threshold.classify(probability),
                    probability,
                })
            })
            .collect::<RiskResult<Vec<_>>>()?;

        tracing::info!("Completed {} predictions", predictions.len());
        Ok(predictions)
    }
}

impl std::fmt::Debug for ModelPredictor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelPredictor")
            .field("config", &self.config)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}
