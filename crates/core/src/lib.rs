//! # Heart Risk Core
//!
//! Core prediction pipeline for the heart-attack risk service.
//!
//! This crate contains the pure data operations:
//! - Patient field schema and validation ([`schema`], [`record`])
//! - Feature engineering into the model's column order ([`preprocessing`])
//! - Decision-forest inference over an exported artifact ([`forest`])
//! - Model loading, thresholding and risk tiers ([`predictor`])
//! - CSV batch input and output ([`batch`])
//!
//! **No API concerns**: HTTP servers, request/response types and the CLI belong in `api-rest`,
//! `api-shared` and `heart-risk-cli`.

pub mod batch;
pub mod config;
pub mod constants;
pub mod error;
pub mod forest;
pub mod predictor;
pub mod preprocessing;
pub mod record;
pub mod schema;

pub use batch::{attach_record_ids, read_records, write_predictions, BatchRow, SAMPLE_CSV};
pub use config::CoreConfig;
pub use constants::*;
pub use error::{FieldIssue, RiskError, RiskResult, ValidationError};
pub use forest::{Classifier, DecisionForest, ModelArtifact};
pub use predictor::{
    BatchPrediction, ModelInfo, ModelPredictor, PredictionResult, RiskLevel, RiskTiers,
};
pub use preprocessing::{FeatureVector, FillValues, Preprocessor};
pub use record::PatientRecord;
pub use risk_types::{Probability, Threshold};
pub use schema::{Field, FEATURE_COUNT, FEATURE_NAMES};
