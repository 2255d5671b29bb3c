//! # API Shared
//!
//! Shared request/response definitions for the heart-risk APIs.
//!
//! Contains:
//! - JSON wire types (`types` module), with OpenAPI schemas
//! - Shared services like `HealthService`
//!
//! Used by `api-rest` and `heart-risk-cli` so both print the same shapes.

pub mod health;
pub mod types;

pub use health::HealthService;
pub use types::*;
