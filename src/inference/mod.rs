//! Inference service module
//!
//! Owns the loaded model and serves single-record predictions:
//! - Readiness and load-source reporting for health checks
//! - Request encoding against the stored feature schema
//! - Class selection for score-vector and scalar model outputs
//! - Label lookup, with failures reported as opaque internal errors

mod service;

pub use service::{
    select_class, HealthStatus, InferenceService, PredictError, Prediction, Predictor, Readiness,
};
