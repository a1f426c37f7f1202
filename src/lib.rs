//! Penguin Classifier - species prediction over HTTP
//!
//! Serves a pre-trained gradient-boosted tree classifier that predicts a
//! penguin's species from body measurements, sex and island.
//!
//! # Modules
//!
//! - [`booster`] - XGBoost JSON model parsing and tree-ensemble evaluation
//! - [`preprocessing`] - Request record, metadata and one-hot feature encoding
//! - [`loader`] - Remote-first model loading with local fallback
//! - [`inference`] - Readiness, prediction and class selection
//! - [`server`] - HTTP API
//! - [`cli`] - Command-line interface

pub mod booster;
pub mod preprocessing;
pub mod loader;
pub mod inference;

pub mod server;
pub mod cli;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::booster::{Booster, ModelError, ModelOutput, Objective};
    pub use crate::inference::{HealthStatus, InferenceService, PredictError, Predictor};
    pub use crate::loader::{LoadError, LoadOutcome, LoadSource, LoadedModel, LoaderConfig};
    pub use crate::preprocessing::{FeatureEncoder, Island, ModelMetadata, PenguinFeatures, Sex};
    pub use crate::server::{create_router, AppState, ServerConfig};
}
