//! Model loading
//!
//! Resolves the model artifact and its metadata at startup, trying each
//! source once and in order:
//! 1. the remote object store, when configured
//! 2. the bundled local files
//!
//! If both fail the caller gets [`LoadOutcome::Degraded`] carrying both
//! errors; the server still starts, just without a model.

mod config;
pub mod local;
pub mod remote;

pub use config::{
    load_env_file, LoaderConfig, LocalConfig, RemoteConfig, DEFAULT_GCS_ENDPOINT, DEFAULT_METADATA_PATH,
    DEFAULT_MODEL_PATH,
};
pub use remote::ObjectStore;

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::booster::{Booster, ModelError};
use crate::preprocessing::{MetadataError, ModelMetadata};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("{0} not set")]
    MissingConfig(&'static str),

    #[error("invalid object-store endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("local {kind} file not found: {}", .path.display())]
    FileNotFound { kind: &'static str, path: PathBuf },

    #[error("failed to read {kind} file {}: {source}", .path.display())]
    Io {
        kind: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("object {object} returned HTTP {status}")]
    Status { object: String, status: u16 },

    #[error("model error: {0}")]
    Model(#[from] ModelError),

    #[error("metadata error: {0}")]
    Metadata(#[from] MetadataError),

    #[error("feature schema has {columns} columns but the model expects {features} features")]
    SchemaMismatch { columns: usize, features: usize },

    #[error("label mapping has {labels} classes but the model outputs {classes}")]
    ClassMismatch { labels: usize, classes: usize },
}

/// Where the serving model came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadSource {
    Remote,
    Local,
    /// No source succeeded.
    Unknown,
}

impl LoadSource {
    pub fn as_str(self) -> &'static str {
        match self {
            LoadSource::Remote => "remote",
            LoadSource::Local => "local",
            LoadSource::Unknown => "unknown",
        }
    }
}

impl fmt::Display for LoadSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A model together with metadata that has been checked against it.
#[derive(Debug, Clone)]
pub struct LoadedModel {
    pub booster: Booster,
    pub metadata: ModelMetadata,
}

impl LoadedModel {
    /// Pair a model with its metadata, rejecting combinations that could
    /// never produce a valid prediction.
    pub fn new(booster: Booster, metadata: ModelMetadata) -> Result<Self, LoadError> {
        if metadata.schema.len() != booster.n_features() {
            return Err(LoadError::SchemaMismatch {
                columns: metadata.schema.len(),
                features: booster.n_features(),
            });
        }
        if booster.objective().is_multiclass() && booster.n_groups() != metadata.labels.len() {
            return Err(LoadError::ClassMismatch {
                labels: metadata.labels.len(),
                classes: booster.n_groups(),
            });
        }
        Ok(Self { booster, metadata })
    }
}

/// Result of the startup load sequence.
#[derive(Debug)]
pub enum LoadOutcome {
    Ready {
        model: LoadedModel,
        source: LoadSource,
    },
    Degraded {
        remote: LoadError,
        local: LoadError,
    },
}

impl LoadOutcome {
    pub fn source(&self) -> LoadSource {
        match self {
            LoadOutcome::Ready { source, .. } => *source,
            LoadOutcome::Degraded { .. } => LoadSource::Unknown,
        }
    }
}

/// Run the remote-then-local load sequence. Never fails; a double failure is
/// reported as [`LoadOutcome::Degraded`].
pub async fn resolve(config: &LoaderConfig) -> LoadOutcome {
    let remote_err = match remote::load(&config.remote, &config.local).await {
        Ok(model) => {
            info!(source = %LoadSource::Remote, classes = ?model.metadata.labels.classes(), "Model ready");
            return LoadOutcome::Ready {
                model,
                source: LoadSource::Remote,
            };
        }
        Err(e) => {
            warn!(error = %e, "Remote model load failed, trying local files");
            e
        }
    };

    match local::load(&config.local) {
        Ok(model) => {
            info!(source = %LoadSource::Local, classes = ?model.metadata.labels.classes(), "Model ready");
            LoadOutcome::Ready {
                model,
                source: LoadSource::Local,
            }
        }
        Err(e) => {
            error!(error = %e, "Local model load failed, serving without a model");
            LoadOutcome::Degraded {
                remote: remote_err,
                local: e,
            }
        }
    }
}
