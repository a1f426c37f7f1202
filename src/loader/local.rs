//! Bundled model files on the local filesystem

use std::path::Path;

use tracing::info;

use crate::booster::Booster;
use crate::preprocessing::ModelMetadata;

use super::{LoadError, LoadedModel, LocalConfig};

/// Load the model and metadata files named by `config`.
pub fn load(config: &LocalConfig) -> Result<LoadedModel, LoadError> {
    ensure_exists("model", &config.model_path)?;
    ensure_exists("metadata", &config.metadata_path)?;

    let bytes = read("model", &config.model_path)?;
    let booster = Booster::from_slice(&bytes)?;
    let metadata = read_metadata(&config.metadata_path)?;

    info!(
        model_path = %config.model_path.display(),
        metadata_path = %config.metadata_path.display(),
        "Loaded model and metadata from local files"
    );
    LoadedModel::new(booster, metadata)
}

/// Read just the metadata document. Also used by the remote source when no
/// remote metadata object is configured.
pub fn read_metadata(path: &Path) -> Result<ModelMetadata, LoadError> {
    ensure_exists("metadata", path)?;
    let bytes = read("metadata", path)?;
    Ok(ModelMetadata::from_slice(&bytes)?)
}

fn ensure_exists(kind: &'static str, path: &Path) -> Result<(), LoadError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(LoadError::FileNotFound {
            kind,
            path: path.to_path_buf(),
        })
    }
}

fn read(kind: &'static str, path: &Path) -> Result<Vec<u8>, LoadError> {
    std::fs::read(path).map_err(|source| LoadError::Io {
        kind,
        path: path.to_path_buf(),
        source,
    })
}
