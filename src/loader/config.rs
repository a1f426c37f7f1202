//! Model source configuration

use std::path::{Path, PathBuf};

/// Default object-store endpoint (Google Cloud Storage JSON API).
pub const DEFAULT_GCS_ENDPOINT: &str = "https://storage.googleapis.com";

/// Bundled model files, relative to the working directory.
pub const DEFAULT_MODEL_PATH: &str = "data/model.json";
pub const DEFAULT_METADATA_PATH: &str = "data/encoders.json";

/// Merge a `.env` file into the process environment and return its path.
///
/// With `None` the file is searched for from the working directory upward.
/// Variables already set in the environment keep their values.
pub fn load_env_file(path: Option<&Path>) -> Option<PathBuf> {
    match path {
        Some(path) => dotenvy::from_path(path).ok().map(|_| path.to_path_buf()),
        None => dotenvy::dotenv().ok(),
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Where to look for the model, in priority order.
#[derive(Debug, Clone, Default)]
pub struct LoaderConfig {
    pub remote: RemoteConfig,
    pub local: LocalConfig,
}

impl LoaderConfig {
    /// Read both sources from the environment.
    pub fn from_env() -> Self {
        Self {
            remote: RemoteConfig::from_env(),
            local: LocalConfig::from_env(),
        }
    }
}

/// Remote object-store source.
///
/// `bucket` and `model_object` are required for a remote attempt; without
/// them the loader goes straight to the local files.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    pub endpoint: String,
    pub bucket: Option<String>,
    pub model_object: Option<String>,
    /// When unset, metadata is read from [`LocalConfig::metadata_path`].
    pub metadata_object: Option<String>,
    pub access_token: Option<String>,
    /// Ask the GCE metadata server for a token when no `access_token` is set.
    pub use_metadata_server: bool,
    pub timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_GCS_ENDPOINT.to_string(),
            bucket: None,
            model_object: None,
            metadata_object: None,
            access_token: None,
            use_metadata_server: true,
            timeout_secs: 30,
        }
    }
}

impl RemoteConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            endpoint: env_var("GCS_ENDPOINT").unwrap_or(defaults.endpoint),
            bucket: env_var("GCS_BUCKET_NAME"),
            model_object: env_var("GCS_MODEL_BLOB").or_else(|| env_var("GCS_BLOB_NAME")),
            metadata_object: env_var("GCS_ENCODER_BLOB"),
            access_token: env_var("GCS_ACCESS_TOKEN"),
            use_metadata_server: env_var("GCS_METADATA_TOKEN")
                .map(|v| !matches!(v.as_str(), "0" | "false" | "no"))
                .unwrap_or(defaults.use_metadata_server),
            timeout_secs: env_var("GCS_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.timeout_secs),
        }
    }

    /// True when both required identifiers are present.
    pub fn is_configured(&self) -> bool {
        self.bucket.is_some() && self.model_object.is_some()
    }
}

/// Bundled local files.
#[derive(Debug, Clone)]
pub struct LocalConfig {
    pub model_path: PathBuf,
    pub metadata_path: PathBuf,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            metadata_path: PathBuf::from(DEFAULT_METADATA_PATH),
        }
    }
}

impl LocalConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            model_path: env_var("MODEL_PATH").map(PathBuf::from).unwrap_or(defaults.model_path),
            metadata_path: env_var("METADATA_PATH").map(PathBuf::from).unwrap_or(defaults.metadata_path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LoaderConfig::default();
        assert_eq!(config.remote.endpoint, DEFAULT_GCS_ENDPOINT);
        assert!(!config.remote.is_configured());
        assert_eq!(config.local.model_path, PathBuf::from("data/model.json"));
        assert_eq!(config.local.metadata_path, PathBuf::from("data/encoders.json"));
    }

    #[test]
    fn test_remote_requires_bucket_and_object() {
        let mut remote = RemoteConfig {
            bucket: Some("models".to_string()),
            ..Default::default()
        };
        assert!(!remote.is_configured());
        remote.model_object = Some("penguins/model.json".to_string());
        assert!(remote.is_configured());
    }
}
