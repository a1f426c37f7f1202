//! Remote object-store source (Cloud Storage JSON API)

use std::time::Duration;

use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::{debug, info};

use crate::booster::Booster;
use crate::preprocessing::ModelMetadata;

use super::{local, LoadError, LoadedModel, LocalConfig, RemoteConfig};

const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

/// Short timeout: off GCE the metadata host does not resolve.
const METADATA_TOKEN_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Read-only client for one object-store endpoint.
pub struct ObjectStore {
    client: Client,
    endpoint: Url,
    token: Option<String>,
}

impl ObjectStore {
    /// Build a client and resolve credentials.
    ///
    /// Uses the configured access token if any, otherwise tries the GCE
    /// metadata server once, otherwise falls back to anonymous access.
    pub async fn connect(config: &RemoteConfig) -> Result<Self, LoadError> {
        let endpoint = Url::parse(&config.endpoint)
            .map_err(|e| LoadError::InvalidEndpoint(format!("{}: {}", config.endpoint, e)))?;
        if endpoint.cannot_be_a_base() {
            return Err(LoadError::InvalidEndpoint(config.endpoint.clone()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(format!("penguin-classifier/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        let token = match &config.access_token {
            Some(token) => Some(token.clone()),
            None if config.use_metadata_server => metadata_server_token(&client).await,
            None => None,
        };

        Ok(Self {
            client,
            endpoint,
            token,
        })
    }

    /// URL of an object's media download.
    pub fn object_url(&self, bucket: &str, object: &str) -> Url {
        let mut url = self.endpoint.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["storage", "v1", "b", bucket, "o", object]);
        }
        url.query_pairs_mut().append_pair("alt", "media");
        url
    }

    /// Download an object's contents.
    pub async fn fetch(&self, bucket: &str, object: &str) -> Result<Vec<u8>, LoadError> {
        let url = self.object_url(bucket, object);
        debug!(url = %url, "Fetching object");

        let mut req = self.client.get(url);
        if let Some(ref token) = self.token {
            req = req.bearer_auth(token);
        }

        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(LoadError::Status {
                object: format!("{}/{}", bucket, object),
                status: status.as_u16(),
            });
        }
        Ok(resp.bytes().await?.to_vec())
    }
}

async fn metadata_server_token(client: &Client) -> Option<String> {
    let resp = client
        .get(METADATA_TOKEN_URL)
        .header("Metadata-Flavor", "Google")
        .timeout(METADATA_TOKEN_TIMEOUT)
        .send()
        .await;

    match resp {
        Ok(resp) if resp.status().is_success() => match resp.bytes().await {
            Ok(body) => serde_json::from_slice::<TokenResponse>(&body)
                .map(|t| t.access_token)
                .map_err(|e| debug!(error = %e, "Unreadable metadata-server token"))
                .ok(),
            Err(e) => {
                debug!(error = %e, "Metadata-server token body failed");
                None
            }
        },
        Ok(resp) => {
            debug!(status = %resp.status(), "Metadata server refused token request");
            None
        }
        Err(e) => {
            debug!(error = %e, "Metadata server unavailable, using anonymous access");
            None
        }
    }
}

/// Download the model (and metadata, if configured) from the object store.
pub async fn load(remote: &RemoteConfig, local: &LocalConfig) -> Result<LoadedModel, LoadError> {
    let bucket = remote
        .bucket
        .as_deref()
        .ok_or(LoadError::MissingConfig("GCS_BUCKET_NAME"))?;
    let model_object = remote
        .model_object
        .as_deref()
        .ok_or(LoadError::MissingConfig("GCS_MODEL_BLOB"))?;

    info!(
        endpoint = %remote.endpoint,
        bucket,
        model_object,
        metadata_object = remote.metadata_object.as_deref().unwrap_or("-"),
        "Attempting remote model load"
    );

    let store = ObjectStore::connect(remote).await?;

    let model_bytes = store.fetch(bucket, model_object).await?;
    let booster = Booster::from_slice(&model_bytes)?;
    info!(bytes = model_bytes.len(), "Remote model downloaded and parsed");

    let metadata = match remote.metadata_object.as_deref() {
        Some(object) => {
            let bytes = store.fetch(bucket, object).await?;
            let metadata = ModelMetadata::from_slice(&bytes)?;
            info!(bytes = bytes.len(), "Remote metadata downloaded");
            metadata
        }
        None => {
            info!(
                metadata_path = %local.metadata_path.display(),
                "No remote metadata object configured, using local metadata"
            );
            local::read_metadata(&local.metadata_path)?
        }
    };

    LoadedModel::new(booster, metadata)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store(endpoint: &str) -> ObjectStore {
        let config = RemoteConfig {
            endpoint: endpoint.to_string(),
            access_token: Some("token".to_string()),
            ..Default::default()
        };
        ObjectStore::connect(&config).await.unwrap()
    }

    #[tokio::test]
    async fn test_object_url_encodes_object_name() {
        let store = store("https://storage.googleapis.com").await;
        let url = store.object_url("my-bucket", "penguins/v1/model.json");
        assert_eq!(
            url.as_str(),
            "https://storage.googleapis.com/storage/v1/b/my-bucket/o/penguins%2Fv1%2Fmodel.json?alt=media"
        );
    }

    #[tokio::test]
    async fn test_object_url_keeps_endpoint_prefix() {
        let store = store("http://127.0.0.1:4443/emulator/").await;
        let url = store.object_url("b", "model.json");
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:4443/emulator/storage/v1/b/b/o/model.json?alt=media"
        );
    }

    #[tokio::test]
    async fn test_missing_configuration_fails_fast() {
        let err = load(&RemoteConfig::default(), &LocalConfig::default()).await.unwrap_err();
        assert!(matches!(err, LoadError::MissingConfig("GCS_BUCKET_NAME")));

        let remote = RemoteConfig {
            bucket: Some("b".to_string()),
            ..Default::default()
        };
        let err = load(&remote, &LocalConfig::default()).await.unwrap_err();
        assert!(matches!(err, LoadError::MissingConfig("GCS_MODEL_BLOB")));
    }

    #[tokio::test]
    async fn test_invalid_endpoint() {
        let config = RemoteConfig {
            endpoint: "not a url".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            ObjectStore::connect(&config).await,
            Err(LoadError::InvalidEndpoint(_))
        ));
    }
}
