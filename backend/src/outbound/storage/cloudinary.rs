//! Cloudinary upload API adapter.
//!
//! Objects are uploaded as `raw` resources with the storage key as their
//! `public_id`. Requests are signed with SHA-256 over the alphabetically
//! sorted parameters followed by the API secret.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mockable::Clock;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::debug;
use zeroize::Zeroizing;

use crate::domain::StorageBackend;
use crate::domain::ports::{FileStorage, FileStorageError, StoredObject};

const DEFAULT_API_BASE: &str = "https://api.cloudinary.com/v1_1/";
const DEFAULT_DELIVERY_BASE: &str = "https://res.cloudinary.com/";

/// Account settings for the Cloudinary adapter.
#[derive(Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: Zeroizing<String>,
    pub timeout: Duration,
}

impl std::fmt::Debug for CloudinaryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudinaryConfig")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    public_id: String,
    secure_url: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

/// Cloudinary `raw` resources accessed through the signed upload API.
pub struct CloudinaryFileStorage {
    client: Client,
    config: CloudinaryConfig,
    api_base: Url,
    delivery_base: Url,
    clock: Arc<dyn Clock>,
}

impl CloudinaryFileStorage {
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(config: CloudinaryConfig, clock: Arc<dyn Clock>) -> Result<Self, FileStorageError> {
        let api_base = Url::parse(DEFAULT_API_BASE)
            .map_err(|err| FileStorageError::backend(err.to_string()))?;
        let delivery_base = Url::parse(DEFAULT_DELIVERY_BASE)
            .map_err(|err| FileStorageError::backend(err.to_string()))?;
        Self::with_endpoints(config, clock, api_base, delivery_base)
    }

    /// Point the adapter at other API and delivery hosts.
    pub fn with_endpoints(
        config: CloudinaryConfig,
        clock: Arc<dyn Clock>,
        api_base: Url,
        delivery_base: Url,
    ) -> Result<Self, FileStorageError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| FileStorageError::backend(err.to_string()))?;
        Ok(Self {
            client,
            config,
            api_base,
            delivery_base,
            clock,
        })
    }

    fn endpoint(&self, action: &str) -> Result<Url, FileStorageError> {
        self.api_base
            .join(&format!("{}/raw/{action}", self.config.cloud_name))
            .map_err(|err| FileStorageError::backend(err.to_string()))
    }

    /// Signed parameter set for `public_id` at the current time.
    fn signed_params(&self, public_id: &str) -> Vec<(&'static str, String)> {
        let timestamp = self.clock.utc().timestamp().to_string();
        let mut params = vec![("public_id", public_id.to_owned()), ("timestamp", timestamp)];
        let signature = sign(&params, &self.config.api_secret);
        params.push(("api_key", self.config.api_key.clone()));
        params.push(("signature", signature));
        params
    }
}

/// Hex SHA-256 of `k1=v1&k2=v2...` (keys sorted) followed by the secret.
fn sign(params: &[(&str, String)], secret: &str) -> String {
    let mut sorted: Vec<&(&str, String)> = params.iter().collect();
    sorted.sort_by_key(|(name, _)| *name);
    let joined = sorted
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("&");
    hex::encode(Sha256::digest(format!("{joined}{secret}").as_bytes()))
}

fn map_transport_error(error: reqwest::Error) -> FileStorageError {
    FileStorageError::backend(format!("cloudinary request failed: {error}"))
}

fn map_status(status: StatusCode, key: &str) -> FileStorageError {
    if status == StatusCode::NOT_FOUND {
        FileStorageError::not_found(key)
    } else {
        FileStorageError::backend(format!("cloudinary answered status {}", status.as_u16()))
    }
}

#[async_trait]
impl FileStorage for CloudinaryFileStorage {
    fn backend(&self) -> StorageBackend {
        StorageBackend::Cloudinary
    }

    async fn put(
        &self,
        key: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<StoredObject, FileStorageError> {
        let part = Part::bytes(bytes.to_vec())
            .file_name(key.replace('/', "_"))
            .mime_str(content_type)
            .map_err(map_transport_error)?;
        let form = self
            .signed_params(key)
            .into_iter()
            .fold(Form::new().part("file", part), |form, (name, value)| {
                form.text(name, value)
            });
        let response = self
            .client
            .post(self.endpoint("upload")?)
            .multipart(form)
            .send()
            .await
            .map_err(map_transport_error)?;
        if !response.status().is_success() {
            return Err(map_status(response.status(), key));
        }
        let uploaded: UploadResponse = response.json().await.map_err(map_transport_error)?;
        debug!(public_id = %uploaded.public_id, "cloudinary upload complete");
        Ok(StoredObject {
            key: uploaded.public_id,
            public_url: Some(uploaded.secure_url),
        })
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, FileStorageError> {
        let url = self
            .delivery_base
            .join(&format!("{}/raw/upload/{key}", self.config.cloud_name))
            .map_err(|_| FileStorageError::invalid_key(key))?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(map_transport_error)?;
        if !response.status().is_success() {
            return Err(map_status(response.status(), key));
        }
        let body = response.bytes().await.map_err(map_transport_error)?;
        Ok(body.to_vec())
    }

    async fn delete(&self, key: &str) -> Result<(), FileStorageError> {
        let response = self
            .client
            .post(self.endpoint("destroy")?)
            .form(&self.signed_params(key))
            .send()
            .await
            .map_err(map_transport_error)?;
        if !response.status().is_success() {
            return Err(map_status(response.status(), key));
        }
        let outcome: DestroyResponse = response.json().await.map_err(map_transport_error)?;
        match outcome.result.as_str() {
            "ok" | "not found" => Ok(()),
            other => Err(FileStorageError::backend(format!(
                "cloudinary destroy returned `{other}`"
            ))),
        }
    }
}
