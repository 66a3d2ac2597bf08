use async_trait::async_trait;
use axum::body::Bytes;
use chrono::Utc;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use url::Url;
use uuid::Uuid;

use crate::config::SupabaseConfig;
use crate::errors::AppError;
use crate::validation;

/// Binary storage for uploaded bills, addressed by key.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Writes `bytes` under `key`. Existing keys are not overwritten.
    async fn upload(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<(), AppError>;

    /// Reads the object stored under `key`; `AppError::NotFound` when absent.
    async fn download(&self, key: &str) -> Result<Bytes, AppError>;
}

/// Builds a collision-resistant key: `{unix micros}-{random hex}.{ext}`.
pub fn storage_key(file_name: &str) -> String {
    format!(
        "{}-{}.{}",
        Utc::now().timestamp_micros(),
        Uuid::new_v4().simple(),
        validation::file_extension(file_name)
    )
}

/// Client for the hosted object storage REST API.
#[derive(Clone)]
pub struct SupabaseStorage {
    client: Client,
    base_url: String,
    service_key: String,
    bucket: String,
}

impl SupabaseStorage {
    pub fn new(config: &SupabaseConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| {
                AppError::ExternalApiError(format!("Failed to create storage client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: config.url.clone(),
            service_key: config.service_key.clone(),
            bucket: config.bucket.clone(),
        })
    }

    fn object_url(&self, key: &str) -> Result<Url, AppError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| AppError::InternalError(format!("Invalid storage URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| AppError::InternalError("Storage URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(["storage", "v1", "object", self.bucket.as_str()])
            .extend(key.split('/').filter(|segment| !segment.is_empty()));
        Ok(url)
    }
}

fn is_missing_object(status: StatusCode, body: &str) -> bool {
    // The storage API reports missing objects as 400 with a not_found payload.
    status == StatusCode::NOT_FOUND
        || body.contains("not_found")
        || body.contains("Object not found")
}

#[async_trait]
impl BlobStore for SupabaseStorage {
    async fn upload(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<(), AppError> {
        let url = self.object_url(key)?;
        tracing::info!(
            "Uploading {} bytes to storage: {}/{}",
            bytes.len(),
            self.bucket,
            key
        );

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .header("Content-Type", content_type)
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("Storage upload failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::error!("Storage upload returned {}: {}", status, error_text);
            return Err(AppError::ExternalApiError(format!(
                "Storage upload returned {}: {}",
                status, error_text
            )));
        }

        tracing::info!("✓ Stored {}/{}", self.bucket, key);
        Ok(())
    }

    async fn download(&self, key: &str) -> Result<Bytes, AppError> {
        let url = self.object_url(key)?;
        tracing::info!("Downloading from storage: {}/{}", self.bucket, key);

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("Storage download failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            if is_missing_object(status, &error_text) {
                return Err(AppError::NotFound(format!("Object not found: {}", key)));
            }
            return Err(AppError::ExternalApiError(format!(
                "Storage download returned {}: {}",
                status, error_text
            )));
        }

        response.bytes().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to read storage response: {}", e))
        })
    }
}
