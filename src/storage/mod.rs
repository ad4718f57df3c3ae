//! Object storage
//!
//! User profiles store raw object keys (CV, photo). Before a profile leaves
//! the API those keys are rewritten into time-limited presigned GET URLs.

use crate::config::StorageConfig;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use aws_sdk_s3::presigning::PresigningConfig;
use std::time::Duration;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Produce a time-limited GET URL for a stored object key
    async fn presigned_get_url(&self, key: &str) -> Result<String>;
}

/// S3-backed object store
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
    bucket: String,
    presign_ttl: Duration,
}

impl S3ObjectStore {
    pub async fn from_env(config: &StorageConfig) -> Self {
        let sdk_config = aws_config::load_from_env().await;
        Self {
            client: aws_sdk_s3::Client::new(&sdk_config),
            bucket: config.bucket.clone(),
            presign_ttl: Duration::from_secs(config.presign_ttl_secs),
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn presigned_get_url(&self, key: &str) -> Result<String> {
        let presigning = PresigningConfig::expires_in(self.presign_ttl)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid presign TTL: {}", e)))?;

        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to presign URL: {}", e)))?;

        Ok(request.uri().to_string())
    }
}
