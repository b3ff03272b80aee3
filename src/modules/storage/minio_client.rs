//! MinIO/S3-compatible blob client
//!
//! Holds file bytes under their storage keys and hands out presigned URLs
//! for previews. All objects are private; access goes through presigning.
//!
//! Uses rust-s3 crate for lightweight S3 operations. The crate is built
//! without `fail-on-err`, so non-2xx responses come back as `Ok` and the
//! status code is checked here.

use s3::creds::Credentials;
use s3::{Bucket, BucketConfiguration, Region};
use tracing::{debug, info, warn};

use super::StoreError;
use crate::core::config::MinIOConfig;

const STATUS_NOT_FOUND: u16 = 404;

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

/// MinIO/S3-compatible storage client
pub struct MinIOClient {
    bucket: Box<Bucket>,
    region: Region,
    credentials: Credentials,
    presigned_url_expiry_secs: u32,
    endpoint: String,
}

impl MinIOClient {
    /// Create a new MinIO client from configuration and make sure the
    /// bucket exists.
    pub async fn new(config: MinIOConfig) -> Result<Self, StoreError> {
        let credentials = Credentials::new(
            Some(&config.access_key),
            Some(&config.secret_key),
            None,
            None,
            None,
        )
        .map_err(|e| {
            StoreError::ObjectStorage(format!("Failed to create MinIO credentials: {}", e))
        })?;

        let region = Region::Custom {
            region: config.region.clone(),
            endpoint: config.endpoint.clone(),
        };

        let mut bucket = Bucket::new(&config.bucket, region.clone(), credentials.clone())
            .map_err(|e| StoreError::ObjectStorage(format!("Failed to create MinIO bucket: {}", e)))?;

        // Use path-style URLs for MinIO (http://endpoint/bucket instead of http://bucket.endpoint)
        bucket.set_path_style();

        let client = Self {
            bucket,
            region,
            credentials,
            presigned_url_expiry_secs: config.presigned_url_expiry_secs,
            endpoint: config.endpoint,
        };

        client.ensure_bucket_exists().await?;

        info!(
            "MinIO client initialized for endpoint: {}, bucket: {}",
            client.endpoint,
            client.bucket.name()
        );

        Ok(client)
    }

    /// Ensure the bucket exists, create if not
    pub async fn ensure_bucket_exists(&self) -> Result<(), StoreError> {
        match self.create_bucket().await {
            Ok(_) => {
                info!("Bucket '{}' created successfully", self.bucket.name());
                Ok(())
            }
            Err(e) => {
                let error_str = e.to_string();
                if error_str.contains("BucketAlreadyOwnedByYou")
                    || error_str.contains("BucketAlreadyExists")
                    || error_str.contains("already own it")
                {
                    debug!("Bucket '{}' already exists", self.bucket.name());
                } else {
                    warn!(
                        "Could not create bucket '{}': {}. Assuming it exists.",
                        self.bucket.name(),
                        e
                    );
                }
                Ok(())
            }
        }
    }

    async fn create_bucket(&self) -> Result<(), StoreError> {
        let response = Bucket::create_with_path_style(
            &self.bucket.name(),
            self.region.clone(),
            self.credentials.clone(),
            BucketConfiguration::default(),
        )
        .await
        .map_err(|e| {
            StoreError::ObjectStorage(format!(
                "Failed to create bucket '{}': {}",
                self.bucket.name(),
                e
            ))
        })?;

        if !response.success() {
            return Err(StoreError::ObjectStorage(format!(
                "Failed to create bucket '{}': {} {}",
                self.bucket.name(),
                response.response_code,
                response.response_text
            )));
        }

        Ok(())
    }

    /// Upload a blob under the given key
    pub async fn upload(&self, key: &str, data: &[u8], content_type: &str) -> Result<(), StoreError> {
        let response = self
            .bucket
            .put_object_with_content_type(key, data, content_type)
            .await
            .map_err(|e| StoreError::ObjectStorage(format!("Failed to upload '{}': {}", key, e)))?;

        let status = response.status_code();
        if !is_success(status) {
            return Err(StoreError::ObjectStorage(format!(
                "Failed to upload '{}': status {}",
                key, status
            )));
        }

        debug!(
            "Uploaded '{}' ({} bytes) to bucket '{}'",
            key,
            data.len(),
            self.bucket.name()
        );
        Ok(())
    }

    /// Delete a blob
    ///
    /// Deleting a key that does not exist is not an error.
    pub async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let response = self
            .bucket
            .delete_object(key)
            .await
            .map_err(|e| StoreError::ObjectStorage(format!("Failed to delete '{}': {}", key, e)))?;

        let status = response.status_code();
        if !is_success(status) && status != STATUS_NOT_FOUND {
            return Err(StoreError::ObjectStorage(format!(
                "Failed to delete '{}': status {}",
                key, status
            )));
        }

        debug!("Deleted '{}' from bucket '{}'", key, self.bucket.name());
        Ok(())
    }

    /// Generate a presigned URL for reading a blob
    pub async fn get_presigned_url(&self, key: &str) -> Result<String, StoreError> {
        self.bucket
            .presign_get(key, self.presigned_url_expiry_secs, None)
            .await
            .map_err(|e| {
                StoreError::ObjectStorage(format!(
                    "Failed to generate presigned URL for '{}': {}",
                    key, e
                ))
            })
    }

    pub fn bucket_name(&self) -> String {
        self.bucket.name()
    }
}
