use std::time::Duration;

use s3::creds::Credentials;
use s3::{Bucket, BucketConfiguration, Region};
use tracing::{error, info};

use super::StorageSink;
use crate::config::StorageConfig;
use crate::error::{PodcastError, Result};

/// Signed uploads into an S3-compatible bucket (MinIO in the default deployment).
///
/// Objects are addressed path-style (`{endpoint}/{bucket}/{key}`); `put`
/// returns a presigned GET URL valid for `url_expiry_secs`.
pub struct S3Storage {
    bucket: Box<Bucket>,
    bucket_name: String,
    region: Region,
    credentials: Credentials,
    url_expiry_secs: u32,
    timeout: Duration,
}

impl S3Storage {
    pub fn new(config: &StorageConfig) -> Result<Self> {
        let endpoint = endpoint_url(&config.endpoint, config.use_ssl)?;
        let region = Region::Custom {
            region: config.region.clone(),
            endpoint,
        };
        let credentials = Credentials::new(
            Some(config.access_key.as_str()),
            Some(config.secret_key.as_str()),
            None,
            None,
            None,
        )
        .map_err(|e| PodcastError::InvalidConfig(format!("storage credentials: {}", e)))?;

        let bucket = Bucket::new(&config.bucket, region.clone(), credentials.clone())
            .map_err(|e| PodcastError::InvalidConfig(format!("storage bucket: {}", e)))?
            .with_path_style();

        Ok(Self {
            bucket,
            bucket_name: config.bucket.clone(),
            region,
            credentials,
            url_expiry_secs: config.url_expiry_secs,
            timeout: config.timeout(),
        })
    }

    /// Create the bucket if the store does not have it yet
    pub async fn ensure_bucket(&self) -> Result<()> {
        let exists = self
            .bucket
            .exists()
            .await
            .map_err(|e| upload_error(&self.bucket_name, e.to_string()))?;
        if exists {
            return Ok(());
        }

        Bucket::create_with_path_style(
            &self.bucket_name,
            self.region.clone(),
            self.credentials.clone(),
            BucketConfiguration::default(),
        )
        .await
        .map_err(|e| upload_error(&self.bucket_name, e.to_string()))?;

        info!("Bucket '{}' created", self.bucket_name);
        Ok(())
    }
}

#[async_trait::async_trait]
impl StorageSink for S3Storage {
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<String> {
        let upload = self
            .bucket
            .put_object_with_content_type(key, &data, content_type);

        let response = tokio::time::timeout(self.timeout, upload)
            .await
            .map_err(|_| upload_error(key, format!("timed out after {:?}", self.timeout)))?
            .map_err(|e| upload_error(key, e.to_string()))?;

        let status = response.status_code();
        if !(200..300).contains(&status) {
            error!("Failed to upload file {}: HTTP {}", key, status);
            return Err(upload_error(key, format!("HTTP {}", status)));
        }
        info!("File uploaded: {} ({} bytes)", key, data.len());

        self.bucket
            .presign_get(key, self.url_expiry_secs, None)
            .await
            .map_err(|e| upload_error(key, e.to_string()))
    }

    async fn prepare(&self) -> Result<()> {
        self.ensure_bucket().await
    }

    fn name(&self) -> &str {
        "s3"
    }
}

fn upload_error(key: &str, message: impl Into<String>) -> PodcastError {
    PodcastError::Upload {
        key: key.to_string(),
        message: message.into(),
    }
}

/// Normalize the configured endpoint to `scheme://host[:port]`.
/// A bare `host[:port]` gets its scheme from `use_ssl`.
fn endpoint_url(endpoint: &str, use_ssl: bool) -> Result<String> {
    let raw = if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        let scheme = if use_ssl { "https" } else { "http" };
        format!("{}://{}", scheme, endpoint)
    };

    let url = url::Url::parse(&raw)
        .map_err(|e| PodcastError::InvalidConfig(format!("storage endpoint {}: {}", endpoint, e)))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(PodcastError::InvalidConfig(format!(
            "storage endpoint must be an http(s) host: {}",
            endpoint
        )));
    }

    Ok(url.origin().ascii_serialization())
}
