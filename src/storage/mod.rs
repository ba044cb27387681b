//! Object storage for finished audio and subtitle files
//!
//! Implementations:
//! - `LocalStorage`: writes under a root directory, returns `file://` URLs
//!   (also used for debug-mode tasks)
//! - `S3Storage`: signed uploads into an S3/MinIO bucket, returns presigned URLs

mod bucket;
mod local;

pub use self::bucket::S3Storage;
pub use self::local::LocalStorage;

use crate::config::{StorageConfig, StorageKind};
use crate::error::Result;
use std::sync::Arc;

/// Destination for uploaded audio and subtitles
#[async_trait::async_trait]
pub trait StorageSink: Send + Sync {
    /// Store `data` under `key` and return a URL it can be fetched from
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<String>;

    /// One-time setup before the first upload (e.g. creating the bucket)
    async fn prepare(&self) -> Result<()> {
        Ok(())
    }

    /// Sink name for logging
    fn name(&self) -> &str;
}

/// MIME type for a vendor audio format
pub fn content_type_for(format: &str) -> &'static str {
    match format {
        "mp3" => "audio/mpeg",
        "ogg_opus" => "audio/ogg",
        "pcm" => "audio/pcm",
        "aac" => "audio/aac",
        "wav" => "audio/wav",
        _ => "application/octet-stream",
    }
}

/// Storage sink factory
pub struct StorageFactory;

impl StorageFactory {
    pub fn create(config: &StorageConfig) -> Result<Arc<dyn StorageSink>> {
        match config.kind {
            StorageKind::Local => Ok(Arc::new(LocalStorage::new(&config.local_root))),
            StorageKind::S3 => Ok(Arc::new(S3Storage::new(config)?)),
        }
    }

    /// Sink used by tasks submitted with `debug_mode`
    pub fn debug(config: &StorageConfig) -> Arc<dyn StorageSink> {
        Arc::new(LocalStorage::new(&config.debug_root))
    }
}
