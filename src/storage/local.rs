use std::path::{Path, PathBuf};

use tracing::info;

use super::StorageSink;
use crate::error::{PodcastError, Result};

/// Filesystem-backed sink
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Object keys are relative paths; reject anything that escapes the root
    fn resolve(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let escapes = relative.components().any(|c| {
            matches!(
                c,
                std::path::Component::ParentDir
                    | std::path::Component::RootDir
                    | std::path::Component::Prefix(_)
            )
        });
        if escapes || key.is_empty() {
            return Err(PodcastError::Upload {
                key: key.to_string(),
                message: "object key must be a relative path".to_string(),
            });
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait::async_trait]
impl StorageSink for LocalStorage {
    async fn put(&self, key: &str, data: Vec<u8>, _content_type: &str) -> Result<String> {
        let path = self.resolve(key)?;
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }

        let size = data.len();
        tokio::fs::write(&path, data).await?;

        let absolute = match tokio::fs::canonicalize(&path).await {
            Ok(p) => p,
            Err(_) => path,
        };
        info!("File saved locally: {} ({} bytes)", absolute.display(), size);

        Ok(format!("file://{}", absolute.display()))
    }

    fn name(&self) -> &str {
        "local"
    }
}
