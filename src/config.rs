use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub vendor: VendorConfig,
    pub orchestrator: OrchestratorConfig,
    pub storage: StorageConfig,
    pub callback: CallbackConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "podcast-tts".to_string(),
            http: HttpConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

/// Vendor WebSocket endpoint and credentials
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VendorConfig {
    pub ws_url: String,
    pub app_id: String,
    pub access_key: String,
    pub resource_id: String,
    pub app_key: String,
    /// Longest wait for the next frame before the connection is considered dead
    pub recv_timeout_secs: u64,
}

impl Default for VendorConfig {
    fn default() -> Self {
        Self {
            ws_url: "wss://openspeech.bytedance.com/api/v3/sami/podcasttts".to_string(),
            app_id: String::new(),
            access_key: String::new(),
            resource_id: "volc.service_type.10050".to_string(),
            app_key: "aGjiRDfUWi".to_string(),
            recv_timeout_secs: 120,
        }
    }
}

impl VendorConfig {
    pub fn recv_timeout(&self) -> Duration {
        Duration::from_secs(self.recv_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    /// How long a finished task stays queryable
    pub retention_secs: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            retry_backoff_ms: 1000,
            retention_secs: 60,
        }
    }
}

impl OrchestratorConfig {
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Local,
    /// S3-compatible object store (MinIO)
    #[serde(alias = "minio")]
    S3,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub kind: StorageKind,
    /// Root directory for the local sink
    pub local_root: String,
    /// Object store endpoint, `http://minio:9000` or a bare `host:port`
    pub endpoint: String,
    /// Scheme for a bare endpoint; ignored when the endpoint has one
    pub use_ssl: bool,
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    /// Lifetime of the presigned download URLs handed to callers
    pub url_expiry_secs: u32,
    /// Upper bound for a single upload
    pub timeout_secs: u64,
    /// Where debug-mode tasks write their output
    pub debug_root: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            kind: StorageKind::Local,
            local_root: "output".to_string(),
            endpoint: "http://localhost:9000".to_string(),
            use_ssl: false,
            region: "us-east-1".to_string(),
            access_key: "minioadmin".to_string(),
            secret_key: "minioadmin".to_string(),
            bucket: "podcast-audio".to_string(),
            url_expiry_secs: 7 * 24 * 60 * 60,
            timeout_secs: 60,
            debug_root: "debug_output".to_string(),
        }
    }
}

impl StorageConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CallbackConfig {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub timeout_secs: u64,
}

impl Default for CallbackConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 1000,
            timeout_secs: 30,
        }
    }
}

impl Config {
    /// Load from an optional config file plus `PODCAST_*` environment overrides
    /// (nested keys use `__`, e.g. `PODCAST_VENDOR__APP_ID`).
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("PODCAST")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .with_context(|| format!("Failed to read config from {}", path))?;

        Ok(settings.try_deserialize()?)
    }
}
