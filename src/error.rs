//! Error types for podcast-tts.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PodcastError {
    // Wire format errors
    #[error("Frame too short: expected at least 3 bytes, got {len}")]
    FrameTooShort { len: usize },

    #[error("Unsupported message type: {0:#06b}")]
    UnsupportedMessageType(u8),

    #[error("Truncated {field}: need {needed} bytes, {remaining} remaining")]
    TruncatedField {
        field: &'static str,
        needed: usize,
        remaining: usize,
    },

    #[error("Invalid frame: {0}")]
    InvalidFrame(&'static str),

    #[error("Payload decompression failed: {0}")]
    Decompression(#[source] std::io::Error),

    // Session errors
    #[error("Protocol error (code {code:?}): {detail}")]
    Protocol { code: Option<u32>, detail: String },

    #[error("Connection closed abnormally: {reason}")]
    AbnormalClosure { reason: String },

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    // Orchestrator errors
    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Collaborator errors
    #[error("Upload of {key} failed: {message}")]
    Upload { key: String, message: String },

    #[error("Callback to {url} failed: {message}")]
    Callback { url: String, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PodcastError {
    pub fn protocol(code: Option<u32>, detail: impl Into<String>) -> Self {
        Self::Protocol {
            code,
            detail: detail.into(),
        }
    }

    pub fn abnormal_closure(reason: impl Into<String>) -> Self {
        Self::AbnormalClosure {
            reason: reason.into(),
        }
    }

    pub(crate) fn truncated(field: &'static str, needed: usize, remaining: usize) -> Self {
        Self::TruncatedField {
            field,
            needed,
            remaining,
        }
    }
}

pub type Result<T> = std::result::Result<T, PodcastError>;
