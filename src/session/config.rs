use serde_json::Value;
use std::time::Duration;

/// Parameters for one connection attempt
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Vendor session id, shared by every attempt of a task
    pub session_id: String,

    /// Fresh per attempt, sent as `X-Api-Connect-Id`
    pub connect_id: String,

    /// StartSession request body (synthesis params plus resume descriptor)
    pub request: Value,

    /// Longest wait for the next inbound frame
    pub recv_timeout: Duration,
}

impl SessionConfig {
    pub fn new(session_id: impl Into<String>, request: Value, recv_timeout: Duration) -> Self {
        Self {
            session_id: session_id.into(),
            connect_id: uuid::Uuid::new_v4().to_string(),
            request,
            recv_timeout,
        }
    }
}
