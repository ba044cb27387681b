use serde::Serialize;

use super::state::SessionState;

/// Counters for one connection attempt
#[derive(Debug, Clone, Serialize)]
pub struct AttemptStats {
    pub connect_id: String,

    /// Frames decoded from the vendor
    pub frames_received: usize,

    /// Rounds closed by `RoundEnd`, including failed ones
    pub rounds_completed: usize,

    /// Audio bytes received on this connection
    pub audio_bytes: usize,

    pub final_state: SessionState,
}

impl AttemptStats {
    pub fn new(connect_id: &str) -> Self {
        Self {
            connect_id: connect_id.to_string(),
            frames_received: 0,
            rounds_completed: 0,
            audio_bytes: 0,
            final_state: SessionState::Idle,
        }
    }
}
