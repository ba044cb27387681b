use std::fmt;

use serde::Serialize;

/// Lifecycle of one vendor connection attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    Idle,
    ConnectionPending,
    ConnectionEstablished,
    SessionPending,
    SessionEstablished,
    Streaming,
    SessionFinishing,
    ConnectionFinishing,
    Closed,
    Errored,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
