//! Vendor session management
//!
//! This module drives a single WebSocket connection to the podcast TTS vendor:
//! - `SessionMachine`: synchronous connect → session → rounds → finish protocol
//! - `Transport` / `Connector`: the message pipe, WebSocket in production
//! - `VendorSession`: async driver feeding frames to the machine and events to the task

mod config;
mod connection;
mod machine;
mod session;
mod state;
mod stats;

pub use config::SessionConfig;
pub use connection::{Connector, Transport, WsConnector};
pub use machine::{SessionEvent, SessionMachine, Step};
pub use session::VendorSession;
pub use state::SessionState;
pub use stats::AttemptStats;
