pub mod callback;
pub mod config;
pub mod error;
pub mod http;
pub mod protocol;
pub mod session;
pub mod storage;
pub mod subtitle;
pub mod task;

pub use callback::{CallbackNotifier, CallbackPayload, HttpCallbackNotifier, RetryPolicy};
pub use config::Config;
pub use error::{PodcastError, Result};
pub use http::{create_router, AppState};
pub use protocol::{EventType, Frame, MsgType, Payload};
pub use session::{Connector, SessionMachine, SessionState, Transport, WsConnector};
pub use storage::{LocalStorage, S3Storage, StorageFactory, StorageSink};
pub use subtitle::{SubtitleEntry, SubtitleTimeline};
pub use task::{CreatePodcastRequest, Orchestrator, TaskSnapshot, TaskStatus};
