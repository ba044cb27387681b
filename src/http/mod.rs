//! HTTP API server for task submission
//!
//! This module provides a REST API over the task orchestrator:
//! - POST /podcast/generate - Submit a podcast generation task
//! - GET /podcast/status/:task_id - Query task status
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use handlers::{ApiResponse, CreatePodcastResponse};
pub use routes::create_router;
pub use state::AppState;
