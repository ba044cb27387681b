use super::state::AppState;
use crate::error::PodcastError;
use crate::task::{CreatePodcastRequest, TaskSnapshot};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use tracing::{error, info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

/// Envelope used by every JSON response
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    fn success(data: T) -> Self {
        Self {
            code: 0,
            message: "success".to_string(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    fn error(message: impl Into<String>) -> Self {
        Self {
            code: -1,
            message: message.into(),
            data: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreatePodcastResponse {
    pub task_id: String,
    pub message: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ApiResponse::error(message))).into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /podcast/generate
/// Submit a podcast generation task
pub async fn generate_podcast(
    State(state): State<AppState>,
    body: Result<Json<CreatePodcastRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match body {
        Ok(body) => body,
        Err(rejection) => {
            warn!("Rejected podcast request: {}", rejection.body_text());
            return error_response(StatusCode::BAD_REQUEST, rejection.body_text());
        }
    };

    match state.orchestrator.create(req).await {
        Ok(task_id) => {
            info!("Podcast task accepted: {}", task_id);
            (
                StatusCode::OK,
                Json(ApiResponse::success(CreatePodcastResponse {
                    task_id,
                    message: "Podcast generation task created".to_string(),
                })),
            )
                .into_response()
        }
        Err(PodcastError::InvalidRequest(message)) => {
            warn!("Invalid podcast request: {}", message);
            error_response(StatusCode::BAD_REQUEST, message)
        }
        Err(e) => {
            error!("Failed to create podcast task: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// GET /podcast/status/:task_id
/// Get status of a podcast task
pub async fn get_task_status(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Response {
    match state.orchestrator.status(&task_id).await {
        Ok(snapshot) => (
            StatusCode::OK,
            Json(ApiResponse::<TaskSnapshot>::success(snapshot)),
        )
            .into_response(),
        Err(PodcastError::TaskNotFound(_)) => {
            error_response(StatusCode::NOT_FOUND, "Task not found")
        }
        Err(e) => {
            error!("Failed to read task {}: {}", task_id, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
