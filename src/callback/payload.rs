use serde::{Deserialize, Serialize};

use crate::protocol::UsageInfo;

/// Audio persisted for one completed round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundAudio {
    pub round_id: i32,
    pub speaker: String,
    pub audio_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodcastInfo {
    pub total_duration: f64,
    pub total_rounds: usize,
    pub speakers: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageInfo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallbackStatus {
    Success,
    Failed,
}

/// Body POSTed to the task's callback URL
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackPayload {
    pub task_id: String,
    pub status: CallbackStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round_audios: Option<Vec<RoundAudio>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub podcast_info: Option<PodcastInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

impl CallbackPayload {
    pub fn failed(task_id: &str, error_message: &str) -> Self {
        Self {
            task_id: task_id.to_string(),
            status: CallbackStatus::Failed,
            audio_url: None,
            subtitle_url: None,
            round_audios: None,
            podcast_info: None,
            usage: None,
            error_message: Some(error_message.to_string()),
            duration: None,
        }
    }
}
