use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use super::request::{CreatePodcastRequest, RetryInfo, StartSessionPayload, SynthesisParams};
use crate::callback::{CallbackPayload, CallbackStatus, PodcastInfo, RoundAudio};
use crate::protocol::{RoundEndPayload, RoundStartPayload, UsageInfo};
use crate::storage::content_type_for;
use crate::subtitle::SubtitleTimeline;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl TaskStatus {
    fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Processing => 1,
            Self::Completed | Self::Failed => 2,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Move forward to `next`; returns false (and stays put) for any
    /// backward or terminal-to-terminal transition.
    pub fn advance(&mut self, next: TaskStatus) -> bool {
        if next.rank() <= self.rank() {
            return false;
        }
        *self = next;
        true
    }
}

/// Round audio ready to be persisted, taken out of the task so the upload
/// can run without holding the task lock
#[derive(Debug, Clone)]
pub struct RoundUpload {
    pub round_id: i32,
    pub speaker: String,
    pub key: String,
    pub content_type: &'static str,
    pub data: Vec<u8>,
}

/// Lengths at the last completed round, restored when a round is interrupted
#[derive(Debug, Clone, Copy, Default)]
struct Checkpoint {
    audio_chunks: usize,
    subtitles: usize,
}

/// One podcast generation job and everything accumulated for it
#[derive(Debug)]
pub struct Task {
    pub id: String,
    pub input_id: String,
    pub session_id: String,
    pub callback_url: String,
    pub debug_mode: bool,
    params: SynthesisParams,
    status: TaskStatus,
    audio_chunks: Vec<Bytes>,
    round_buffer: Vec<Bytes>,
    round_audios: Vec<RoundAudio>,
    total_duration: f64,
    current_round: i32,
    current_speaker: String,
    retry_count: u32,
    max_retries: u32,
    last_finished_round_id: i32,
    at_round_boundary: bool,
    missing_duration: bool,
    subtitles: SubtitleTimeline,
    usage: Option<UsageInfo>,
    checkpoint: Checkpoint,
    error: Option<String>,
    created_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn new(id: String, request: CreatePodcastRequest, max_retries: u32) -> Self {
        let input_id = request
            .params
            .input_id
            .clone()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "unknown".to_string());

        Self {
            id,
            input_id,
            session_id: uuid::Uuid::new_v4().to_string(),
            callback_url: request.callback_url,
            debug_mode: request.debug_mode,
            params: request.params,
            status: TaskStatus::Pending,
            audio_chunks: Vec::new(),
            round_buffer: Vec::new(),
            round_audios: Vec::new(),
            total_duration: 0.0,
            current_round: 0,
            current_speaker: String::new(),
            retry_count: 0,
            max_retries,
            last_finished_round_id: -1,
            at_round_boundary: true,
            missing_duration: false,
            subtitles: SubtitleTimeline::new(),
            usage: None,
            checkpoint: Checkpoint::default(),
            error: None,
            created_at: Utc::now(),
            finished_at: None,
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn mark_processing(&mut self) {
        self.status.advance(TaskStatus::Processing);
    }

    /// Returns false if the task was already terminal
    pub fn complete(&mut self) -> bool {
        if !self.status.advance(TaskStatus::Completed) {
            return false;
        }
        self.finished_at = Some(Utc::now());
        true
    }

    /// Returns false if the task was already terminal
    pub fn fail(&mut self, message: &str) -> bool {
        if !self.status.advance(TaskStatus::Failed) {
            return false;
        }
        self.error = Some(message.to_string());
        self.finished_at = Some(Utc::now());
        true
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn has_attempts_left(&self) -> bool {
        self.retry_count < self.max_retries
    }

    pub fn record_retry(&mut self) {
        self.retry_count += 1;
    }

    // ========================================================================
    // Round events
    // ========================================================================

    pub fn begin_round(&mut self, round: &RoundStartPayload) {
        self.round_buffer.clear();
        if let Some(id) = round.round_id {
            self.current_round = id;
        }
        self.current_speaker = round.speaker_label();
        self.at_round_boundary = false;

        let text = round.text.as_deref().unwrap_or_default();
        if !text.is_empty() {
            self.subtitles
                .add_entry(&self.current_speaker, text, self.current_round);
        }

        let preview: String = text.chars().take(50).collect();
        debug!(
            "Round {} started, speaker: {}, text: {}",
            self.current_round, self.current_speaker, preview
        );
    }

    pub fn push_audio(&mut self, chunk: Bytes) {
        self.audio_chunks.push(chunk.clone());
        self.round_buffer.push(chunk);
    }

    /// Close the current round. Returns the round audio to persist, if any.
    pub fn end_round(&mut self, end: &RoundEndPayload) -> Option<RoundUpload> {
        let round_id = self.current_round;
        let buffer = std::mem::take(&mut self.round_buffer);
        let mut upload = None;

        if end.is_error {
            warn!(
                "Round {} failed, speaker: {}: {}",
                round_id,
                self.current_speaker,
                end.error_msg.as_deref().unwrap_or("unknown error")
            );
            // Not persisted as a round; chunks already in the merged stream stay
            debug!("Round {} discarded {} buffered chunks", round_id, buffer.len());
        } else {
            match end.audio_duration {
                Some(duration) => {
                    self.total_duration += duration;
                    self.subtitles.update_end_time(round_id, duration);
                    debug!("Round {} ended, duration: {}s", round_id, duration);
                }
                None => self.missing_duration = true,
            }

            if round_id >= 0 && !buffer.is_empty() {
                let format = self.params.audio_format();
                upload = Some(RoundUpload {
                    round_id,
                    speaker: self.current_speaker.clone(),
                    key: self.object_key(&format!("round_{}.{}", round_id, format)),
                    content_type: content_type_for(format),
                    data: buffer.concat(),
                });
            }
        }

        self.at_round_boundary = true;
        self.last_finished_round_id = round_id;
        self.checkpoint = Checkpoint {
            audio_chunks: self.audio_chunks.len(),
            subtitles: self.subtitles.len(),
        };

        upload
    }

    pub fn record_round_audio(&mut self, round: RoundAudio) {
        self.round_audios.push(round);
    }

    pub fn add_usage(&mut self, usage: &UsageInfo) {
        self.usage.get_or_insert_with(UsageInfo::default).accumulate(usage);
    }

    /// Undo everything appended since the last completed round.
    /// Returns true if the connection was lost mid-round.
    pub fn rollback_partial_round(&mut self) -> bool {
        let interrupted = !self.at_round_boundary;
        self.audio_chunks.truncate(self.checkpoint.audio_chunks);
        self.subtitles.truncate(self.checkpoint.subtitles);
        self.round_buffer.clear();
        self.at_round_boundary = true;
        interrupted
    }

    // ========================================================================
    // Resume and finalize
    // ========================================================================

    pub fn last_finished_round_id(&self) -> i32 {
        self.last_finished_round_id
    }

    pub fn resume_descriptor(&self) -> Option<RetryInfo> {
        (self.last_finished_round_id >= 0).then(|| RetryInfo {
            retry_task_id: self.session_id.clone(),
            last_finished_round_id: self.last_finished_round_id,
        })
    }

    pub fn start_session_payload(&self) -> StartSessionPayload {
        StartSessionPayload {
            params: self.params.clone(),
            retry_info: self.resume_descriptor(),
        }
    }

    pub fn audio_format(&self) -> &str {
        self.params.audio_format()
    }

    pub fn object_key(&self, name: &str) -> String {
        format!("podcast/{}/{}/{}", self.input_id, self.id, name)
    }

    pub fn merged_audio(&self) -> Vec<u8> {
        self.audio_chunks.concat()
    }

    pub fn total_duration(&self) -> f64 {
        self.total_duration
    }

    pub fn subtitles(&self) -> &SubtitleTimeline {
        &self.subtitles
    }

    /// Render the caption track, spreading time evenly first when some
    /// successful round never reported its duration.
    pub fn render_subtitles(&mut self) -> Option<String> {
        if self.subtitles.is_empty() {
            return None;
        }
        if self.missing_duration {
            self.subtitles.distribute_evenly(self.total_duration);
        }
        Some(self.subtitles.to_srt())
    }

    pub fn usage(&self) -> Option<UsageInfo> {
        self.usage
    }

    pub fn round_audios(&self) -> &[RoundAudio] {
        &self.round_audios
    }

    pub fn success_payload(&self, audio_url: &str, subtitle_url: Option<String>) -> CallbackPayload {
        CallbackPayload {
            task_id: self.id.clone(),
            status: CallbackStatus::Success,
            audio_url: Some(audio_url.to_string()),
            subtitle_url,
            round_audios: Some(self.round_audios.clone()),
            podcast_info: Some(PodcastInfo {
                total_duration: self.subtitles.total_duration(),
                total_rounds: self.subtitles.len(),
                speakers: self.subtitles.speakers().to_vec(),
                usage: self.usage,
            }),
            usage: self.usage,
            error_message: None,
            duration: Some(self.total_duration),
        }
    }

    pub fn snapshot(&self) -> TaskSnapshot {
        TaskSnapshot {
            task_id: self.id.clone(),
            input_id: self.input_id.clone(),
            status: self.status,
            session_id: self.session_id.clone(),
            retry_count: self.retry_count,
            max_retries: self.max_retries,
            current_round: self.current_round,
            last_finished_round_id: self.last_finished_round_id,
            total_duration: self.total_duration,
            audio_bytes: self.audio_chunks.iter().map(Bytes::len).sum(),
            subtitle_count: self.subtitles.len(),
            round_audios: self.round_audios.clone(),
            usage: self.usage,
            debug_mode: self.debug_mode,
            error: self.error.clone(),
            created_at: self.created_at,
            finished_at: self.finished_at,
        }
    }
}

/// Read-only view returned by the status endpoint
#[derive(Debug, Clone, Serialize)]
pub struct TaskSnapshot {
    pub task_id: String,
    pub input_id: String,
    pub status: TaskStatus,
    pub session_id: String,
    pub retry_count: u32,
    pub max_retries: u32,
    pub current_round: i32,
    pub last_finished_round_id: i32,
    pub total_duration: f64,
    pub audio_bytes: usize,
    pub subtitle_count: usize,
    pub round_audios: Vec<RoundAudio>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageInfo>,
    pub debug_mode: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}
