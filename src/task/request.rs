use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{PodcastError, Result};

/// Podcast generation modes accepted by the vendor
pub const ACTION_SUMMARIZE: i32 = 0;
pub const ACTION_DIALOGUE: i32 = 3;
pub const ACTION_PROMPT: i32 = 4;

const AUDIO_FORMATS: [&str; 4] = ["mp3", "ogg_opus", "pcm", "aac"];
const DEFAULT_AUDIO_FORMAT: &str = "mp3";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NlpText {
    pub speaker: String,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub only_nlp_text: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_audio_url: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_text_max_length: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speech_rate: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeakerInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub random_order: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speakers: Option<Vec<String>>,
}

/// Fields forwarded verbatim to the vendor in `StartSession`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SynthesisParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_id: Option<String>,
    pub action: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nlp_texts: Option<Vec<NlpText>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_info: Option<InputInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_config: Option<AudioConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker_info: Option<SpeakerInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_head_music: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_tail_music: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aigc_watermark: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aigc_metadata: Option<Value>,
}

impl SynthesisParams {
    pub fn audio_format(&self) -> &str {
        self.audio_config
            .as_ref()
            .and_then(|c| c.format.as_deref())
            .unwrap_or(DEFAULT_AUDIO_FORMAT)
    }
}

/// Body of `POST /podcast/generate`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatePodcastRequest {
    #[serde(flatten)]
    pub params: SynthesisParams,
    pub callback_url: String,
    /// Write output to the local debug directory instead of the configured sink
    #[serde(default)]
    pub debug_mode: bool,
}

impl CreatePodcastRequest {
    pub fn validate(&self) -> Result<()> {
        if !matches!(
            self.params.action,
            ACTION_SUMMARIZE | ACTION_DIALOGUE | ACTION_PROMPT
        ) {
            return Err(PodcastError::InvalidRequest(format!(
                "action must be one of 0, 3, 4 (got {})",
                self.params.action
            )));
        }

        let url = url::Url::parse(&self.callback_url).map_err(|e| {
            PodcastError::InvalidRequest(format!("callback_url must be a valid URL: {}", e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(PodcastError::InvalidRequest(format!(
                "callback_url must be http or https (got {})",
                url.scheme()
            )));
        }

        let format = self.params.audio_format();
        if !AUDIO_FORMATS.contains(&format) {
            return Err(PodcastError::InvalidRequest(format!(
                "audio_config.format must be one of {} (got {})",
                AUDIO_FORMATS.join(", "),
                format
            )));
        }

        if let Some(texts) = &self.params.nlp_texts {
            if texts.iter().any(|t| t.speaker.is_empty()) {
                return Err(PodcastError::InvalidRequest(
                    "nlp_texts entries need a speaker".to_string(),
                ));
            }
        }

        Ok(())
    }
}

/// Resume descriptor sent on retries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryInfo {
    pub retry_task_id: String,
    pub last_finished_round_id: i32,
}

/// Request body of the `StartSession` frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartSessionPayload {
    #[serde(flatten)]
    pub params: SynthesisParams,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_info: Option<RetryInfo>,
}

impl StartSessionPayload {
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}
