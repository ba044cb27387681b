use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::types::{EventType, MsgType, Serialization};

/// Frame payload, resolved once at decode time
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Binary(Bytes),
}

impl Payload {
    pub fn empty_json() -> Self {
        Self::Json(Value::Object(Default::default()))
    }

    /// Decide how a (decompressed) payload is interpreted.
    ///
    /// Audio chunks of a round are opaque; everything else follows the
    /// serialization nibble, falling back to raw bytes when JSON does not parse.
    pub fn interpret(
        msg_type: MsgType,
        event: Option<EventType>,
        serialization: Serialization,
        data: Bytes,
    ) -> Self {
        if msg_type.carries_audio() && event == Some(EventType::RoundResponse) {
            return Self::Binary(data);
        }

        if serialization == Serialization::Json && !data.is_empty() {
            if let Ok(value) = serde_json::from_slice::<Value>(&data) {
                return Self::Json(value);
            }
        }

        Self::Binary(data)
    }

    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        match self {
            Self::Json(value) => serde_json::to_vec(value),
            Self::Binary(data) => Ok(data.to_vec()),
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Binary(_) => None,
        }
    }

    /// Deserialize a JSON payload into a typed vendor message
    pub fn parse<T: DeserializeOwned>(&self) -> Option<T> {
        self.as_json()
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// Human-readable rendering for error diagnostics
    pub fn describe(&self) -> String {
        match self {
            Self::Json(value) => value.to_string(),
            Self::Binary(data) => String::from_utf8_lossy(data).into_owned(),
        }
    }
}

// ============================================================================
// Vendor message bodies
// ============================================================================

/// Body of a `RoundStart` event
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoundStartPayload {
    #[serde(default)]
    pub text_type: Option<String>,
    #[serde(default)]
    pub speaker: Option<String>,
    #[serde(default)]
    pub round_id: Option<i32>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub round_type: Option<String>,
}

impl RoundStartPayload {
    /// Speaker label, falling back to the round type (e.g. music rounds)
    pub fn speaker_label(&self) -> String {
        self.speaker
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(self.round_type.as_deref())
            .unwrap_or_default()
            .to_string()
    }
}

/// Body of a `RoundEnd` event
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoundEndPayload {
    #[serde(default)]
    pub is_error: bool,
    #[serde(default)]
    pub error_msg: Option<String>,
    /// Seconds of audio produced by the round
    #[serde(default)]
    pub audio_duration: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetaInfo {
    #[serde(default)]
    pub audio_url: Option<String>,
}

/// Body of a `StreamEnd` (podcast end) event
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamEndPayload {
    #[serde(default)]
    pub meta_info: Option<MetaInfo>,
}

/// Token usage reported by the vendor
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageInfo {
    #[serde(rename = "inputTextTokens", alias = "input_text_tokens", default)]
    pub input_text_tokens: u64,
    #[serde(rename = "outputAudioTokens", alias = "output_audio_tokens", default)]
    pub output_audio_tokens: u64,
}

impl UsageInfo {
    pub fn accumulate(&mut self, other: &UsageInfo) {
        self.input_text_tokens += other.input_text_tokens;
        self.output_audio_tokens += other.output_audio_tokens;
    }
}

/// Body of a `UsageResponse` event
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsagePayload {
    #[serde(default)]
    pub usage: Option<UsageInfo>,
}
