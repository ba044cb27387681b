use std::fmt;

/// Message type nibble (byte 1, high 4 bits)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MsgType {
    FullClientRequest,
    AudioOnlyClient,
    FullServerResponse,
    AudioOnlyServer,
    FrontEndResultServer,
    Error,
}

impl MsgType {
    pub fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0b0001 => Some(Self::FullClientRequest),
            0b0010 => Some(Self::AudioOnlyClient),
            0b1001 => Some(Self::FullServerResponse),
            0b1011 => Some(Self::AudioOnlyServer),
            0b1100 => Some(Self::FrontEndResultServer),
            0b1111 => Some(Self::Error),
            _ => None,
        }
    }

    pub fn bits(self) -> u8 {
        match self {
            Self::FullClientRequest => 0b0001,
            Self::AudioOnlyClient => 0b0010,
            Self::FullServerResponse => 0b1001,
            Self::AudioOnlyServer => 0b1011,
            Self::FrontEndResultServer => 0b1100,
            Self::Error => 0b1111,
        }
    }

    /// Types that may carry a sequence number
    pub fn carries_data(self) -> bool {
        !matches!(self, Self::Error)
    }

    /// Types whose payload may be opaque audio
    pub fn carries_audio(self) -> bool {
        matches!(self, Self::AudioOnlyClient | Self::AudioOnlyServer)
    }
}

/// Message flags nibble (byte 1, low 4 bits)
///
/// The low two bits select the sequence mode, bit 2 marks an event code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MsgFlags(u8);

impl MsgFlags {
    pub const NO_SEQ: Self = Self(0b0000);
    pub const POSITIVE_SEQ: Self = Self(0b0001);
    pub const LAST_NO_SEQ: Self = Self(0b0010);
    pub const NEGATIVE_SEQ: Self = Self(0b0011);
    pub const WITH_EVENT: Self = Self(0b0100);

    pub fn from_bits(bits: u8) -> Self {
        Self(bits & 0x0f)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn has_event(self) -> bool {
        self.0 & Self::WITH_EVENT.0 != 0
    }

    /// Positive (01) or negative (11) sequence
    pub fn has_sequence(self) -> bool {
        self.0 & 0b0001 != 0
    }
}

impl std::ops::BitOr for MsgFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Serialization {
    Raw,
    #[default]
    Json,
    Thrift,
    Custom,
}

impl Serialization {
    /// Unassigned values are treated as vendor-custom
    pub fn from_bits(bits: u8) -> Self {
        match bits {
            0b0000 => Self::Raw,
            0b0001 => Self::Json,
            0b0011 => Self::Thrift,
            _ => Self::Custom,
        }
    }

    pub fn bits(self) -> u8 {
        match self {
            Self::Raw => 0b0000,
            Self::Json => 0b0001,
            Self::Thrift => 0b0011,
            Self::Custom => 0b1111,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Compression {
    #[default]
    None,
    Gzip,
    Custom,
}

impl Compression {
    pub fn from_bits(bits: u8) -> Self {
        match bits {
            0b0000 => Self::None,
            0b0001 => Self::Gzip,
            _ => Self::Custom,
        }
    }

    pub fn bits(self) -> u8 {
        match self {
            Self::None => 0b0000,
            Self::Gzip => 0b0001,
            Self::Custom => 0b1111,
        }
    }
}

/// Event codes carried after the header when `WITH_EVENT` is set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    // Upstream connection events
    StartConnection,
    FinishConnection,
    // Downstream connection events
    ConnectionStarted,
    ConnectionFailed,
    ConnectionFinished,
    // Upstream session events
    StartSession,
    CancelSession,
    FinishSession,
    // Downstream session events
    SessionStarted,
    SessionCanceled,
    SessionFinished,
    SessionFailed,
    UsageResponse,
    // Podcast round events
    RoundStart,
    RoundResponse,
    RoundEnd,
    StreamEnd,
    Unknown(i32),
}

impl EventType {
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => Self::StartConnection,
            2 => Self::FinishConnection,
            50 => Self::ConnectionStarted,
            51 => Self::ConnectionFailed,
            52 => Self::ConnectionFinished,
            100 => Self::StartSession,
            101 => Self::CancelSession,
            102 => Self::FinishSession,
            150 => Self::SessionStarted,
            151 => Self::SessionCanceled,
            152 => Self::SessionFinished,
            153 => Self::SessionFailed,
            154 => Self::UsageResponse,
            360 => Self::RoundStart,
            361 => Self::RoundResponse,
            362 => Self::RoundEnd,
            363 => Self::StreamEnd,
            other => Self::Unknown(other),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::StartConnection => 1,
            Self::FinishConnection => 2,
            Self::ConnectionStarted => 50,
            Self::ConnectionFailed => 51,
            Self::ConnectionFinished => 52,
            Self::StartSession => 100,
            Self::CancelSession => 101,
            Self::FinishSession => 102,
            Self::SessionStarted => 150,
            Self::SessionCanceled => 151,
            Self::SessionFinished => 152,
            Self::SessionFailed => 153,
            Self::UsageResponse => 154,
            Self::RoundStart => 360,
            Self::RoundResponse => 361,
            Self::RoundEnd => 362,
            Self::StreamEnd => 363,
            Self::Unknown(code) => code,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::StartConnection => "StartConnection",
            Self::FinishConnection => "FinishConnection",
            Self::ConnectionStarted => "ConnectionStarted",
            Self::ConnectionFailed => "ConnectionFailed",
            Self::ConnectionFinished => "ConnectionFinished",
            Self::StartSession => "StartSession",
            Self::CancelSession => "CancelSession",
            Self::FinishSession => "FinishSession",
            Self::SessionStarted => "SessionStarted",
            Self::SessionCanceled => "SessionCanceled",
            Self::SessionFinished => "SessionFinished",
            Self::SessionFailed => "SessionFailed",
            Self::UsageResponse => "UsageResponse",
            Self::RoundStart => "RoundStart",
            Self::RoundResponse => "RoundResponse",
            Self::RoundEnd => "RoundEnd",
            Self::StreamEnd => "StreamEnd",
            Self::Unknown(_) => "Unknown",
        }
    }

    /// Connection-lifecycle events never carry a session id
    pub fn is_connection_event(self) -> bool {
        matches!(
            self,
            Self::StartConnection
                | Self::FinishConnection
                | Self::ConnectionStarted
                | Self::ConnectionFailed
                | Self::ConnectionFinished
        )
    }

    /// Server-to-client connection events carry the connect id
    pub fn carries_connect_id(self) -> bool {
        matches!(
            self,
            Self::ConnectionStarted | Self::ConnectionFailed | Self::ConnectionFinished
        )
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(code) => write!(f, "Unknown({})", code),
            other => write!(f, "{}", other.name()),
        }
    }
}
