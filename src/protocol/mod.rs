//! Binary framing for the vendor podcast TTS WebSocket
//!
//! Every message is a 4-byte header (version, header size, message type,
//! flags, serialization, compression) followed by optional event code,
//! session id, connect id, sequence number and error code fields, and a
//! length-prefixed payload. All integers are big-endian.

mod frame;
mod payload;
mod types;

pub use frame::{Frame, Header, HEADER_WORDS, PROTOCOL_VERSION};
pub use payload::{
    MetaInfo, Payload, RoundEndPayload, RoundStartPayload, StreamEndPayload, UsageInfo,
    UsagePayload,
};
pub use types::{Compression, EventType, MsgFlags, MsgType, Serialization};
