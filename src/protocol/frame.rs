use std::io::{Read, Write};

use bytes::{Buf, BufMut, Bytes, BytesMut};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde_json::Value;

use super::payload::Payload;
use super::types::{Compression, EventType, MsgFlags, MsgType, Serialization};
use crate::error::{PodcastError, Result};

pub const PROTOCOL_VERSION: u8 = 1;
pub const HEADER_WORDS: u8 = 1;

/// Fixed 4-byte frame header, one nibble per field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub version: u8,
    /// Header length in 4-byte words
    pub header_words: u8,
    pub msg_type: MsgType,
    pub flags: MsgFlags,
    pub serialization: Serialization,
    pub compression: Compression,
}

impl Header {
    pub fn new(msg_type: MsgType, flags: MsgFlags) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            header_words: HEADER_WORDS,
            msg_type,
            flags,
            serialization: Serialization::Json,
            compression: Compression::None,
        }
    }

    pub fn pack(&self) -> [u8; 4] {
        [
            (self.version & 0x0f) << 4 | (self.header_words & 0x0f),
            self.msg_type.bits() << 4 | self.flags.bits(),
            self.serialization.bits() << 4 | self.compression.bits(),
            0,
        ]
    }

    /// Reads the first three header bytes; byte 3 is reserved.
    pub fn unpack(data: &[u8]) -> Result<Self> {
        if data.len() < 3 {
            return Err(PodcastError::FrameTooShort { len: data.len() });
        }

        let type_bits = data[1] >> 4;
        let msg_type =
            MsgType::from_bits(type_bits).ok_or(PodcastError::UnsupportedMessageType(type_bits))?;

        Ok(Self {
            version: data[0] >> 4,
            header_words: data[0] & 0x0f,
            msg_type,
            flags: MsgFlags::from_bits(data[1]),
            serialization: Serialization::from_bits(data[2] >> 4),
            compression: Compression::from_bits(data[2] & 0x0f),
        })
    }

    pub fn len(&self) -> usize {
        4 * self.header_words as usize
    }

    pub fn is_empty(&self) -> bool {
        self.header_words == 0
    }
}

/// One protocol message
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub header: Header,
    pub event: Option<EventType>,
    pub session_id: Option<String>,
    pub connect_id: Option<String>,
    pub sequence: Option<i32>,
    pub error_code: Option<u32>,
    pub payload: Payload,
}

impl Frame {
    pub fn new(msg_type: MsgType, flags: MsgFlags) -> Self {
        Self {
            header: Header::new(msg_type, flags),
            event: None,
            session_id: None,
            connect_id: None,
            sequence: None,
            error_code: None,
            payload: Payload::Binary(Bytes::new()),
        }
    }

    /// Event frame; binary payloads are marked raw, JSON payloads as JSON.
    pub fn with_event(
        msg_type: MsgType,
        event: EventType,
        session_id: Option<&str>,
        payload: Payload,
    ) -> Self {
        let mut frame = Self::new(msg_type, MsgFlags::WITH_EVENT);
        frame.header.serialization = match payload {
            Payload::Json(_) => Serialization::Json,
            Payload::Binary(_) => Serialization::Raw,
        };
        frame.event = Some(event);
        frame.session_id = session_id.filter(|s| !s.is_empty()).map(str::to_string);
        frame.payload = payload;
        frame
    }

    pub fn start_connection() -> Self {
        Self::with_event(
            MsgType::FullClientRequest,
            EventType::StartConnection,
            None,
            Payload::empty_json(),
        )
    }

    pub fn finish_connection() -> Self {
        Self::with_event(
            MsgType::FullClientRequest,
            EventType::FinishConnection,
            None,
            Payload::empty_json(),
        )
    }

    pub fn start_session(session_id: &str, request: Value) -> Self {
        Self::with_event(
            MsgType::FullClientRequest,
            EventType::StartSession,
            Some(session_id),
            Payload::Json(request),
        )
    }

    pub fn finish_session(session_id: &str) -> Self {
        Self::with_event(
            MsgType::FullClientRequest,
            EventType::FinishSession,
            Some(session_id),
            Payload::empty_json(),
        )
    }

    pub fn msg_type(&self) -> MsgType {
        self.header.msg_type
    }

    pub fn event_name(&self) -> String {
        self.event
            .map(|e| e.to_string())
            .unwrap_or_else(|| "None".to_string())
    }

    /// Error message type or a non-zero error code
    pub fn is_error(&self) -> bool {
        self.header.msg_type == MsgType::Error || self.error_code.is_some_and(|code| code != 0)
    }

    fn carries_session_id(&self) -> bool {
        self.event.is_some_and(|e| !e.is_connection_event())
    }

    fn carries_connect_id(&self) -> bool {
        self.event.is_some_and(|e| e.carries_connect_id())
    }

    fn carries_sequence(&self) -> bool {
        self.header.msg_type.carries_data() && self.header.flags.has_sequence()
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let body = self.payload.to_bytes()?;
        let body = match self.header.compression {
            Compression::Gzip => gzip(&body)?,
            _ => body,
        };

        let mut buf = BytesMut::with_capacity(self.header.len().max(4) + 32 + body.len());
        buf.put_slice(&self.header.pack());
        // Extra header words are zero padding
        for _ in 4..self.header.len() {
            buf.put_u8(0);
        }

        if self.header.flags.has_event() {
            let event = self
                .event
                .ok_or(PodcastError::InvalidFrame("WITH_EVENT flag set without an event"))?;
            buf.put_i32(event.code());

            if self.carries_session_id() {
                put_string(&mut buf, self.session_id.as_deref().unwrap_or_default());
            }
            if self.carries_connect_id() {
                put_string(&mut buf, self.connect_id.as_deref().unwrap_or_default());
            }
        }

        if self.carries_sequence() {
            buf.put_i32(self.sequence.unwrap_or_default());
        }

        if self.header.msg_type == MsgType::Error {
            buf.put_u32(self.error_code.unwrap_or_default());
        }

        buf.put_u32(body.len() as u32);
        buf.put_slice(&body);

        Ok(buf.to_vec())
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        let header = Header::unpack(data)?;
        if header.is_empty() {
            return Err(PodcastError::InvalidFrame("header size of zero words"));
        }

        let mut cursor = Cursor::new(data);
        cursor.skip(header.len(), "header")?;

        let mut frame = Self {
            header,
            event: None,
            session_id: None,
            connect_id: None,
            sequence: None,
            error_code: None,
            payload: Payload::Binary(Bytes::new()),
        };

        if header.flags.has_event() {
            frame.event = Some(EventType::from_code(cursor.i32("event")?));

            if frame.carries_session_id() {
                frame.session_id = cursor.string("session id")?;
            }
            if frame.carries_connect_id() {
                frame.connect_id = cursor.string("connect id")?;
            }
        }

        if frame.carries_sequence() {
            frame.sequence = Some(cursor.i32("sequence")?);
        }

        if header.msg_type == MsgType::Error {
            frame.error_code = Some(cursor.u32("error code")?);
        }

        let raw = cursor.sized("payload")?;
        let raw = match header.compression {
            Compression::Gzip if !raw.is_empty() => gunzip(&raw)?,
            _ => raw,
        };

        frame.payload = Payload::interpret(header.msg_type, frame.event, header.serialization, raw);

        Ok(frame)
    }
}

fn put_string(buf: &mut BytesMut, value: &str) {
    buf.put_u32(value.len() as u32);
    buf.put_slice(value.as_bytes());
}

fn gzip(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

fn gunzip(data: &[u8]) -> Result<Bytes> {
    let mut decoder = GzDecoder::new(data);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(PodcastError::Decompression)?;
    Ok(Bytes::from(out))
}

/// Bounds-checked big-endian reader over a frame buffer
struct Cursor<'a> {
    data: &'a [u8],
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    fn ensure(&self, field: &'static str, needed: usize) -> Result<()> {
        if self.data.remaining() < needed {
            return Err(PodcastError::truncated(field, needed, self.data.remaining()));
        }
        Ok(())
    }

    fn skip(&mut self, len: usize, field: &'static str) -> Result<()> {
        self.ensure(field, len)?;
        self.data.advance(len);
        Ok(())
    }

    fn i32(&mut self, field: &'static str) -> Result<i32> {
        self.ensure(field, 4)?;
        Ok(self.data.get_i32())
    }

    fn u32(&mut self, field: &'static str) -> Result<u32> {
        self.ensure(field, 4)?;
        Ok(self.data.get_u32())
    }

    /// Length-prefixed byte run
    fn sized(&mut self, field: &'static str) -> Result<Bytes> {
        let len = self.u32(field)? as usize;
        self.ensure(field, len)?;
        let out = Bytes::copy_from_slice(&self.data[..len]);
        self.data.advance(len);
        Ok(out)
    }

    /// Length-prefixed UTF-8; empty strings decode as absent
    fn string(&mut self, field: &'static str) -> Result<Option<String>> {
        let raw = self.sized(field)?;
        if raw.is_empty() {
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(&raw).into_owned()))
    }
}
