use bytes::Bytes;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::state::SessionState;
use crate::error::{PodcastError, Result};
use crate::protocol::{
    EventType, Frame, Payload, RoundEndPayload, RoundStartPayload, StreamEndPayload, UsageInfo,
    UsagePayload,
};

/// What a frame means for the task, once the handshake is out of the way
#[derive(Debug, Clone)]
pub enum SessionEvent {
    RoundStart(RoundStartPayload),
    AudioChunk(Bytes),
    RoundEnd(RoundEndPayload),
    StreamEnd(StreamEndPayload),
    Usage(UsageInfo),
}

/// Result of feeding one inbound frame to the machine
#[derive(Debug, Default)]
pub struct Step {
    /// Frames to send back, in order
    pub replies: Vec<Frame>,
    pub event: Option<SessionEvent>,
}

impl Step {
    fn reply(frame: Frame) -> Self {
        Self {
            replies: vec![frame],
            event: None,
        }
    }

    fn event(event: SessionEvent) -> Self {
        Self {
            replies: Vec::new(),
            event: Some(event),
        }
    }
}

/// Synchronous protocol state machine for a single connection.
///
/// The machine never touches the network: the caller sends the frame returned
/// by [`SessionMachine::open`], feeds every inbound frame to
/// [`SessionMachine::on_frame`] in arrival order, sends the returned replies and
/// applies the returned event.
pub struct SessionMachine {
    state: SessionState,
    session_id: String,
    request: Value,
}

impl SessionMachine {
    pub fn new(session_id: impl Into<String>, request: Value) -> Self {
        Self {
            state: SessionState::Idle,
            session_id: session_id.into(),
            request,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state == SessionState::Closed
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// First frame of the connection
    pub fn open(&mut self) -> Result<Frame> {
        if self.state != SessionState::Idle {
            return Err(self.fail(None, format!("open called in state {}", self.state)));
        }
        self.state = SessionState::ConnectionPending;
        Ok(Frame::start_connection())
    }

    pub fn on_frame(&mut self, frame: Frame) -> Result<Step> {
        debug!(
            "Received frame: type={:?}, event={}, state={}",
            frame.msg_type(),
            frame.event_name(),
            self.state
        );

        if frame.is_error() {
            return Err(self.fail(frame.error_code, frame.payload.describe()));
        }

        let Some(event) = frame.event else {
            debug!("Ignoring frame without event in state {}", self.state);
            return Ok(Step::default());
        };

        match event {
            EventType::ConnectionFailed | EventType::SessionFailed | EventType::SessionCanceled => {
                Err(self.fail(
                    frame.error_code,
                    format!("{}: {}", event, frame.payload.describe()),
                ))
            }

            EventType::ConnectionStarted => {
                self.expect_state(SessionState::ConnectionPending, event)?;
                self.state = SessionState::ConnectionEstablished;
                info!("Connection started, session: {}", self.session_id);

                let start = Frame::start_session(&self.session_id, self.request.clone());
                self.state = SessionState::SessionPending;
                Ok(Step::reply(start))
            }

            EventType::SessionStarted => {
                self.expect_state(SessionState::SessionPending, event)?;
                self.state = SessionState::SessionEstablished;
                info!("Session started: {}", self.session_id);

                // All input is in StartSession, so the session can be closed
                // for input right away; the vendor keeps streaming rounds.
                let finish = Frame::finish_session(&self.session_id);
                self.state = SessionState::Streaming;
                Ok(Step::reply(finish))
            }

            EventType::RoundStart => {
                self.expect_state(SessionState::Streaming, event)?;
                let round = frame.payload.parse().unwrap_or_default();
                Ok(Step::event(SessionEvent::RoundStart(round)))
            }

            EventType::RoundResponse => {
                self.expect_state(SessionState::Streaming, event)?;
                match frame.payload {
                    Payload::Binary(data) => Ok(Step::event(SessionEvent::AudioChunk(data))),
                    Payload::Json(value) => {
                        debug!("Ignoring JSON round response: {}", value);
                        Ok(Step::default())
                    }
                }
            }

            EventType::RoundEnd => {
                self.expect_state(SessionState::Streaming, event)?;
                let end = frame.payload.parse().unwrap_or_default();
                Ok(Step::event(SessionEvent::RoundEnd(end)))
            }

            EventType::StreamEnd => {
                self.expect_state(SessionState::Streaming, event)?;
                let end = frame.payload.parse().unwrap_or_default();
                Ok(Step::event(SessionEvent::StreamEnd(end)))
            }

            EventType::UsageResponse => {
                let usage = frame
                    .payload
                    .parse::<UsagePayload>()
                    .and_then(|p| p.usage);
                Ok(match usage {
                    Some(usage) => Step::event(SessionEvent::Usage(usage)),
                    None => Step::default(),
                })
            }

            EventType::SessionFinished => {
                self.expect_state(SessionState::Streaming, event)?;
                info!("Session finished: {}", self.session_id);
                self.state = SessionState::SessionFinishing;

                let finish = Frame::finish_connection();
                self.state = SessionState::ConnectionFinishing;
                Ok(Step::reply(finish))
            }

            EventType::ConnectionFinished => {
                self.expect_state(SessionState::ConnectionFinishing, event)?;
                self.state = SessionState::Closed;
                info!("Connection finished, session: {}", self.session_id);
                Ok(Step::default())
            }

            other => {
                warn!("Unexpected event {} in state {}", other, self.state);
                Ok(Step::default())
            }
        }
    }

    /// The transport ended. Anything short of `Closed` is abnormal.
    pub fn on_close(&mut self) -> Result<()> {
        if self.state == SessionState::Closed {
            return Ok(());
        }
        let reason = format!("connection closed in state {}", self.state);
        self.state = SessionState::Errored;
        Err(PodcastError::abnormal_closure(reason))
    }

    /// Nothing arrived within the receive window
    pub fn on_timeout(&mut self, waited: Duration) -> PodcastError {
        let reason = format!("no frame within {:?} in state {}", waited, self.state);
        self.state = SessionState::Errored;
        PodcastError::abnormal_closure(reason)
    }

    fn expect_state(&mut self, state: SessionState, event: EventType) -> Result<()> {
        if self.state == state {
            return Ok(());
        }
        Err(self.fail(None, format!("{} received in state {}", event, self.state)))
    }

    fn fail(&mut self, code: Option<u32>, detail: String) -> PodcastError {
        self.state = SessionState::Errored;
        PodcastError::protocol(code, detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::MsgType;
    use serde_json::json;

    fn server(event: EventType, payload: Payload) -> Frame {
        Frame::with_event(MsgType::FullServerResponse, event, Some("sess-1"), payload)
    }

    fn handshake(machine: &mut SessionMachine) {
        machine.open().unwrap();
        machine
            .on_frame(server(EventType::ConnectionStarted, Payload::empty_json()))
            .unwrap();
        machine
            .on_frame(server(EventType::SessionStarted, Payload::empty_json()))
            .unwrap();
    }

    #[test]
    fn test_handshake_replies() {
        let mut machine = SessionMachine::new("sess-1", json!({"action": 3}));
        let open = machine.open().unwrap();
        assert_eq!(open.event, Some(EventType::StartConnection));
        assert_eq!(machine.state(), SessionState::ConnectionPending);

        let step = machine
            .on_frame(server(EventType::ConnectionStarted, Payload::empty_json()))
            .unwrap();
        assert_eq!(step.replies.len(), 1);
        assert_eq!(step.replies[0].event, Some(EventType::StartSession));
        assert_eq!(step.replies[0].session_id.as_deref(), Some("sess-1"));
        assert_eq!(step.replies[0].payload, Payload::Json(json!({"action": 3})));
        assert_eq!(machine.state(), SessionState::SessionPending);

        let step = machine
            .on_frame(server(EventType::SessionStarted, Payload::empty_json()))
            .unwrap();
        assert_eq!(step.replies[0].event, Some(EventType::FinishSession));
        assert_eq!(machine.state(), SessionState::Streaming);
    }

    #[test]
    fn test_round_events() {
        let mut machine = SessionMachine::new("sess-1", json!({}));
        handshake(&mut machine);

        let step = machine
            .on_frame(server(
                EventType::RoundStart,
                Payload::Json(json!({"round_id": 0, "speaker": "A", "text": "hi"})),
            ))
            .unwrap();
        assert!(matches!(
            step.event,
            Some(SessionEvent::RoundStart(RoundStartPayload { round_id: Some(0), .. }))
        ));

        let audio = Frame::with_event(
            MsgType::AudioOnlyServer,
            EventType::RoundResponse,
            Some("sess-1"),
            Payload::Binary(Bytes::from_static(&[1, 2, 3])),
        );
        let step = machine.on_frame(audio).unwrap();
        assert!(matches!(step.event, Some(SessionEvent::AudioChunk(ref b)) if b.as_ref() == [1, 2, 3]));

        let step = machine
            .on_frame(server(
                EventType::RoundEnd,
                Payload::Json(json!({"audio_duration": 1.5})),
            ))
            .unwrap();
        assert!(matches!(
            step.event,
            Some(SessionEvent::RoundEnd(RoundEndPayload { audio_duration: Some(d), .. })) if d == 1.5
        ));
    }

    #[test]
    fn test_graceful_close() {
        let mut machine = SessionMachine::new("sess-1", json!({}));
        handshake(&mut machine);

        let step = machine
            .on_frame(server(
                EventType::UsageResponse,
                Payload::Json(json!({"usage": {"inputTextTokens": 3, "outputAudioTokens": 4}})),
            ))
            .unwrap();
        assert!(matches!(step.event, Some(SessionEvent::Usage(u)) if u.output_audio_tokens == 4));

        let step = machine
            .on_frame(server(EventType::SessionFinished, Payload::empty_json()))
            .unwrap();
        assert_eq!(step.replies[0].event, Some(EventType::FinishConnection));
        assert_eq!(machine.state(), SessionState::ConnectionFinishing);

        machine
            .on_frame(server(EventType::ConnectionFinished, Payload::empty_json()))
            .unwrap();
        assert!(machine.is_closed());
        assert!(machine.on_close().is_ok());
    }

    #[test]
    fn test_close_mid_stream_is_abnormal() {
        let mut machine = SessionMachine::new("sess-1", json!({}));
        handshake(&mut machine);
        assert!(matches!(
            machine.on_close(),
            Err(PodcastError::AbnormalClosure { .. })
        ));
        assert_eq!(machine.state(), SessionState::Errored);
    }

    #[test]
    fn test_error_frame() {
        let mut machine = SessionMachine::new("sess-1", json!({}));
        machine.open().unwrap();

        let mut error = Frame::new(MsgType::Error, Default::default());
        error.error_code = Some(45000001);
        error.payload = Payload::Json(json!({"error": "quota exceeded"}));

        match machine.on_frame(error) {
            Err(PodcastError::Protocol { code, detail }) => {
                assert_eq!(code, Some(45000001));
                assert!(detail.contains("quota exceeded"));
            }
            other => panic!("expected protocol error, got {:?}", other.map(|_| ())),
        }
        assert_eq!(machine.state(), SessionState::Errored);
    }

    #[test]
    fn test_session_failed_event() {
        let mut machine = SessionMachine::new("sess-1", json!({}));
        machine.open().unwrap();
        machine
            .on_frame(server(EventType::ConnectionStarted, Payload::empty_json()))
            .unwrap();
        assert!(machine
            .on_frame(server(EventType::SessionFailed, Payload::empty_json()))
            .is_err());
        assert_eq!(machine.state(), SessionState::Errored);
    }

    #[test]
    fn test_out_of_order_handshake() {
        let mut machine = SessionMachine::new("sess-1", json!({}));
        machine.open().unwrap();
        assert!(matches!(
            machine.on_frame(server(EventType::SessionStarted, Payload::empty_json())),
            Err(PodcastError::Protocol { .. })
        ));
    }

    #[test]
    fn test_open_twice() {
        let mut machine = SessionMachine::new("sess-1", json!({}));
        machine.open().unwrap();
        assert!(machine.open().is_err());
    }
}
