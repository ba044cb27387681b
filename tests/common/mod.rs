// Shared test doubles: a scripted vendor connection, in-memory storage and a
// callback recorder.

#![allow(dead_code)]

use podcast_tts::callback::{CallbackNotifier, CallbackPayload};
use podcast_tts::config::Config;
use podcast_tts::protocol::{EventType, Frame, MsgFlags, MsgType, Payload};
use podcast_tts::session::{Connector, Transport};
use podcast_tts::storage::StorageSink;
use podcast_tts::task::{Orchestrator, TaskSnapshot};
use podcast_tts::{PodcastError, Result};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ============================================================================
// Scripted vendor
// ============================================================================

#[derive(Debug, Clone)]
pub struct Round {
    pub id: i32,
    pub speaker: &'static str,
    pub text: &'static str,
    pub audio: Vec<Vec<u8>>,
    pub duration: Option<f64>,
    pub is_error: bool,
}

impl Round {
    pub fn new(id: i32, speaker: &'static str, text: &'static str, audio: Vec<Vec<u8>>, duration: f64) -> Self {
        Self {
            id,
            speaker,
            text,
            audio,
            duration: Some(duration),
            is_error: false,
        }
    }
}

/// How one connection attempt behaves
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Plan {
    /// Stream every remaining round and close gracefully
    Complete,
    /// Finish `after_rounds` rounds, start the next one, send one chunk, drop
    CutMidRound { after_rounds: usize },
    /// Answer StartConnection with an error frame
    ErrorFrame,
    /// Fail to connect at all
    Refuse,
}

#[derive(Default)]
pub struct VendorLog {
    pub connect_ids: Vec<String>,
    pub start_sessions: Vec<Value>,
    pub session_ids: Vec<String>,
}

pub struct FakeVendor {
    rounds: Vec<Round>,
    plans: Mutex<VecDeque<Plan>>,
    fallback: Plan,
    pub log: Arc<Mutex<VendorLog>>,
}

impl FakeVendor {
    pub fn new(rounds: Vec<Round>, plans: Vec<Plan>, fallback: Plan) -> Arc<Self> {
        Arc::new(Self {
            rounds,
            plans: Mutex::new(plans.into()),
            fallback,
            log: Arc::new(Mutex::new(VendorLog::default())),
        })
    }

    pub fn completing(rounds: Vec<Round>) -> Arc<Self> {
        Self::new(rounds, Vec::new(), Plan::Complete)
    }

    pub fn start_sessions(&self) -> Vec<Value> {
        self.log.lock().unwrap().start_sessions.clone()
    }

    pub fn connect_ids(&self) -> Vec<String> {
        self.log.lock().unwrap().connect_ids.clone()
    }

    pub fn session_ids(&self) -> Vec<String> {
        self.log.lock().unwrap().session_ids.clone()
    }
}

#[async_trait::async_trait]
impl Connector for FakeVendor {
    async fn connect(&self, connect_id: &str) -> Result<Box<dyn Transport>> {
        self.log
            .lock()
            .unwrap()
            .connect_ids
            .push(connect_id.to_string());

        let plan = self
            .plans
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.fallback);

        if plan == Plan::Refuse {
            return Err(PodcastError::abnormal_closure("connection refused"));
        }

        Ok(Box::new(FakeTransport {
            plan,
            rounds: self.rounds.clone(),
            log: Arc::clone(&self.log),
            session_id: String::new(),
            resume_after: -1,
            outbox: VecDeque::new(),
        }))
    }
}

struct FakeTransport {
    plan: Plan,
    rounds: Vec<Round>,
    log: Arc<Mutex<VendorLog>>,
    session_id: String,
    resume_after: i32,
    outbox: VecDeque<Vec<u8>>,
}

impl FakeTransport {
    fn push(&mut self, frame: Frame) {
        self.outbox.push_back(frame.encode().unwrap());
    }

    fn push_event(&mut self, event: EventType, payload: Value) {
        let frame = Frame::with_event(
            MsgType::FullServerResponse,
            event,
            Some(self.session_id.as_str()),
            Payload::Json(payload),
        );
        self.push(frame);
    }

    fn push_round_start(&mut self, round: &Round) {
        self.push_event(
            EventType::RoundStart,
            json!({"round_id": round.id, "speaker": round.speaker, "text": round.text}),
        );
    }

    fn push_audio(&mut self, chunk: &[u8]) {
        let frame = Frame::with_event(
            MsgType::AudioOnlyServer,
            EventType::RoundResponse,
            Some(self.session_id.as_str()),
            Payload::Binary(chunk.to_vec().into()),
        );
        self.push(frame);
    }

    fn push_round(&mut self, round: &Round) {
        self.push_round_start(round);
        for chunk in &round.audio {
            self.push_audio(chunk);
        }
        let end = if round.is_error {
            json!({"is_error": true, "error_msg": "synthesis failed"})
        } else {
            match round.duration {
                Some(d) => json!({"audio_duration": d}),
                None => json!({}),
            }
        };
        self.push_event(EventType::RoundEnd, end);
    }

    fn stream(&mut self) {
        let remaining: Vec<Round> = self
            .rounds
            .iter()
            .filter(|r| r.id > self.resume_after)
            .cloned()
            .collect();

        match self.plan {
            Plan::CutMidRound { after_rounds } => {
                for round in remaining.iter().take(after_rounds) {
                    self.push_round(round);
                }
                if let Some(next) = remaining.get(after_rounds) {
                    self.push_round_start(next);
                    if let Some(chunk) = next.audio.first() {
                        self.push_audio(chunk);
                    }
                }
            }
            _ => {
                for round in &remaining {
                    self.push_round(round);
                }
                self.push_event(
                    EventType::UsageResponse,
                    json!({"usage": {"inputTextTokens": 10, "outputAudioTokens": 20}}),
                );
                self.push_event(
                    EventType::StreamEnd,
                    json!({"meta_info": {"audio_url": "https://vendor.example/podcast.mp3"}}),
                );
                self.push_event(EventType::SessionFinished, json!({}));
            }
        }
    }
}

#[async_trait::async_trait]
impl Transport for FakeTransport {
    async fn send(&mut self, data: Vec<u8>) -> Result<()> {
        let frame = Frame::decode(&data)?;

        match frame.event {
            Some(EventType::StartConnection) => {
                if self.plan == Plan::ErrorFrame {
                    let mut error = Frame::new(MsgType::Error, MsgFlags::NO_SEQ);
                    error.error_code = Some(45000000);
                    error.payload = Payload::Json(json!({"error": "quota exceeded"}));
                    self.push(error);
                } else {
                    self.push_event(EventType::ConnectionStarted, json!({}));
                }
            }
            Some(EventType::StartSession) => {
                self.session_id = frame.session_id.clone().unwrap_or_default();
                let request = frame.payload.as_json().cloned().unwrap_or(Value::Null);
                self.resume_after = request["retry_info"]["last_finished_round_id"]
                    .as_i64()
                    .map_or(-1, |id| id as i32);

                {
                    let mut log = self.log.lock().unwrap();
                    log.start_sessions.push(request);
                    log.session_ids.push(self.session_id.clone());
                }
                self.push_event(EventType::SessionStarted, json!({}));
            }
            Some(EventType::FinishSession) => self.stream(),
            Some(EventType::FinishConnection) => {
                self.push_event(EventType::ConnectionFinished, json!({}));
            }
            _ => {}
        }

        Ok(())
    }

    async fn next_message(&mut self) -> Option<Result<Vec<u8>>> {
        self.outbox.pop_front().map(Ok)
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

// ============================================================================
// Storage and callbacks
// ============================================================================

#[derive(Default)]
pub struct MemoryStorage {
    objects: Mutex<HashMap<String, (Vec<u8>, String)>>,
    fail_suffix: Option<&'static str>,
}

impl MemoryStorage {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Rejects keys ending with `suffix`
    pub fn failing_on(suffix: &'static str) -> Arc<Self> {
        Arc::new(Self {
            objects: Mutex::new(HashMap::new()),
            fail_suffix: Some(suffix),
        })
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(key).map(|(data, _)| data.clone())
    }

    pub fn content_type(&self, key: &str) -> Option<String> {
        self.objects.lock().unwrap().get(key).map(|(_, ct)| ct.clone())
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait::async_trait]
impl StorageSink for MemoryStorage {
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<String> {
        if self.fail_suffix.is_some_and(|suffix| key.ends_with(suffix)) {
            return Err(PodcastError::Upload {
                key: key.to_string(),
                message: "bucket unavailable".to_string(),
            });
        }
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), (data, content_type.to_string()));
        Ok(format!("mem://{}", key))
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    delivered: Mutex<Vec<(String, CallbackPayload)>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn payloads(&self) -> Vec<CallbackPayload> {
        self.delivered
            .lock()
            .unwrap()
            .iter()
            .map(|(_, p)| p.clone())
            .collect()
    }

    pub fn urls(&self) -> Vec<String> {
        self.delivered
            .lock()
            .unwrap()
            .iter()
            .map(|(url, _)| url.clone())
            .collect()
    }

    /// Poll until at least `count` callbacks arrived
    pub async fn wait_for(&self, count: usize) -> Vec<CallbackPayload> {
        for _ in 0..500 {
            let payloads = self.payloads();
            if payloads.len() >= count {
                return payloads;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.payloads()
    }
}

#[async_trait::async_trait]
impl CallbackNotifier for RecordingNotifier {
    async fn deliver(&self, url: &str, payload: &CallbackPayload) -> bool {
        self.delivered
            .lock()
            .unwrap()
            .push((url.to_string(), payload.clone()));
        true
    }
}

// ============================================================================
// Wiring
// ============================================================================

pub fn test_config(max_retries: u32) -> Config {
    let mut config = Config::default();
    config.orchestrator.max_retries = max_retries;
    config.orchestrator.retry_backoff_ms = 10;
    config.vendor.recv_timeout_secs = 5;
    config
}

pub struct Harness {
    pub orchestrator: Orchestrator,
    pub vendor: Arc<FakeVendor>,
    pub storage: Arc<MemoryStorage>,
    pub debug_storage: Arc<MemoryStorage>,
    pub notifier: Arc<RecordingNotifier>,
}

impl Harness {
    pub fn new(config: &Config, vendor: Arc<FakeVendor>) -> Self {
        Self::with_storage(config, vendor, MemoryStorage::new())
    }

    pub fn with_storage(config: &Config, vendor: Arc<FakeVendor>, storage: Arc<MemoryStorage>) -> Self {
        let debug_storage = MemoryStorage::new();
        let notifier = RecordingNotifier::new();
        let orchestrator = Orchestrator::new(
            config,
            vendor.clone(),
            storage.clone(),
            debug_storage.clone(),
            notifier.clone(),
        );

        Self {
            orchestrator,
            vendor,
            storage,
            debug_storage,
            notifier,
        }
    }

    /// Poll until the task reaches completed or failed
    pub async fn wait_terminal(&self, task_id: &str) -> TaskSnapshot {
        for _ in 0..500 {
            if let Ok(snapshot) = self.orchestrator.status(task_id).await {
                if snapshot.status.is_terminal() {
                    return snapshot;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("task {} did not finish in time", task_id);
    }
}

pub fn request(input_id: &str) -> podcast_tts::CreatePodcastRequest {
    serde_json::from_value(json!({
        "input_id": input_id,
        "action": 3,
        "nlp_texts": [{"speaker": "A", "text": "Hello"}, {"speaker": "B", "text": "World"}],
        "callback_url": "http://localhost:9000/callback"
    }))
    .unwrap()
}

pub fn two_rounds() -> Vec<Round> {
    vec![
        Round::new(0, "A", "Hello", vec![vec![1, 2, 3]], 1.5),
        Round::new(1, "B", "World", vec![vec![4], vec![5]], 1.0),
    ]
}
