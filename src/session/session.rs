use super::config::SessionConfig;
use super::connection::{Connector, Transport};
use super::machine::{SessionEvent, SessionMachine};
use super::stats::AttemptStats;
use crate::callback::RoundAudio;
use crate::error::Result;
use crate::protocol::Frame;
use crate::storage::StorageSink;
use crate::task::{RoundUpload, Task};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// One connection attempt against the vendor, from StartConnection to
/// ConnectionFinished
pub struct VendorSession {
    config: SessionConfig,
    machine: SessionMachine,
    stats: AttemptStats,
}

impl VendorSession {
    pub fn new(config: SessionConfig) -> Self {
        let machine = SessionMachine::new(config.session_id.clone(), config.request.clone());
        let stats = AttemptStats::new(&config.connect_id);
        Self {
            config,
            machine,
            stats,
        }
    }

    /// Run the attempt to the end. `Ok` means the connection reached `Closed`.
    pub async fn run(
        mut self,
        connector: &dyn Connector,
        task: &Arc<Mutex<Task>>,
        storage: &dyn StorageSink,
    ) -> Result<AttemptStats> {
        info!(
            "Opening vendor session: {}, connect_id: {}",
            self.config.session_id, self.config.connect_id
        );

        let mut transport = connector.connect(&self.config.connect_id).await?;
        let result = self.drive(transport.as_mut(), task, storage).await;

        self.stats.final_state = self.machine.state();
        if let Err(e) = transport.close().await {
            debug!("Error closing transport: {}", e);
        }

        match result {
            Ok(()) => {
                info!(
                    "Vendor session closed: {} frames, {} rounds, {} audio bytes",
                    self.stats.frames_received, self.stats.rounds_completed, self.stats.audio_bytes
                );
                Ok(self.stats)
            }
            Err(e) => {
                warn!(
                    "Vendor session aborted in state {} after {} frames: {}",
                    self.stats.final_state, self.stats.frames_received, e
                );
                Err(e)
            }
        }
    }

    async fn drive(
        &mut self,
        transport: &mut dyn Transport,
        task: &Arc<Mutex<Task>>,
        storage: &dyn StorageSink,
    ) -> Result<()> {
        let open = self.machine.open()?;
        transport.send(open.encode()?).await?;

        while !self.machine.is_closed() {
            let message =
                match tokio::time::timeout(self.config.recv_timeout, transport.next_message()).await
                {
                    Ok(Some(message)) => message?,
                    Ok(None) => return self.machine.on_close(),
                    Err(_) => return Err(self.machine.on_timeout(self.config.recv_timeout)),
                };

            let frame = Frame::decode(&message)?;
            self.stats.frames_received += 1;

            let step = self.machine.on_frame(frame)?;
            for reply in step.replies {
                debug!("Sending {}", reply.event_name());
                transport.send(reply.encode()?).await?;
            }

            if let Some(event) = step.event {
                self.apply(event, task, storage).await;
            }
        }

        Ok(())
    }

    async fn apply(&mut self, event: SessionEvent, task: &Arc<Mutex<Task>>, storage: &dyn StorageSink) {
        match event {
            SessionEvent::RoundStart(round) => task.lock().await.begin_round(&round),

            SessionEvent::AudioChunk(data) => {
                self.stats.audio_bytes += data.len();
                task.lock().await.push_audio(data);
            }

            SessionEvent::RoundEnd(end) => {
                self.stats.rounds_completed += 1;
                let upload = task.lock().await.end_round(&end);
                if let Some(upload) = upload {
                    Self::persist_round(upload, task, storage).await;
                }
            }

            SessionEvent::StreamEnd(end) => {
                info!("Podcast stream ended, session: {}", self.config.session_id);
                if let Some(url) = end.meta_info.and_then(|m| m.audio_url) {
                    debug!("Audio URL from server: {}", url);
                }
            }

            SessionEvent::Usage(usage) => {
                debug!(
                    "Usage: input_tokens={}, output_tokens={}",
                    usage.input_text_tokens, usage.output_audio_tokens
                );
                task.lock().await.add_usage(&usage);
            }
        }
    }

    /// Upload runs without the task lock; a failed round upload is logged only.
    async fn persist_round(upload: RoundUpload, task: &Arc<Mutex<Task>>, storage: &dyn StorageSink) {
        let RoundUpload {
            round_id,
            speaker,
            key,
            content_type,
            data,
        } = upload;

        match storage.put(&key, data, content_type).await {
            Ok(audio_url) => {
                info!("Round {} audio saved: {}, speaker: {}", round_id, key, speaker);
                task.lock().await.record_round_audio(RoundAudio {
                    round_id,
                    speaker,
                    audio_url,
                });
            }
            Err(e) => error!("Failed to save round {} audio: {}", round_id, e),
        }
    }
}
