use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use super::model::{Task, TaskSnapshot};
use super::request::CreatePodcastRequest;
use crate::callback::{CallbackNotifier, CallbackPayload, HttpCallbackNotifier};
use crate::config::{Config, OrchestratorConfig};
use crate::error::{PodcastError, Result};
use crate::session::{Connector, SessionConfig, VendorSession, WsConnector};
use crate::storage::{content_type_for, StorageFactory, StorageSink};

/// Shared task table; each entry is locked independently
pub type TaskTable = Arc<RwLock<HashMap<String, Arc<Mutex<Task>>>>>;

/// Owns every task from submission to eviction
#[derive(Clone)]
pub struct Orchestrator {
    tasks: TaskTable,
    config: OrchestratorConfig,
    recv_timeout: Duration,
    connector: Arc<dyn Connector>,
    storage: Arc<dyn StorageSink>,
    debug_storage: Arc<dyn StorageSink>,
    notifier: Arc<dyn CallbackNotifier>,
}

impl Orchestrator {
    pub fn new(
        config: &Config,
        connector: Arc<dyn Connector>,
        storage: Arc<dyn StorageSink>,
        debug_storage: Arc<dyn StorageSink>,
        notifier: Arc<dyn CallbackNotifier>,
    ) -> Self {
        Self {
            tasks: Arc::new(RwLock::new(HashMap::new())),
            config: config.orchestrator.clone(),
            recv_timeout: config.vendor.recv_timeout(),
            connector,
            storage,
            debug_storage,
            notifier,
        }
    }

    /// Production wiring: vendor WebSocket, configured storage, HTTP callbacks
    pub async fn from_config(config: &Config) -> Result<Self> {
        let connector = Arc::new(WsConnector::new(config.vendor.clone()));
        let storage = StorageFactory::create(&config.storage)?;
        // Startup continues without the bucket; uploads then fail per task
        if let Err(e) = storage.prepare().await {
            error!("Failed to prepare {} storage: {}", storage.name(), e);
        }
        let debug_storage = StorageFactory::debug(&config.storage);
        let notifier = Arc::new(HttpCallbackNotifier::new(&config.callback)?);

        info!(
            "Orchestrator ready: storage={}, max_retries={}",
            storage.name(),
            config.orchestrator.max_retries
        );

        Ok(Self::new(config, connector, storage, debug_storage, notifier))
    }

    // ========================================================================
    // Public operations
    // ========================================================================

    /// Register a task and start generating in the background
    pub async fn create(&self, request: CreatePodcastRequest) -> Result<String> {
        request.validate()?;

        let task_id = uuid::Uuid::new_v4().to_string();
        let task = Task::new(task_id.clone(), request, self.config.max_retries);
        info!(
            "Task created: {}, session: {}, input: {}",
            task_id, task.session_id, task.input_id
        );

        let task = Arc::new(Mutex::new(task));
        self.tasks
            .write()
            .await
            .insert(task_id.clone(), Arc::clone(&task));

        let this = self.clone();
        tokio::spawn(async move {
            this.run(task).await;
        });

        Ok(task_id)
    }

    pub async fn status(&self, task_id: &str) -> Result<TaskSnapshot> {
        let task = self
            .tasks
            .read()
            .await
            .get(task_id)
            .cloned()
            .ok_or_else(|| PodcastError::TaskNotFound(task_id.to_string()))?;

        let snapshot = task.lock().await.snapshot();
        Ok(snapshot)
    }

    pub async fn task_count(&self) -> usize {
        self.tasks.read().await.len()
    }

    // ========================================================================
    // Retry loop
    // ========================================================================

    async fn run(&self, task: Arc<Mutex<Task>>) {
        let mut last_error = String::from("no attempt made");

        loop {
            let (session, storage) = {
                let mut t = task.lock().await;
                if !t.has_attempts_left() {
                    break;
                }
                t.mark_processing();

                let request = match t.start_session_payload().to_value() {
                    Ok(request) => request,
                    Err(e) => {
                        drop(t);
                        self.fail(&task, &e.to_string()).await;
                        return;
                    }
                };
                if let Some(resume) = request.get("retry_info") {
                    info!("Task {} resuming with retry_info: {}", t.id, resume);
                }

                let config = SessionConfig::new(t.session_id.clone(), request, self.recv_timeout);
                (VendorSession::new(config), self.sink_for(t.debug_mode))
            };

            match session.run(&*self.connector, &task, &*storage).await {
                Ok(_) => {
                    self.finalize(&task).await;
                    return;
                }
                Err(e) => {
                    let mut t = task.lock().await;
                    let interrupted = t.rollback_partial_round();
                    t.record_retry();
                    warn!(
                        "Attempt {}/{} failed for task {} (mid-round: {}, last finished round: {}): {}",
                        t.retry_count(),
                        t.max_retries(),
                        t.id,
                        interrupted,
                        t.last_finished_round_id(),
                        e
                    );
                    last_error = e.to_string();

                    if !t.has_attempts_left() {
                        break;
                    }
                }
            }

            tokio::time::sleep(self.config.retry_backoff()).await;
        }

        let message = format!(
            "Max retries ({}) exceeded: {}",
            self.config.max_retries, last_error
        );
        self.fail(&task, &message).await;
    }

    // ========================================================================
    // Terminal transitions
    // ========================================================================

    async fn finalize(&self, task: &Arc<Mutex<Task>>) {
        let (task_id, audio, audio_key, content_type, storage) = {
            let t = task.lock().await;
            let format = t.audio_format().to_string();
            (
                t.id.clone(),
                t.merged_audio(),
                t.object_key(&format!("audio.{}", format)),
                content_type_for(&format),
                self.sink_for(t.debug_mode),
            )
        };

        info!("Audio data collected for task {}: {} bytes", task_id, audio.len());
        if audio.is_empty() {
            self.fail(task, "No audio data received").await;
            return;
        }

        let audio_url = match storage.put(&audio_key, audio, content_type).await {
            Ok(url) => url,
            Err(e) => {
                self.fail(task, &e.to_string()).await;
                return;
            }
        };

        let subtitles = {
            let mut t = task.lock().await;
            t.render_subtitles()
                .map(|srt| (t.object_key("subtitles.srt"), srt))
        };

        let subtitle_url = match subtitles {
            Some((key, srt)) => match storage.put(&key, srt.into_bytes(), "text/srt").await {
                Ok(url) => {
                    info!("Subtitle uploaded: {}", url);
                    Some(url)
                }
                Err(e) => {
                    self.fail(task, &e.to_string()).await;
                    return;
                }
            },
            None => None,
        };

        let (callback_url, payload) = {
            let mut t = task.lock().await;
            if !t.complete() {
                warn!("Task {} already terminal, skipping completion", task_id);
                return;
            }
            (t.callback_url.clone(), t.success_payload(&audio_url, subtitle_url))
        };

        info!(
            "Task {} completed: duration={}s, rounds={}",
            task_id,
            payload.duration.unwrap_or_default(),
            payload.round_audios.as_ref().map_or(0, Vec::len)
        );

        self.notifier.deliver(&callback_url, &payload).await;
        self.schedule_eviction(task_id);
    }

    /// Mark the task failed and notify once; later calls are no-ops
    async fn fail(&self, task: &Arc<Mutex<Task>>, message: &str) {
        let (task_id, callback_url) = {
            let mut t = task.lock().await;
            if !t.fail(message) {
                return;
            }
            (t.id.clone(), t.callback_url.clone())
        };

        error!("Task {} failed: {}", task_id, message);
        self.notifier
            .deliver(&callback_url, &CallbackPayload::failed(&task_id, message))
            .await;
        self.schedule_eviction(task_id);
    }

    fn schedule_eviction(&self, task_id: String) {
        let tasks = Arc::clone(&self.tasks);
        let retention = self.config.retention();
        tokio::spawn(async move {
            tokio::time::sleep(retention).await;
            if tasks.write().await.remove(&task_id).is_some() {
                debug!("Task evicted: {}", task_id);
            }
        });
    }

    fn sink_for(&self, debug_mode: bool) -> Arc<dyn StorageSink> {
        if debug_mode {
            Arc::clone(&self.debug_storage)
        } else {
            Arc::clone(&self.storage)
        }
    }
}
