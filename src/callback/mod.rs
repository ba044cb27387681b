//! Outbound webhook delivery for task results

mod payload;

pub use payload::{CallbackPayload, CallbackStatus, PodcastInfo, RoundAudio};

use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::CallbackConfig;
use crate::error::{PodcastError, Result};

/// Bounded attempts with a doubling delay between them
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay after the `attempt`-th failure (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(20);
        self.initial_delay.saturating_mul(1 << shift)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(1000))
    }
}

impl From<&CallbackConfig> for RetryPolicy {
    fn from(config: &CallbackConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_millis(config.initial_delay_ms),
        )
    }
}

/// Delivers task results to the submitter
#[async_trait::async_trait]
pub trait CallbackNotifier: Send + Sync {
    /// Deliver with retries; returns whether any attempt succeeded
    async fn deliver(&self, url: &str, payload: &CallbackPayload) -> bool;
}

/// POSTs JSON to the callback URL
pub struct HttpCallbackNotifier {
    client: reqwest::Client,
    policy: RetryPolicy,
}

impl HttpCallbackNotifier {
    pub fn new(config: &CallbackConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PodcastError::InvalidConfig(format!("callback client: {}", e)))?;

        Ok(Self {
            client,
            policy: RetryPolicy::from(config),
        })
    }

    async fn notify(&self, url: &str, payload: &CallbackPayload) -> Result<()> {
        info!(
            "Sending callback to {}, task: {}, status: {:?}",
            url, payload.task_id, payload.status
        );

        let response = self
            .client
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(|e| PodcastError::Callback {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(PodcastError::Callback {
                url: url.to_string(),
                message: format!("non-success status {}", response.status()),
            });
        }

        Ok(())
    }
}

#[async_trait::async_trait]
impl CallbackNotifier for HttpCallbackNotifier {
    async fn deliver(&self, url: &str, payload: &CallbackPayload) -> bool {
        for attempt in 1..=self.policy.max_attempts() {
            match self.notify(url, payload).await {
                Ok(()) => {
                    info!("Callback success for task: {}", payload.task_id);
                    return true;
                }
                Err(e) => warn!("Callback attempt {} failed: {}", attempt, e),
            }

            if attempt < self.policy.max_attempts() {
                let delay = self.policy.delay_after(attempt);
                info!(
                    "Retrying callback ({}/{}) after {}ms",
                    attempt,
                    self.policy.max_attempts(),
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }
        }

        error!("All callback attempts failed for task: {}", payload.task_id);
        false
    }
}
