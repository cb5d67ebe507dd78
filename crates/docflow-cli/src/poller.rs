//! Per-record status polling
//!
//! Each record that reaches `Processing` gets its own loop: wait
//! `initial_delay`, then query the status endpoint every `interval` until a
//! terminal phase arrives or `max_attempts` queries have been made. The
//! ceiling is fixed; there is no backoff.

use crate::api::DocumentApi;
use crate::batch::Batch;
use crate::error::RecordError;
use crate::record::{RecordId, RecordUpdate};
use docflow_common::types::RemotePhase;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_POLL_MAX_ATTEMPTS: u32 = 60;
pub const DEFAULT_POLL_INITIAL_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub initial_delay: Duration,
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            initial_delay: DEFAULT_POLL_INITIAL_DELAY,
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_POLL_MAX_ATTEMPTS,
        }
    }
}

impl PollConfig {
    /// Latest point, measured from the start of the loop, at which a record
    /// can still be waiting on its final status query
    pub fn wall_clock_bound(&self) -> Duration {
        self.initial_delay.max(self.interval)
            + self.interval * self.max_attempts.saturating_sub(1)
    }
}

/// How a polling loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Completed,
    Failed,
    TimedOut,
    /// The record was removed or finished elsewhere
    Retired,
}

#[derive(Clone)]
pub struct StatusPoller {
    batch: Batch,
    api: Arc<dyn DocumentApi>,
    config: PollConfig,
}

impl StatusPoller {
    pub fn new(batch: Batch, api: Arc<dyn DocumentApi>, config: PollConfig) -> Self {
        Self { batch, api, config }
    }

    pub fn spawn(self, id: RecordId, correlation_id: String) -> JoinHandle<PollOutcome> {
        tokio::spawn(async move { self.run(id, &correlation_id).await })
    }

    pub async fn run(&self, id: RecordId, correlation_id: &str) -> PollOutcome {
        let started = Instant::now();
        let mut last_error: Option<String> = None;

        sleep(self.config.initial_delay).await;

        for attempt in 1..=self.config.max_attempts {
            if !self.batch.is_live(id) {
                debug!(
                    record_id = %id,
                    correlation_id,
                    attempt,
                    "Record no longer live, stopping poll loop"
                );
                return PollOutcome::Retired;
            }

            match self.api.status(correlation_id).await {
                Ok(response) => {
                    let phase = response.status;
                    debug!(
                        record_id = %id,
                        correlation_id,
                        attempt,
                        phase = %phase,
                        "Status received"
                    );

                    let outcome = match phase {
                        RemotePhase::Completed => Some(PollOutcome::Completed),
                        RemotePhase::Failed => Some(PollOutcome::Failed),
                        _ => None,
                    };

                    let _ = self.batch.apply(
                        id,
                        RecordUpdate::Phase {
                            phase,
                            error: response.error,
                        },
                    );

                    if let Some(outcome) = outcome {
                        info!(
                            record_id = %id,
                            correlation_id,
                            attempt,
                            outcome = ?outcome,
                            "Processing finished"
                        );
                        return outcome;
                    }
                },
                Err(e) => {
                    warn!(
                        record_id = %id,
                        correlation_id,
                        attempt,
                        error = %e,
                        "Status query failed"
                    );
                    last_error = Some(e.to_string());
                },
            }

            if attempt < self.config.max_attempts {
                sleep(self.config.interval).await;
            }
        }

        if !self.batch.is_live(id) {
            return PollOutcome::Retired;
        }

        let elapsed = started.elapsed();
        warn!(
            record_id = %id,
            correlation_id,
            attempts = self.config.max_attempts,
            elapsed_secs = elapsed.as_secs(),
            "Processing timed out"
        );
        let _ = self.batch.apply(
            id,
            RecordUpdate::Fail(RecordError::Timeout {
                attempts: self.config.max_attempts,
                elapsed,
                last_error,
            }),
        );
        PollOutcome::TimedOut
    }
}
