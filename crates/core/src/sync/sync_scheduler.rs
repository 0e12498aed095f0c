//! Periodic and on-demand entry points into the sync orchestrator.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::{SyncRunResult, SyncServiceTrait, SyncStatus};
use crate::errors::{Error, Result};

/// Runs the orchestrator on a fixed interval in a background task.
pub struct SyncScheduler {
    service: Arc<dyn SyncServiceTrait>,
    interval: Duration,
    background_task: Mutex<Option<JoinHandle<()>>>,
}

impl SyncScheduler {
    pub fn new(service: Arc<dyn SyncServiceTrait>, interval: Duration) -> Self {
        Self {
            service,
            interval,
            background_task: Mutex::new(None),
        }
    }

    /// Starts the loop unless it is already running. The first run happens one interval from now.
    pub async fn start(&self) {
        let mut guard = self.background_task.lock().await;
        if let Some(handle) = guard.as_ref() {
            if !handle.is_finished() {
                return;
            }
            guard.take();
        }

        let service = Arc::clone(&self.service);
        let period = self.interval;
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let result = service.run_sync().await;
                match result.status {
                    SyncStatus::Error => {
                        warn!("[SyncScheduler] Scheduled sync failed: {}", result.message)
                    }
                    _ => debug!(
                        "[SyncScheduler] Scheduled sync finished status={} message={}",
                        result.status, result.message
                    ),
                }
            }
        });
        info!(
            "[SyncScheduler] Started with interval of {} seconds",
            period.as_secs()
        );
        *guard = Some(handle);
    }

    /// Cancels the loop and any run in flight. Returns once the task has been dropped,
    /// so a cancelled run's lock release is already queued.
    pub async fn stop(&self) {
        let mut guard = self.background_task.lock().await;
        if let Some(handle) = guard.take() {
            handle.abort();
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    warn!("[SyncScheduler] Background task ended abnormally: {}", e);
                }
            }
            info!("[SyncScheduler] Stopped");
        }
    }

    pub async fn is_running(&self) -> bool {
        self.background_task
            .lock()
            .await
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

/// On-demand sync guarded by the admin token.
pub struct ManualSyncTrigger {
    service: Arc<dyn SyncServiceTrait>,
    admin_token: String,
}

impl ManualSyncTrigger {
    pub fn new(service: Arc<dyn SyncServiceTrait>, admin_token: impl Into<String>) -> Self {
        Self {
            service,
            admin_token: admin_token.into(),
        }
    }

    pub async fn trigger(&self, provided_token: &str) -> Result<SyncRunResult> {
        if self.admin_token.is_empty() || !tokens_match(provided_token, &self.admin_token) {
            return Err(Error::Unauthorized("Invalid admin token".to_string()));
        }
        info!("[Sync] Manual sync requested");
        Ok(self.service.run_sync().await)
    }
}

/// Comparison whose running time does not depend on where the inputs differ.
fn tokens_match(provided: &str, expected: &str) -> bool {
    let (a, b) = (provided.as_bytes(), expected.as_bytes());
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
