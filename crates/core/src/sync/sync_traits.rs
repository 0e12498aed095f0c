use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{NewSyncState, SyncRunResult, SyncState};
use crate::errors::Result;

/// Append-only log of sync runs.
#[async_trait]
pub trait SyncStateRepositoryTrait: Send + Sync {
    /// Newest recorded run for `provider`.
    fn latest(&self, provider: &str) -> Result<Option<SyncState>>;

    /// Cursor of the newest successful run. Skipped and failed runs never move it.
    fn latest_successful_cursor(&self, provider: &str) -> Result<Option<DateTime<Utc>>>;

    /// Most recent runs first.
    fn history(&self, provider: &str, limit: i64) -> Result<Vec<SyncState>>;

    /// Appends a run stamped with the current time.
    async fn record(&self, state: NewSyncState) -> Result<SyncState>;
}

/// Store-level named lock shared by every process using the same database.
#[async_trait]
pub trait SyncLockTrait: Send + Sync {
    /// Non-blocking. Returns `false` while another owner holds a live lease on `key`.
    async fn try_acquire(&self, key: i64, owner: &str) -> Result<bool>;

    /// Extends a live lease. Returns `false` once `owner` no longer holds `key`.
    async fn renew(&self, key: i64, owner: &str) -> Result<bool>;

    /// Releases the lease if `owner` still holds it.
    async fn release(&self, key: i64, owner: &str) -> Result<()>;

    /// Queues a release without waiting for it. Used when a run is dropped mid-flight.
    fn release_in_background(&self, key: i64, owner: &str);
}

#[async_trait]
pub trait SyncServiceTrait: Send + Sync {
    /// Runs one sync cycle. Failures are recorded and reported in the result, never returned.
    async fn run_sync(&self) -> SyncRunResult;

    fn latest_sync_state(&self) -> Result<Option<SyncState>>;

    fn sync_history(&self, limit: i64) -> Result<Vec<SyncState>>;
}
