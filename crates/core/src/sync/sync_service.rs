use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use uuid::Uuid;

use super::{
    NewSyncState, SyncLockTrait, SyncRunResult, SyncServiceTrait, SyncState,
    SyncStateRepositoryTrait, SyncStatus,
};
use crate::errors::{Error, Result};
use crate::ledger::{LedgerUpsertService, ReportIdMap};
use crate::provider::{ExpenseProviderTrait, PROVIDER_ZOHO_EXPENSE};

/// Lock key shared by every sync entry point.
pub const SYNC_LOCK_KEY: i64 = 812739;

pub const SYNC_SKIPPED_MESSAGE: &str = "Another sync is running";

/// Counts and cursor of a run that reached the end of both collections.
struct CompletedRun {
    reports: usize,
    expenses: usize,
    cursor: DateTime<Utc>,
}

/// Lease on the sync lock held by one run.
///
/// Dropping it while still held, for example when the run's task is aborted,
/// queues the release so the next run is not locked out.
struct SyncLease {
    lock: Arc<dyn SyncLockTrait>,
    owner: String,
    held: bool,
}

impl SyncLease {
    fn new(lock: Arc<dyn SyncLockTrait>) -> Self {
        Self {
            lock,
            owner: Uuid::new_v4().to_string(),
            held: true,
        }
    }

    fn disarm(&mut self) {
        self.held = false;
    }

    /// Extends the lease, failing the run if another owner has taken it over.
    async fn renew(&self) -> Result<()> {
        if self.lock.renew(SYNC_LOCK_KEY, &self.owner).await? {
            return Ok(());
        }
        Err(Error::Unexpected(format!(
            "Sync lock lease of run {} was taken over by another run",
            self.owner
        )))
    }

    async fn release(mut self) {
        let result = self.lock.release(SYNC_LOCK_KEY, &self.owner).await;
        self.held = false;
        if let Err(e) = result {
            error!("[Sync] Failed to release sync lock: {}", e);
        }
    }
}

impl Drop for SyncLease {
    fn drop(&mut self) {
        if self.held {
            warn!(
                "[Sync] Run {} stopped while holding the sync lock, releasing it",
                self.owner
            );
            self.lock.release_in_background(SYNC_LOCK_KEY, &self.owner);
        }
    }
}

/// Pulls reports then expenses from the provider into the ledger.
pub struct SyncService {
    provider_key: String,
    provider: Arc<dyn ExpenseProviderTrait>,
    upserts: LedgerUpsertService,
    state_repository: Arc<dyn SyncStateRepositoryTrait>,
    lock: Arc<dyn SyncLockTrait>,
}

impl SyncService {
    pub fn new(
        provider: Arc<dyn ExpenseProviderTrait>,
        upserts: LedgerUpsertService,
        state_repository: Arc<dyn SyncStateRepositoryTrait>,
        lock: Arc<dyn SyncLockTrait>,
    ) -> Self {
        Self {
            provider_key: PROVIDER_ZOHO_EXPENSE.to_string(),
            provider,
            upserts,
            state_repository,
            lock,
        }
    }

    fn current_cursor(&self) -> Result<Option<DateTime<Utc>>> {
        self.state_repository
            .latest_successful_cursor(&self.provider_key)
    }

    async fn sync_reports(
        &self,
        since: Option<DateTime<Utc>>,
        lease: &SyncLease,
    ) -> Result<(ReportIdMap, usize)> {
        let mut report_ids = ReportIdMap::new();
        let mut count = 0;
        let mut page = 1;
        loop {
            let batch = self.provider.list_reports(since, page).await?;
            debug!(
                "[Sync] Reports page {} returned {} items (has_more={})",
                page,
                batch.items.len(),
                batch.has_more
            );
            for raw in &batch.items {
                if let Some(local_id) = self.upserts.upsert_report(raw).await? {
                    if let Some(key) = crate::ledger::normalize::report_provider_id(raw) {
                        report_ids.insert(key, local_id);
                    }
                }
                count += 1;
            }
            if !batch.has_more {
                break;
            }
            lease.renew().await?;
            page += 1;
        }
        Ok((report_ids, count))
    }

    async fn sync_expenses(
        &self,
        since: Option<DateTime<Utc>>,
        report_ids: &ReportIdMap,
        lease: &SyncLease,
    ) -> Result<usize> {
        let mut count = 0;
        let mut page = 1;
        loop {
            let batch = self.provider.list_expenses(since, page).await?;
            debug!(
                "[Sync] Expenses page {} returned {} items (has_more={})",
                page,
                batch.items.len(),
                batch.has_more
            );
            for raw in &batch.items {
                self.upserts.upsert_expense(raw, report_ids).await?;
                count += 1;
            }
            if !batch.has_more {
                break;
            }
            lease.renew().await?;
            page += 1;
        }
        Ok(count)
    }

    async fn run_locked(
        &self,
        since: Option<DateTime<Utc>>,
        lease: &SyncLease,
    ) -> Result<CompletedRun> {
        let (report_ids, reports) = self.sync_reports(since, lease).await?;
        lease.renew().await?;

        // Taken before expense pagination so records modified mid-run are fetched again next time.
        let cursor = Utc::now();
        let expenses = self.sync_expenses(since, &report_ids, lease).await?;

        Ok(CompletedRun {
            reports,
            expenses,
            cursor,
        })
    }

    async fn record(&self, status: SyncStatus, cursor: Option<DateTime<Utc>>, message: &str) {
        let state = NewSyncState {
            provider: self.provider_key.clone(),
            cursor,
            status,
            message: Some(message.to_string()),
        };
        if let Err(e) = self.state_repository.record(state).await {
            error!("[Sync] Failed to record {} sync state: {}", status, e);
        }
    }

    async fn run_with_lock(&self, lease: &SyncLease) -> SyncRunResult {
        let since = match self.current_cursor() {
            Ok(cursor) => cursor,
            Err(e) => {
                let message = e.to_string();
                self.record(SyncStatus::Error, None, &message).await;
                return SyncRunResult::not_run(SyncStatus::Error, None, message);
            }
        };
        debug!(
            "[Sync] Run {} starting from cursor {}",
            lease.owner,
            since.map(|c| c.to_rfc3339()).unwrap_or_else(|| "<none>".into())
        );

        match self.run_locked(since, lease).await {
            Ok(run) => {
                let result = SyncRunResult::success(run.reports, run.expenses, run.cursor);
                self.record(SyncStatus::Success, result.cursor, &result.message)
                    .await;
                info!("[Sync] {}", result.message);
                result
            }
            Err(e) => {
                let message = e.to_string();
                warn!("[Sync] Run failed: {}", message);
                self.record(SyncStatus::Error, since, &message).await;
                SyncRunResult::not_run(SyncStatus::Error, since, message)
            }
        }
    }
}

#[async_trait]
impl SyncServiceTrait for SyncService {
    async fn run_sync(&self) -> SyncRunResult {
        // Armed before acquiring so a run cancelled mid-acquire still gives the lease back.
        let mut lease = SyncLease::new(Arc::clone(&self.lock));

        match self.lock.try_acquire(SYNC_LOCK_KEY, &lease.owner).await {
            Ok(true) => {}
            Ok(false) => {
                lease.disarm();
                info!("[Sync] Skipped: {}", SYNC_SKIPPED_MESSAGE);
                let cursor = self.current_cursor().unwrap_or_else(|e| {
                    warn!("[Sync] Could not read cursor for skipped run: {}", e);
                    None
                });
                self.record(SyncStatus::Skipped, cursor, SYNC_SKIPPED_MESSAGE)
                    .await;
                return SyncRunResult::not_run(SyncStatus::Skipped, cursor, SYNC_SKIPPED_MESSAGE);
            }
            Err(e) => {
                lease.disarm();
                let message = e.to_string();
                error!("[Sync] Could not acquire sync lock: {}", message);
                let cursor = self.current_cursor().ok().flatten();
                self.record(SyncStatus::Error, cursor, &message).await;
                return SyncRunResult::not_run(SyncStatus::Error, cursor, message);
            }
        }

        let result = self.run_with_lock(&lease).await;
        lease.release().await;
        result
    }

    fn latest_sync_state(&self) -> Result<Option<SyncState>> {
        self.state_repository.latest(&self.provider_key)
    }

    fn sync_history(&self, limit: i64) -> Result<Vec<SyncState>> {
        self.state_repository
            .history(&self.provider_key, limit.clamp(1, 500))
    }
}
