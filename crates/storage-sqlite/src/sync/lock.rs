//! Lease-based named lock stored in `sync_locks`.
//!
//! SQLite has no advisory locks, so a lease row stands in for one. A lease older
//! than `stale_after` is treated as abandoned by a crashed holder and is reclaimed.
//! Holders renew it between pages to keep long runs from looking abandoned.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use diesel::prelude::*;
use diesel::SqliteConnection;
use expense_ledger_core::sync::SyncLockTrait;
use expense_ledger_core::Result;
use log::{debug, error, warn};

use super::model::SyncLockDB;
use crate::db::WriteHandle;
use crate::errors::StorageError;
use crate::schema::sync_locks;
use crate::values::timestamp_to_db;

pub const DEFAULT_LOCK_STALE_AFTER_MINUTES: i64 = 60;

pub struct SqliteSyncLock {
    writer: WriteHandle,
    stale_after: Duration,
}

impl SqliteSyncLock {
    pub fn new(writer: WriteHandle) -> Self {
        Self {
            writer,
            stale_after: Duration::minutes(DEFAULT_LOCK_STALE_AFTER_MINUTES),
        }
    }

    pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = stale_after;
        self
    }
}

#[async_trait]
impl SyncLockTrait for SqliteSyncLock {
    async fn try_acquire(&self, key: i64, owner: &str) -> Result<bool> {
        let now = Utc::now();
        let stale_before = timestamp_to_db(now - self.stale_after);
        let lease = SyncLockDB {
            lock_key: key,
            owner: owner.to_string(),
            acquired_at: timestamp_to_db(now),
        };

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<bool> {
                let reclaimed = diesel::delete(
                    sync_locks::table
                        .filter(sync_locks::lock_key.eq(key))
                        .filter(sync_locks::acquired_at.lt(&stale_before)),
                )
                .execute(conn)
                .map_err(StorageError::from)?;
                if reclaimed > 0 {
                    warn!("[SyncLock] Reclaimed stale lease on key {}", key);
                }

                let inserted = diesel::insert_into(sync_locks::table)
                    .values(&lease)
                    .on_conflict(sync_locks::lock_key)
                    .do_nothing()
                    .execute(conn)
                    .map_err(StorageError::from)?;
                debug!(
                    "[SyncLock] key {} owner {} acquired={}",
                    key,
                    lease.owner,
                    inserted == 1
                );
                Ok(inserted == 1)
            })
            .await
    }

    async fn renew(&self, key: i64, owner: &str) -> Result<bool> {
        let owner = owner.to_string();
        let now = timestamp_to_db(Utc::now());
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<bool> {
                let renewed = diesel::update(
                    sync_locks::table
                        .filter(sync_locks::lock_key.eq(key))
                        .filter(sync_locks::owner.eq(&owner)),
                )
                .set(sync_locks::acquired_at.eq(&now))
                .execute(conn)
                .map_err(StorageError::from)?;
                if renewed == 0 {
                    warn!("[SyncLock] Owner {} no longer holds key {}", owner, key);
                }
                Ok(renewed == 1)
            })
            .await
    }

    async fn release(&self, key: i64, owner: &str) -> Result<()> {
        let owner = owner.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| delete_lease(conn, key, &owner))
            .await
    }

    fn release_in_background(&self, key: i64, owner: &str) {
        let owner = owner.to_string();
        if let Err(e) = self
            .writer
            .submit(move |conn: &mut SqliteConnection| delete_lease(conn, key, &owner))
        {
            error!("[SyncLock] Could not queue release of key {}: {}", key, e);
        }
    }
}

fn delete_lease(conn: &mut SqliteConnection, key: i64, owner: &str) -> Result<()> {
    diesel::delete(
        sync_locks::table
            .filter(sync_locks::lock_key.eq(key))
            .filter(sync_locks::owner.eq(owner)),
    )
    .execute(conn)
    .map_err(StorageError::from)?;
    Ok(())
}
