//! Database models for sync runs and lock leases.

use diesel::prelude::*;
use expense_ledger_core::sync::SyncState;
use log::warn;

use crate::errors::StorageError;
use crate::values::timestamp_from_db;

#[derive(Queryable, Identifiable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::sync_state)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SyncStateDB {
    pub id: i64,
    pub provider: String,
    pub cursor: Option<String>,
    pub last_run_at: String,
    pub status: String,
    pub message: Option<String>,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::sync_state)]
pub struct NewSyncStateDB {
    pub provider: String,
    pub cursor: Option<String>,
    pub last_run_at: String,
    pub status: String,
    pub message: Option<String>,
}

impl TryFrom<SyncStateDB> for SyncState {
    type Error = StorageError;

    fn try_from(db: SyncStateDB) -> Result<Self, Self::Error> {
        // A cursor that no longer parses restarts from a full sync instead of failing every run.
        let cursor = match db.cursor.as_deref() {
            Some(raw) => match timestamp_from_db(raw) {
                Ok(cursor) => Some(cursor),
                Err(_) => {
                    warn!("[Sync] Ignoring unparseable cursor '{}' on run {}", raw, db.id);
                    None
                }
            },
            None => None,
        };
        let status = db
            .status
            .parse()
            .map_err(|_| StorageError::invalid_value(format!("sync status '{}'", db.status)))?;

        Ok(SyncState {
            cursor,
            status,
            last_run_at: timestamp_from_db(&db.last_run_at)?,
            id: db.id,
            provider: db.provider,
            message: db.message,
        })
    }
}

#[derive(Queryable, Insertable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::sync_locks)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SyncLockDB {
    pub lock_key: i64,
    pub owner: String,
    pub acquired_at: String,
}
