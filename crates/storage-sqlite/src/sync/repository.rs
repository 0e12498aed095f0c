use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::SqliteConnection;
use expense_ledger_core::sync::{NewSyncState, SyncState, SyncStateRepositoryTrait, SyncStatus};
use expense_ledger_core::Result;

use super::model::{NewSyncStateDB, SyncStateDB};
use crate::db::{get_connection, WriteHandle};
use crate::errors::StorageError;
use crate::schema::sync_state;
use crate::values::timestamp_to_db;

pub struct SyncStateRepository {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
    writer: WriteHandle,
}

impl SyncStateRepository {
    pub fn new(
        pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
        writer: WriteHandle,
    ) -> Self {
        Self { pool, writer }
    }
}

#[async_trait]
impl SyncStateRepositoryTrait for SyncStateRepository {
    fn latest(&self, provider: &str) -> Result<Option<SyncState>> {
        let mut conn = get_connection(&self.pool)?;
        let row = sync_state::table
            .filter(sync_state::provider.eq(provider))
            .order(sync_state::id.desc())
            .select(SyncStateDB::as_select())
            .first::<SyncStateDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        Ok(row.map(SyncState::try_from).transpose()?)
    }

    fn latest_successful_cursor(&self, provider: &str) -> Result<Option<DateTime<Utc>>> {
        let mut conn = get_connection(&self.pool)?;
        let row = sync_state::table
            .filter(sync_state::provider.eq(provider))
            .filter(sync_state::status.eq(SyncStatus::Success.as_str()))
            .filter(sync_state::cursor.is_not_null())
            .order(sync_state::id.desc())
            .select(SyncStateDB::as_select())
            .first::<SyncStateDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        let state = row.map(SyncState::try_from).transpose()?;
        Ok(state.and_then(|s| s.cursor))
    }

    fn history(&self, provider: &str, limit: i64) -> Result<Vec<SyncState>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = sync_state::table
            .filter(sync_state::provider.eq(provider))
            .order(sync_state::id.desc())
            .limit(limit)
            .select(SyncStateDB::as_select())
            .load::<SyncStateDB>(&mut conn)
            .map_err(StorageError::from)?;
        let states = rows
            .into_iter()
            .map(SyncState::try_from)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StorageError::from)?;
        Ok(states)
    }

    async fn record(&self, state: NewSyncState) -> Result<SyncState> {
        let row = NewSyncStateDB {
            provider: state.provider,
            cursor: state.cursor.map(timestamp_to_db),
            last_run_at: timestamp_to_db(Utc::now()),
            status: state.status.as_str().to_string(),
            message: state.message,
        };

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<SyncState> {
                let stored = diesel::insert_into(sync_state::table)
                    .values(&row)
                    .returning(SyncStateDB::as_returning())
                    .get_result::<SyncStateDB>(conn)
                    .map_err(StorageError::from)?;
                Ok(SyncState::try_from(stored)?)
            })
            .await
    }
}
