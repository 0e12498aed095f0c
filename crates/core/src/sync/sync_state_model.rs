use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::Error;

/// Outcome recorded for a sync run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Success,
    Error,
    Skipped,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Success => "success",
            SyncStatus::Error => "error",
            SyncStatus::Skipped => "skipped",
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncStatus {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "success" => Ok(SyncStatus::Success),
            "error" => Ok(SyncStatus::Error),
            "skipped" => Ok(SyncStatus::Skipped),
            other => Err(Error::invalid_data(format!("Unknown sync status '{}'", other))),
        }
    }
}

/// One persisted sync run. The newest row per provider is the current state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncState {
    pub id: i64,
    pub provider: String,
    pub cursor: Option<DateTime<Utc>>,
    pub last_run_at: DateTime<Utc>,
    pub status: SyncStatus,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSyncState {
    pub provider: String,
    pub cursor: Option<DateTime<Utc>>,
    pub status: SyncStatus,
    pub message: Option<String>,
}

/// What a single orchestrator invocation did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRunResult {
    pub status: SyncStatus,
    pub reports_synced: usize,
    pub expenses_synced: usize,
    /// Cursor persisted by this run.
    pub cursor: Option<DateTime<Utc>>,
    pub message: String,
}

impl SyncRunResult {
    pub fn success(
        reports_synced: usize,
        expenses_synced: usize,
        cursor: DateTime<Utc>,
    ) -> Self {
        Self {
            status: SyncStatus::Success,
            reports_synced,
            expenses_synced,
            cursor: Some(cursor),
            message: format!(
                "Synced {} reports, {} expenses",
                reports_synced, expenses_synced
            ),
        }
    }

    pub fn not_run(
        status: SyncStatus,
        cursor: Option<DateTime<Utc>>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status,
            reports_synced: 0,
            expenses_synced: 0,
            cursor,
            message: message.into(),
        }
    }
}
