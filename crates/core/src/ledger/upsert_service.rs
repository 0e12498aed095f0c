use std::collections::HashMap;
use std::sync::Arc;

use log::debug;
use serde_json::Value;

use super::normalize::{expense_from_raw, report_from_raw};
use super::LedgerRepositoryTrait;
use crate::errors::Result;

/// Maps provider report ids to local report ids for one sync run.
pub type ReportIdMap = HashMap<String, i64>;

/// Idempotent ingestion of raw provider records.
pub struct LedgerUpsertService {
    repository: Arc<dyn LedgerRepositoryTrait>,
}

impl LedgerUpsertService {
    pub fn new(repository: Arc<dyn LedgerRepositoryTrait>) -> Self {
        Self { repository }
    }

    /// `None` for a missing or blank name.
    pub async fn upsert_vendor(&self, name: Option<&str>) -> Result<Option<i64>> {
        match name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => self.repository.upsert_vendor(name.to_string()).await.map(Some),
            None => Ok(None),
        }
    }

    pub async fn upsert_category(&self, name: Option<&str>) -> Result<Option<i64>> {
        match name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => self
                .repository
                .upsert_category(name.to_string())
                .await
                .map(Some),
            None => Ok(None),
        }
    }

    /// Returns the local id, or `None` when the payload has no provider id.
    pub async fn upsert_report(&self, raw: &Value) -> Result<Option<i64>> {
        let Some(report) = report_from_raw(raw)? else {
            debug!("[Upsert] Skipping report without identifier");
            return Ok(None);
        };
        self.repository.upsert_report(report).await.map(Some)
    }

    /// Upserts an expense, resolving its report only through `report_ids`.
    ///
    /// An unresolved report reference leaves the link null on insert and
    /// untouched on update.
    pub async fn upsert_expense(&self, raw: &Value, report_ids: &ReportIdMap) -> Result<Option<i64>> {
        let Some(expense) = expense_from_raw(raw)? else {
            debug!("[Upsert] Skipping expense without identifier");
            return Ok(None);
        };

        let vendor_id = self.upsert_vendor(expense.vendor_name.as_deref()).await?;
        let category_id = self.upsert_category(expense.category_name.as_deref()).await?;
        let report_id = expense
            .report_ref
            .as_ref()
            .and_then(|key| report_ids.get(key).copied());

        let upsert = expense.into_upsert(report_id, vendor_id, category_id);
        self.repository.upsert_expense(upsert).await.map(Some)
    }
}
