use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use log::info;
use rust_decimal::Decimal;

use super::{Expense, ExpenseListFilter, ExpenseRepositoryTrait, TeReportSummary};
use crate::errors::{Error, Result};

#[async_trait]
pub trait ExpenseServiceTrait: Send + Sync {
    fn list_expenses(&self, filter: ExpenseListFilter) -> Result<Vec<Expense>>;

    /// Marks expenses reimbursed today. Returns the number of rows updated.
    async fn mark_reimbursed(&self, expense_ids: Vec<i64>, amount: Option<Decimal>)
        -> Result<usize>;

    async fn assign_te_report(&self, expense_ids: Vec<i64>, label: Option<String>)
        -> Result<usize>;

    fn list_te_reports(&self) -> Result<Vec<TeReportSummary>>;
}

pub struct ExpenseService {
    repository: Arc<dyn ExpenseRepositoryTrait>,
}

impl ExpenseService {
    pub fn new(repository: Arc<dyn ExpenseRepositoryTrait>) -> Self {
        Self { repository }
    }

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }
}

#[async_trait]
impl ExpenseServiceTrait for ExpenseService {
    fn list_expenses(&self, filter: ExpenseListFilter) -> Result<Vec<Expense>> {
        let limit = filter.effective_limit();
        let filter = ExpenseListFilter {
            reimbursement_status: filter
                .reimbursement_status
                .filter(|status| !status.trim().is_empty()),
            limit: Some(limit),
        };
        self.repository.list_expenses(&filter)
    }

    async fn mark_reimbursed(
        &self,
        expense_ids: Vec<i64>,
        amount: Option<Decimal>,
    ) -> Result<usize> {
        if expense_ids.is_empty() {
            return Ok(0);
        }
        if amount.is_some_and(|a| a.is_sign_negative()) {
            return Err(Error::invalid_data("Reimbursed amount cannot be negative"));
        }
        let updated = self
            .repository
            .mark_reimbursed(expense_ids, amount, Self::today())
            .await?;
        info!("Marked {} expenses as reimbursed", updated);
        Ok(updated)
    }

    async fn assign_te_report(
        &self,
        expense_ids: Vec<i64>,
        label: Option<String>,
    ) -> Result<usize> {
        if expense_ids.is_empty() {
            return Ok(0);
        }
        let label = label
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty());
        self.repository.assign_te_report(expense_ids, label).await
    }

    fn list_te_reports(&self) -> Result<Vec<TeReportSummary>> {
        let mut by_label: BTreeMap<String, TeReportSummary> = BTreeMap::new();
        for expense in self.repository.load_all_expenses()? {
            let Some(label) = expense.te_report.clone() else {
                continue;
            };
            let entry = by_label
                .entry(label.clone())
                .or_insert_with(|| TeReportSummary {
                    label,
                    expense_count: 0,
                    total_home_amount: Decimal::ZERO,
                });
            entry.expense_count += 1;
            entry.total_home_amount += expense.home_amount();
        }
        Ok(by_label.into_values().collect())
    }
}
