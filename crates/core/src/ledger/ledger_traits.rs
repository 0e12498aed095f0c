use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::{Category, Expense, ExpenseListFilter, ExpenseReport, ExpenseUpsert, ReportUpsert};
use crate::errors::Result;

/// Idempotent writes keyed by natural or provider identifiers.
///
/// Each call commits on its own.
#[async_trait]
pub trait LedgerRepositoryTrait: Send + Sync {
    /// Inserts the vendor if missing and returns its id. Safe under concurrent inserts.
    async fn upsert_vendor(&self, name: String) -> Result<i64>;

    async fn upsert_category(&self, name: String) -> Result<i64>;

    /// Creates or refreshes a report keyed by its provider id.
    async fn upsert_report(&self, report: ReportUpsert) -> Result<i64>;

    /// Creates or refreshes the provider-owned fields of an expense keyed by its provider id.
    async fn upsert_expense(&self, expense: ExpenseUpsert) -> Result<i64>;
}

/// Reads and local workflow updates over stored expenses.
#[async_trait]
pub trait ExpenseRepositoryTrait: Send + Sync {
    /// Newest transaction date first.
    fn list_expenses(&self, filter: &ExpenseListFilter) -> Result<Vec<Expense>>;

    fn get_expense(&self, expense_id: i64) -> Result<Option<Expense>>;

    fn get_expense_by_provider_id(&self, provider_expense_id: &str) -> Result<Option<Expense>>;

    /// Every stored expense, for aggregation.
    fn load_all_expenses(&self) -> Result<Vec<Expense>>;

    /// Expenses without a reconciliation reference whose merchant contains `merchant`,
    /// ignoring ASCII case.
    fn find_unmatched_by_merchant(&self, merchant: &str) -> Result<Vec<Expense>>;

    fn list_reports(&self) -> Result<Vec<ExpenseReport>>;

    fn get_report_by_provider_id(&self, provider_report_id: &str)
        -> Result<Option<ExpenseReport>>;

    fn list_categories(&self) -> Result<Vec<Category>>;

    /// Marks expenses reimbursed on `paid_on`. `amount` overrides the per-expense amount.
    async fn mark_reimbursed(
        &self,
        expense_ids: Vec<i64>,
        amount: Option<Decimal>,
        paid_on: NaiveDate,
    ) -> Result<usize>;

    /// Sets or clears the company T&E report label.
    async fn assign_te_report(&self, expense_ids: Vec<i64>, label: Option<String>)
        -> Result<usize>;

    /// Records a reconciliation reference and company report status.
    async fn set_external_ref(
        &self,
        expense_id: i64,
        reference: String,
        company_report_status: String,
    ) -> Result<Option<Expense>>;
}
