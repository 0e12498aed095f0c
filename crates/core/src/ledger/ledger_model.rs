use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const REIMBURSEMENT_STATUS_NOT_REIMBURSED: &str = "Not Reimbursed";
pub const REIMBURSEMENT_STATUS_REIMBURSED: &str = "Reimbursed";
pub const COMPANY_REPORT_STATUS_PENDING: &str = "Pending";
pub const COMPANY_REPORT_STATUS_MATCHED: &str = "Matched";

/// Default and maximum row counts for expense listings.
pub const DEFAULT_EXPENSE_LIST_LIMIT: i64 = 100;
pub const MAX_EXPENSE_LIST_LIMIT: i64 = 500;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vendor {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// Expense report as last seen from the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseReport {
    pub id: i64,
    pub provider_report_id: String,
    pub title: Option<String>,
    pub report_number: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: Option<String>,
    pub total_amount: Option<Decimal>,
    pub currency: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A single expense line.
///
/// Fields from `reimbursable` through `te_report` are owned locally and never
/// written by provider sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: i64,
    pub provider_expense_id: String,
    pub report_id: Option<i64>,
    pub txn_date: NaiveDate,
    pub merchant: Option<String>,
    pub vendor_id: Option<i64>,
    pub category_id: Option<i64>,
    pub description: Option<String>,
    pub amount: Decimal,
    pub currency: String,
    pub exchange_rate: Option<Decimal>,
    pub amount_home: Option<Decimal>,
    pub payment_mode: Option<String>,
    pub reimbursable: bool,
    pub company_report_status: String,
    pub reimbursement_status: String,
    pub reimbursed_amount: Decimal,
    pub reimbursed_date: Option<NaiveDate>,
    pub external_ref: Option<String>,
    pub te_report: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Expense {
    pub fn is_reimbursed(&self) -> bool {
        self.reimbursement_status == REIMBURSEMENT_STATUS_REIMBURSED
    }

    /// Home-currency amount, falling back to the transaction amount.
    pub fn home_amount(&self) -> Decimal {
        self.amount_home.unwrap_or(self.amount)
    }
}

/// Receipt or file attached to an expense.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: i64,
    pub expense_id: i64,
    pub provider_file_id: Option<String>,
    pub filename: Option<String>,
    pub mime_type: Option<String>,
    pub size_bytes: Option<i64>,
    pub url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Provider-owned report fields written on every sync.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReportUpsert {
    pub provider_report_id: String,
    pub title: Option<String>,
    pub report_number: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: Option<String>,
    pub total_amount: Option<Decimal>,
    pub currency: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
}

/// Provider-owned expense fields after vendor, category and report resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseUpsert {
    pub provider_expense_id: String,
    /// `None` keeps an existing link on update.
    pub report_id: Option<i64>,
    pub txn_date: NaiveDate,
    pub merchant: Option<String>,
    pub vendor_id: Option<i64>,
    pub category_id: Option<i64>,
    pub description: Option<String>,
    pub amount: Decimal,
    pub currency: String,
    pub exchange_rate: Option<Decimal>,
    pub amount_home: Option<Decimal>,
    pub payment_mode: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseListFilter {
    pub reimbursement_status: Option<String>,
    pub limit: Option<i64>,
}

impl ExpenseListFilter {
    /// Requested limit clamped to `1..=MAX_EXPENSE_LIST_LIMIT`.
    pub fn effective_limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_EXPENSE_LIST_LIMIT)
            .clamp(1, MAX_EXPENSE_LIST_LIMIT)
    }
}

/// Company T&E report label with its assigned expenses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeReportSummary {
    pub label: String,
    pub expense_count: usize,
    pub total_home_amount: Decimal,
}
