//! In-memory ledger store shared by service tests.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;

use super::*;
use crate::errors::Result;

#[derive(Default)]
struct LedgerState {
    next_id: i64,
    vendors: Vec<Vendor>,
    categories: Vec<Category>,
    reports: Vec<ExpenseReport>,
    expenses: Vec<Expense>,
}

impl LedgerState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Default)]
pub struct InMemoryLedger {
    state: Mutex<LedgerState>,
}

impl InMemoryLedger {
    pub fn vendors(&self) -> Vec<Vendor> {
        self.state.lock().unwrap().vendors.clone()
    }

    pub fn expenses(&self) -> Vec<Expense> {
        self.state.lock().unwrap().expenses.clone()
    }

    pub fn reports(&self) -> Vec<ExpenseReport> {
        self.state.lock().unwrap().reports.clone()
    }

    pub fn add_category(&self, name: &str) -> i64 {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id();
        state.categories.push(Category {
            id,
            name: name.to_string(),
        });
        id
    }

    /// Stores a fully-formed expense, assigning its id.
    pub fn push_expense(&self, mut expense: Expense) -> i64 {
        let mut state = self.state.lock().unwrap();
        expense.id = state.next_id();
        let id = expense.id;
        state.expenses.push(expense);
        id
    }

    pub fn update_expense<F: FnOnce(&mut Expense)>(&self, expense_id: i64, f: F) {
        let mut state = self.state.lock().unwrap();
        if let Some(expense) = state.expenses.iter_mut().find(|e| e.id == expense_id) {
            f(expense);
        }
    }
}

/// Expense with workflow defaults, ready for `push_expense`.
pub fn sample_expense(provider_id: &str, txn_date: NaiveDate, amount: Decimal) -> Expense {
    let now = Utc::now();
    Expense {
        id: 0,
        provider_expense_id: provider_id.to_string(),
        report_id: None,
        txn_date,
        merchant: None,
        vendor_id: None,
        category_id: None,
        description: None,
        amount,
        currency: "USD".to_string(),
        exchange_rate: None,
        amount_home: None,
        payment_mode: None,
        reimbursable: true,
        company_report_status: COMPANY_REPORT_STATUS_PENDING.to_string(),
        reimbursement_status: REIMBURSEMENT_STATUS_NOT_REIMBURSED.to_string(),
        reimbursed_amount: Decimal::ZERO,
        reimbursed_date: None,
        external_ref: None,
        te_report: None,
        created_at: now,
        updated_at: now,
    }
}

#[async_trait]
impl LedgerRepositoryTrait for InMemoryLedger {
    async fn upsert_vendor(&self, name: String) -> Result<i64> {
        let mut state = self.state.lock().unwrap();
        if let Some(vendor) = state.vendors.iter().find(|v| v.name == name) {
            return Ok(vendor.id);
        }
        let id = state.next_id();
        state.vendors.push(Vendor { id, name });
        Ok(id)
    }

    async fn upsert_category(&self, name: String) -> Result<i64> {
        let mut state = self.state.lock().unwrap();
        if let Some(category) = state.categories.iter().find(|c| c.name == name) {
            return Ok(category.id);
        }
        let id = state.next_id();
        state.categories.push(Category { id, name });
        Ok(id)
    }

    async fn upsert_report(&self, report: ReportUpsert) -> Result<i64> {
        let mut state = self.state.lock().unwrap();
        let now = Utc::now();
        if let Some(existing) = state
            .reports
            .iter_mut()
            .find(|r| r.provider_report_id == report.provider_report_id)
        {
            existing.title = report.title;
            existing.report_number = report.report_number;
            existing.start_date = report.start_date;
            existing.end_date = report.end_date;
            existing.status = report.status;
            existing.total_amount = report.total_amount;
            existing.currency = report.currency;
            existing.submitted_at = report.submitted_at;
            existing.approved_at = report.approved_at;
            existing.updated_at = now;
            return Ok(existing.id);
        }
        let id = state.next_id();
        state.reports.push(ExpenseReport {
            id,
            provider_report_id: report.provider_report_id,
            title: report.title,
            report_number: report.report_number,
            start_date: report.start_date,
            end_date: report.end_date,
            status: report.status,
            total_amount: report.total_amount,
            currency: report.currency,
            submitted_at: report.submitted_at,
            approved_at: report.approved_at,
            created_at: now,
            updated_at: now,
        });
        Ok(id)
    }

    async fn upsert_expense(&self, upsert: ExpenseUpsert) -> Result<i64> {
        let mut state = self.state.lock().unwrap();
        if let Some(existing) = state
            .expenses
            .iter_mut()
            .find(|e| e.provider_expense_id == upsert.provider_expense_id)
        {
            if upsert.report_id.is_some() {
                existing.report_id = upsert.report_id;
            }
            existing.txn_date = upsert.txn_date;
            existing.merchant = upsert.merchant;
            existing.vendor_id = upsert.vendor_id;
            existing.category_id = upsert.category_id;
            existing.description = upsert.description;
            existing.amount = upsert.amount;
            existing.currency = upsert.currency;
            existing.exchange_rate = upsert.exchange_rate;
            existing.amount_home = upsert.amount_home;
            existing.payment_mode = upsert.payment_mode;
            existing.updated_at = Utc::now();
            return Ok(existing.id);
        }
        let id = state.next_id();
        let mut expense = sample_expense(&upsert.provider_expense_id, upsert.txn_date, upsert.amount);
        expense.id = id;
        expense.report_id = upsert.report_id;
        expense.merchant = upsert.merchant;
        expense.vendor_id = upsert.vendor_id;
        expense.category_id = upsert.category_id;
        expense.description = upsert.description;
        expense.currency = upsert.currency;
        expense.exchange_rate = upsert.exchange_rate;
        expense.amount_home = upsert.amount_home;
        expense.payment_mode = upsert.payment_mode;
        state.expenses.push(expense);
        Ok(id)
    }
}

#[async_trait]
impl ExpenseRepositoryTrait for InMemoryLedger {
    fn list_expenses(&self, filter: &ExpenseListFilter) -> Result<Vec<Expense>> {
        let mut rows: Vec<Expense> = self
            .expenses()
            .into_iter()
            .filter(|e| {
                filter
                    .reimbursement_status
                    .as_ref()
                    .map_or(true, |status| &e.reimbursement_status == status)
            })
            .collect();
        rows.sort_by(|a, b| b.txn_date.cmp(&a.txn_date).then(b.id.cmp(&a.id)));
        rows.truncate(filter.effective_limit() as usize);
        Ok(rows)
    }

    fn get_expense(&self, expense_id: i64) -> Result<Option<Expense>> {
        Ok(self.expenses().into_iter().find(|e| e.id == expense_id))
    }

    fn get_expense_by_provider_id(&self, provider_expense_id: &str) -> Result<Option<Expense>> {
        Ok(self
            .expenses()
            .into_iter()
            .find(|e| e.provider_expense_id == provider_expense_id))
    }

    fn load_all_expenses(&self) -> Result<Vec<Expense>> {
        Ok(self.expenses())
    }

    fn find_unmatched_by_merchant(&self, merchant: &str) -> Result<Vec<Expense>> {
        let needle = merchant.to_ascii_lowercase();
        Ok(self
            .expenses()
            .into_iter()
            .filter(|e| e.external_ref.is_none())
            .filter(|e| {
                e.merchant
                    .as_ref()
                    .is_some_and(|m| m.to_ascii_lowercase().contains(&needle))
            })
            .collect())
    }

    fn list_reports(&self) -> Result<Vec<ExpenseReport>> {
        Ok(self.reports())
    }

    fn get_report_by_provider_id(
        &self,
        provider_report_id: &str,
    ) -> Result<Option<ExpenseReport>> {
        Ok(self
            .reports()
            .into_iter()
            .find(|r| r.provider_report_id == provider_report_id))
    }

    fn list_categories(&self) -> Result<Vec<Category>> {
        Ok(self.state.lock().unwrap().categories.clone())
    }

    async fn mark_reimbursed(
        &self,
        expense_ids: Vec<i64>,
        amount: Option<Decimal>,
        paid_on: NaiveDate,
    ) -> Result<usize> {
        let mut state = self.state.lock().unwrap();
        let mut updated = 0;
        for expense in state
            .expenses
            .iter_mut()
            .filter(|e| expense_ids.contains(&e.id))
        {
            expense.reimbursement_status = REIMBURSEMENT_STATUS_REIMBURSED.to_string();
            expense.reimbursed_amount = amount.unwrap_or(expense.amount);
            expense.reimbursed_date = Some(paid_on);
            updated += 1;
        }
        Ok(updated)
    }

    async fn assign_te_report(
        &self,
        expense_ids: Vec<i64>,
        label: Option<String>,
    ) -> Result<usize> {
        let mut state = self.state.lock().unwrap();
        let mut updated = 0;
        for expense in state
            .expenses
            .iter_mut()
            .filter(|e| expense_ids.contains(&e.id))
        {
            expense.te_report = label.clone();
            updated += 1;
        }
        Ok(updated)
    }

    async fn set_external_ref(
        &self,
        expense_id: i64,
        reference: String,
        company_report_status: String,
    ) -> Result<Option<Expense>> {
        let mut state = self.state.lock().unwrap();
        Ok(state
            .expenses
            .iter_mut()
            .find(|e| e.id == expense_id)
            .map(|expense| {
                expense.external_ref = Some(reference);
                expense.company_report_status = company_report_status;
                expense.clone()
            }))
    }
}
