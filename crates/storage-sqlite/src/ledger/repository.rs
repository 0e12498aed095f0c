use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::SqliteConnection;
use expense_ledger_core::ledger::{
    Category, Expense, ExpenseListFilter, ExpenseReport, ExpenseRepositoryTrait, ExpenseUpsert,
    LedgerRepositoryTrait, ReportUpsert, REIMBURSEMENT_STATUS_REIMBURSED,
};
use expense_ledger_core::Result;
use log::debug;
use rust_decimal::Decimal;

use super::model::{
    CategoryDB, ExpenseDB, ExpenseProviderFieldsDB, ExpenseReportDB, NewExpenseDB,
    NewExpenseReportDB, ReportProviderFieldsDB,
};
use crate::db::{get_connection, WriteHandle};
use crate::errors::StorageError;
use crate::schema::{categories, expense_reports, expenses, vendors};
use crate::values::{date_to_db, decimal_to_db, timestamp_to_db};

pub struct LedgerRepository {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
    writer: WriteHandle,
}

impl LedgerRepository {
    pub fn new(
        pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
        writer: WriteHandle,
    ) -> Self {
        Self { pool, writer }
    }
}

fn to_expenses(rows: Vec<ExpenseDB>) -> Result<Vec<Expense>> {
    let expenses = rows
        .into_iter()
        .map(Expense::try_from)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(StorageError::from)?;
    Ok(expenses)
}

/// Escapes LIKE wildcards so the merchant text matches literally.
fn like_pattern(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    escaped.push('%');
    for ch in value.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

#[async_trait]
impl LedgerRepositoryTrait for LedgerRepository {
    async fn upsert_vendor(&self, name: String) -> Result<i64> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<i64> {
                let inserted = diesel::insert_into(vendors::table)
                    .values(vendors::name.eq(&name))
                    .on_conflict(vendors::name)
                    .do_nothing()
                    .returning(vendors::id)
                    .get_result::<i64>(conn)
                    .optional()
                    .map_err(StorageError::from)?;
                if let Some(id) = inserted {
                    return Ok(id);
                }
                let id = vendors::table
                    .filter(vendors::name.eq(&name))
                    .select(vendors::id)
                    .first::<i64>(conn)
                    .map_err(StorageError::from)?;
                Ok(id)
            })
            .await
    }

    async fn upsert_category(&self, name: String) -> Result<i64> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<i64> {
                let inserted = diesel::insert_into(categories::table)
                    .values(categories::name.eq(&name))
                    .on_conflict(categories::name)
                    .do_nothing()
                    .returning(categories::id)
                    .get_result::<i64>(conn)
                    .optional()
                    .map_err(StorageError::from)?;
                if let Some(id) = inserted {
                    return Ok(id);
                }
                let id = categories::table
                    .filter(categories::name.eq(&name))
                    .select(categories::id)
                    .first::<i64>(conn)
                    .map_err(StorageError::from)?;
                Ok(id)
            })
            .await
    }

    async fn upsert_report(&self, report: ReportUpsert) -> Result<i64> {
        let now = timestamp_to_db(Utc::now());
        let fields = ReportProviderFieldsDB::from_upsert(&report, &now);
        let row = NewExpenseReportDB {
            provider_report_id: report.provider_report_id,
            created_at: now,
            fields: fields.clone(),
        };

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<i64> {
                let id = diesel::insert_into(expense_reports::table)
                    .values(&row)
                    .on_conflict(expense_reports::provider_report_id)
                    .do_update()
                    .set(&fields)
                    .returning(expense_reports::id)
                    .get_result::<i64>(conn)
                    .map_err(StorageError::from)?;
                Ok(id)
            })
            .await
    }

    async fn upsert_expense(&self, expense: ExpenseUpsert) -> Result<i64> {
        let now = timestamp_to_db(Utc::now());
        let fields = ExpenseProviderFieldsDB::from_upsert(&expense, &now);
        let report_id = expense.report_id;
        let row = NewExpenseDB {
            provider_expense_id: expense.provider_expense_id,
            report_id,
            created_at: now,
            fields: fields.clone(),
        };

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<i64> {
                let id = diesel::insert_into(expenses::table)
                    .values(&row)
                    .on_conflict(expenses::provider_expense_id)
                    .do_update()
                    .set(&fields)
                    .returning(expenses::id)
                    .get_result::<i64>(conn)
                    .map_err(StorageError::from)?;

                // An unresolved report leaves any existing link in place.
                if let Some(report_id) = report_id {
                    diesel::update(expenses::table.find(id))
                        .set(expenses::report_id.eq(report_id))
                        .execute(conn)
                        .map_err(StorageError::from)?;
                }
                debug!("[Upsert] expense {} stored as {}", row.provider_expense_id, id);
                Ok(id)
            })
            .await
    }
}

#[async_trait]
impl ExpenseRepositoryTrait for LedgerRepository {
    fn list_expenses(&self, filter: &ExpenseListFilter) -> Result<Vec<Expense>> {
        let mut conn = get_connection(&self.pool)?;
        let mut query = expenses::table.into_boxed();
        if let Some(status) = filter.reimbursement_status.as_deref() {
            query = query.filter(expenses::reimbursement_status.eq(status));
        }
        let rows = query
            .order((expenses::txn_date.desc(), expenses::id.desc()))
            .limit(filter.effective_limit())
            .select(ExpenseDB::as_select())
            .load::<ExpenseDB>(&mut conn)
            .map_err(StorageError::from)?;
        to_expenses(rows)
    }

    fn get_expense(&self, expense_id: i64) -> Result<Option<Expense>> {
        let mut conn = get_connection(&self.pool)?;
        let row = expenses::table
            .find(expense_id)
            .select(ExpenseDB::as_select())
            .first::<ExpenseDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        Ok(row.map(Expense::try_from).transpose()?)
    }

    fn get_expense_by_provider_id(&self, provider_expense_id: &str) -> Result<Option<Expense>> {
        let mut conn = get_connection(&self.pool)?;
        let row = expenses::table
            .filter(expenses::provider_expense_id.eq(provider_expense_id))
            .select(ExpenseDB::as_select())
            .first::<ExpenseDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        Ok(row.map(Expense::try_from).transpose()?)
    }

    fn load_all_expenses(&self) -> Result<Vec<Expense>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = expenses::table
            .order(expenses::id.asc())
            .select(ExpenseDB::as_select())
            .load::<ExpenseDB>(&mut conn)
            .map_err(StorageError::from)?;
        to_expenses(rows)
    }

    fn find_unmatched_by_merchant(&self, merchant: &str) -> Result<Vec<Expense>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = expenses::table
            .filter(expenses::external_ref.is_null())
            .filter(expenses::merchant.like(like_pattern(merchant)).escape('\\'))
            .order((expenses::txn_date.desc(), expenses::id.desc()))
            .select(ExpenseDB::as_select())
            .load::<ExpenseDB>(&mut conn)
            .map_err(StorageError::from)?;
        to_expenses(rows)
    }

    fn list_reports(&self) -> Result<Vec<ExpenseReport>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = expense_reports::table
            .order(expense_reports::id.asc())
            .select(ExpenseReportDB::as_select())
            .load::<ExpenseReportDB>(&mut conn)
            .map_err(StorageError::from)?;
        let reports = rows
            .into_iter()
            .map(ExpenseReport::try_from)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StorageError::from)?;
        Ok(reports)
    }

    fn get_report_by_provider_id(
        &self,
        provider_report_id: &str,
    ) -> Result<Option<ExpenseReport>> {
        let mut conn = get_connection(&self.pool)?;
        let row = expense_reports::table
            .filter(expense_reports::provider_report_id.eq(provider_report_id))
            .select(ExpenseReportDB::as_select())
            .first::<ExpenseReportDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        Ok(row.map(ExpenseReport::try_from).transpose()?)
    }

    fn list_categories(&self) -> Result<Vec<Category>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = categories::table
            .order(categories::name.asc())
            .select(CategoryDB::as_select())
            .load::<CategoryDB>(&mut conn)
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(Category::from).collect())
    }

    async fn mark_reimbursed(
        &self,
        expense_ids: Vec<i64>,
        amount: Option<Decimal>,
        paid_on: NaiveDate,
    ) -> Result<usize> {
        let paid_on = date_to_db(paid_on);
        let now = timestamp_to_db(Utc::now());
        let amount = amount.map(decimal_to_db);

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                let target = expenses::table.filter(expenses::id.eq_any(&expense_ids));
                let updated = match amount {
                    Some(amount) => diesel::update(target)
                        .set((
                            expenses::reimbursement_status.eq(REIMBURSEMENT_STATUS_REIMBURSED),
                            expenses::reimbursed_amount.eq(amount),
                            expenses::reimbursed_date.eq(&paid_on),
                            expenses::updated_at.eq(&now),
                        ))
                        .execute(conn),
                    None => diesel::update(target)
                        .set((
                            expenses::reimbursement_status.eq(REIMBURSEMENT_STATUS_REIMBURSED),
                            expenses::reimbursed_amount.eq(expenses::amount),
                            expenses::reimbursed_date.eq(&paid_on),
                            expenses::updated_at.eq(&now),
                        ))
                        .execute(conn),
                }
                .map_err(StorageError::from)?;
                Ok(updated)
            })
            .await
    }

    async fn assign_te_report(
        &self,
        expense_ids: Vec<i64>,
        label: Option<String>,
    ) -> Result<usize> {
        let now = timestamp_to_db(Utc::now());
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                let updated =
                    diesel::update(expenses::table.filter(expenses::id.eq_any(&expense_ids)))
                        .set((expenses::te_report.eq(&label), expenses::updated_at.eq(&now)))
                        .execute(conn)
                        .map_err(StorageError::from)?;
                Ok(updated)
            })
            .await
    }

    async fn set_external_ref(
        &self,
        expense_id: i64,
        reference: String,
        company_report_status: String,
    ) -> Result<Option<Expense>> {
        let now = timestamp_to_db(Utc::now());
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Option<Expense>> {
                let row = diesel::update(expenses::table.find(expense_id))
                    .set((
                        expenses::external_ref.eq(&reference),
                        expenses::company_report_status.eq(&company_report_status),
                        expenses::updated_at.eq(&now),
                    ))
                    .returning(ExpenseDB::as_returning())
                    .get_result::<ExpenseDB>(conn)
                    .optional()
                    .map_err(StorageError::from)?;
                Ok(row.map(Expense::try_from).transpose()?)
            })
            .await
    }
}
