//! Database models for vendors, categories, reports, expenses and attachments.

use diesel::prelude::*;
use expense_ledger_core::ledger::{
    Attachment, Category, Expense, ExpenseReport, ExpenseUpsert, ReportUpsert, Vendor,
};

use crate::errors::StorageError;
use crate::values::{
    date_from_db, date_to_db, decimal_from_db, decimal_to_db, optional, timestamp_from_db,
    timestamp_to_db,
};

#[derive(Queryable, Identifiable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::vendors)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct VendorDB {
    pub id: i64,
    pub name: String,
}

impl From<VendorDB> for Vendor {
    fn from(db: VendorDB) -> Self {
        Vendor {
            id: db.id,
            name: db.name,
        }
    }
}

#[derive(Queryable, Identifiable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::categories)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CategoryDB {
    pub id: i64,
    pub name: String,
}

impl From<CategoryDB> for Category {
    fn from(db: CategoryDB) -> Self {
        Category {
            id: db.id,
            name: db.name,
        }
    }
}

#[derive(Queryable, Identifiable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::expense_reports)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ExpenseReportDB {
    pub id: i64,
    pub provider_report_id: String,
    pub title: Option<String>,
    pub report_number: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub status: Option<String>,
    pub total_amount: Option<String>,
    pub currency: Option<String>,
    pub submitted_at: Option<String>,
    pub approved_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl TryFrom<ExpenseReportDB> for ExpenseReport {
    type Error = StorageError;

    fn try_from(db: ExpenseReportDB) -> Result<Self, Self::Error> {
        Ok(ExpenseReport {
            start_date: optional(db.start_date.as_deref(), date_from_db)?,
            end_date: optional(db.end_date.as_deref(), date_from_db)?,
            total_amount: optional(db.total_amount.as_deref(), decimal_from_db)?,
            submitted_at: optional(db.submitted_at.as_deref(), timestamp_from_db)?,
            approved_at: optional(db.approved_at.as_deref(), timestamp_from_db)?,
            created_at: timestamp_from_db(&db.created_at)?,
            updated_at: timestamp_from_db(&db.updated_at)?,
            id: db.id,
            provider_report_id: db.provider_report_id,
            title: db.title,
            report_number: db.report_number,
            status: db.status,
            currency: db.currency,
        })
    }
}

/// Provider-owned report columns. `None` clears the stored value.
#[derive(Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = crate::schema::expense_reports)]
#[diesel(treat_none_as_null = true)]
pub struct ReportProviderFieldsDB {
    pub title: Option<String>,
    pub report_number: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub status: Option<String>,
    pub total_amount: Option<String>,
    pub currency: Option<String>,
    pub submitted_at: Option<String>,
    pub approved_at: Option<String>,
    pub updated_at: String,
}

impl ReportProviderFieldsDB {
    pub fn from_upsert(report: &ReportUpsert, now: &str) -> Self {
        Self {
            title: report.title.clone(),
            report_number: report.report_number.clone(),
            start_date: report.start_date.map(date_to_db),
            end_date: report.end_date.map(date_to_db),
            status: report.status.clone(),
            total_amount: report.total_amount.map(decimal_to_db),
            currency: report.currency.clone(),
            submitted_at: report.submitted_at.map(timestamp_to_db),
            approved_at: report.approved_at.map(timestamp_to_db),
            updated_at: now.to_string(),
        }
    }
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::expense_reports)]
pub struct NewExpenseReportDB {
    pub provider_report_id: String,
    pub created_at: String,
    #[diesel(embed)]
    pub fields: ReportProviderFieldsDB,
}

#[derive(Queryable, Identifiable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::expenses)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ExpenseDB {
    pub id: i64,
    pub provider_expense_id: String,
    pub report_id: Option<i64>,
    pub txn_date: String,
    pub merchant: Option<String>,
    pub vendor_id: Option<i64>,
    pub category_id: Option<i64>,
    pub description: Option<String>,
    pub amount: String,
    pub currency: String,
    pub exchange_rate: Option<String>,
    pub amount_home: Option<String>,
    pub payment_mode: Option<String>,
    pub reimbursable: bool,
    pub company_report_status: String,
    pub reimbursement_status: String,
    pub reimbursed_amount: String,
    pub reimbursed_date: Option<String>,
    pub external_ref: Option<String>,
    pub te_report: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl TryFrom<ExpenseDB> for Expense {
    type Error = StorageError;

    fn try_from(db: ExpenseDB) -> Result<Self, Self::Error> {
        Ok(Expense {
            txn_date: date_from_db(&db.txn_date)?,
            amount: decimal_from_db(&db.amount)?,
            exchange_rate: optional(db.exchange_rate.as_deref(), decimal_from_db)?,
            amount_home: optional(db.amount_home.as_deref(), decimal_from_db)?,
            reimbursed_amount: decimal_from_db(&db.reimbursed_amount)?,
            reimbursed_date: optional(db.reimbursed_date.as_deref(), date_from_db)?,
            created_at: timestamp_from_db(&db.created_at)?,
            updated_at: timestamp_from_db(&db.updated_at)?,
            id: db.id,
            provider_expense_id: db.provider_expense_id,
            report_id: db.report_id,
            merchant: db.merchant,
            vendor_id: db.vendor_id,
            category_id: db.category_id,
            description: db.description,
            currency: db.currency,
            payment_mode: db.payment_mode,
            reimbursable: db.reimbursable,
            company_report_status: db.company_report_status,
            reimbursement_status: db.reimbursement_status,
            external_ref: db.external_ref,
            te_report: db.te_report,
        })
    }
}

/// Provider-owned expense columns. The report link and workflow columns are not part of it.
#[derive(Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = crate::schema::expenses)]
#[diesel(treat_none_as_null = true)]
pub struct ExpenseProviderFieldsDB {
    pub txn_date: String,
    pub merchant: Option<String>,
    pub vendor_id: Option<i64>,
    pub category_id: Option<i64>,
    pub description: Option<String>,
    pub amount: String,
    pub currency: String,
    pub exchange_rate: Option<String>,
    pub amount_home: Option<String>,
    pub payment_mode: Option<String>,
    pub updated_at: String,
}

impl ExpenseProviderFieldsDB {
    pub fn from_upsert(expense: &ExpenseUpsert, now: &str) -> Self {
        Self {
            txn_date: date_to_db(expense.txn_date),
            merchant: expense.merchant.clone(),
            vendor_id: expense.vendor_id,
            category_id: expense.category_id,
            description: expense.description.clone(),
            amount: decimal_to_db(expense.amount),
            currency: expense.currency.clone(),
            exchange_rate: expense.exchange_rate.map(decimal_to_db),
            amount_home: expense.amount_home.map(decimal_to_db),
            payment_mode: expense.payment_mode.clone(),
            updated_at: now.to_string(),
        }
    }
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::expenses)]
pub struct NewExpenseDB {
    pub provider_expense_id: String,
    pub report_id: Option<i64>,
    pub created_at: String,
    #[diesel(embed)]
    pub fields: ExpenseProviderFieldsDB,
}

#[derive(Queryable, Identifiable, Insertable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::attachments)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct AttachmentDB {
    pub id: i64,
    pub expense_id: i64,
    pub provider_file_id: Option<String>,
    pub filename: Option<String>,
    pub mime_type: Option<String>,
    pub size_bytes: Option<i64>,
    pub url: Option<String>,
    pub created_at: String,
}

impl TryFrom<AttachmentDB> for Attachment {
    type Error = StorageError;

    fn try_from(db: AttachmentDB) -> Result<Self, Self::Error> {
        Ok(Attachment {
            created_at: timestamp_from_db(&db.created_at)?,
            id: db.id,
            expense_id: db.expense_id,
            provider_file_id: db.provider_file_id,
            filename: db.filename,
            mime_type: db.mime_type,
            size_bytes: db.size_bytes,
            url: db.url,
        })
    }
}
