use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use log::info;
use rust_decimal::Decimal;

use super::{
    CompanyReport, CompanyReportLine, CompanyReportRowError, CompanyReportSummary,
    MatchCandidates, MatchQuery, MATCH_CANDIDATE_LIMIT, REQUIRED_COMPANY_REPORT_COLUMNS,
};
use crate::errors::{Error, Result};
use crate::ledger::{Expense, ExpenseRepositoryTrait, COMPANY_REPORT_STATUS_MATCHED};

/// Relative tolerance when comparing amounts.
const AMOUNT_TOLERANCE: Decimal = Decimal::from_parts(5, 0, 0, false, 2);

#[async_trait]
pub trait ReconciliationServiceTrait: Send + Sync {
    /// Validates a company report and splits it into matchable lines and errors.
    fn process_company_report(&self, report: CompanyReport) -> Result<CompanyReportSummary>;

    fn match_candidates(&self, query: MatchQuery) -> Result<MatchCandidates>;

    /// Links an expense to a company report reference.
    async fn create_match(&self, expense_id: i64, reference: String) -> Result<Expense>;
}

pub struct ReconciliationService {
    repository: Arc<dyn ExpenseRepositoryTrait>,
}

impl ReconciliationService {
    pub fn new(repository: Arc<dyn ExpenseRepositoryTrait>) -> Self {
        Self { repository }
    }
}

fn within_tolerance(candidate: Decimal, target: Decimal) -> bool {
    let tolerance = (target * AMOUNT_TOLERANCE).abs();
    candidate >= target - tolerance && candidate <= target + tolerance
}

#[async_trait]
impl ReconciliationServiceTrait for ReconciliationService {
    fn process_company_report(&self, report: CompanyReport) -> Result<CompanyReportSummary> {
        let missing: Vec<&str> = REQUIRED_COMPANY_REPORT_COLUMNS
            .iter()
            .copied()
            .filter(|required| !report.columns.iter().any(|c| c.trim() == *required))
            .collect();
        if !missing.is_empty() {
            return Err(Error::invalid_data(format!(
                "Company report must contain columns: {}",
                REQUIRED_COMPANY_REPORT_COLUMNS.join(", ")
            )));
        }

        let total_rows = report.rows.len();
        let mut ready_for_matching = Vec::new();
        let mut errors = Vec::new();

        for (index, row) in report.rows.into_iter().enumerate() {
            let row_number = index + 1;
            let field = |key: &str| row.get(key).map(|v| v.trim().to_string()).unwrap_or_default();
            let raw_amount = field("amount");

            match Decimal::from_str(&raw_amount.replace(',', "")) {
                Ok(amount) => ready_for_matching.push(CompanyReportLine {
                    row_number,
                    date: field("date"),
                    merchant: field("merchant"),
                    amount,
                    reference: field("reference"),
                }),
                Err(_) => errors.push(CompanyReportRowError {
                    row_number,
                    error: format!(
                        "Invalid amount: {}",
                        if raw_amount.is_empty() { "missing" } else { raw_amount.as_str() }
                    ),
                }),
            }
        }

        let message = format!(
            "Processed {} rows ready for matching",
            ready_for_matching.len()
        );
        info!("[Reconciliation] {} ({} errors)", message, errors.len());
        Ok(CompanyReportSummary {
            total_rows,
            ready_for_matching,
            errors,
            message,
        })
    }

    fn match_candidates(&self, query: MatchQuery) -> Result<MatchCandidates> {
        let merchant = query.merchant.trim();
        if merchant.is_empty() {
            return Err(Error::invalid_data("Merchant is required"));
        }

        let mut candidates: Vec<Expense> = self
            .repository
            .find_unmatched_by_merchant(merchant)?
            .into_iter()
            .filter(|e| query.amount.map_or(true, |a| within_tolerance(e.amount, a)))
            .filter(|e| query.date_from.map_or(true, |from| e.txn_date >= from))
            .filter(|e| query.date_to.map_or(true, |to| e.txn_date <= to))
            .collect();
        candidates.sort_by(|a, b| b.txn_date.cmp(&a.txn_date).then(a.id.cmp(&b.id)));
        candidates.truncate(MATCH_CANDIDATE_LIMIT);

        Ok(MatchCandidates { query, candidates })
    }

    async fn create_match(&self, expense_id: i64, reference: String) -> Result<Expense> {
        let reference = reference.trim().to_string();
        if reference.is_empty() {
            return Err(Error::invalid_data("Company reference is required"));
        }
        let expense = self
            .repository
            .set_external_ref(
                expense_id,
                reference,
                COMPANY_REPORT_STATUS_MATCHED.to_string(),
            )
            .await?
            .ok_or_else(|| Error::NotFound(format!("Expense {} not found", expense_id)))?;
        info!(
            "[Reconciliation] Matched expense {} to company reference",
            expense_id
        );
        Ok(expense)
    }
}
