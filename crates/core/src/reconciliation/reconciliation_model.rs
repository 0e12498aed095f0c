use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ledger::Expense;

/// Columns every company report must carry.
pub const REQUIRED_COMPANY_REPORT_COLUMNS: [&str; 3] = ["date", "merchant", "amount"];

/// Maximum candidates returned for one company report line.
pub const MATCH_CANDIDATE_LIMIT: usize = 10;

/// A decoded company T&E report: header plus one map per line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyReport {
    pub columns: Vec<String>,
    pub rows: Vec<HashMap<String, String>>,
}

/// Line that parsed and can be matched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyReportLine {
    pub row_number: usize,
    pub date: String,
    pub merchant: String,
    pub amount: Decimal,
    pub reference: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyReportRowError {
    pub row_number: usize,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyReportSummary {
    pub total_rows: usize,
    pub ready_for_matching: Vec<CompanyReportLine>,
    pub errors: Vec<CompanyReportRowError>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchQuery {
    pub merchant: String,
    pub amount: Option<Decimal>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchCandidates {
    pub query: MatchQuery,
    pub candidates: Vec<Expense>,
}
