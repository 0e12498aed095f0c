//! Subcommand handlers. Results are printed as JSON on stdout.

use std::path::PathBuf;

use anyhow::Context as _;
use chrono::{NaiveDate, Utc};
use clap::Subcommand;
use expense_ledger_core::ledger::{ExpenseListFilter, ExpenseServiceTrait};
use expense_ledger_core::provider::PROVIDER_ZOHO_EXPENSE;
use expense_ledger_core::reconciliation::{
    CompanyReport, MatchQuery, ReconciliationServiceTrait,
};
use expense_ledger_core::reports::ReportsServiceTrait;
use expense_ledger_core::sync::{SyncScheduler, SyncStatus};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use crate::context::AppContext;

#[derive(Subcommand)]
pub enum ExpenseCommand {
    /// Newest first
    List {
        /// Reimbursement status filter, e.g. "Not Reimbursed"
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        limit: Option<i64>,
    },
    /// Mark expenses reimbursed today
    Reimburse {
        #[arg(long, value_delimiter = ',', required = true)]
        ids: Vec<i64>,
        /// Overrides each expense's own amount
        #[arg(long)]
        amount: Option<Decimal>,
    },
    /// Assign expenses to a company T&E report; an empty label clears it
    AssignTe {
        #[arg(long, value_delimiter = ',', required = true)]
        ids: Vec<i64>,
        #[arg(long, default_value = "")]
        label: String,
    },
    /// Totals per T&E report label
    TeReports,
}

#[derive(Subcommand)]
pub enum ReportCommand {
    /// Totals per currency
    Summary,
    /// Outstanding reimbursable amounts per category
    Outstanding,
    /// Outstanding amounts by age
    Ageing {
        /// Reference date, defaults to today
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
}

#[derive(Subcommand)]
pub enum ReconCommand {
    /// Validate a company report given as JSON `{"columns": [...], "rows": [{...}]}`
    Process {
        #[arg(long)]
        file: PathBuf,
    },
    /// Unmatched expenses that could correspond to a company report line
    Candidates {
        #[arg(long)]
        merchant: String,
        #[arg(long)]
        amount: Option<Decimal>,
        #[arg(long)]
        date_from: Option<NaiveDate>,
        #[arg(long)]
        date_to: Option<NaiveDate>,
    },
    /// Link an expense to a company report line
    Match {
        #[arg(long)]
        expense_id: i64,
        #[arg(long)]
        reference: String,
    },
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub async fn serve(context: &AppContext) -> anyhow::Result<()> {
    let service = context.sync_service()?;
    let scheduler = SyncScheduler::new(service, context.config.sync_interval);
    scheduler.start().await;
    info!(
        "Sync scheduler running every {} minutes; press Ctrl-C to stop",
        context.config.sync_interval.as_secs() / 60
    );

    tokio::signal::ctrl_c()
        .await
        .context("waiting for Ctrl-C")?;
    info!("Shutting down sync scheduler");
    scheduler.stop().await;
    Ok(())
}

pub async fn sync_now(context: &AppContext, admin_token: &str) -> anyhow::Result<()> {
    let result = context.manual_trigger()?.trigger(admin_token).await?;
    print_json(&result)?;
    if result.status == SyncStatus::Error {
        anyhow::bail!(result.message);
    }
    Ok(())
}

pub fn status(context: &AppContext, limit: i64) -> anyhow::Result<()> {
    let connection = match context.token_manager() {
        Ok(manager) => serde_json::to_value(manager.connection_status()?)?,
        Err(e) => {
            warn!("Provider connection unavailable: {}", e);
            json!({ "isConfigured": false, "error": e.to_string() })
        }
    };
    let history = context
        .sync_state()
        .history(PROVIDER_ZOHO_EXPENSE, limit.clamp(1, 500))?;
    print_json(&json!({ "connection": connection, "syncHistory": history }))
}

pub fn auth_url(context: &AppContext) -> anyhow::Result<()> {
    println!("{}", context.token_manager()?.authorization_url());
    Ok(())
}

pub async fn authorize(context: &AppContext, code: &str) -> anyhow::Result<()> {
    let manager = context.token_manager()?;
    manager.authorize_with_code(code).await?;
    print_json(&manager.connection_status()?)
}

pub async fn expenses(context: &AppContext, command: ExpenseCommand) -> anyhow::Result<()> {
    let service = context.expense_service();
    match command {
        ExpenseCommand::List { status, limit } => print_json(&service.list_expenses(
            ExpenseListFilter {
                reimbursement_status: status,
                limit,
            },
        )?),
        ExpenseCommand::Reimburse { ids, amount } => {
            let updated = service.mark_reimbursed(ids, amount).await?;
            print_json(&json!({ "updated": updated }))
        }
        ExpenseCommand::AssignTe { ids, label } => {
            let updated = service.assign_te_report(ids, Some(label)).await?;
            print_json(&json!({ "updated": updated }))
        }
        ExpenseCommand::TeReports => print_json(&service.list_te_reports()?),
    }
}

pub fn report(context: &AppContext, command: ReportCommand) -> anyhow::Result<()> {
    let service = context.reports_service();
    match command {
        ReportCommand::Summary => print_json(&service.summary()?),
        ReportCommand::Outstanding => print_json(&service.outstanding()?),
        ReportCommand::Ageing { as_of } => {
            print_json(&service.ageing(as_of.unwrap_or_else(|| Utc::now().date_naive()))?)
        }
    }
}

pub async fn recon(context: &AppContext, command: ReconCommand) -> anyhow::Result<()> {
    let service = context.reconciliation_service();
    match command {
        ReconCommand::Process { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let report: CompanyReport = serde_json::from_str(&raw)
                .with_context(|| format!("parsing {}", file.display()))?;
            print_json(&service.process_company_report(report)?)
        }
        ReconCommand::Candidates {
            merchant,
            amount,
            date_from,
            date_to,
        } => print_json(&service.match_candidates(MatchQuery {
            merchant,
            amount,
            date_from,
            date_to,
        })?),
        ReconCommand::Match {
            expense_id,
            reference,
        } => print_json(&service.create_match(expense_id, reference).await?),
    }
}
