//! Command-line entry point for the expense ledger.

mod commands;
mod context;

use clap::{Parser, Subcommand};
use expense_ledger_core::LedgerConfig;
use tracing_subscriber::EnvFilter;

use crate::context::AppContext;

/// Zoho Expense sync ledger.
#[derive(Parser)]
#[command(name = "expense-ledger")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the periodic sync scheduler until Ctrl-C
    Serve,

    /// Run one sync now
    Sync {
        /// Must match ADMIN_TOKEN
        #[arg(long, env = "LEDGER_ADMIN_TOKEN")]
        admin_token: String,
    },

    /// Show the provider connection and recent sync runs
    Status {
        #[arg(short, long, default_value_t = 5)]
        limit: i64,
    },

    /// Print the provider consent URL
    AuthUrl,

    /// Exchange an authorization code from the OAuth callback
    Authorize {
        #[arg(long)]
        code: String,
    },

    /// Stored expenses and their reimbursement workflow
    Expenses {
        #[command(subcommand)]
        command: commands::ExpenseCommand,
    },

    /// Aggregate reports over stored expenses
    Report {
        #[command(subcommand)]
        command: commands::ReportCommand,
    },

    /// Reconcile expenses against a company T&E report
    Recon {
        #[command(subcommand)]
        command: commands::ReconCommand,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    let config = LedgerConfig::from_env()?;
    let context = AppContext::open(config)?;

    match cli.command {
        Command::Serve => commands::serve(&context).await,
        Command::Sync { admin_token } => commands::sync_now(&context, &admin_token).await,
        Command::Status { limit } => commands::status(&context, limit),
        Command::AuthUrl => commands::auth_url(&context),
        Command::Authorize { code } => commands::authorize(&context, &code).await,
        Command::Expenses { command } => commands::expenses(&context, command).await,
        Command::Report { command } => commands::report(&context, command),
        Command::Recon { command } => commands::recon(&context, command).await,
    }
}
