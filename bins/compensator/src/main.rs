//! Offset operator CLI.
//!
//! Compensates, confirms-and-compensates or reverses one credit note, or
//! prints a debtor's outstanding balances. Results are written to stdout as
//! JSON; logs go to stderr.

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use offset_core::compensation::{CompensationError, DocumentClass};
use offset_db::{CompensationRepository, RetryPolicy, connect_with};
use offset_shared::config::LoggingConfig;
use offset_shared::types::{CompanyId, DebtorId, InvoiceId};
use offset_shared::AppConfig;

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Side {
    /// Customer invoices and credit notes
    Sales,
    /// Supplier invoices and debit notes
    Purchase,
}

impl From<Side> for DocumentClass {
    fn from(side: Side) -> Self {
        match side {
            Side::Sales => Self::Sales,
            Side::Purchase => Self::Purchase,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "offset",
    version,
    about = "Apply credit and debit notes against open invoices"
)]
struct Cli {
    /// Company (tenant) the documents belong to
    #[arg(long)]
    company: CompanyId,

    /// Ledger side
    #[arg(long, value_enum, default_value_t = Side::Sales)]
    side: Side,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compensate a confirmed credit note
    Compensate {
        /// Credit note id
        note: InvoiceId,
    },
    /// Confirm a draft credit note and compensate it in one transaction
    Confirm {
        /// Credit note id
        note: InvoiceId,
    },
    /// Undo a credit note's compensation and cancel it
    Reverse {
        /// Credit note id
        note: InvoiceId,
    },
    /// Show a debtor's outstanding invoices
    Balances {
        /// Customer or supplier id
        debtor: DebtorId,
    },
}

fn init_tracing(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.filter));
    let registry = tracing_subscriber::registry().with(filter);

    if config.json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn report(err: CompensationError) -> anyhow::Error {
    error!(code = err.error_code(), retryable = err.is_retryable(), error = %err, "run failed");
    anyhow::Error::new(err)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = AppConfig::load().context("failed to load configuration")?;
    init_tracing(&config.logging);

    let db = connect_with(&config.database)
        .await
        .context("failed to connect to database")?;
    info!("Connected to database");

    let repo = CompensationRepository::new(db)
        .with_retry_policy(RetryPolicy::from_config(&config.compensation));
    let class = DocumentClass::from(cli.side);

    match cli.command {
        Command::Compensate { note } => {
            let outcome = repo
                .compensate(cli.company, class, note)
                .await
                .map_err(report)?;
            print_json(&outcome)
        }
        Command::Confirm { note } => {
            let outcome = repo
                .confirm_and_compensate(cli.company, class, note)
                .await
                .map_err(report)?;
            print_json(&outcome)
        }
        Command::Reverse { note } => {
            let outcome = repo
                .reverse(cli.company, class, note)
                .await
                .map_err(report)?;
            print_json(&outcome)
        }
        Command::Balances { debtor } => {
            let pending = repo
                .outstanding_balances(cli.company, class, debtor)
                .await
                .map_err(report)?;
            print_json(&pending)
        }
    }
}
