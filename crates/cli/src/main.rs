//! Payroll CLI - salary batch operations from the command line
//!
//! Usage:
//! ```bash
//! payroll init
//! payroll company add --name "Acme" --site ACM
//! payroll employee add --company ACM --code E001 --name "Asha" --joining 2025-01-01
//! payroll bank request --company ACM --emp E001 --bank HDFC --account 50100012345 --routing HDFC0001234
//! payroll bank approve 1
//! payroll salary upload --company ACM --period 2026-03 --file salaries.csv
//! payroll batch finalize --company ACM --period 2026-03
//! payroll batch export --company ACM --period 2026-03 --output bank.csv
//! payroll response ingest --company ACM --period 2026-03 --file response.csv
//! payroll retry --company ACM --period 2026-03
//! payroll report batch --company ACM --period 2026-03 --format markdown
//! ```

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use payroll_business::PayrollConfig;
use payroll_core::{PayrollPeriod, RequestStatus};
use rust_decimal::Decimal;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod db;

use commands::{audit, bank, batch, company, profile, report};

/// Payroll - multi-company salary batches with bank reconciliation
#[derive(Parser)]
#[command(name = "payroll")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Database file path (overrides the config file)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Audit events directory (overrides the config file)
    #[arg(long, global = true)]
    pub events_dir: Option<PathBuf>,

    /// Name recorded as the actor of every change
    #[arg(long, default_value = "admin", global = true)]
    pub actor: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database schema
    Init {
        /// Remove an existing database first
        #[arg(long)]
        force: bool,
    },

    /// Show database status
    Status,

    /// Company management
    Company {
        #[command(subcommand)]
        action: CompanyAction,
    },

    /// Employee registration
    Employee {
        #[command(subcommand)]
        action: EmployeeAction,
    },

    /// Bank accounts and change requests
    Bank {
        #[command(subcommand)]
        action: BankAction,
    },

    /// Employee profile change requests
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },

    /// Salary uploads
    Salary {
        #[command(subcommand)]
        action: SalaryAction,
    },

    /// Salary batch lifecycle
    Batch {
        #[command(subcommand)]
        action: BatchAction,
    },

    /// Bank response files
    Response {
        #[command(subcommand)]
        action: ResponseAction,
    },

    /// Re-open failed salaries of an exported or completed batch
    Retry {
        #[command(flatten)]
        target: BatchTarget,
    },

    /// Generate reports
    Report {
        #[command(subcommand)]
        kind: ReportKind,

        /// Report format
        #[arg(long, default_value = "markdown", global = true)]
        format: ReportFormat,

        /// Output file path
        #[arg(long, short, global = true)]
        output: Option<PathBuf>,
    },

    /// Show the audit trail
    Audit {
        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,
        /// End date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,
        /// Company site code
        #[arg(long)]
        company: Option<String>,
        /// Batch ID
        #[arg(long)]
        batch: Option<i64>,
        /// Employee code
        #[arg(long)]
        employee: Option<String>,
        /// Actions to show (comma-separated, e.g. batch_exported,batch_reversed)
        #[arg(long, value_delimiter = ',')]
        actions: Option<Vec<String>>,
        /// Print raw JSON lines
        #[arg(long)]
        json: bool,
    },
}

/// Company and payroll month of a batch
#[derive(Args, Clone)]
pub struct BatchTarget {
    /// Company site code
    #[arg(long)]
    pub company: String,
    /// Payroll month (YYYY-MM)
    #[arg(long)]
    pub period: PayrollPeriod,
}

#[derive(Subcommand)]
pub enum CompanyAction {
    /// Register a company
    Add {
        #[arg(long)]
        name: String,
        /// Unique site code
        #[arg(long)]
        site: String,
        #[arg(long)]
        organisation: Option<String>,
    },
    /// List companies
    List,
}

#[derive(Subcommand)]
pub enum EmployeeAction {
    /// Register an employee
    Add {
        /// Company site code
        #[arg(long)]
        company: String,
        #[arg(long)]
        code: String,
        #[arg(long)]
        name: String,
        /// Joining date (YYYY-MM-DD)
        #[arg(long)]
        joining: NaiveDate,
        #[arg(long)]
        father_name: Option<String>,
        #[arg(long)]
        uan: Option<String>,
        #[arg(long)]
        esic: Option<String>,
        #[arg(long)]
        document: Option<String>,
        #[arg(long)]
        salary: Option<Decimal>,
        /// Exit date (YYYY-MM-DD)
        #[arg(long)]
        exit: Option<NaiveDate>,
    },
    /// List employees of a company
    List {
        #[arg(long)]
        company: String,
    },
}

#[derive(Subcommand)]
pub enum BankAction {
    /// Submit a bank change request
    Request {
        #[arg(long)]
        company: String,
        #[arg(long)]
        emp: String,
        #[arg(long)]
        bank: String,
        #[arg(long)]
        account: String,
        /// Bank routing code (IFSC)
        #[arg(long)]
        routing: String,
        /// First payroll month of the new account (YYYY-MM), defaults to the current month
        #[arg(long)]
        effective: Option<PayrollPeriod>,
    },
    /// Approve a pending request and activate the account
    Approve { request_id: i64 },
    /// Reject a pending request
    Reject {
        request_id: i64,
        #[arg(long)]
        reason: Option<String>,
    },
    /// Create accounts from a CSV sheet
    Upload {
        #[arg(long)]
        company: String,
        #[arg(long)]
        file: PathBuf,
    },
    /// Write a CSV template of employees without an active account
    Template {
        #[arg(long)]
        company: String,
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// List change requests
    List {
        #[arg(long)]
        company: String,
        #[arg(long)]
        status: Option<RequestStatus>,
    },
    /// Show the account history of an employee
    Show {
        #[arg(long)]
        company: String,
        #[arg(long)]
        emp: String,
    },
}

#[derive(Subcommand)]
pub enum ProfileAction {
    /// Submit a profile change request
    Request {
        #[arg(long)]
        company: String,
        #[arg(long)]
        emp: String,
        /// New value as FIELD=VALUE (repeatable), e.g. uan_number=100200300
        #[arg(long = "set", value_name = "FIELD=VALUE")]
        set: Vec<String>,
        /// Field to clear (repeatable)
        #[arg(long = "clear", value_name = "FIELD")]
        clear: Vec<String>,
    },
    /// Approve a pending request
    Approve { request_id: i64 },
    /// Reject a pending request
    Reject {
        request_id: i64,
        #[arg(long)]
        reason: Option<String>,
    },
    /// List pending requests
    List {
        #[arg(long)]
        company: String,
    },
}

#[derive(Subcommand)]
pub enum SalaryAction {
    /// Upload a salary sheet into the DRAFT batch
    Upload {
        #[command(flatten)]
        target: BatchTarget,
        #[arg(long)]
        file: PathBuf,
    },
}

#[derive(Subcommand)]
pub enum BatchAction {
    /// Show a batch with per-status totals
    Show {
        #[command(flatten)]
        target: BatchTarget,
        /// Also list the transactions
        #[arg(long)]
        transactions: bool,
    },
    /// List batches of a company
    List {
        #[arg(long)]
        company: String,
    },
    /// Re-evaluate HOLD rows against current facts
    Reevaluate {
        #[command(flatten)]
        target: BatchTarget,
    },
    /// Cancel one employee's live transaction in a DRAFT batch
    Exclude {
        #[command(flatten)]
        target: BatchTarget,
        #[arg(long)]
        emp: String,
    },
    /// DRAFT -> READY
    Finalize {
        #[command(flatten)]
        target: BatchTarget,
    },
    /// Write the bank file; READY/EXPORTED -> EXPORTED
    Export {
        #[command(flatten)]
        target: BatchTarget,
        #[arg(long, short)]
        output: PathBuf,
    },
    /// Reverse the batch and cancel its open transactions
    Reverse {
        #[command(flatten)]
        target: BatchTarget,
        #[arg(long)]
        reason: String,
    },
}

#[derive(Subcommand)]
pub enum ResponseAction {
    /// Apply a bank response file to the exported batch
    Ingest {
        #[command(flatten)]
        target: BatchTarget,
        #[arg(long)]
        file: PathBuf,
    },
}

#[derive(Subcommand)]
pub enum ReportKind {
    /// Batch detail and status summary
    Batch {
        #[command(flatten)]
        target: BatchTarget,
    },
    /// Transactions, monthly and year summary
    Yearly {
        #[arg(long)]
        company: String,
        #[arg(long)]
        year: i32,
    },
    /// Bank change requests
    BankChanges {
        #[arg(long)]
        company: String,
        #[arg(long)]
        status: Option<RequestStatus>,
        /// Effective month (YYYY-MM)
        #[arg(long)]
        effective: Option<PayrollPeriod>,
    },
    /// Company figures for a month
    Dashboard {
        #[arg(long)]
        company: String,
        /// Payroll month (YYYY-MM), defaults to the current month
        #[arg(long)]
        period: Option<PayrollPeriod>,
    },
    /// Salary history of one employee
    Ledger {
        #[arg(long)]
        company: String,
        #[arg(long)]
        emp: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ReportFormat {
    Csv,
    Json,
    Markdown,
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<PayrollConfig> {
    let mut config = PayrollConfig::load_or_default(cli.config.as_deref())
        .context("Failed to load configuration")?;
    if let Some(db) = &cli.db {
        config.database.path = db.clone();
    }
    if let Some(events_dir) = &cli.events_dir {
        config.audit.events_dir = events_dir.clone();
    }
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

async fn run(cli: Cli, config: PayrollConfig) -> Result<()> {
    let actor = cli.actor.as_str();

    match cli.command {
        Commands::Init { force } => {
            db::init_database(&config, force).await?;
            println!("✅ Database initialized at {:?}", config.database.path);
        }

        Commands::Status => {
            db::show_status(&config).await?;
        }

        Commands::Company { action } => {
            let ctx = db::open(&config).await?;
            company::handle_company(&ctx, action, actor).await?;
        }

        Commands::Employee { action } => {
            let ctx = db::open(&config).await?;
            company::handle_employee(&ctx, action, actor).await?;
        }

        Commands::Bank { action } => {
            let ctx = db::open(&config).await?;
            bank::handle(&ctx, action, actor).await?;
        }

        Commands::Profile { action } => {
            let ctx = db::open(&config).await?;
            profile::handle(&ctx, action, actor).await?;
        }

        Commands::Salary { action } => {
            let ctx = db::open(&config).await?;
            match action {
                SalaryAction::Upload { target, file } => {
                    batch::upload(&ctx, &target, &file, actor).await?;
                }
            }
        }

        Commands::Batch { action } => {
            let ctx = db::open(&config).await?;
            batch::handle(&ctx, action, actor).await?;
        }

        Commands::Response { action } => {
            let ctx = db::open(&config).await?;
            match action {
                ResponseAction::Ingest { target, file } => {
                    batch::ingest(&ctx, &target, &file, actor).await?;
                }
            }
        }

        Commands::Retry { target } => {
            let ctx = db::open(&config).await?;
            batch::retry(&ctx, &target, actor).await?;
        }

        Commands::Report {
            kind,
            format,
            output,
        } => {
            let ctx = db::open(&config).await?;
            report::generate(&ctx, kind, format, output).await?;
        }

        Commands::Audit {
            from,
            to,
            company,
            batch,
            employee,
            actions,
            json,
        } => {
            let filter = audit::AuditQuery {
                from,
                to,
                company,
                batch,
                employee,
                actions,
                json,
            };
            audit::run_audit(&config, filter).await?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {:#}", e);
            std::process::exit(2);
        }
    };
    init_tracing(&config.logging.level);
    tracing::debug!(db = ?config.database.path, events = ?config.audit.events_dir, "configuration loaded");

    if let Err(e) = run(cli, config).await {
        eprintln!("❌ {:#}", e);
        std::process::exit(1);
    }
}
