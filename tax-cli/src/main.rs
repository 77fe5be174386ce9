use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tax_core::TaxAnalyzer;
use tax_core::history::SortOrder;
use tracing::{debug, info};

use tax_cli::config::AppConfig;
use tax_cli::{app, logging};

// ─── CLI definition ──────────────────────────────────────────────────────────

/// Income-tax assistant for the Indian new regime.
///
/// Reads `label: amount` income statements, computes slab tax and the
/// rebate, and keeps a history of past analyses.
#[derive(Debug, Parser)]
#[command(name = "tax-assistant", version, about)]
struct Cli {
    /// Config file; defaults to $TAX_ASSISTANT_CONFIG, then ./tax-assistant.toml.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database backend, overriding the config file.
    #[arg(long, global = true)]
    backend: Option<String>,

    /// Database connection string, overriding the config file.
    /// For SQLite this is a file path (e.g. `tax-assistant.db`) or `:memory:`.
    #[arg(long, global = true)]
    db: Option<String>,

    /// Log filter, overriding the config file (e.g. `debug`).
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Analyze an income statement read from a file or stdin.
    Analyze {
        /// Statement file; stdin when omitted.
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Print the report without storing the analysis.
        #[arg(long)]
        no_save: bool,
    },

    /// List stored analyses.
    History {
        /// date-desc, date-asc, tax-desc or tax-asc.
        #[arg(long, default_value_t = SortOrder::DateDesc)]
        sort: SortOrder,

        /// Only analyses whose categories or amounts contain this text.
        #[arg(long)]
        search: Option<String>,
    },

    /// Render the report of a stored analysis.
    Report {
        #[arg(long)]
        id: i64,

        /// Write the report here instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Remove a stored analysis.
    Delete {
        #[arg(long)]
        id: i64,
    },

    /// Slab-by-slab tax on a taxable amount.
    Calc {
        /// Taxable income, e.g. 12,00,000.
        amount: String,
    },

    /// Print the active slab table.
    Slabs,
}

// ─── entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (mut config, config_path) = AppConfig::load(cli.config.as_deref())?;
    if let Some(backend) = cli.backend {
        config.database.backend = backend;
    }
    if let Some(db) = cli.db {
        config.database.connection_string = db;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }

    logging::init_logging(&config.logging.level);
    if let Some(file) = &config.logging.file {
        logging::enable_file_logging(file)?;
    }
    match &config_path {
        Some(path) => debug!(path = %path.display(), "loaded config"),
        None => debug!("no config file, using defaults"),
    }

    let repo = app::open_repository(&config.database).await?;
    let now = Utc::now();

    match cli.command {
        Command::Analyze { file, no_save } => {
            let text = match &file {
                Some(path) => std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read: {}", path.display()))?,
                None => {
                    let mut text = String::new();
                    std::io::stdin()
                        .read_to_string(&mut text)
                        .context("Failed to read stdin")?;
                    text
                }
            };

            let slabs = app::load_slabs(repo.as_ref(), &config.tax.regime).await?;
            let analyzer = TaxAnalyzer::new(slabs, config.rebate, config.parser);
            let outcome = app::run_analyze(repo.as_ref(), &analyzer, &text, !no_save, now).await?;

            print!("{}", outcome.report);
            if let Some(id) = outcome.saved_id {
                println!("\nSaved as analysis {id}.");
            }
        }
        Command::History { sort, search } => {
            print!("{}", app::run_history(repo.as_ref(), sort, search.as_deref()).await?);
        }
        Command::Report { id, output } => {
            let report = app::run_report(repo.as_ref(), id, now).await?;
            match output {
                Some(path) => {
                    std::fs::write(&path, report)
                        .with_context(|| format!("Failed to write: {}", path.display()))?;
                    info!(path = %path.display(), id, "wrote report");
                }
                None => print!("{report}"),
            }
        }
        Command::Delete { id } => {
            print!("{}", app::run_delete(repo.as_ref(), id).await?);
        }
        Command::Calc { amount } => {
            let amount = app::parse_amount(&amount)?;
            let slabs = app::load_slabs(repo.as_ref(), &config.tax.regime).await?;
            print!("{}", app::run_calc(&slabs, &config.rebate, amount)?);
        }
        Command::Slabs => {
            print!("{}", app::run_slabs(repo.as_ref(), &config.tax.regime).await?);
        }
    }

    Ok(())
}
