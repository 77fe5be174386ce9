//! Command orchestration behind the `tax-assistant` subcommands.
//!
//! Each `run_*` function returns the text to print so the binary stays a thin
//! shell and the commands can be exercised against an in-memory repository.

use std::collections::HashMap;
use std::fmt::Write as _;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tax_core::calculations::{RebatePolicy, SlabCalculator};
use tax_core::db::{DbConfig, RepositoryRegistry};
use tax_core::history::{SortOrder, TrendDirection, filter_records, liability_trend, sort_records};
use tax_core::income::MAX_AMOUNT;
use tax_core::report::{format_inr, render_report};
use tax_core::suggestions::{RuleBasedSuggestions, WithFallback};
use tax_core::{
    AnalysisError, AnalysisRepository, AnalysisResult, RepositoryError, SlabTable, TaxAnalyzer,
};
use tax_db_sqlite::SqliteRepositoryFactory;
use tracing::{debug, info, warn};

const HISTORY_DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Registry with every backend this binary ships.
pub fn build_registry() -> RepositoryRegistry {
    let mut registry = RepositoryRegistry::new();
    registry.register(Box::new(SqliteRepositoryFactory));
    registry
}

pub async fn open_repository(config: &DbConfig) -> Result<Box<dyn AnalysisRepository>> {
    debug!(backend = %config.backend, "opening repository");
    build_registry()
        .create(config)
        .await
        .with_context(|| {
            format!(
                "Failed to open {} database '{}'",
                config.backend, config.connection_string
            )
        })
}

/// Slab table for `regime`, or the built-in table when the regime was never
/// loaded.
pub async fn load_slabs(
    repo: &dyn AnalysisRepository,
    regime: &str,
) -> Result<SlabTable> {
    match repo.get_tax_slabs(regime).await {
        Ok(table) => Ok(table),
        Err(RepositoryError::NotFound) => {
            warn!(regime, "no stored slab table, using the built-in new-regime table");
            Ok(SlabTable::canonical())
        }
        Err(e) => Err(e).with_context(|| format!("Failed to load slab table '{regime}'")),
    }
}

/// Reads a user-typed amount such as `12,00,000`, `₹ 1200000.50` or
/// `Rs. 500`, with the same rules as income statement lines.
pub fn parse_amount(input: &str) -> Result<Decimal> {
    if input.trim().is_empty() {
        bail!("amount is required");
    }
    match tax_core::income::parse_amount(input) {
        Some(amount) => Ok(amount),
        None => bail!(
            "'{input}' is not a valid amount: expected a non-negative number up to {}",
            format_inr(MAX_AMOUNT)
        ),
    }
}

/// What `analyze` produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzeOutcome {
    pub analysis: AnalysisResult,
    pub report: String,
    /// Repository id, when the analysis was stored.
    pub saved_id: Option<i64>,
}

/// Analyzes `text`, renders the report and optionally appends the result to
/// the history log.
pub async fn run_analyze(
    repo: &dyn AnalysisRepository,
    analyzer: &TaxAnalyzer,
    text: &str,
    save: bool,
    now: DateTime<Utc>,
) -> Result<AnalyzeOutcome> {
    let generator = WithFallback::new(RuleBasedSuggestions);
    let analysis = match analyzer.analyze(text, &generator, now) {
        Ok(analysis) => analysis,
        Err(AnalysisError::NoIncome) => {
            bail!("Please enter valid income details, one 'label: amount' per line")
        }
        Err(e) => return Err(e).context("Failed to analyze income"),
    };

    let saved_id = if save {
        let record = repo
            .save_analysis(&analysis)
            .await
            .context("Failed to save analysis")?;
        debug!(id = record.id, "analysis stored");
        Some(record.id)
    } else {
        None
    };

    let report = render_report(&analysis, now);
    Ok(AnalyzeOutcome {
        analysis,
        report,
        saved_id,
    })
}

/// Stored analyses as a table, with the liability trend arrow computed in
/// chronological order whatever `sort` is.
pub async fn run_history(
    repo: &dyn AnalysisRepository,
    sort: SortOrder,
    search: Option<&str>,
) -> Result<String> {
    let records = repo
        .list_analyses()
        .await
        .context("Failed to list analyses")?;

    let trend: HashMap<i64, TrendDirection> = records
        .iter()
        .zip(liability_trend(&records))
        .map(|(record, point)| (record.id, point.direction))
        .collect();

    let term = search.unwrap_or("");
    let mut matched: Vec<_> = filter_records(&records, term).into_iter().cloned().collect();
    if matched.is_empty() {
        return Ok(if term.trim().is_empty() {
            "No analyses stored yet.\n".to_string()
        } else {
            format!("No analyses match '{}'.\n", term.trim())
        });
    }
    sort_records(&mut matched, sort);

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>4}  {:<16}  {:>14}  {:>14}  {:>12}  {:>12}  Trend",
        "ID", "Date", "Total Income", "Taxable", "Tax", "Net Payable"
    );
    for record in &matched {
        let a = &record.analysis;
        let arrow = trend.get(&record.id).map_or("", TrendDirection::arrow);
        let _ = writeln!(
            out,
            "{:>4}  {:<16}  {:>14}  {:>14}  {:>12}  {:>12}  {arrow}",
            record.id,
            a.timestamp.format(HISTORY_DATE_FORMAT),
            format_inr(a.total_income),
            format_inr(a.total_taxable_income),
            format_inr(a.tax_liability),
            format_inr(a.net_tax_payable),
        );
    }
    Ok(out)
}

/// Report text for a stored analysis.
pub async fn run_report(
    repo: &dyn AnalysisRepository,
    id: i64,
    now: DateTime<Utc>,
) -> Result<String> {
    let record = match repo.get_analysis(id).await {
        Ok(record) => record,
        Err(RepositoryError::NotFound) => bail!("No analysis with id {id}"),
        Err(e) => return Err(e).with_context(|| format!("Failed to load analysis {id}")),
    };
    Ok(render_report(&record.analysis, now))
}

pub async fn run_delete(
    repo: &dyn AnalysisRepository,
    id: i64,
) -> Result<String> {
    match repo.delete_analysis(id).await {
        Ok(()) => {
            info!(id, "deleted analysis");
            Ok(format!("Deleted analysis {id}.\n"))
        }
        Err(RepositoryError::NotFound) => bail!("No analysis with id {id}"),
        Err(e) => Err(e).with_context(|| format!("Failed to delete analysis {id}")),
    }
}

fn percent(rate: Decimal) -> String {
    format!("{}%", (rate * Decimal::ONE_HUNDRED).normalize())
}

/// Slab-by-slab tax on a taxable amount, followed by the rebate.
pub fn run_calc(
    slabs: &SlabTable,
    rebate: &RebatePolicy,
    taxable_income: Decimal,
) -> Result<String> {
    let calculator = SlabCalculator::new(slabs);
    let portions = calculator.breakdown(taxable_income)?;
    let liability: Decimal = portions.iter().map(|p| p.tax).sum();
    let outcome = rebate.apply(liability, taxable_income);

    let mut out = String::new();
    let _ = writeln!(out, "Taxable Income: ₹{}", format_inr(taxable_income));
    let _ = writeln!(out);
    let _ = writeln!(out, "{:<26}  {:>5}  {:>12}  {:>10}", "Slab", "Rate", "Amount", "Tax");
    for portion in &portions {
        let range = match portion.ceiling {
            Some(ceiling) => format!("{} - {}", format_inr(portion.floor), format_inr(ceiling)),
            None => format!("above {}", format_inr(portion.floor)),
        };
        let _ = writeln!(
            out,
            "{range:<26}  {:>5}  {:>12}  {:>10}",
            percent(portion.rate),
            format_inr(portion.taxed_amount),
            format_inr(portion.tax),
        );
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "Tax Liability: ₹{}", format_inr(liability));
    let _ = writeln!(out, "Rebate: ₹{}", format_inr(outcome.rebate));
    let _ = writeln!(out, "Net Tax Payable: ₹{}", format_inr(outcome.net_tax_payable));
    Ok(out)
}

pub fn render_slabs(
    regime: &str,
    table: &SlabTable,
) -> String {
    let mut out = format!("Slab table: {regime}\n");
    let mut floor = Decimal::ZERO;
    for slab in table.slabs() {
        let line = match slab.upper_bound {
            Some(upper) => {
                let line = format!(
                    "₹{} - ₹{}: {}",
                    format_inr(floor),
                    format_inr(upper),
                    percent(slab.rate)
                );
                floor = upper;
                line
            }
            None => format!("above ₹{}: {}", format_inr(floor), percent(slab.rate)),
        };
        out.push_str(&line);
        out.push('\n');
    }
    out
}

/// The active table plus the regimes stored in the repository.
pub async fn run_slabs(
    repo: &dyn AnalysisRepository,
    regime: &str,
) -> Result<String> {
    let table = load_slabs(repo, regime).await?;
    let regimes = repo.list_regimes().await.context("Failed to list regimes")?;

    let mut out = render_slabs(regime, &table);
    if !regimes.is_empty() {
        let _ = writeln!(out, "\nStored regimes: {}", regimes.join(", "));
    }
    Ok(out)
}
