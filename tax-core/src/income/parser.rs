//! Free-text income statement parsing.
//!
//! Input is one `label: amount` pair per line, e.g.
//!
//! ```text
//! Salary: 5,00,000
//! Rent: 120000
//! Health Insurance: 20000
//! ```
//!
//! Labels are normalized to canonical category keys by case-insensitive
//! keyword matching. Lines that cannot be read are dropped without error so
//! users can paste loosely formatted text.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use tax_core::income::parse_income_text;
//!
//! let map = parse_income_text("Monthly salary: 50,000\nnot a line\nRental: 1200");
//!
//! assert_eq!(map.get("Salary"), Some(dec!(50000)));
//! assert_eq!(map.get("Rental Income"), Some(dec!(1200)));
//! assert_eq!(map.len(), 2);
//! ```

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::models::{DEDUCTION_PREFIX, IncomeCategory, IncomeLine, IncomeMap};

/// What to do when two lines normalize to the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
    /// Later lines overwrite earlier ones.
    #[default]
    Replace,
    /// Amounts are added together.
    Sum,
}

/// Parser settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ParseOptions {
    #[serde(default)]
    pub duplicates: DuplicatePolicy,
}

#[derive(Debug, Clone, Copy)]
enum LabelRule {
    Category(IncomeCategory),
    Deduction,
}

// Checked in order; the first match wins.
static LABEL_RULES: LazyLock<Vec<(Regex, LabelRule)>> = LazyLock::new(|| {
    [
        (r"(?i)salary|pension", LabelRule::Category(IncomeCategory::Salary)),
        (r"(?i)rent|rental", LabelRule::Category(IncomeCategory::RentalIncome)),
        (r"(?i)freelance|business", LabelRule::Category(IncomeCategory::FreelanceIncome)),
        (r"(?i)capital", LabelRule::Category(IncomeCategory::CapitalGains)),
        (r"(?i)foreign", LabelRule::Category(IncomeCategory::ForeignIncome)),
        (r"(?i)investment|other", LabelRule::Category(IncomeCategory::OtherSources)),
        (r"(?i)health|insurance|section", LabelRule::Deduction),
    ]
    .into_iter()
    .map(|(pattern, rule)| (Regex::new(pattern).expect("keyword pattern is valid"), rule))
    .collect()
});

static CURRENCY_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:₹|(?i:rs\.?|inr))\s*").expect("currency pattern is valid"));

/// Maps a user label to its normalized key.
///
/// Unrecognised labels are returned trimmed but otherwise unchanged.
pub fn normalize_label(label: &str) -> String {
    let label = label.trim();
    let rule = LABEL_RULES
        .iter()
        .find(|(pattern, _)| pattern.is_match(label))
        .map(|(_, rule)| *rule);

    match rule {
        Some(LabelRule::Category(category)) => category.as_str().to_string(),
        Some(LabelRule::Deduction) => format!("{DEDUCTION_PREFIX}{label}"),
        None => label.to_string(),
    }
}

/// Largest amount a single line may carry (₹10^15).
///
/// Keeps every sum over a statement well inside the range of [`Decimal`].
pub const MAX_AMOUNT: Decimal = dec!(1000000000000000);

/// Reads an amount such as `₹ 1,20,000.50`, `Rs. 500` or `INR 20`.
///
/// The currency marker and `,` separators are removed before parsing.
/// Negative amounts, amounts above [`MAX_AMOUNT`] and unparseable text
/// yield `None`.
pub fn parse_amount(segment: &str) -> Option<Decimal> {
    let cleaned = CURRENCY_PREFIX.replace(segment.trim(), "").replace(',', "");
    let amount = Decimal::from_str(cleaned.trim()).ok()?;
    (Decimal::ZERO..=MAX_AMOUNT).contains(&amount).then_some(amount)
}

/// Splits text into accepted [`IncomeLine`]s, labels untouched.
pub fn parse_income_lines(text: &str) -> Vec<IncomeLine> {
    text.lines()
        .filter_map(|line| {
            let parsed = line.split_once(':').and_then(|(label, amount)| {
                let label = label.trim();
                if label.is_empty() {
                    return None;
                }
                parse_amount(amount).map(|amount| IncomeLine {
                    label: label.to_string(),
                    amount,
                })
            });
            if parsed.is_none() && !line.trim().is_empty() {
                trace!(line, "skipping unreadable income line");
            }
            parsed
        })
        .collect()
}

/// Parses text into a normalized [`IncomeMap`] using default options.
pub fn parse_income_text(text: &str) -> IncomeMap {
    parse_income_text_with(text, &ParseOptions::default())
}

/// Parses text into a normalized [`IncomeMap`].
///
/// Never fails: text without a single readable line gives an empty map.
pub fn parse_income_text_with(
    text: &str,
    options: &ParseOptions,
) -> IncomeMap {
    let mut map = IncomeMap::new();
    for line in parse_income_lines(text) {
        let key = normalize_label(&line.label);
        match options.duplicates {
            DuplicatePolicy::Replace => {
                map.insert(key, line.amount);
            }
            DuplicatePolicy::Sum => {
                if let Err(e) = map.add(key, line.amount) {
                    warn!(error = %e, "dropping income line");
                }
            }
        }
    }
    map
}
