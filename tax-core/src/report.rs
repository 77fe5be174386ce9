//! Plain-text rendering of an [`AnalysisResult`].

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::calculations::common::round_half_up;
use crate::models::{AnalysisResult, IncomeMap};

const DATE_FORMAT: &str = "%-d %b %Y, %H:%M UTC";

/// Formats an amount with Indian digit grouping (`12,34,567.5`).
///
/// Rounded half-up to at most two fraction digits; trailing zeros dropped.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use tax_core::report::format_inr;
///
/// assert_eq!(format_inr(dec!(1234567.5)), "12,34,567.5");
/// assert_eq!(format_inr(dec!(60000.00)), "60,000");
/// ```
pub fn format_inr(amount: Decimal) -> String {
    let rounded = round_half_up(amount).normalize();
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };

    let digits = rounded.abs().to_string();
    match digits.split_once('.') {
        Some((whole, fraction)) => format!("{sign}{}.{fraction}", group_indian(whole)),
        None => format!("{sign}{}", group_indian(&digits)),
    }
}

// Last three digits, then pairs.
fn group_indian(whole: &str) -> String {
    if whole.len() <= 3 {
        return whole.to_string();
    }

    let (mut head, tail) = whole.split_at(whole.len() - 3);
    let mut groups = Vec::new();
    while head.len() > 2 {
        let (rest, pair) = head.split_at(head.len() - 2);
        groups.push(pair);
        head = rest;
    }
    groups.push(head);
    groups.reverse();

    format!("{},{tail}", groups.join(","))
}

fn rupees(amount: Decimal) -> String {
    format!("₹{}", format_inr(amount))
}

fn section(
    lines: &mut Vec<String>,
    title: &str,
    map: &IncomeMap,
) {
    lines.push(String::new());
    lines.push(format!("{title}:"));
    if map.is_empty() {
        lines.push("(none)".to_string());
    }
    for (key, amount) in map.iter() {
        lines.push(format!("{key}: {}", rupees(amount)));
    }
}

/// Renders the downloadable text report.
pub fn render_report(
    analysis: &AnalysisResult,
    generated_at: DateTime<Utc>,
) -> String {
    let mut lines = vec![
        "Tax Report".to_string(),
        format!("Date: {}", generated_at.format(DATE_FORMAT)),
        format!("Analysed: {}", analysis.timestamp.format(DATE_FORMAT)),
        format!("Total Income: {}", rupees(analysis.total_income)),
        format!("Taxable Income: {}", rupees(analysis.total_taxable_income)),
        format!("Tax Liability: {}", rupees(analysis.tax_liability)),
        format!("Rebate: {}", rupees(analysis.rebate)),
        format!("Net Tax Payable: {}", rupees(analysis.net_tax_payable)),
    ];

    section(&mut lines, "Taxable Income", &analysis.taxable);
    section(&mut lines, "Non-Taxable Income", &analysis.non_taxable);
    section(&mut lines, "Deductions", &analysis.deductions);

    lines.push(String::new());
    lines.push("Tax Saving Suggestions:".to_string());
    if analysis.suggestions.is_empty() {
        lines.push("(none)".to_string());
    }
    for s in &analysis.suggestions {
        lines.push(format!("{}: {} (Impact: {})", s.kind, s.suggestion, s.impact));
    }

    let mut report = lines.join("\n");
    report.push('\n');
    report
}
