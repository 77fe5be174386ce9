use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::income::IncomeMap;
use super::suggestion::Suggestion;

/// Snapshot produced by one "analyze" action.
///
/// Immutable once built: the history log only ever appends new results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub timestamp: DateTime<Utc>,
    /// Normalized parser output, deduction keys still prefixed.
    pub income_details: IncomeMap,
    pub taxable: IncomeMap,
    pub non_taxable: IncomeMap,
    pub deductions: IncomeMap,
    /// Taxable plus non-taxable income; deductions excluded.
    pub total_income: Decimal,
    /// Taxable income minus deductions, never below zero.
    pub total_taxable_income: Decimal,
    /// Slab tax on `total_taxable_income`, before any rebate.
    pub tax_liability: Decimal,
    pub rebate: Decimal,
    pub net_tax_payable: Decimal,
    pub suggestions: Vec<Suggestion>,
}

/// A stored [`AnalysisResult`] together with its repository identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub id: i64,
    pub analysis: AnalysisResult,
}
