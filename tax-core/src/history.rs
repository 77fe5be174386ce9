//! Views over stored analyses: ordering, liability trend and search.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::AnalysisRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortOrder {
    /// Newest first.
    #[default]
    DateDesc,
    DateAsc,
    TaxDesc,
    TaxAsc,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown sort order '{0}' (expected date-desc, date-asc, tax-desc or tax-asc)")]
pub struct ParseSortOrderError(pub String);

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::DateDesc => "date-desc",
            SortOrder::DateAsc => "date-asc",
            SortOrder::TaxDesc => "tax-desc",
            SortOrder::TaxAsc => "tax-asc",
        }
    }
}

impl FromStr for SortOrder {
    type Err = ParseSortOrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "date-desc" => Ok(SortOrder::DateDesc),
            "date-asc" => Ok(SortOrder::DateAsc),
            "tax-desc" => Ok(SortOrder::TaxDesc),
            "tax-asc" => Ok(SortOrder::TaxAsc),
            _ => Err(ParseSortOrderError(s.to_string())),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sorts in place. Ties keep their relative order.
pub fn sort_records(
    records: &mut [AnalysisRecord],
    order: SortOrder,
) {
    match order {
        SortOrder::DateAsc => records.sort_by_key(|r| r.analysis.timestamp),
        SortOrder::DateDesc => records.sort_by(|a, b| b.analysis.timestamp.cmp(&a.analysis.timestamp)),
        SortOrder::TaxAsc => records.sort_by_key(|r| r.analysis.tax_liability),
        SortOrder::TaxDesc => {
            records.sort_by(|a, b| b.analysis.tax_liability.cmp(&a.analysis.tax_liability))
        }
    }
}

/// Movement of the liability relative to the previous record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    First,
    Increase,
    Decrease,
    Unchanged,
}

impl TrendDirection {
    pub fn arrow(&self) -> &'static str {
        match self {
            TrendDirection::First => "·",
            TrendDirection::Increase => "↑",
            TrendDirection::Decrease => "↓",
            TrendDirection::Unchanged => "→",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendPoint {
    /// Day and abbreviated month, e.g. `16-Oct`.
    pub label: String,
    pub tax_liability: Decimal,
    pub direction: TrendDirection,
}

/// One point per record, in the order given.
pub fn liability_trend(records: &[AnalysisRecord]) -> Vec<TrendPoint> {
    let mut previous: Option<Decimal> = None;
    records
        .iter()
        .map(|record| {
            let liability = record.analysis.tax_liability;
            let direction = match previous {
                None => TrendDirection::First,
                Some(p) if liability > p => TrendDirection::Increase,
                Some(p) if liability < p => TrendDirection::Decrease,
                Some(_) => TrendDirection::Unchanged,
            };
            previous = Some(liability);
            TrendPoint {
                label: record.analysis.timestamp.format("%-d-%b").to_string(),
                tax_liability: liability,
                direction,
            }
        })
        .collect()
}

/// Records whose income categories or headline amounts contain `term`,
/// ignoring case. A blank term matches everything.
pub fn filter_records<'a>(
    records: &'a [AnalysisRecord],
    term: &str,
) -> Vec<&'a AnalysisRecord> {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return records.iter().collect();
    }

    records
        .iter()
        .filter(|record| {
            let analysis = &record.analysis;
            let in_categories = analysis
                .income_details
                .keys()
                .any(|key| key.to_lowercase().contains(&needle));
            let in_amounts = [
                analysis.total_income,
                analysis.total_taxable_income,
                analysis.tax_liability,
            ]
            .iter()
            .any(|amount| amount.to_string().contains(&needle));
            in_categories || in_amounts
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::calculations::RebatePolicy;
    use crate::models::{AnalysisResult, IncomeMap, SlabTable};

    fn record(
        id: i64,
        day: u32,
        income: &[(&str, Decimal)],
    ) -> AnalysisRecord {
        let timestamp = Utc.with_ymd_and_hms(2026, 10, day, 12, 0, 0).unwrap();
        let income: IncomeMap = income.iter().map(|(k, v)| (*k, *v)).collect();
        let analysis = AnalysisResult::assemble(
            timestamp,
            income,
            &SlabTable::canonical(),
            &RebatePolicy::default(),
            vec![],
        )
        .unwrap();
        AnalysisRecord { id, analysis }
    }

    fn sample() -> Vec<AnalysisRecord> {
        vec![
            record(1, 3, &[("Salary", dec!(900000))]),
            record(2, 16, &[("Salary", dec!(1200000)), ("Lottery", dec!(500))]),
            record(3, 9, &[("Rental Income", dec!(300000))]),
        ]
    }

    fn ids(records: &[AnalysisRecord]) -> Vec<i64> {
        records.iter().map(|r| r.id).collect()
    }

    // =========================================================================
    // SortOrder tests
    // =========================================================================

    #[test]
    fn sort_order_parses_and_displays() {
        for order in [
            SortOrder::DateDesc,
            SortOrder::DateAsc,
            SortOrder::TaxDesc,
            SortOrder::TaxAsc,
        ] {
            assert_eq!(order.to_string().parse::<SortOrder>(), Ok(order));
        }
        assert_eq!(" Tax-Asc ".parse::<SortOrder>(), Ok(SortOrder::TaxAsc));
        assert!("newest".parse::<SortOrder>().is_err());
    }

    #[test]
    fn sorts_by_date() {
        let mut records = sample();

        sort_records(&mut records, SortOrder::DateDesc);
        assert_eq!(ids(&records), vec![2, 3, 1]);

        sort_records(&mut records, SortOrder::DateAsc);
        assert_eq!(ids(&records), vec![1, 3, 2]);
    }

    #[test]
    fn sorts_by_tax() {
        let mut records = sample();

        sort_records(&mut records, SortOrder::TaxDesc);
        assert_eq!(ids(&records), vec![2, 1, 3]);

        sort_records(&mut records, SortOrder::TaxAsc);
        assert_eq!(ids(&records), vec![3, 1, 2]);
    }

    // =========================================================================
    // liability_trend tests
    // =========================================================================

    #[test]
    fn trend_labels_and_directions() {
        let records = vec![
            record(1, 3, &[("Salary", dec!(900000))]),
            record(2, 9, &[("Salary", dec!(900000))]),
            record(3, 16, &[("Salary", dec!(1200000))]),
            record(4, 20, &[("Salary", dec!(300000))]),
        ];

        let trend = liability_trend(&records);

        let labels: Vec<_> = trend.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, vec!["3-Oct", "9-Oct", "16-Oct", "20-Oct"]);
        let directions: Vec<_> = trend.iter().map(|p| p.direction).collect();
        assert_eq!(
            directions,
            vec![
                TrendDirection::First,
                TrendDirection::Unchanged,
                TrendDirection::Increase,
                TrendDirection::Decrease,
            ]
        );
        assert_eq!(trend[2].tax_liability, dec!(60000));
    }

    #[test]
    fn trend_of_nothing_is_empty() {
        assert!(liability_trend(&[]).is_empty());
    }

    // =========================================================================
    // filter_records tests
    // =========================================================================

    #[test]
    fn filter_matches_categories_case_insensitively() {
        let records = sample();

        let found = filter_records(&records, "rental");

        assert_eq!(found.iter().map(|r| r.id).collect::<Vec<_>>(), vec![3]);
    }

    #[test]
    fn filter_matches_amounts() {
        let records = sample();

        // tax liability of the 1,200,000 salary record
        let found = filter_records(&records, "60000");

        assert_eq!(found.iter().map(|r| r.id).collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn blank_filter_matches_everything() {
        let records = sample();

        assert_eq!(filter_records(&records, "  ").len(), 3);
    }
}
