use std::fmt;

use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Prefix marking a normalized key as a deduction rather than income.
pub const DEDUCTION_PREFIX: &str = "Deduction ";

/// The canonical income categories a free-text label can normalize to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IncomeCategory {
    Salary,
    RentalIncome,
    FreelanceIncome,
    CapitalGains,
    ForeignIncome,
    OtherSources,
}

impl IncomeCategory {
    /// Categories whose amounts are subject to slab tax.
    pub const TAXABLE: [IncomeCategory; 5] = [
        IncomeCategory::Salary,
        IncomeCategory::FreelanceIncome,
        IncomeCategory::RentalIncome,
        IncomeCategory::CapitalGains,
        IncomeCategory::ForeignIncome,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Salary => "Salary",
            Self::RentalIncome => "Rental Income",
            Self::FreelanceIncome => "Freelance Income",
            Self::CapitalGains => "Capital Gains",
            Self::ForeignIncome => "Foreign Income",
            Self::OtherSources => "Other Sources",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Salary" => Some(Self::Salary),
            "Rental Income" => Some(Self::RentalIncome),
            "Freelance Income" => Some(Self::FreelanceIncome),
            "Capital Gains" => Some(Self::CapitalGains),
            "Foreign Income" => Some(Self::ForeignIncome),
            "Other Sources" => Some(Self::OtherSources),
            _ => None,
        }
    }

    pub fn is_taxable(&self) -> bool {
        Self::TAXABLE.contains(self)
    }
}

impl fmt::Display for IncomeCategory {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `label: amount` line accepted by the parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomeLine {
    pub label: String,
    pub amount: Decimal,
}

/// Raised when accumulating amounts leaves the range of [`Decimal`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("amount for '{key}' overflows when adding {amount}")]
pub struct AmountOverflow {
    pub key: String,
    pub amount: Decimal,
}

/// Insertion-ordered mapping from category key to amount.
///
/// Keys are unique. [`IncomeMap::insert`] overwrites an existing key in place
/// (the key keeps its original position), [`IncomeMap::add`] accumulates.
/// Equality ignores ordering: two maps are equal when they hold the same
/// key/amount pairs. Serializes as a JSON object in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IncomeMap {
    entries: IndexMap<String, Decimal>,
}

impl IncomeMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(
        &self,
        key: &str,
    ) -> Option<Decimal> {
        self.entries.get(key).copied()
    }

    pub fn contains_key(
        &self,
        key: &str,
    ) -> bool {
        self.entries.contains_key(key)
    }

    /// Sets `key` to `amount`, returning the previous amount if the key
    /// already existed.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        amount: Decimal,
    ) -> Option<Decimal> {
        self.entries.insert(key.into(), amount)
    }

    /// Adds `amount` to whatever is already stored under `key`.
    ///
    /// On overflow the stored amount is left unchanged.
    pub fn add(
        &mut self,
        key: impl Into<String>,
        amount: Decimal,
    ) -> Result<(), AmountOverflow> {
        let key = key.into();
        match self.entries.get_mut(&key) {
            Some(existing) => {
                *existing = existing
                    .checked_add(amount)
                    .ok_or(AmountOverflow { key, amount })?;
            }
            None => {
                self.entries.insert(key, amount);
            }
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Decimal)> + '_ {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.keys().map(String::as_str)
    }

    /// Sum of every amount in the map, or `None` if it does not fit in a
    /// [`Decimal`].
    pub fn total(&self) -> Option<Decimal> {
        self.entries
            .values()
            .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(*v))
    }
}

impl<K: Into<String>> FromIterator<(K, Decimal)> for IncomeMap {
    fn from_iter<I: IntoIterator<Item = (K, Decimal)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}
