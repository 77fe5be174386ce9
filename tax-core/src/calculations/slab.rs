//! Progressive slab tax.
//!
//! Income is taxed slab by slab: each slab's rate applies only to the part of
//! the income between the previous slab's upper bound and its own.
//!
//! | Slab            | Rate |
//! |-----------------|------|
//! | 0 – 4,00,000    | 0%   |
//! | 4L – 8L         | 5%   |
//! | 8L – 12L        | 10%  |
//! | 12L – 16L       | 15%  |
//! | 16L – 20L       | 20%  |
//! | 20L – 24L       | 25%  |
//! | above 24L       | 30%  |
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use tax_core::calculations::SlabCalculator;
//! use tax_core::SlabTable;
//!
//! let table = SlabTable::canonical();
//! let calculator = SlabCalculator::new(&table);
//!
//! assert_eq!(calculator.calculate_tax(dec!(1200000)), Ok(dec!(60000)));
//! assert_eq!(calculator.calculate_tax(dec!(3000000)), Ok(dec!(480000)));
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::SlabTable;

/// Errors that can occur during slab tax calculation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaxCalculationError {
    /// Taxable income must be clamped to zero before calculation.
    #[error("taxable income {0} is negative")]
    NegativeIncome(Decimal),
    /// Income totals do not fit in a [`Decimal`].
    #[error("income totals are too large to calculate")]
    AmountOverflow,
}

/// The share of income that fell into one slab and the tax it produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlabPortion {
    pub floor: Decimal,
    /// `None` for the unbounded top slab.
    pub ceiling: Option<Decimal>,
    pub rate: Decimal,
    pub taxed_amount: Decimal,
    pub tax: Decimal,
}

/// Calculator over a borrowed [`SlabTable`].
#[derive(Debug, Clone, Copy)]
pub struct SlabCalculator<'a> {
    table: &'a SlabTable,
}

impl<'a> SlabCalculator<'a> {
    pub fn new(table: &'a SlabTable) -> Self {
        Self { table }
    }

    /// Total tax on `taxable_income`. Not rounded.
    ///
    /// # Errors
    ///
    /// Returns [`TaxCalculationError::NegativeIncome`] for negative input.
    pub fn calculate_tax(
        &self,
        taxable_income: Decimal,
    ) -> Result<Decimal, TaxCalculationError> {
        Ok(self
            .breakdown(taxable_income)?
            .iter()
            .map(|portion| portion.tax)
            .sum())
    }

    /// Walks the slabs in ascending order, returning one portion per slab
    /// the income reaches. The last portion is the slab the income ends in.
    ///
    /// # Errors
    ///
    /// Returns [`TaxCalculationError::NegativeIncome`] for negative input.
    pub fn breakdown(
        &self,
        taxable_income: Decimal,
    ) -> Result<Vec<SlabPortion>, TaxCalculationError> {
        if taxable_income < Decimal::ZERO {
            return Err(TaxCalculationError::NegativeIncome(taxable_income));
        }

        let mut portions = Vec::new();
        let mut previous_limit = Decimal::ZERO;

        for slab in self.table.slabs() {
            match slab.upper_bound {
                Some(upper) if taxable_income > upper => {
                    let taxed_amount = upper - previous_limit;
                    portions.push(SlabPortion {
                        floor: previous_limit,
                        ceiling: Some(upper),
                        rate: slab.rate,
                        taxed_amount,
                        tax: taxed_amount * slab.rate,
                    });
                    previous_limit = upper;
                }
                ceiling => {
                    let taxed_amount = taxable_income - previous_limit;
                    portions.push(SlabPortion {
                        floor: previous_limit,
                        ceiling,
                        rate: slab.rate,
                        taxed_amount,
                        tax: taxed_amount * slab.rate,
                    });
                    break;
                }
            }
        }

        Ok(portions)
    }
}

/// Slab tax on `taxable_income` using [`SlabTable::canonical`].
pub fn calculate_tax(taxable_income: Decimal) -> Result<Decimal, TaxCalculationError> {
    SlabCalculator::new(&SlabTable::canonical()).calculate_tax(taxable_income)
}
