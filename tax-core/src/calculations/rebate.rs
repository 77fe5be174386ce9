//! Low-liability rebate applied after the slab tax.
//!
//! The rebate is `min(tax_liability, cap)` when the basis amount is at or
//! below the threshold, and zero otherwise. Which amount is compared against
//! the threshold is configurable through [`RebateBasis`].

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::common::non_negative;

/// Amount compared against [`RebatePolicy::threshold`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RebateBasis {
    /// Compare the computed tax liability.
    #[default]
    TaxLiability,
    /// Compare taxable income, as section 87A reads.
    TaxableIncome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RebatePolicy {
    pub threshold: Decimal,
    pub cap: Decimal,
    pub basis: RebateBasis,
}

impl Default for RebatePolicy {
    fn default() -> Self {
        Self {
            threshold: dec!(500000),
            cap: dec!(12500),
            basis: RebateBasis::default(),
        }
    }
}

/// Result of [`RebatePolicy::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebateOutcome {
    pub rebate: Decimal,
    pub net_tax_payable: Decimal,
}

impl RebatePolicy {
    pub fn apply(
        &self,
        tax_liability: Decimal,
        taxable_income: Decimal,
    ) -> RebateOutcome {
        let basis_amount = match self.basis {
            RebateBasis::TaxLiability => tax_liability,
            RebateBasis::TaxableIncome => taxable_income,
        };

        let rebate = if basis_amount <= self.threshold {
            non_negative(tax_liability.min(self.cap))
        } else {
            Decimal::ZERO
        };

        debug!(%tax_liability, %taxable_income, %rebate, basis = ?self.basis, "applied rebate");

        RebateOutcome {
            rebate,
            net_tax_payable: tax_liability - rebate,
        }
    }
}

/// Net tax payable under the default [`RebatePolicy`].
pub fn apply_rebate(
    tax_liability: Decimal,
    taxable_income: Decimal,
) -> Decimal {
    RebatePolicy::default()
        .apply(tax_liability, taxable_income)
        .net_tax_payable
}
