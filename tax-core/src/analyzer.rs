//! End-to-end analysis: parse, classify, total, tax, rebate, suggestions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::calculations::common::non_negative;
use crate::calculations::{RebatePolicy, SlabCalculator, TaxCalculationError};
use crate::income::{ParseOptions, classify_income, parse_income_text_with};
use crate::models::{AnalysisResult, IncomeMap, SlabTable, Suggestion};
use crate::suggestions::{SuggestionError, SuggestionGenerator};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AnalysisError {
    /// The text had no readable `label: amount` line.
    #[error("no valid income details found")]
    NoIncome,
    #[error(transparent)]
    Calculation(#[from] TaxCalculationError),
    #[error(transparent)]
    Suggestions(#[from] SuggestionError),
}

impl AnalysisResult {
    /// Builds a result from an already parsed income map.
    ///
    /// Taxable income is floored at zero before the slab walk. Fails with
    /// [`TaxCalculationError::AmountOverflow`] when the totals leave the
    /// range of [`Decimal`](rust_decimal::Decimal).
    pub fn assemble(
        timestamp: DateTime<Utc>,
        income_details: IncomeMap,
        slabs: &SlabTable,
        rebate: &RebatePolicy,
        suggestions: Vec<Suggestion>,
    ) -> Result<Self, TaxCalculationError> {
        let classified = classify_income(&income_details);

        let taxable = classified.taxable.total();
        let non_taxable = classified.non_taxable.total();
        let deductions = classified.deductions.total();
        let (Some(taxable), Some(non_taxable), Some(deductions)) = (taxable, non_taxable, deductions)
        else {
            return Err(TaxCalculationError::AmountOverflow);
        };

        let total_income = taxable
            .checked_add(non_taxable)
            .ok_or(TaxCalculationError::AmountOverflow)?;
        let total_taxable_income = non_negative(
            taxable
                .checked_sub(deductions)
                .ok_or(TaxCalculationError::AmountOverflow)?,
        );
        let tax_liability = SlabCalculator::new(slabs).calculate_tax(total_taxable_income)?;
        let outcome = rebate.apply(tax_liability, total_taxable_income);

        debug!(
            %total_income,
            %total_taxable_income,
            %tax_liability,
            net_tax_payable = %outcome.net_tax_payable,
            "assembled analysis"
        );

        Ok(Self {
            timestamp,
            income_details,
            taxable: classified.taxable,
            non_taxable: classified.non_taxable,
            deductions: classified.deductions,
            total_income,
            total_taxable_income,
            tax_liability,
            rebate: outcome.rebate,
            net_tax_payable: outcome.net_tax_payable,
            suggestions,
        })
    }
}

/// Everything an analysis depends on besides its input text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxAnalyzer {
    pub slabs: SlabTable,
    pub rebate: RebatePolicy,
    pub parse_options: ParseOptions,
}

impl TaxAnalyzer {
    pub fn new(
        slabs: SlabTable,
        rebate: RebatePolicy,
        parse_options: ParseOptions,
    ) -> Self {
        Self {
            slabs,
            rebate,
            parse_options,
        }
    }

    /// Analyzes free text.
    ///
    /// The generator sees the normalized income map. Wrap it in
    /// [`WithFallback`](crate::suggestions::WithFallback) so that missing
    /// advice never stops an analysis.
    ///
    /// # Errors
    ///
    /// [`AnalysisError::NoIncome`] when no line could be read; generator
    /// failures are passed through.
    pub fn analyze(
        &self,
        text: &str,
        generator: &dyn SuggestionGenerator,
        timestamp: DateTime<Utc>,
    ) -> Result<AnalysisResult, AnalysisError> {
        let income = parse_income_text_with(text, &self.parse_options);
        if income.is_empty() {
            return Err(AnalysisError::NoIncome);
        }

        let suggestions = generator.generate(&income)?;

        Ok(AnalysisResult::assemble(
            timestamp,
            income,
            &self.slabs,
            &self.rebate,
            suggestions,
        )?)
    }
}
