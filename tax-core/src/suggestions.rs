//! Tax-saving suggestions.
//!
//! The analyzer asks a [`SuggestionGenerator`] for advice and carries the
//! result along untouched. Generators that talk to a remote text model do so
//! in the calling layer and hand their raw output to
//! [`parse_suggestions_json`]; [`WithFallback`] keeps an analysis from ever
//! failing because advice was unavailable.

use thiserror::Error;
use tracing::warn;

use crate::models::{IncomeCategory, IncomeMap, Suggestion};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SuggestionError {
    #[error("suggestion generator unavailable: {0}")]
    Unavailable(String),
    #[error("malformed suggestion payload: {0}")]
    Malformed(String),
}

/// Produces suggestions for a normalized income map.
pub trait SuggestionGenerator {
    fn generate(&self, income: &IncomeMap) -> Result<Vec<Suggestion>, SuggestionError>;
}

impl<F> SuggestionGenerator for F
where
    F: Fn(&IncomeMap) -> Result<Vec<Suggestion>, SuggestionError>,
{
    fn generate(&self, income: &IncomeMap) -> Result<Vec<Suggestion>, SuggestionError> {
        self(income)
    }
}

/// The fixed three-item list used when nothing better is available.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticSuggestions;

impl StaticSuggestions {
    pub fn suggestions() -> Vec<Suggestion> {
        vec![
            Suggestion::new(
                "Investment",
                "Invest in ELSS funds under Section 80C",
                "Save up to ₹46,800",
            ),
            Suggestion::new(
                "Insurance",
                "Get health insurance under Section 80D",
                "Save up to ₹25,000",
            ),
            Suggestion::new(
                "Home Loan",
                "Claim home loan interest under Section 24",
                "Save up to ₹2,00,000",
            ),
        ]
    }
}

impl SuggestionGenerator for StaticSuggestions {
    fn generate(&self, _income: &IncomeMap) -> Result<Vec<Suggestion>, SuggestionError> {
        Ok(Self::suggestions())
    }
}

/// Offline advice chosen by which income categories are present.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedSuggestions;

impl RuleBasedSuggestions {
    fn for_category(category: IncomeCategory) -> Option<Suggestion> {
        let suggestion = match category {
            IncomeCategory::Salary => Suggestion::new(
                "Salary Structure",
                "Consider restructuring salary to include more tax-exempt components",
                "Potential tax saving up to ₹50,000",
            ),
            IncomeCategory::FreelanceIncome => Suggestion::new(
                "Freelance Income",
                "Maintain proper documentation of expenses for deductions",
                "Can reduce taxable income by 30%",
            ),
            IncomeCategory::RentalIncome => Suggestion::new(
                "Rental Income",
                "Claim the 30% standard deduction and municipal taxes paid on let-out property",
                "Reduces taxable rent by 30%",
            ),
            IncomeCategory::CapitalGains => Suggestion::new(
                "Capital Gains",
                "Book long-term gains within the yearly exemption limit",
                "First ₹1,25,000 of LTCG is exempt",
            ),
            IncomeCategory::ForeignIncome => Suggestion::new(
                "Foreign Income",
                "Claim relief under the applicable tax treaty for tax paid abroad",
                "Avoids double taxation",
            ),
            IncomeCategory::OtherSources => return None,
        };
        Some(suggestion)
    }
}

impl SuggestionGenerator for RuleBasedSuggestions {
    fn generate(&self, income: &IncomeMap) -> Result<Vec<Suggestion>, SuggestionError> {
        let mut suggestions: Vec<Suggestion> = income
            .keys()
            .filter_map(IncomeCategory::parse)
            .filter_map(Self::for_category)
            .collect();

        let has_80c = income.keys().any(|key| key.contains("80C"));
        if !has_80c {
            suggestions.push(Suggestion::new(
                "Investment",
                "Increase investment in ELSS funds for tax benefits",
                "Additional tax saving of ₹15,000",
            ));
        }

        let has_health_cover = income
            .keys()
            .any(|key| key.to_lowercase().contains("health"));
        if !has_health_cover {
            suggestions.push(Suggestion::new(
                "Health Insurance",
                "Increase health coverage for higher 80D benefits",
                "Extra deduction of ₹25,000 possible",
            ));
        }

        Ok(suggestions)
    }
}

/// Wraps a generator, substituting [`StaticSuggestions`] when it fails or
/// returns nothing.
#[derive(Debug, Clone, Default)]
pub struct WithFallback<G> {
    inner: G,
}

impl<G> WithFallback<G> {
    pub fn new(inner: G) -> Self {
        Self { inner }
    }
}

impl<G: SuggestionGenerator> SuggestionGenerator for WithFallback<G> {
    fn generate(&self, income: &IncomeMap) -> Result<Vec<Suggestion>, SuggestionError> {
        match self.inner.generate(income) {
            Ok(suggestions) if !suggestions.is_empty() => Ok(suggestions),
            Ok(_) => {
                warn!("suggestion generator returned nothing, using static suggestions");
                Ok(StaticSuggestions::suggestions())
            }
            Err(err) => {
                warn!(error = %err, "suggestion generator failed, using static suggestions");
                Ok(StaticSuggestions::suggestions())
            }
        }
    }
}

/// Prompt text for a remote generator, embedding the income map as JSON.
pub fn suggestion_prompt(income: &IncomeMap) -> Result<String, SuggestionError> {
    let details =
        serde_json::to_string(income).map_err(|e| SuggestionError::Malformed(e.to_string()))?;
    Ok(format!(
        "Given these income details: {details}, provide 3 specific tax saving suggestions. \
         Respond with a JSON array of objects with the fields type, suggestion and impact."
    ))
}

/// Parses a generator's text output as a JSON array of suggestions.
///
/// A surrounding Markdown code fence is tolerated.
pub fn parse_suggestions_json(text: &str) -> Result<Vec<Suggestion>, SuggestionError> {
    let trimmed = text.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed);

    serde_json::from_str(body.trim()).map_err(|e| SuggestionError::Malformed(e.to_string()))
}
