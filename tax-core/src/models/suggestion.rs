use serde::{Deserialize, Serialize};

/// A tax-saving hint carried along with an analysis.
///
/// The field names match the JSON shape `{type, suggestion, impact}` that
/// suggestion generators produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    #[serde(rename = "type")]
    pub kind: String,
    pub suggestion: String,
    pub impact: String,
}

impl Suggestion {
    pub fn new(
        kind: impl Into<String>,
        suggestion: impl Into<String>,
        impact: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            suggestion: suggestion.into(),
            impact: impact.into(),
        }
    }
}
