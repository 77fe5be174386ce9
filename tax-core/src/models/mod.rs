mod analysis;
mod classified_income;
mod income;
mod suggestion;
mod tax_slab;

pub use analysis::{AnalysisRecord, AnalysisResult};
pub use classified_income::ClassifiedIncome;
pub use income::{AmountOverflow, DEDUCTION_PREFIX, IncomeCategory, IncomeLine, IncomeMap};
pub use suggestion::Suggestion;
pub use tax_slab::{SlabTable, SlabTableError, TaxSlab};
