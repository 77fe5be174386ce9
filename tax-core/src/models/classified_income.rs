use serde::{Deserialize, Serialize};

use super::income::{DEDUCTION_PREFIX, IncomeMap};

/// An [`IncomeMap`] partitioned into taxable, non-taxable and deduction
/// buckets. Deduction keys are stored without their `"Deduction "` prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedIncome {
    pub taxable: IncomeMap,
    pub non_taxable: IncomeMap,
    pub deductions: IncomeMap,
}

impl ClassifiedIncome {
    /// True when neither taxable nor non-taxable income was recognised.
    pub fn has_no_income(&self) -> bool {
        self.taxable.is_empty() && self.non_taxable.is_empty()
    }

    /// Rebuilds the normalized map the partition was produced from,
    /// restoring the deduction prefix.
    pub fn to_income_map(&self) -> IncomeMap {
        let mut map = IncomeMap::new();
        for (key, amount) in self.taxable.iter().chain(self.non_taxable.iter()) {
            map.insert(key, amount);
        }
        for (key, amount) in self.deductions.iter() {
            map.insert(format!("{DEDUCTION_PREFIX}{key}"), amount);
        }
        map
    }
}
