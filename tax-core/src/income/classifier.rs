use tracing::debug;

use crate::models::{ClassifiedIncome, DEDUCTION_PREFIX, IncomeCategory, IncomeMap};

/// Partitions a normalized map into taxable, non-taxable and deduction
/// buckets.
///
/// * keys naming a taxable [`IncomeCategory`] go to `taxable`;
/// * keys starting with `"Deduction "` go to `deductions`, prefix stripped;
/// * everything else goes to `non_taxable`.
///
/// Every input key lands in exactly one bucket, and each bucket keeps the
/// input's ordering.
pub fn classify_income(income: &IncomeMap) -> ClassifiedIncome {
    let mut classified = ClassifiedIncome::default();

    for (key, amount) in income.iter() {
        if let Some(name) = key.strip_prefix(DEDUCTION_PREFIX) {
            classified.deductions.insert(name, amount);
        } else if IncomeCategory::parse(key).is_some_and(|c| c.is_taxable()) {
            classified.taxable.insert(key, amount);
        } else {
            classified.non_taxable.insert(key, amount);
        }
    }

    debug!(
        taxable = classified.taxable.len(),
        non_taxable = classified.non_taxable.len(),
        deductions = classified.deductions.len(),
        "classified income"
    );

    classified
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::income::parse_income_text;

    fn map(entries: &[(&str, rust_decimal::Decimal)]) -> IncomeMap {
        entries.iter().map(|(k, v)| (*k, *v)).collect()
    }

    #[test]
    fn classifies_reference_statement() {
        let income = parse_income_text("Salary: 500000\nRent: 120000\nHealth Insurance: 20000");

        let classified = classify_income(&income);

        assert_eq!(
            classified.taxable,
            map(&[("Salary", dec!(500000)), ("Rental Income", dec!(120000))])
        );
        assert_eq!(
            classified.deductions,
            map(&[("Health Insurance", dec!(20000))])
        );
        assert!(classified.non_taxable.is_empty());
    }

    #[test]
    fn other_sources_and_unknown_labels_are_non_taxable() {
        let income = map(&[
            ("Other Sources", dec!(50000)),
            ("Lottery", dec!(1000)),
            ("Capital Gains", dec!(75000)),
        ]);

        let classified = classify_income(&income);

        assert_eq!(
            classified.non_taxable,
            map(&[("Other Sources", dec!(50000)), ("Lottery", dec!(1000))])
        );
        assert_eq!(classified.taxable, map(&[("Capital Gains", dec!(75000))]));
    }

    #[test]
    fn every_taxable_category_is_taxable() {
        let income = map(&[
            ("Salary", dec!(1)),
            ("Freelance Income", dec!(2)),
            ("Rental Income", dec!(3)),
            ("Capital Gains", dec!(4)),
            ("Foreign Income", dec!(5)),
        ]);

        let classified = classify_income(&income);

        assert_eq!(classified.taxable, income);
        assert!(classified.non_taxable.is_empty());
        assert!(classified.deductions.is_empty());
    }

    #[test]
    fn buckets_preserve_input_order() {
        let income = map(&[
            ("Rental Income", dec!(1)),
            ("Lottery", dec!(2)),
            ("Salary", dec!(3)),
            ("Gift", dec!(4)),
        ]);

        let classified = classify_income(&income);

        assert_eq!(
            classified.taxable.keys().collect::<Vec<_>>(),
            vec!["Rental Income", "Salary"]
        );
        assert_eq!(
            classified.non_taxable.keys().collect::<Vec<_>>(),
            vec!["Lottery", "Gift"]
        );
    }

    #[test]
    fn partition_covers_every_key_exactly_once() {
        let income = parse_income_text(
            "Salary: 900000\nFreelance: 150000\nInvestment: 30000\nGift: 5000\n\
             Section 80C: 150000\nHealth Insurance: 25000\nForeign: 1000",
        );

        let classified = classify_income(&income);

        let bucket_sizes =
            classified.taxable.len() + classified.non_taxable.len() + classified.deductions.len();
        assert_eq!(bucket_sizes, income.len());
        assert_eq!(classified.to_income_map(), income);
    }

    #[test]
    fn reclassifying_the_union_recovers_the_same_partition() {
        let income = parse_income_text("Salary: 1\nOther: 2\nInsurance: 3\nCapital: 4");
        let classified = classify_income(&income);

        let again = classify_income(&classified.to_income_map());

        assert_eq!(again, classified);
    }

    #[test]
    fn empty_map_classifies_to_empty_buckets() {
        let classified = classify_income(&IncomeMap::new());

        assert!(classified.has_no_income());
        assert!(classified.deductions.is_empty());
    }

    #[test]
    fn deductions_only_counts_as_no_income() {
        let classified = classify_income(&map(&[("Deduction Health Insurance", dec!(100))]));

        assert!(classified.has_no_income());
        assert_eq!(classified.deductions.len(), 1);
    }
}
