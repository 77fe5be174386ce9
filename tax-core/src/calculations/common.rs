//! Small numeric helpers shared by the calculators and the report renderer.

use rust_decimal::{Decimal, RoundingStrategy};

/// Rounds a decimal value to two places, halves away from zero.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use tax_core::calculations::common::round_half_up;
///
/// assert_eq!(round_half_up(dec!(12499.994)), dec!(12499.99));
/// assert_eq!(round_half_up(dec!(12499.995)), dec!(12500.00));
/// assert_eq!(round_half_up(dec!(-0.005)), dec!(-0.01));
/// ```
pub fn round_half_up(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Clamps negative values to zero.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use tax_core::calculations::common::non_negative;
///
/// assert_eq!(non_negative(dec!(-25000)), dec!(0));
/// assert_eq!(non_negative(dec!(600000)), dec!(600000));
/// ```
pub fn non_negative(value: Decimal) -> Decimal {
    value.max(Decimal::ZERO)
}
