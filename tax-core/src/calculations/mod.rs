//! Tax computation: progressive slab tax and the low-liability rebate.
//!
//! Both steps are exposed separately so callers can verify the slab walk and
//! the rebate independently.

pub mod common;
pub mod rebate;
pub mod slab;

pub use rebate::{RebateBasis, RebateOutcome, RebatePolicy, apply_rebate};
pub use slab::{SlabCalculator, SlabPortion, TaxCalculationError, calculate_tax};
