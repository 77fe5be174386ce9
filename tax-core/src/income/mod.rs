//! Turning free-text income statements into classified amounts.

pub mod classifier;
pub mod parser;

pub use classifier::classify_income;
pub use parser::{
    DuplicatePolicy, MAX_AMOUNT, ParseOptions, normalize_label, parse_amount, parse_income_lines,
    parse_income_text, parse_income_text_with,
};
