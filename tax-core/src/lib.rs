//! Core of the income-tax assistant: parsing free-text income statements,
//! slab tax and rebate computation, analysis assembly and the storage
//! traits that backends implement.

pub mod analyzer;
pub mod calculations;
pub mod db;
pub mod history;
pub mod income;
pub mod models;
pub mod report;
pub mod suggestions;

pub use analyzer::{AnalysisError, TaxAnalyzer};
pub use db::repository::{AnalysisRepository, RepositoryError};
pub use models::*;
