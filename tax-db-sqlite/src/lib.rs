//! SQLite backend for [`tax_core::AnalysisRepository`].

mod decimal;
mod factory;
mod repository;

pub use factory::SqliteRepositoryFactory;
pub use repository::SqliteRepository;
