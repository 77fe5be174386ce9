use async_trait::async_trait;
use thiserror::Error;

use crate::models::{AnalysisRecord, AnalysisResult, SlabTable, TaxSlab};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("Record not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Storage for the analysis history log and the slab tables of each regime.
#[async_trait]
pub trait AnalysisRepository: Send + Sync {
    // Analysis history
    async fn save_analysis(
        &self,
        analysis: &AnalysisResult,
    ) -> Result<AnalysisRecord, RepositoryError>;

    async fn get_analysis(
        &self,
        id: i64,
    ) -> Result<AnalysisRecord, RepositoryError>;

    /// Every stored analysis, oldest first.
    async fn list_analyses(&self) -> Result<Vec<AnalysisRecord>, RepositoryError>;

    async fn delete_analysis(
        &self,
        id: i64,
    ) -> Result<(), RepositoryError>;

    // Slab tables
    /// [`RepositoryError::NotFound`] when the regime has no slabs.
    async fn get_tax_slabs(
        &self,
        regime: &str,
    ) -> Result<SlabTable, RepositoryError>;

    async fn insert_tax_slab(
        &self,
        regime: &str,
        position: u32,
        slab: &TaxSlab,
    ) -> Result<(), RepositoryError>;

    async fn delete_tax_slabs(
        &self,
        regime: &str,
    ) -> Result<(), RepositoryError>;

    /// Swaps the regime's rows for `table` as one unit.
    ///
    /// On error the previously stored table is left untouched.
    async fn replace_tax_slabs(
        &self,
        regime: &str,
        table: &SlabTable,
    ) -> Result<(), RepositoryError>;

    async fn list_regimes(&self) -> Result<Vec<String>, RepositoryError>;
}
