use std::io::Read;

use rust_decimal::Decimal;
use serde::Deserialize;
use tax_core::{AnalysisRepository, RepositoryError, SlabTable, SlabTableError, TaxSlab};
use thiserror::Error;
use tracing::info;

/// Errors that can occur when loading slab tables.
#[derive(Debug, Error)]
pub enum TaxSlabLoaderError {
    #[error("CSV parse error: {0}")]
    CsvParse(String),

    #[error("Invalid slab table for regime '{regime}': {source}")]
    InvalidTable {
        regime: String,
        #[source]
        source: SlabTableError,
    },

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<csv::Error> for TaxSlabLoaderError {
    fn from(err: csv::Error) -> Self {
        TaxSlabLoaderError::CsvParse(err.to_string())
    }
}

/// One row of a slab CSV file.
///
/// - `regime`: name of the tax regime, e.g. `new-regime`
/// - `upper_bound`: top of the slab; empty for the unbounded last slab
/// - `rate`: marginal rate as a fraction, e.g. `0.05`
///
/// Rows of a regime are listed lowest slab first.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TaxSlabRecord {
    pub regime: String,
    #[serde(deserialize_with = "deserialize_optional_decimal")]
    pub upper_bound: Option<Decimal>,
    pub rate: Decimal,
}

fn deserialize_optional_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s {
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => s
            .trim()
            .parse::<Decimal>()
            .map(Some)
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

/// Imports slab tables from CSV through any [`AnalysisRepository`].
pub struct TaxSlabLoader;

impl TaxSlabLoader {
    pub fn parse<R: Read>(reader: R) -> Result<Vec<TaxSlabRecord>, TaxSlabLoaderError> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut records = Vec::new();

        for result in csv_reader.deserialize() {
            let record: TaxSlabRecord = result?;
            records.push(record);
        }

        Ok(records)
    }

    /// Groups rows by regime, in order of first appearance, and checks that
    /// each group forms a valid [`SlabTable`].
    pub fn validate(
        records: &[TaxSlabRecord]
    ) -> Result<Vec<(String, SlabTable)>, TaxSlabLoaderError> {
        let mut groups: Vec<(String, Vec<TaxSlab>)> = Vec::new();

        for record in records {
            let slab = TaxSlab {
                upper_bound: record.upper_bound,
                rate: record.rate,
            };
            match groups.iter_mut().find(|(regime, _)| *regime == record.regime) {
                Some((_, slabs)) => slabs.push(slab),
                None => groups.push((record.regime.clone(), vec![slab])),
            }
        }

        groups
            .into_iter()
            .map(|(regime, slabs)| match SlabTable::new(slabs) {
                Ok(table) => Ok((regime, table)),
                Err(source) => Err(TaxSlabLoaderError::InvalidTable { regime, source }),
            })
            .collect()
    }

    /// Replaces the slab table of every regime in `records`.
    ///
    /// All groups are validated before anything is written, so a bad row
    /// leaves the database untouched. Each regime is swapped in one
    /// [`AnalysisRepository::replace_tax_slabs`] call: a storage failure
    /// keeps that regime's previous table. Loading the same file twice gives
    /// the same result. Returns the number of slabs inserted.
    pub async fn load<R: AnalysisRepository + ?Sized>(
        repo: &R,
        records: &[TaxSlabRecord],
    ) -> Result<usize, TaxSlabLoaderError> {
        let tables = Self::validate(records)?;
        let mut inserted = 0;

        for (regime, table) in &tables {
            repo.replace_tax_slabs(regime, table).await?;
            inserted += table.len();

            info!(regime = %regime, slabs = table.len(), "loaded slab table");
        }

        Ok(inserted)
    }
}
