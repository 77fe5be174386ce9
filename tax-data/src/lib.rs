//! CSV import of slab tables.

mod loader;

pub use loader::{TaxSlabLoader, TaxSlabLoaderError, TaxSlabRecord};
