use std::path::PathBuf;

use async_trait::async_trait;
use tax_core::db::{DbConfig, RepositoryFactory};
use tax_core::{AnalysisRepository, RepositoryError};

use crate::repository::SqliteRepository;

/// Where seed SQL is looked up:
/// 1. `TAX_DB_SQLITE_SEEDS_DIR` if set;
/// 2. `./seeds` if it exists;
/// 3. this crate's own `seeds` directory.
fn seeds_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("TAX_DB_SQLITE_SEEDS_DIR") {
        return PathBuf::from(dir);
    }
    let cwd_seeds = PathBuf::from("./seeds");
    if cwd_seeds.is_dir() {
        return cwd_seeds;
    }
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("seeds")
}

/// The `"sqlite"` backend.
///
/// ```rust,no_run
/// use tax_core::db::RepositoryRegistry;
/// use tax_db_sqlite::SqliteRepositoryFactory;
///
/// let mut registry = RepositoryRegistry::new();
/// registry.register(Box::new(SqliteRepositoryFactory));
/// ```
pub struct SqliteRepositoryFactory;

#[async_trait]
impl RepositoryFactory for SqliteRepositoryFactory {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    /// Opens `config.connection_string` (a file path, `sqlite:` URL or
    /// `:memory:`), migrates it and applies the seed SQL.
    async fn create(
        &self,
        config: &DbConfig,
    ) -> Result<Box<dyn AnalysisRepository>, RepositoryError> {
        let repo = SqliteRepository::new(&config.connection_string)
            .await
            .map_err(|e| RepositoryError::Connection(format!("{e:#}")))?;
        repo.run_migrations()
            .await
            .map_err(|e| RepositoryError::Database(format!("{e:#}")))?;
        repo.run_seeds(&seeds_dir())
            .await
            .map_err(|e| RepositoryError::Database(format!("{e:#}")))?;
        Ok(Box::new(repo))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tax_core::SlabTable;
    use tax_core::db::{DbConfig, RepositoryFactory};

    use super::SqliteRepositoryFactory;

    fn memory() -> DbConfig {
        DbConfig {
            backend: "sqlite".to_string(),
            connection_string: ":memory:".to_string(),
        }
    }

    #[test]
    fn backend_name_is_sqlite() {
        assert_eq!(SqliteRepositoryFactory.backend_name(), "sqlite");
    }

    #[tokio::test]
    async fn creates_seeded_in_memory_repository() {
        let repo = SqliteRepositoryFactory
            .create(&memory())
            .await
            .expect("failed to create in-memory repository");

        assert_eq!(
            repo.get_tax_slabs("new-regime").await.unwrap(),
            SlabTable::canonical()
        );
        assert!(repo.list_analyses().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unreadable_path_is_a_connection_error() {
        let config = DbConfig {
            connection_string: "/no/such/dir/tax.db".to_string(),
            ..memory()
        };

        let result = SqliteRepositoryFactory.create(&config).await;

        assert!(matches!(
            result,
            Err(tax_core::RepositoryError::Connection(_))
        ));
    }
}
