use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use tax_core::{
    AnalysisRecord, AnalysisRepository, AnalysisResult, RepositoryError, SlabTable, TaxSlab,
};
use tracing::{debug, info, warn};

use crate::decimal::{decimal_to_text, get_decimal, get_optional_decimal};

const ANALYSIS_COLUMNS: &str = "id, recorded_at, income_details, taxable, non_taxable, deductions,
     total_income, total_taxable_income, tax_liability, rebate, net_tax_payable, suggestions";

const INSERT_SLAB: &str =
    "INSERT INTO tax_slabs (regime, position, upper_bound, rate) VALUES (?, ?, ?, ?)";

pub struct SqliteRepository {
    pool: SqlitePool,
}

fn is_in_memory(connection_string: &str) -> bool {
    connection_string.contains(":memory:") || connection_string.contains("mode=memory")
}

impl SqliteRepository {
    /// Opens `connection_string`, which may be a bare file path, a
    /// `sqlite:` URL or `:memory:`. Database files are created on demand.
    pub async fn new(connection_string: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(connection_string)
            .with_context(|| format!("Invalid SQLite connection string: {connection_string}"))?
            .create_if_missing(true);

        let mut pool_options = SqlitePoolOptions::new();
        if is_in_memory(connection_string) {
            // The database lives only as long as its connection.
            pool_options = pool_options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = pool_options
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to connect to database: {connection_string}"))?;
        Ok(Self { pool })
    }

    pub fn new_with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }

    /// Executes every `*.sql` file in `seeds_dir`, in filename order.
    /// A missing directory is skipped with a warning.
    pub async fn run_seeds(
        &self,
        seeds_dir: &Path,
    ) -> Result<()> {
        if !seeds_dir.is_dir() {
            warn!(dir = %seeds_dir.display(), "seeds directory not found, skipping seeds");
            return Ok(());
        }

        let mut entries: Vec<_> = std::fs::read_dir(seeds_dir)
            .with_context(|| format!("Failed to read seeds directory '{}'", seeds_dir.display()))?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "sql"))
            .collect();

        entries.sort_by_key(|entry| entry.file_name());

        for entry in entries {
            let path = entry.path();
            let sql = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read seed file '{}'", path.display()))?;

            sqlx::raw_sql(&sql)
                .execute(&self.pool)
                .await
                .with_context(|| format!("Failed to execute seed file '{}'", path.display()))?;
            debug!(file = %path.display(), "applied seed file");
        }

        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, RepositoryError> {
    serde_json::to_string(value).map_err(|e| RepositoryError::Database(e.to_string()))
}

fn get_json<T: DeserializeOwned>(
    row: &SqliteRow,
    column: &str,
) -> Result<T, RepositoryError> {
    let text: String = row
        .try_get(column)
        .map_err(|e| RepositoryError::Database(e.to_string()))?;
    serde_json::from_str(&text)
        .map_err(|e| RepositoryError::Database(format!("Invalid JSON in '{column}': {e}")))
}

fn row_to_analysis_record(row: &SqliteRow) -> Result<AnalysisRecord, RepositoryError> {
    Ok(AnalysisRecord {
        id: row
            .try_get("id")
            .map_err(|e| RepositoryError::Database(e.to_string()))?,
        analysis: AnalysisResult {
            timestamp: row
                .try_get::<DateTime<Utc>, _>("recorded_at")
                .map_err(|e| {
                    RepositoryError::Database(format!("Failed to get recorded_at: {e}"))
                })?,
            income_details: get_json(row, "income_details")?,
            taxable: get_json(row, "taxable")?,
            non_taxable: get_json(row, "non_taxable")?,
            deductions: get_json(row, "deductions")?,
            total_income: get_decimal(row, "total_income")?,
            total_taxable_income: get_decimal(row, "total_taxable_income")?,
            tax_liability: get_decimal(row, "tax_liability")?,
            rebate: get_decimal(row, "rebate")?,
            net_tax_payable: get_decimal(row, "net_tax_payable")?,
            suggestions: get_json(row, "suggestions")?,
        },
    })
}

#[async_trait]
impl AnalysisRepository for SqliteRepository {
    async fn save_analysis(
        &self,
        analysis: &AnalysisResult,
    ) -> Result<AnalysisRecord, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO analysis_records (
                recorded_at, income_details, taxable, non_taxable, deductions,
                total_income, total_taxable_income, tax_liability, rebate,
                net_tax_payable, suggestions
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(analysis.timestamp)
        .bind(to_json(&analysis.income_details)?)
        .bind(to_json(&analysis.taxable)?)
        .bind(to_json(&analysis.non_taxable)?)
        .bind(to_json(&analysis.deductions)?)
        .bind(decimal_to_text(analysis.total_income))
        .bind(decimal_to_text(analysis.total_taxable_income))
        .bind(decimal_to_text(analysis.tax_liability))
        .bind(decimal_to_text(analysis.rebate))
        .bind(decimal_to_text(analysis.net_tax_payable))
        .bind(to_json(&analysis.suggestions)?)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        let id = result.last_insert_rowid();
        info!(id, tax_liability = %analysis.tax_liability, "saved analysis");

        Ok(AnalysisRecord {
            id,
            analysis: analysis.clone(),
        })
    }

    async fn get_analysis(
        &self,
        id: i64,
    ) -> Result<AnalysisRecord, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {ANALYSIS_COLUMNS} FROM analysis_records WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?
        .ok_or(RepositoryError::NotFound)?;

        row_to_analysis_record(&row)
    }

    async fn list_analyses(&self) -> Result<Vec<AnalysisRecord>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {ANALYSIS_COLUMNS} FROM analysis_records ORDER BY recorded_at ASC, id ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        rows.iter().map(row_to_analysis_record).collect()
    }

    async fn delete_analysis(
        &self,
        id: i64,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM analysis_records WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn get_tax_slabs(
        &self,
        regime: &str,
    ) -> Result<SlabTable, RepositoryError> {
        let rows = sqlx::query(
            "SELECT upper_bound, rate FROM tax_slabs WHERE regime = ? ORDER BY position",
        )
        .bind(regime)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        if rows.is_empty() {
            return Err(RepositoryError::NotFound);
        }

        let mut slabs = Vec::with_capacity(rows.len());
        for row in &rows {
            slabs.push(TaxSlab {
                upper_bound: get_optional_decimal(row, "upper_bound")?,
                rate: get_decimal(row, "rate")?,
            });
        }

        SlabTable::new(slabs).map_err(|e| {
            RepositoryError::Database(format!("Invalid slab table for regime '{regime}': {e}"))
        })
    }

    async fn insert_tax_slab(
        &self,
        regime: &str,
        position: u32,
        slab: &TaxSlab,
    ) -> Result<(), RepositoryError> {
        sqlx::query(INSERT_SLAB)
            .bind(regime)
            .bind(i64::from(position))
            .bind(slab.upper_bound.map(decimal_to_text))
            .bind(decimal_to_text(slab.rate))
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        Ok(())
    }

    async fn delete_tax_slabs(
        &self,
        regime: &str,
    ) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM tax_slabs WHERE regime = ?")
            .bind(regime)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        Ok(())
    }

    async fn replace_tax_slabs(
        &self,
        regime: &str,
        table: &SlabTable,
    ) -> Result<(), RepositoryError> {
        // Dropping `tx` before commit rolls everything back.
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        sqlx::query("DELETE FROM tax_slabs WHERE regime = ?")
            .bind(regime)
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        for (position, slab) in (0i64..).zip(table.slabs()) {
            sqlx::query(INSERT_SLAB)
                .bind(regime)
                .bind(position)
                .bind(slab.upper_bound.map(decimal_to_text))
                .bind(decimal_to_text(slab.rate))
                .execute(&mut *tx)
                .await
                .map_err(|e| RepositoryError::Database(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        debug!(regime, slabs = table.len(), "replaced slab table");
        Ok(())
    }

    async fn list_regimes(&self) -> Result<Vec<String>, RepositoryError> {
        let rows = sqlx::query("SELECT DISTINCT regime FROM tax_slabs ORDER BY regime")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        rows.iter()
            .map(|row| {
                row.try_get("regime")
                    .map_err(|e| RepositoryError::Database(e.to_string()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use tax_core::calculations::RebatePolicy;
    use tax_core::income::parse_income_text;
    use tax_core::suggestions::StaticSuggestions;

    use super::*;

    async fn setup_test_db() -> SqliteRepository {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory database");

        let repo = SqliteRepository::new_with_pool(pool);
        repo.run_migrations()
            .await
            .expect("Failed to run migrations");
        repo
    }

    fn seeds() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("seeds")
    }

    fn analysis(
        day: u32,
        text: &str,
    ) -> AnalysisResult {
        let timestamp = Utc.with_ymd_and_hms(2026, 10, day, 8, 15, 30).unwrap();
        AnalysisResult::assemble(
            timestamp,
            parse_income_text(text),
            &SlabTable::canonical(),
            &RebatePolicy::default(),
            StaticSuggestions::suggestions(),
        )
        .unwrap()
    }

    async fn insert_slabs(
        repo: &SqliteRepository,
        regime: &str,
        slabs: &[TaxSlab],
    ) {
        for (position, slab) in slabs.iter().enumerate() {
            repo.insert_tax_slab(regime, position as u32, slab)
                .await
                .expect("Should insert slab");
        }
    }

    // =========================================================================
    // analysis history tests
    // =========================================================================

    #[tokio::test]
    async fn test_save_and_get_analysis() {
        let repo = setup_test_db().await;
        let original = analysis(16, "Salary: 500000\nRent: 120000\nHealth Insurance: 20000");

        let saved = repo.save_analysis(&original).await.expect("Should save");
        let fetched = repo.get_analysis(saved.id).await.expect("Should get");

        assert_eq!(fetched, saved);
        assert_eq!(fetched.analysis, original);
    }

    #[tokio::test]
    async fn test_saved_amounts_keep_their_scale() {
        let repo = setup_test_db().await;
        let original = analysis(16, "Salary: 900000.50");

        let saved = repo.save_analysis(&original).await.unwrap();
        let fetched = repo.get_analysis(saved.id).await.unwrap();

        assert_eq!(
            fetched.analysis.tax_liability.to_string(),
            original.tax_liability.to_string()
        );
        assert_eq!(fetched.analysis.income_details.get("Salary"), Some(dec!(900000.50)));
    }

    #[tokio::test]
    async fn test_saved_income_keeps_key_order() {
        let repo = setup_test_db().await;
        let original = analysis(16, "Rent: 1\nSalary: 2\nGift: 3");

        let saved = repo.save_analysis(&original).await.unwrap();
        let fetched = repo.get_analysis(saved.id).await.unwrap();

        assert_eq!(
            fetched.analysis.income_details.keys().collect::<Vec<_>>(),
            vec!["Rental Income", "Salary", "Gift"]
        );
    }

    #[tokio::test]
    async fn test_get_analysis_not_found() {
        let repo = setup_test_db().await;

        assert_eq!(repo.get_analysis(42).await, Err(RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_list_analyses_oldest_first() {
        let repo = setup_test_db().await;
        let late = repo.save_analysis(&analysis(20, "Salary: 3")).await.unwrap();
        let early = repo.save_analysis(&analysis(2, "Salary: 1")).await.unwrap();
        let middle = repo.save_analysis(&analysis(9, "Salary: 2")).await.unwrap();

        let ids: Vec<i64> = repo
            .list_analyses()
            .await
            .unwrap()
            .iter()
            .map(|r| r.id)
            .collect();

        assert_eq!(ids, vec![early.id, middle.id, late.id]);
    }

    #[tokio::test]
    async fn test_list_analyses_empty() {
        let repo = setup_test_db().await;

        assert!(repo.list_analyses().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_analysis() {
        let repo = setup_test_db().await;
        let saved = repo.save_analysis(&analysis(16, "Salary: 1")).await.unwrap();

        repo.delete_analysis(saved.id).await.expect("Should delete");

        assert_eq!(
            repo.get_analysis(saved.id).await,
            Err(RepositoryError::NotFound)
        );
        assert_eq!(
            repo.delete_analysis(saved.id).await,
            Err(RepositoryError::NotFound)
        );
    }

    // =========================================================================
    // slab table tests
    // =========================================================================

    #[tokio::test]
    async fn test_seeded_new_regime_is_canonical() {
        let repo = setup_test_db().await;
        repo.run_seeds(&seeds()).await.expect("Should run seeds");

        let table = repo.get_tax_slabs("new-regime").await.expect("Should get slabs");

        assert_eq!(table, SlabTable::canonical());
    }

    #[tokio::test]
    async fn test_seeds_are_idempotent() {
        let repo = setup_test_db().await;
        repo.run_seeds(&seeds()).await.unwrap();
        repo.run_seeds(&seeds()).await.expect("Second run should succeed");

        assert_eq!(repo.get_tax_slabs("new-regime").await.unwrap().len(), 7);
    }

    #[tokio::test]
    async fn test_seeds_leave_imported_table_alone() {
        let repo = setup_test_db().await;
        let imported = [
            TaxSlab::bounded(dec!(300000), dec!(0)),
            TaxSlab::unbounded(dec!(0.20)),
        ];
        insert_slabs(&repo, "new-regime", &imported).await;

        repo.run_seeds(&seeds()).await.unwrap();

        assert_eq!(
            repo.get_tax_slabs("new-regime").await.unwrap().slabs(),
            &imported
        );
    }

    #[tokio::test]
    async fn test_missing_seeds_dir_is_skipped() {
        let repo = setup_test_db().await;

        repo.run_seeds(Path::new("/definitely/not/here"))
            .await
            .expect("Missing seeds dir should be skipped");
        assert!(repo.list_regimes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_insert_and_get_tax_slabs() {
        let repo = setup_test_db().await;
        // Inserted out of order; positions decide the order.
        repo.insert_tax_slab("old-regime", 1, &TaxSlab::unbounded(dec!(0.30)))
            .await
            .unwrap();
        repo.insert_tax_slab("old-regime", 0, &TaxSlab::bounded(dec!(250000), dec!(0)))
            .await
            .unwrap();

        let table = repo.get_tax_slabs("old-regime").await.unwrap();

        assert_eq!(
            table.slabs(),
            &[
                TaxSlab::bounded(dec!(250000), Decimal::ZERO),
                TaxSlab::unbounded(dec!(0.30)),
            ]
        );
    }

    #[tokio::test]
    async fn test_get_tax_slabs_not_found() {
        let repo = setup_test_db().await;

        assert_eq!(
            repo.get_tax_slabs("flat-tax").await,
            Err(RepositoryError::NotFound)
        );
    }

    #[tokio::test]
    async fn test_invalid_stored_table_is_a_database_error() {
        let repo = setup_test_db().await;
        insert_slabs(&repo, "broken", &[TaxSlab::bounded(dec!(1000), dec!(0.1))]).await;

        let result = repo.get_tax_slabs("broken").await;

        assert!(matches!(
            result,
            Err(RepositoryError::Database(msg)) if msg.contains("broken")
        ));
    }

    #[tokio::test]
    async fn test_duplicate_position_is_rejected() {
        let repo = setup_test_db().await;
        let slab = TaxSlab::unbounded(dec!(0.1));
        repo.insert_tax_slab("r", 0, &slab).await.unwrap();

        let result = repo.insert_tax_slab("r", 0, &slab).await;

        assert!(matches!(result, Err(RepositoryError::Database(_))));
    }

    #[tokio::test]
    async fn test_delete_tax_slabs() {
        let repo = setup_test_db().await;
        repo.run_seeds(&seeds()).await.unwrap();

        repo.delete_tax_slabs("new-regime").await.expect("Should delete");
        repo.delete_tax_slabs("never-existed")
            .await
            .expect("Deleting nothing should succeed");

        assert_eq!(
            repo.get_tax_slabs("new-regime").await,
            Err(RepositoryError::NotFound)
        );
    }

    #[tokio::test]
    async fn test_replace_tax_slabs_swaps_whole_table() {
        let repo = setup_test_db().await;
        repo.run_seeds(&seeds()).await.unwrap();
        let flat = SlabTable::new(vec![TaxSlab::unbounded(dec!(0.1))]).unwrap();

        repo.replace_tax_slabs("new-regime", &flat)
            .await
            .expect("Should replace");

        assert_eq!(repo.get_tax_slabs("new-regime").await.unwrap(), flat);
    }

    #[tokio::test]
    async fn test_replace_tax_slabs_rolls_back_on_failed_insert() {
        let repo = setup_test_db().await;
        repo.run_seeds(&seeds()).await.unwrap();
        sqlx::raw_sql(
            "CREATE TRIGGER fail_third_slab BEFORE INSERT ON tax_slabs
             WHEN NEW.position = 2
             BEGIN SELECT RAISE(ABORT, 'disk full'); END;",
        )
        .execute(repo.pool())
        .await
        .unwrap();

        let result = repo
            .replace_tax_slabs("new-regime", &SlabTable::canonical())
            .await;

        assert!(matches!(
            result,
            Err(RepositoryError::Database(msg)) if msg.contains("disk full")
        ));
        assert_eq!(
            repo.get_tax_slabs("new-regime").await.unwrap(),
            SlabTable::canonical()
        );
    }

    #[tokio::test]
    async fn test_list_regimes_sorted() {
        let repo = setup_test_db().await;
        repo.run_seeds(&seeds()).await.unwrap();
        insert_slabs(&repo, "flat", &[TaxSlab::unbounded(dec!(0.1))]).await;

        assert_eq!(
            repo.list_regimes().await.unwrap(),
            vec!["flat".to_string(), "new-regime".to_string()]
        );
    }

    // =========================================================================
    // connection tests
    // =========================================================================

    #[tokio::test]
    async fn test_new_accepts_bare_memory_string() {
        let repo = SqliteRepository::new(":memory:").await.expect("Should open");
        repo.run_migrations().await.expect("Should migrate");

        let saved = repo.save_analysis(&analysis(1, "Salary: 1")).await.unwrap();

        assert_eq!(repo.list_analyses().await.unwrap().len(), 1);
        assert_eq!(saved.id, 1);
    }

    #[test]
    fn test_is_in_memory() {
        assert!(is_in_memory(":memory:"));
        assert!(is_in_memory("sqlite::memory:"));
        assert!(is_in_memory("sqlite://file?mode=memory"));
        assert!(!is_in_memory("tax-assistant.db"));
    }
}
