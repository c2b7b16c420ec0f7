// crates/db/src/lib.rs
// SQLite storage for statfrance series and locations
pub mod import;
mod migrations;
mod queries;

pub use import::ImportSummary;
pub use queries::imports::ImportRun;
pub use queries::observations::DatasetCoverage;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{ConnectOptions, SqlitePool};
use statfrance_core::ImportError;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Failed to determine cache directory")]
    NoCacheDir,

    #[error("Failed to create database directory: {0}")]
    CreateDir(#[from] std::io::Error),

    #[error("Import failed: {0}")]
    Import(#[from] ImportError),

    #[error("{dataset} is not published at {level} level")]
    UnsupportedLevel { dataset: String, level: String },
}

pub type DbResult<T> = Result<T, DbError>;

/// Main database handle wrapping a SQLite connection pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    db_path: PathBuf,
}

impl Database {
    /// Open (or create) the database at the given path and run migrations.
    pub async fn new(path: &Path) -> DbResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(30))
            .log_slow_statements(
                tracing::log::LevelFilter::Warn,
                std::time::Duration::from_secs(5),
            );

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        let db = Self {
            pool,
            db_path: path.to_owned(),
        };
        db.run_migrations().await?;

        info!("Database opened at {}", path.display());
        Ok(db)
    }

    /// Create an in-memory database (for testing).
    ///
    /// Uses `shared_cache(true)` so all pool connections share the same
    /// in-memory database.
    pub async fn new_in_memory() -> DbResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?
            .shared_cache(true)
            .busy_timeout(std::time::Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;
        let db = Self {
            pool,
            db_path: PathBuf::new(),
        };
        db.run_migrations().await?;
        Ok(db)
    }

    /// Open the database at the default location: `~/.cache/statfrance/statfrance.db`
    pub async fn open_default() -> DbResult<Self> {
        let path = default_db_path()?;
        Self::new(&path).await
    }

    /// Run all inline migrations.
    ///
    /// Uses a `_migrations` table to track which migrations have already been
    /// applied, so each statement runs once per database.
    async fn run_migrations(&self) -> DbResult<()> {
        sqlx::query("CREATE TABLE IF NOT EXISTS _migrations (version INTEGER PRIMARY KEY)")
            .execute(&self.pool)
            .await?;

        let row: (i64,) = sqlx::query_as("SELECT COALESCE(MAX(version), 0) FROM _migrations")
            .fetch_one(&self.pool)
            .await?;
        let current_version = row.0 as usize;

        for (i, migration) in migrations::MIGRATIONS.iter().enumerate() {
            let version = i + 1; // 1-based
            if version > current_version {
                sqlx::query(migration).execute(&self.pool).await?;
                sqlx::query("INSERT INTO _migrations (version) VALUES (?)")
                    .bind(version as i64)
                    .execute(&self.pool)
                    .await?;
            }
        }

        Ok(())
    }

    /// Get a reference to the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Get the path to the database file.
    /// Returns an empty path for in-memory databases.
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

/// Returns the default database path: `~/.cache/statfrance/statfrance.db`
pub fn default_db_path() -> DbResult<PathBuf> {
    statfrance_core::paths::db_path().ok_or(DbError::NoCacheDir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_database() {
        let db = Database::new_in_memory()
            .await
            .expect("should create in-memory database");

        for table in ["locations", "observations", "import_runs"] {
            let count: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
                .fetch_one(db.pool())
                .await
                .unwrap_or_else(|e| panic!("{table} table should exist: {e}"));
            assert_eq!(count.0, 0);
        }
    }

    #[tokio::test]
    async fn test_migrations_idempotent() {
        let db = Database::new_in_memory()
            .await
            .expect("first open should succeed");

        db.run_migrations()
            .await
            .expect("second migration run should succeed");

        let versions: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM _migrations")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(versions.0 as usize, migrations::MIGRATIONS.len());
    }

    #[tokio::test]
    async fn test_file_based_database() {
        let tmp = tempfile::tempdir().expect("should create temp dir");
        let db_path = tmp.path().join("nested").join("test.db");

        let db = Database::new(&db_path)
            .await
            .expect("should create file-based database");

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM observations")
            .fetch_one(db.pool())
            .await
            .expect("observations table should exist");
        assert_eq!(count.0, 0);

        assert!(db_path.exists(), "database file should be created on disk");
        assert_eq!(db.db_path(), db_path.as_path());
    }

    #[tokio::test]
    async fn test_default_db_path() {
        let path = default_db_path().expect("should resolve default path");
        assert!(path.to_string_lossy().ends_with("statfrance.db"));
    }
}
