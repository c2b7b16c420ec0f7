// crates/db/src/import.rs
//! CSV imports into the observations and locations tables.
//!
//! Parsing is all-or-nothing: a malformed row aborts the import before
//! anything is written.

use std::path::Path;
use std::time::Instant;

use serde::Serialize;
use statfrance_core::csv_import::{extract_locations, extract_observations, read_rows};
use statfrance_core::{Dataset, ImportError, Level};
use tracing::info;

use crate::{Database, DbResult};

/// Outcome of one import.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub run_id: i64,
    pub rows_read: usize,
    pub rows_written: u64,
    pub duration_ms: u64,
}

async fn read_source(path: &Path) -> Result<String, ImportError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ImportError::io(path, e))
}

impl Database {
    /// Import a stats CSV for one dataset and level from `path`.
    pub async fn import_observations_csv(
        &self,
        dataset: Dataset,
        level: Level,
        path: &Path,
    ) -> DbResult<ImportSummary> {
        let text = read_source(path).await?;
        self.import_observations_str(dataset, level, &path.display().to_string(), &text)
            .await
    }

    /// Import stats CSV text; `source` is recorded in the import run.
    pub async fn import_observations_str(
        &self,
        dataset: Dataset,
        level: Level,
        source: &str,
        text: &str,
    ) -> DbResult<ImportSummary> {
        let start = Instant::now();
        let table = read_rows(text)?;
        let observations = extract_observations(&table, level)?;
        let rows_written = self.insert_observations(dataset, level, &observations).await?;
        let run_id = self
            .record_import_run("observations", Some(dataset), level, source, rows_written)
            .await?;

        let summary = ImportSummary {
            run_id,
            rows_read: table.rows.len(),
            rows_written,
            duration_ms: start.elapsed().as_millis() as u64,
        };
        info!(
            dataset = %dataset,
            level = %level,
            source,
            rows_read = summary.rows_read,
            rows_written = summary.rows_written,
            duration_ms = summary.duration_ms,
            "Imported observations"
        );
        Ok(summary)
    }

    /// Import a `code,name[,parent_code]` CSV for one level from `path`.
    pub async fn import_locations_csv(&self, level: Level, path: &Path) -> DbResult<ImportSummary> {
        let text = read_source(path).await?;
        self.import_locations_str(level, &path.display().to_string(), &text)
            .await
    }

    pub async fn import_locations_str(
        &self,
        level: Level,
        source: &str,
        text: &str,
    ) -> DbResult<ImportSummary> {
        let start = Instant::now();
        let table = read_rows(text)?;
        let locations = extract_locations(&table, level)?;
        let rows_written = self.upsert_locations(&locations).await?;
        let run_id = self
            .record_import_run("locations", None, level, source, rows_written)
            .await?;

        let summary = ImportSummary {
            run_id,
            rows_read: table.rows.len(),
            rows_written,
            duration_ms: start.elapsed().as_millis() as u64,
        };
        info!(
            level = %level,
            source,
            rows_written = summary.rows_written,
            "Imported locations"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DbError;

    #[tokio::test]
    async fn test_import_observations_str() {
        let db = Database::new_in_memory().await.unwrap();
        let csv = "code;year;births;deaths\n75;2020;26 000;14 000\n75;2021;25 500;\n";
        let summary = db
            .import_observations_str(Dataset::Population, Level::Departement, "pop.csv", csv)
            .await
            .unwrap();
        assert_eq!(summary.rows_read, 2);
        assert_eq!(summary.rows_written, 4);

        let runs = db.recent_import_runs(5).await.unwrap();
        assert_eq!(runs[0].id, summary.run_id);
        assert_eq!(runs[0].source, "pop.csv");
    }

    #[tokio::test]
    async fn test_duplicate_row_with_empty_cell_keeps_value() {
        let db = Database::new_in_memory().await.unwrap();
        let csv = "code,year,births\n75,2020,100\n75,2020,\n";
        db.import_observations_str(Dataset::Population, Level::Departement, "dup.csv", csv)
            .await
            .unwrap();

        let rows = db
            .fetch_rows(Dataset::Population, Level::Departement, "75")
            .await
            .unwrap();
        let series = statfrance_core::serialize(&rows);
        assert_eq!(series.data["births"], vec![Some(100.0)]);
    }

    #[tokio::test]
    async fn test_country_import_rejects_foreign_code() {
        let db = Database::new_in_memory().await.unwrap();
        let csv = "code,year,population\nFRA,2020,67000000\n";
        let err = db
            .import_observations_str(Dataset::Population, Level::Country, "pop.csv", csv)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Import(ImportError::InvalidValue { line: 2, .. })
        ));
        assert!(db.dataset_summary().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_csv_writes_nothing() {
        let db = Database::new_in_memory().await.unwrap();
        let csv = "code,year,births\n75,2020,1\n75,2021\n";
        let err = db
            .import_observations_str(Dataset::Population, Level::Departement, "bad.csv", csv)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Import(ImportError::Malformed { line: 3, .. })));
        assert!(db.dataset_summary().await.unwrap().is_empty());
        assert!(db.recent_import_runs(5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_import_missing_file() {
        let db = Database::new_in_memory().await.unwrap();
        let err = db
            .import_locations_csv(Level::Departement, Path::new("/nonexistent/deps.csv"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Import(ImportError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_import_locations_from_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("communes.csv");
        std::fs::write(&path, "code,name,departement_code\n75056,Paris,75\n").unwrap();

        let db = Database::new_in_memory().await.unwrap();
        let summary = db.import_locations_csv(Level::Commune, &path).await.unwrap();
        assert_eq!(summary.rows_written, 1);

        let paris = db.get_location(Level::Commune, "75056").await.unwrap().unwrap();
        assert_eq!(paris.parent_code.as_deref(), Some("75"));
    }
}
