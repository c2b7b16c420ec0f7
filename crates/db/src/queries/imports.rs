// crates/db/src/queries/imports.rs
// Import run bookkeeping.

use serde::Serialize;
use sqlx::Row;
use statfrance_core::{Dataset, Level};
use ts_rs::TS;

use super::{decode_dataset, decode_level};
use crate::{Database, DbResult};

/// One completed CSV import.
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = "../../../web/src/types/generated/")]
#[serde(rename_all = "camelCase")]
pub struct ImportRun {
    #[ts(type = "number")]
    pub id: i64,
    /// `observations` or `locations`.
    pub kind: String,
    pub dataset: Option<Dataset>,
    pub level: Level,
    pub source: String,
    #[ts(type = "number")]
    pub rows_imported: i64,
    /// Unix seconds.
    #[ts(type = "number")]
    pub imported_at: i64,
}

impl<'r> sqlx::FromRow<'r, sqlx::sqlite::SqliteRow> for ImportRun {
    fn from_row(row: &'r sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        let dataset: Option<String> = row.try_get("dataset")?;
        Ok(Self {
            id: row.try_get("id")?,
            kind: row.try_get("kind")?,
            dataset: dataset.map(decode_dataset).transpose()?,
            level: decode_level(row.try_get("level")?)?,
            source: row.try_get("source")?,
            rows_imported: row.try_get("rows_imported")?,
            imported_at: row.try_get("imported_at")?,
        })
    }
}

impl Database {
    /// Record a finished import. Returns the new run id.
    pub async fn record_import_run(
        &self,
        kind: &str,
        dataset: Option<Dataset>,
        level: Level,
        source: &str,
        rows_imported: u64,
    ) -> DbResult<i64> {
        let imported_at = chrono::Utc::now().timestamp();
        let result = sqlx::query(
            r#"
            INSERT INTO import_runs (kind, dataset, level, source, rows_imported, imported_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(kind)
        .bind(dataset.map(|d| d.slug()))
        .bind(level.slug())
        .bind(source)
        .bind(rows_imported as i64)
        .bind(imported_at)
        .execute(self.pool())
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Most recent imports first.
    pub async fn recent_import_runs(&self, limit: u32) -> DbResult<Vec<ImportRun>> {
        let rows: Vec<ImportRun> = sqlx::query_as(
            r#"
            SELECT id, kind, dataset, level, source, rows_imported, imported_at
            FROM import_runs
            ORDER BY imported_at DESC, id DESC
            LIMIT ?1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(self.pool())
        .await?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_record_and_list_import_runs() {
        let db = Database::new_in_memory().await.unwrap();
        db.record_import_run("locations", None, Level::Departement, "deps.csv", 101)
            .await
            .unwrap();
        let id = db
            .record_import_run(
                "observations",
                Some(Dataset::Crime),
                Level::Departement,
                "crime.csv",
                4242,
            )
            .await
            .unwrap();

        let runs = db.recent_import_runs(10).await.unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].id, id);
        assert_eq!(runs[0].dataset, Some(Dataset::Crime));
        assert_eq!(runs[0].rows_imported, 4242);
        assert_eq!(runs[1].dataset, None);
        assert_eq!(runs[1].kind, "locations");

        assert_eq!(db.recent_import_runs(1).await.unwrap().len(), 1);
    }
}
