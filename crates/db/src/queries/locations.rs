// crates/db/src/queries/locations.rs
// Location CRUD: country, départements, communes.

use sqlx::Row;
use statfrance_core::{Level, Location};

use super::decode_level;
use crate::{Database, DbResult};

/// Row wrapper so `Location` can stay free of sqlx in the core crate.
struct LocationRow(Location);

impl<'r> sqlx::FromRow<'r, sqlx::sqlite::SqliteRow> for LocationRow {
    fn from_row(row: &'r sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self(Location {
            level: decode_level(row.try_get("level")?)?,
            code: row.try_get("code")?,
            name: row.try_get("name")?,
            parent_code: row.try_get("parent_code")?,
        }))
    }
}

impl Database {
    /// Insert or update locations in one transaction.
    ///
    /// Returns the number of rows written.
    pub async fn upsert_locations(&self, locations: &[Location]) -> DbResult<u64> {
        if locations.is_empty() {
            return Ok(0);
        }
        let mut tx = self.pool().begin().await?;
        let mut written = 0u64;
        for location in locations {
            let result = sqlx::query(
                r#"
                INSERT INTO locations (level, code, name, parent_code)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(level, code) DO UPDATE SET
                    name = excluded.name,
                    parent_code = excluded.parent_code
                "#,
            )
            .bind(location.level.slug())
            .bind(&location.code)
            .bind(&location.name)
            .bind(&location.parent_code)
            .execute(&mut *tx)
            .await?;
            written += result.rows_affected();
        }
        tx.commit().await?;
        Ok(written)
    }

    /// List locations of a level, optionally restricted to one parent, by name.
    pub async fn list_locations(
        &self,
        level: Level,
        parent_code: Option<&str>,
    ) -> DbResult<Vec<Location>> {
        let rows: Vec<LocationRow> = sqlx::query_as(
            r#"
            SELECT level, code, name, parent_code
            FROM locations
            WHERE level = ?1 AND (?2 IS NULL OR parent_code = ?2)
            ORDER BY name COLLATE NOCASE, code
            "#,
        )
        .bind(level.slug())
        .bind(parent_code)
        .fetch_all(self.pool())
        .await?;

        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    pub async fn get_location(&self, level: Level, code: &str) -> DbResult<Option<Location>> {
        let row: Option<LocationRow> = sqlx::query_as(
            "SELECT level, code, name, parent_code FROM locations WHERE level = ?1 AND code = ?2",
        )
        .bind(level.slug())
        .bind(code)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(|r| r.0))
    }

    /// Prefix search on name or code, for the location picker.
    pub async fn search_locations(
        &self,
        level: Level,
        query: &str,
        limit: u32,
    ) -> DbResult<Vec<Location>> {
        let escaped = query
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        let pattern = format!("{}%", escaped.trim());
        let rows: Vec<LocationRow> = sqlx::query_as(
            r#"
            SELECT level, code, name, parent_code
            FROM locations
            WHERE level = ?1
              AND (name LIKE ?2 ESCAPE '\' OR code LIKE ?2 ESCAPE '\')
            ORDER BY length(name), name COLLATE NOCASE
            LIMIT ?3
            "#,
        )
        .bind(level.slug())
        .bind(&pattern)
        .bind(limit as i64)
        .fetch_all(self.pool())
        .await?;

        Ok(rows.into_iter().map(|r| r.0).collect())
    }
}
