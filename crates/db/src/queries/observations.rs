// crates/db/src/queries/observations.rs
// Long-format observation storage and the pivot back to raw series rows.

use std::collections::BTreeMap;

use serde::Serialize;
use sqlx::Row;
use statfrance_core::{CellValue, Dataset, Level, Observation, RawRow};
use ts_rs::TS;

use super::decode_dataset;
use crate::{Database, DbError, DbResult};

/// Stored coverage for one (dataset, level) pair.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export, export_to = "../../../web/src/types/generated/")]
#[serde(rename_all = "camelCase")]
pub struct DatasetCoverage {
    pub dataset: Dataset,
    pub level: Level,
    #[ts(type = "number")]
    pub locations: i64,
    #[ts(type = "number")]
    pub observations: i64,
    #[ts(type = "number | null")]
    pub first_year: Option<i64>,
    #[ts(type = "number | null")]
    pub last_year: Option<i64>,
}

impl<'r> sqlx::FromRow<'r, sqlx::sqlite::SqliteRow> for DatasetCoverage {
    fn from_row(row: &'r sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            dataset: decode_dataset(row.try_get("dataset")?)?,
            level: super::decode_level(row.try_get("level")?)?,
            locations: row.try_get("locations")?,
            observations: row.try_get("observations")?,
            first_year: row.try_get("first_year")?,
            last_year: row.try_get("last_year")?,
        })
    }
}

fn ensure_supported(dataset: Dataset, level: Level) -> DbResult<()> {
    if dataset.supports(level) {
        Ok(())
    } else {
        Err(DbError::UnsupportedLevel {
            dataset: dataset.slug().to_string(),
            level: level.slug().to_string(),
        })
    }
}

impl Database {
    /// Write observations in one transaction. A new value replaces the stored
    /// one for the same (location, year, indicator); a null never replaces a
    /// value.
    ///
    /// Returns the number of rows written.
    pub async fn insert_observations(
        &self,
        dataset: Dataset,
        level: Level,
        observations: &[Observation],
    ) -> DbResult<u64> {
        ensure_supported(dataset, level)?;
        if observations.is_empty() {
            return Ok(0);
        }
        let mut tx = self.pool().begin().await?;
        let mut written = 0u64;
        for obs in observations {
            let result = sqlx::query(
                r#"
                INSERT INTO observations (dataset, level, code, year, indicator, value)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ON CONFLICT (dataset, level, code, year, indicator)
                DO UPDATE SET value = COALESCE(excluded.value, observations.value)
                "#,
            )
            .bind(dataset.slug())
            .bind(level.slug())
            .bind(&obs.code)
            .bind(obs.year)
            .bind(&obs.indicator)
            .bind(obs.value)
            .execute(&mut *tx)
            .await?;
            written += result.rows_affected();
        }
        tx.commit().await?;
        Ok(written)
    }

    /// Rebuild the flat per-year rows of one location's series.
    ///
    /// Each row carries the dataset's year field (`year` or `birth-year`),
    /// the location `code`, and one cell per stored indicator. Rows come out
    /// in storage order; `serialize` does the sorting and alignment.
    pub async fn fetch_rows(
        &self,
        dataset: Dataset,
        level: Level,
        code: &str,
    ) -> DbResult<Vec<RawRow>> {
        ensure_supported(dataset, level)?;
        let records: Vec<(i64, String, Option<f64>)> = sqlx::query_as(
            r#"
            SELECT year, indicator, value
            FROM observations
            WHERE dataset = ?1 AND level = ?2 AND code = ?3
            "#,
        )
        .bind(dataset.slug())
        .bind(level.slug())
        .bind(code)
        .fetch_all(self.pool())
        .await?;

        let mut by_year: BTreeMap<i64, RawRow> = BTreeMap::new();
        for (year, indicator, value) in records {
            let row = by_year.entry(year).or_insert_with(|| {
                let mut row = RawRow::new();
                row.insert(dataset.year_field().to_string(), CellValue::from(year));
                row.insert("code".to_string(), CellValue::from(code));
                row
            });
            row.insert(indicator, CellValue::from(value));
        }

        tracing::debug!(
            dataset = %dataset,
            level = %level,
            code,
            years = by_year.len(),
            "Fetched series rows"
        );
        Ok(by_year.into_values().collect())
    }

    /// Distinct indicator names stored for a dataset at a level.
    pub async fn list_indicators(&self, dataset: Dataset, level: Level) -> DbResult<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT DISTINCT indicator FROM observations
            WHERE dataset = ?1 AND level = ?2
            ORDER BY indicator
            "#,
        )
        .bind(dataset.slug())
        .bind(level.slug())
        .fetch_all(self.pool())
        .await?;

        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    /// Coverage per (dataset, level): locations, values, and year span.
    pub async fn dataset_summary(&self) -> DbResult<Vec<DatasetCoverage>> {
        let rows: Vec<DatasetCoverage> = sqlx::query_as(
            r#"
            SELECT dataset, level,
                   COUNT(DISTINCT code) AS locations,
                   COUNT(*) AS observations,
                   MIN(year) AS first_year,
                   MAX(year) AS last_year
            FROM observations
            GROUP BY dataset, level
            ORDER BY dataset, level
            "#,
        )
        .fetch_all(self.pool())
        .await?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn obs(code: &str, year: i64, indicator: &str, value: Option<f64>) -> Observation {
        Observation {
            code: code.to_string(),
            year,
            indicator: indicator.to_string(),
            value,
        }
    }

    #[tokio::test]
    async fn test_insert_and_fetch_rows() {
        let db = Database::new_in_memory().await.unwrap();
        let written = db
            .insert_observations(
                Dataset::Population,
                Level::Departement,
                &[
                    obs("75", 2021, "births", Some(25_000.0)),
                    obs("75", 2020, "births", Some(26_000.0)),
                    obs("75", 2020, "deaths", None),
                    obs("13", 2020, "births", Some(20_000.0)),
                ],
            )
            .await
            .unwrap();
        assert_eq!(written, 4);

        let rows = db
            .fetch_rows(Dataset::Population, Level::Departement, "75")
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["year"], CellValue::Number(2020.0));
        assert_eq!(rows[0]["code"], CellValue::Text("75".into()));
        assert_eq!(rows[0]["births"], CellValue::Number(26_000.0));
        assert_eq!(rows[0]["deaths"], CellValue::Null);
        assert!(!rows[1].contains_key("deaths"));
    }

    #[tokio::test]
    async fn test_fetch_rows_uses_birth_year_field() {
        let db = Database::new_in_memory().await.unwrap();
        db.insert_observations(
            Dataset::Births,
            Level::Country,
            &[obs("FR", 1990, "girls", Some(1.0))],
        )
        .await
        .unwrap();

        let rows = db
            .fetch_rows(Dataset::Births, Level::Country, "FR")
            .await
            .unwrap();
        assert_eq!(rows[0]["birth-year"], CellValue::Number(1990.0));
        assert!(!rows[0].contains_key("year"));
    }

    #[tokio::test]
    async fn test_insert_replaces_existing_value() {
        let db = Database::new_in_memory().await.unwrap();
        let level = Level::Country;
        db.insert_observations(Dataset::Crime, level, &[obs("FR", 2020, "homicides", Some(1.0))])
            .await
            .unwrap();
        db.insert_observations(Dataset::Crime, level, &[obs("FR", 2020, "homicides", Some(2.0))])
            .await
            .unwrap();

        let rows = db.fetch_rows(Dataset::Crime, level, "FR").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["homicides"], CellValue::Number(2.0));
    }

    #[tokio::test]
    async fn test_null_does_not_replace_stored_value() {
        let db = Database::new_in_memory().await.unwrap();
        let level = Level::Departement;
        db.insert_observations(Dataset::Population, level, &[obs("75", 2020, "births", Some(100.0))])
            .await
            .unwrap();
        db.insert_observations(Dataset::Population, level, &[obs("75", 2020, "births", None)])
            .await
            .unwrap();

        let rows = db.fetch_rows(Dataset::Population, level, "75").await.unwrap();
        assert_eq!(rows[0]["births"], CellValue::Number(100.0));
    }

    #[tokio::test]
    async fn test_unsupported_level_rejected() {
        let db = Database::new_in_memory().await.unwrap();
        let err = db
            .fetch_rows(Dataset::Births, Level::Commune, "75056")
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UnsupportedLevel { .. }));
    }

    #[tokio::test]
    async fn test_list_indicators_and_summary() {
        let db = Database::new_in_memory().await.unwrap();
        db.insert_observations(
            Dataset::Crime,
            Level::Departement,
            &[
                obs("75", 2019, "assault", Some(10.0)),
                obs("75", 2021, "homicides", Some(1.0)),
                obs("13", 2020, "assault", Some(5.0)),
            ],
        )
        .await
        .unwrap();

        let indicators = db
            .list_indicators(Dataset::Crime, Level::Departement)
            .await
            .unwrap();
        assert_eq!(indicators, vec!["assault", "homicides"]);

        let summary = db.dataset_summary().await.unwrap();
        assert_eq!(
            summary,
            vec![DatasetCoverage {
                dataset: Dataset::Crime,
                level: Level::Departement,
                locations: 2,
                observations: 3,
                first_year: Some(2019),
                last_year: Some(2021),
            }]
        );
    }
}
