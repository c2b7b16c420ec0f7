// crates/db/src/queries/mod.rs
// Query methods on Database, split by table.

pub mod imports;
pub mod locations;
pub mod observations;

use statfrance_core::{Dataset, Level};
use std::str::FromStr;

/// Decode a slug column into a catalog enum inside a `FromRow` impl.
pub(crate) fn decode_slug<T>(column: &str, raw: String) -> Result<T, sqlx::Error>
where
    T: FromStr<Err = statfrance_core::CatalogError>,
{
    raw.parse::<T>().map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

pub(crate) fn decode_level(raw: String) -> Result<Level, sqlx::Error> {
    decode_slug("level", raw)
}

pub(crate) fn decode_dataset(raw: String) -> Result<Dataset, sqlx::Error> {
    decode_slug("dataset", raw)
}
