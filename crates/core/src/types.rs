// crates/core/src/types.rs
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::catalog::Level;

/// A place series are published for: the country, a département or a commune.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../../web/src/types/generated/")]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub level: Level,
    /// INSEE code (`FR`, `75`, `2A`, `75056`, ...).
    pub code: String,
    pub name: String,
    /// Code of the enclosing location, `None` for the country.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_code: Option<String>,
}

/// One (location, year, indicator) value in long format.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub code: String,
    pub year: i64,
    pub indicator: String,
    pub value: Option<f64>,
}
