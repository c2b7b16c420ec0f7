// crates/core/src/series.rs
//! Time-series alignment and composite-metric aggregation.
//!
//! Stats tables arrive as flat rows: one row per year, with an arbitrary set
//! of indicator columns. [`serialize`] turns those rows into one shared,
//! ascending list of year labels plus one value series per indicator, all of
//! the same length. [`aggregate`] then derives composite indicators from the
//! aligned base series.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;
use ts_rs::TS;

/// Column names that carry the year of a row, in detection order.
pub const YEAR_FIELDS: [&str; 2] = ["year", "birth-year"];

/// Identifier columns that are never treated as indicators.
pub const IDENTIFIER_FIELDS: [&str; 6] = [
    "code",
    "level",
    "name",
    "departement_code",
    "commune_code",
    "id",
];

/// A single cell of a raw stats row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Null,
}

impl CellValue {
    /// Numeric reading of the cell. Text is parsed; anything else is `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) if n.is_finite() => Some(*n),
            CellValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }

    /// Year reading of the cell: an integral number or integer text.
    pub fn as_year(&self) -> Option<i64> {
        match self {
            CellValue::Number(n) if n.is_finite() && n.fract() == 0.0 => Some(*n as i64),
            CellValue::Text(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<Option<f64>> for CellValue {
    fn from(value: Option<f64>) -> Self {
        value.map_or(CellValue::Null, CellValue::Number)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

/// One flat stats row: column name to cell.
pub type RawRow = BTreeMap<String, CellValue>;

/// Year columns and identifier columns are excluded from the indicator set.
pub fn is_reserved_column(key: &str) -> bool {
    YEAR_FIELDS.contains(&key) || IDENTIFIER_FIELDS.contains(&key)
}

/// Find the year of a row. `year` takes precedence over `birth-year`.
pub fn detect_year(row: &RawRow) -> Option<i64> {
    YEAR_FIELDS
        .iter()
        .find_map(|field| row.get(*field))
        .and_then(CellValue::as_year)
}

/// Aligned label/series structure.
///
/// Every series in `data` has exactly `labels.len()` entries; a missing
/// (year, indicator) pair is `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../../web/src/types/generated/")]
pub struct SerializedSeries {
    #[ts(type = "number[]")]
    pub labels: Vec<i64>,
    pub data: BTreeMap<String, Vec<Option<f64>>>,
}

impl SerializedSeries {
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Value of `key` for `year`, if both exist and the value is non-null.
    pub fn value_at(&self, key: &str, year: i64) -> Option<f64> {
        let idx = self.labels.binary_search(&year).ok()?;
        self.data.get(key)?.get(idx).copied().flatten()
    }

    /// Flatten back into one row per label, keyed by `year`, carrying only
    /// the non-null values.
    pub fn to_rows(&self) -> Vec<RawRow> {
        self.labels
            .iter()
            .enumerate()
            .map(|(idx, year)| {
                let mut row = RawRow::new();
                row.insert("year".to_string(), CellValue::from(*year));
                for (key, series) in &self.data {
                    if let Some(Some(value)) = series.get(idx) {
                        row.insert(key.clone(), CellValue::Number(*value));
                    }
                }
                row
            })
            .collect()
    }

    /// Merge composite series into `data`. A composite replaces a base
    /// indicator of the same name.
    pub fn merge_composites(&mut self, composites: BTreeMap<String, Vec<f64>>) {
        for (key, values) in composites {
            let mut aligned: Vec<Option<f64>> = values.into_iter().map(Some).collect();
            aligned.resize(self.labels.len(), None);
            self.data.insert(key, aligned);
        }
    }
}

/// Reshape flat rows into an aligned [`SerializedSeries`].
///
/// Labels come out in ascending year order whatever the row order. Rows
/// without a usable year are skipped. When two rows carry the same
/// (year, indicator) pair, a value replaces a null and the last value wins.
pub fn serialize(rows: &[RawRow]) -> SerializedSeries {
    let mut by_year: BTreeMap<i64, BTreeMap<&str, Option<f64>>> = BTreeMap::new();
    let mut keys: BTreeSet<&str> = BTreeSet::new();

    for row in rows {
        let Some(year) = detect_year(row) else {
            debug!(columns = row.len(), "Skipping stats row without a usable year");
            continue;
        };
        let slot = by_year.entry(year).or_default();
        for (key, cell) in row {
            if is_reserved_column(key) {
                continue;
            }
            keys.insert(key.as_str());
            let value = cell.as_f64();
            if value.is_some() || !slot.contains_key(key.as_str()) {
                slot.insert(key.as_str(), value);
            }
        }
    }

    let labels: Vec<i64> = by_year.keys().copied().collect();
    let data = keys
        .into_iter()
        .map(|key| {
            let series: Vec<Option<f64>> = by_year
                .values()
                .map(|slot| slot.get(key).copied().flatten())
                .collect();
            (key.to_string(), series)
        })
        .collect();

    SerializedSeries { labels, data }
}

/// How the component values of a composite are combined at one position.
///
/// Every formula receives one value per declared component, in declaration
/// order. Null cells and absent series read as zero.
#[derive(Debug, Clone, Copy)]
pub enum Formula {
    Sum,
    /// First component minus all the others.
    Difference,
    /// First component over the second; zero on a zero denominator.
    Ratio,
    /// First component per thousand of the second; zero on a zero denominator.
    PerThousand,
    Custom(fn(&[f64]) -> f64),
}

impl Formula {
    pub fn apply(&self, values: &[f64]) -> f64 {
        match self {
            Formula::Sum => values.iter().sum(),
            Formula::Difference => match values.split_first() {
                Some((first, rest)) => first - rest.iter().sum::<f64>(),
                None => 0.0,
            },
            Formula::Ratio => ratio(values, 1.0),
            Formula::PerThousand => ratio(values, 1000.0),
            Formula::Custom(f) => f(values),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Formula::Sum => "sum",
            Formula::Difference => "difference",
            Formula::Ratio => "ratio",
            Formula::PerThousand => "per_thousand",
            Formula::Custom(_) => "custom",
        }
    }
}

fn ratio(values: &[f64], scale: f64) -> f64 {
    match values {
        [num, den, ..] if *den != 0.0 => num * scale / den,
        _ => 0.0,
    }
}

/// Definition of one composite indicator.
#[derive(Debug, Clone)]
pub struct CompositeDef {
    pub components: Vec<String>,
    pub formula: Formula,
}

impl CompositeDef {
    /// Additive composite: the sum of its components.
    pub fn sum(components: &[&str]) -> Self {
        Self::with_formula(components, Formula::Sum)
    }

    pub fn with_formula(components: &[&str], formula: Formula) -> Self {
        Self {
            components: components.iter().map(|c| c.to_string()).collect(),
            formula,
        }
    }
}

/// Derive composite series from aligned base series.
///
/// A composite whose components are all absent from `data` is omitted. The
/// output length is the length of the first present component; a position
/// beyond the end of a shorter component reads as zero.
pub fn aggregate(
    data: &BTreeMap<String, Vec<Option<f64>>>,
    definitions: &BTreeMap<String, CompositeDef>,
) -> BTreeMap<String, Vec<f64>> {
    let mut out = BTreeMap::new();

    for (name, def) in definitions {
        let components: Vec<Option<&[Option<f64>]>> = def
            .components
            .iter()
            .map(|c| data.get(c).map(Vec::as_slice))
            .collect();
        let Some(len) = components.iter().flatten().map(|s| s.len()).next() else {
            debug!(composite = %name, "No component series present, skipping composite");
            continue;
        };

        let mut values = Vec::with_capacity(components.len());
        let series: Vec<f64> = (0..len)
            .map(|i| {
                values.clear();
                values.extend(components.iter().map(|series| {
                    series
                        .and_then(|s| s.get(i).copied().flatten())
                        .unwrap_or(0.0)
                }));
                def.formula.apply(&values)
            })
            .collect();
        out.insert(name.clone(), series);
    }

    out
}

/// [`serialize`] the rows and merge the composites into the result.
pub fn serialize_with_composites(
    rows: &[RawRow],
    definitions: &BTreeMap<String, CompositeDef>,
) -> SerializedSeries {
    let mut series = serialize(rows);
    let composites = aggregate(&series.data, definitions);
    series.merge_composites(composites);
    series
}
