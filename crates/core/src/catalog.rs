// crates/core/src/catalog.rs
//! Datasets served by the API, the levels they are published at, and the
//! composite indicators derived from their base columns.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::CatalogError;
use crate::series::{CompositeDef, Formula};

/// Code used for the single country-level location.
pub const COUNTRY_CODE: &str = "FR";

/// Geographic granularity of a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../../web/src/types/generated/")]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Country,
    Departement,
    Commune,
}

impl Level {
    pub const ALL: [Level; 3] = [Level::Country, Level::Departement, Level::Commune];

    pub fn slug(&self) -> &'static str {
        match self {
            Level::Country => "country",
            Level::Departement => "departement",
            Level::Commune => "commune",
        }
    }

    /// Level-specific code column accepted by the CSV importer besides `code`.
    pub fn code_column(&self) -> Option<&'static str> {
        match self {
            Level::Country => None,
            Level::Departement => Some("departement_code"),
            Level::Commune => Some("commune_code"),
        }
    }

    /// The level a location of this level is nested in.
    pub fn parent(&self) -> Option<Level> {
        match self {
            Level::Country => None,
            Level::Departement => Some(Level::Country),
            Level::Commune => Some(Level::Departement),
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Level {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "country" | "france" => Ok(Level::Country),
            "departement" | "département" | "department" => Ok(Level::Departement),
            "commune" => Ok(Level::Commune),
            _ => Err(CatalogError::UnknownLevel(s.to_string())),
        }
    }
}

/// A published family of series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../../web/src/types/generated/")]
#[serde(rename_all = "lowercase")]
pub enum Dataset {
    Population,
    Crime,
    Births,
}

impl Dataset {
    pub const ALL: [Dataset; 3] = [Dataset::Population, Dataset::Crime, Dataset::Births];

    pub fn slug(&self) -> &'static str {
        match self {
            Dataset::Population => "population",
            Dataset::Crime => "crime",
            Dataset::Births => "births",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Dataset::Population => "Population, births and deaths",
            Dataset::Crime => "Recorded crime",
            Dataset::Births => "Births by sex (first-names register)",
        }
    }

    /// Column carrying the year in this dataset's rows.
    pub fn year_field(&self) -> &'static str {
        match self {
            Dataset::Births => "birth-year",
            Dataset::Population | Dataset::Crime => "year",
        }
    }

    pub fn levels(&self) -> &'static [Level] {
        match self {
            Dataset::Population | Dataset::Crime => &Level::ALL,
            Dataset::Births => &[Level::Country, Level::Departement],
        }
    }

    pub fn supports(&self, level: Level) -> bool {
        self.levels().contains(&level)
    }

    /// Composite indicators derived from the dataset's base columns.
    pub fn composites(&self) -> BTreeMap<String, CompositeDef> {
        let defs: Vec<(&str, CompositeDef)> = match self {
            Dataset::Population => vec![
                (
                    "natural_balance",
                    CompositeDef::with_formula(&["births", "deaths"], Formula::Difference),
                ),
                (
                    "birth_rate",
                    CompositeDef::with_formula(&["births", "population"], Formula::PerThousand),
                ),
                (
                    "death_rate",
                    CompositeDef::with_formula(&["deaths", "population"], Formula::PerThousand),
                ),
            ],
            Dataset::Crime => vec![
                (
                    "homicides_total",
                    CompositeDef::sum(&["homicides", "attempted_homicides"]),
                ),
                (
                    "violence_total",
                    CompositeDef::sum(&[
                        "homicides",
                        "attempted_homicides",
                        "assault",
                        "sexual_violence",
                        "armed_robbery",
                    ]),
                ),
                (
                    "theft_total",
                    CompositeDef::sum(&[
                        "burglary",
                        "vehicle_theft",
                        "theft_from_vehicle",
                        "shoplifting",
                    ]),
                ),
                (
                    "drug_offences_total",
                    CompositeDef::sum(&["drug_use", "drug_trafficking"]),
                ),
                (
                    "violence_rate",
                    CompositeDef::with_formula(
                        &["assault", "sexual_violence", "population"],
                        Formula::Custom(violence_rate),
                    ),
                ),
            ],
            Dataset::Births => vec![
                ("births_total", CompositeDef::sum(&["girls", "boys"])),
                (
                    "girls_share",
                    CompositeDef::with_formula(&["girls", "boys"], Formula::Custom(girls_share)),
                ),
            ],
        };
        defs.into_iter()
            .map(|(name, def)| (name.to_string(), def))
            .collect()
    }

    pub fn info(&self) -> DatasetInfo {
        DatasetInfo {
            slug: self.slug().to_string(),
            title: self.title().to_string(),
            year_field: self.year_field().to_string(),
            levels: self.levels().to_vec(),
            composites: self.composites().into_keys().collect(),
        }
    }
}

/// Assaults and sexual violence per thousand inhabitants.
fn violence_rate(values: &[f64]) -> f64 {
    match values {
        [assault, sexual, population] if *population > 0.0 => {
            (assault + sexual) * 1000.0 / population
        }
        _ => 0.0,
    }
}

fn girls_share(values: &[f64]) -> f64 {
    match values {
        [girls, boys] if girls + boys > 0.0 => girls / (girls + boys),
        _ => 0.0,
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Dataset {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "population" => Ok(Dataset::Population),
            "crime" | "delinquance" => Ok(Dataset::Crime),
            "births" | "names" | "prenoms" => Ok(Dataset::Births),
            _ => Err(CatalogError::UnknownDataset(s.to_string())),
        }
    }
}

/// Catalog entry returned by `GET /api/datasets`.
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = "../../../web/src/types/generated/")]
#[serde(rename_all = "camelCase")]
pub struct DatasetInfo {
    pub slug: String,
    pub title: String,
    pub year_field: String,
    pub levels: Vec<Level>,
    pub composites: Vec<String>,
}
