// crates/core/src/lib.rs
pub mod catalog;
pub mod config;
pub mod csv_import;
pub mod error;
pub mod paths;
pub mod series;
pub mod types;

pub use catalog::{Dataset, DatasetInfo, Level, COUNTRY_CODE};
pub use config::AppConfig;
pub use error::*;
pub use series::{
    aggregate, serialize, serialize_with_composites, CellValue, CompositeDef, Formula, RawRow,
    SerializedSeries,
};
pub use types::*;
