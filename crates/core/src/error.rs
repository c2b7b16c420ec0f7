// crates/core/src/error.rs
use std::path::PathBuf;
use thiserror::Error;

/// Errors resolving dataset and level names
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Unknown dataset: {0}")]
    UnknownDataset(String),

    #[error("Unknown level: {0}")]
    UnknownLevel(String),

    #[error("Dataset {dataset} is not published at {level} level")]
    UnsupportedLevel { dataset: String, level: String },
}

/// Errors that can occur when reading CSV imports
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Import file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Empty CSV input")]
    Empty,

    #[error("Missing column '{column}' in CSV header")]
    MissingColumn { column: String },

    #[error("Malformed CSV at line {line}: {message}")]
    Malformed { line: usize, message: String },

    #[error("Invalid value at line {line}, column '{column}': {value:?}")]
    InvalidValue {
        line: usize,
        column: String,
        value: String,
    },
}

impl ImportError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Io { path, source },
        }
    }

    pub fn malformed(line: usize, message: impl Into<String>) -> Self {
        Self::Malformed {
            line,
            message: message.into(),
        }
    }
}

/// Errors loading the TOML config file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_error_io_classification() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = ImportError::io("/data/crime.csv", io_err);
        assert!(matches!(err, ImportError::NotFound { .. }));
        assert!(err.to_string().contains("/data/crime.csv"));

        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = ImportError::io("/data/crime.csv", io_err);
        assert!(matches!(err, ImportError::Io { .. }));
    }

    #[test]
    fn test_malformed_display_has_line() {
        let err = ImportError::malformed(12, "unterminated quote");
        assert_eq!(
            err.to_string(),
            "Malformed CSV at line 12: unterminated quote"
        );
    }

    #[test]
    fn test_catalog_error_display() {
        let err = CatalogError::UnsupportedLevel {
            dataset: "births".into(),
            level: "commune".into(),
        };
        assert!(err.to_string().contains("births"));
        assert!(err.to_string().contains("commune"));
    }
}
