// crates/core/src/config.rs
//! Server configuration file.
//!
//! Every field is optional; command-line flags and environment variables
//! take precedence over the file, which takes precedence over built-in
//! defaults.

use std::net::IpAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub port: Option<u16>,
    pub bind: Option<IpAddr>,
    pub db_path: Option<PathBuf>,
    pub static_dir: Option<PathBuf>,
    /// `tracing` filter directive, e.g. `info,statfrance_db=debug`.
    pub log: Option<String>,
}

impl AppConfig {
    pub fn from_toml_str(path: &Path, text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })
    }

    /// Load the file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        Self::from_toml_str(path, &text)
    }

    /// Load `path` if it exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load from the default config location, defaults when absent.
    pub fn load_default() -> Result<Self, ConfigError> {
        match crate::paths::config_path() {
            Some(path) => Self::load_or_default(&path),
            None => Ok(Self::default()),
        }
    }
}
