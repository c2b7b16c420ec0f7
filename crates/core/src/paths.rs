//! Centralized path functions for all app storage locations.

use std::path::PathBuf;

const APP_DIR: &str = "statfrance";

/// App cache root: `~/Library/Caches/statfrance/` (macOS) or `~/.cache/statfrance/` (Linux).
pub fn app_cache_dir() -> Option<PathBuf> {
    dirs::cache_dir().map(|d| d.join(APP_DIR))
}

/// SQLite database file: `<app_cache_dir>/statfrance.db`.
pub fn db_path() -> Option<PathBuf> {
    app_cache_dir().map(|d| d.join("statfrance.db"))
}

/// App config root: `~/.config/statfrance/` on Linux.
pub fn app_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR))
}

/// Optional TOML config file: `<app_config_dir>/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    app_config_dir().map(|d| d.join("config.toml"))
}
