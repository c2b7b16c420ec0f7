/// Inline SQL migrations for the statfrance database schema.
///
/// Each entry is one version, numbered from 1 by position.

pub const MIGRATIONS: &[&str] = &[
    // locations (country, départements, communes)
    r#"
CREATE TABLE IF NOT EXISTS locations (
    level       TEXT NOT NULL,
    code        TEXT NOT NULL,
    name        TEXT NOT NULL,
    parent_code TEXT,
    PRIMARY KEY (level, code)
);
"#,
    r#"
CREATE INDEX IF NOT EXISTS idx_locations_parent ON locations(level, parent_code);
"#,
    // long-format observations, one value per (location, year, indicator)
    r#"
CREATE TABLE IF NOT EXISTS observations (
    dataset   TEXT NOT NULL,
    level     TEXT NOT NULL,
    code      TEXT NOT NULL,
    year      INTEGER NOT NULL,
    indicator TEXT NOT NULL,
    value     REAL,
    PRIMARY KEY (dataset, level, code, year, indicator)
);
"#,
    // import audit trail
    r#"
CREATE TABLE IF NOT EXISTS import_runs (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    kind          TEXT NOT NULL,
    dataset       TEXT,
    level         TEXT NOT NULL,
    source        TEXT NOT NULL,
    rows_imported INTEGER NOT NULL DEFAULT 0,
    imported_at   INTEGER NOT NULL
);
"#,
    r#"
CREATE INDEX IF NOT EXISTS idx_import_runs_imported_at ON import_runs(imported_at DESC);
"#,
];
