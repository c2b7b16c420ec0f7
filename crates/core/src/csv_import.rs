// crates/core/src/csv_import.rs
//! CSV reading for stats and location imports.
//!
//! Open-data CSVs come either comma- or semicolon-separated; semicolon files
//! usually use decimal commas. The reader handles RFC 4180 quoting (quoted
//! delimiters, doubled quotes, embedded newlines, CRLF).

use std::collections::HashMap;

use tracing::debug;

use crate::catalog::{Level, COUNTRY_CODE};
use crate::error::ImportError;
use crate::series::{detect_year, is_reserved_column, CellValue, RawRow, IDENTIFIER_FIELDS, YEAR_FIELDS};
use crate::types::{Location, Observation};

/// Cell texts that mean "no value".
const NULL_MARKERS: [&str; 4] = ["NA", "N/A", "nd", "-"];

/// One parsed CSV record with the line it starts on (1-based).
#[derive(Debug, Clone, PartialEq)]
pub struct CsvRecord {
    pub line: usize,
    pub fields: Vec<String>,
}

/// A parsed CSV file: header plus typed rows.
#[derive(Debug, Clone)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub delimiter: char,
    /// `(line, row)` pairs in file order.
    pub rows: Vec<(usize, RawRow)>,
}

impl CsvTable {
    pub fn has_column(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h == name)
    }

    /// First of `candidates` present in the header.
    fn find_column<'a>(&self, candidates: &[&'a str]) -> Option<&'a str> {
        candidates.iter().copied().find(|c| self.has_column(c))
    }
}

/// Pick `;`, `\t` or `,` from the header line, whichever occurs most.
pub fn detect_delimiter(header: &str) -> char {
    [';', '\t', ',']
        .into_iter()
        .map(|d| (header.matches(d).count(), d))
        .filter(|(count, _)| *count > 0)
        .max_by_key(|(count, _)| *count)
        .map(|(_, d)| d)
        .unwrap_or(',')
}

/// Split `input` into records. Blank lines are dropped.
pub fn parse_records(input: &str, delimiter: char) -> Result<Vec<CsvRecord>, ImportError> {
    let input = input.strip_prefix('\u{feff}').unwrap_or(input);
    let mut records = Vec::new();
    let mut fields: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut at_field_start = true;
    let mut line = 1;
    let mut record_line = 1;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push('\n');
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if at_field_start => {
                in_quotes = true;
                at_field_start = false;
            }
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                fields.push(std::mem::take(&mut field));
                push_record(&mut records, record_line, std::mem::take(&mut fields));
                line += 1;
                record_line = line;
                at_field_start = true;
            }
            c if c == delimiter => {
                fields.push(std::mem::take(&mut field));
                at_field_start = true;
            }
            _ => {
                field.push(c);
                at_field_start = false;
            }
        }
    }

    if in_quotes {
        return Err(ImportError::malformed(record_line, "unterminated quoted field"));
    }
    if !fields.is_empty() || !field.is_empty() {
        fields.push(field);
        push_record(&mut records, record_line, fields);
    }

    Ok(records)
}

fn push_record(records: &mut Vec<CsvRecord>, line: usize, fields: Vec<String>) {
    let blank = fields.len() == 1 && fields[0].trim().is_empty();
    if !blank {
        records.push(CsvRecord { line, fields });
    }
}

/// Type a data cell. Empty cells and null markers become `Null`; numbers
/// (with decimal commas when `;`-separated, and spaced thousands) become
/// `Number`; anything else stays `Text`.
pub fn parse_cell(text: &str, delimiter: char) -> CellValue {
    let trimmed = text.trim();
    if trimmed.is_empty() || NULL_MARKERS.contains(&trimmed) {
        return CellValue::Null;
    }
    let mut candidate: String = trimmed
        .chars()
        .filter(|c| !matches!(c, ' ' | '\u{a0}' | '\u{202f}'))
        .collect();
    if delimiter != ',' {
        candidate = candidate.replace(',', ".");
    }
    match candidate.parse::<f64>() {
        Ok(n) if n.is_finite() => CellValue::Number(n),
        _ => CellValue::Text(trimmed.to_string()),
    }
}

/// Parse a whole CSV file into typed rows.
///
/// Identifier columns stay text so codes like `01` or `2A` survive intact.
pub fn read_rows(input: &str) -> Result<CsvTable, ImportError> {
    let first_line = input
        .trim_start_matches('\u{feff}')
        .lines()
        .next()
        .ok_or(ImportError::Empty)?;
    let delimiter = detect_delimiter(first_line);
    let mut records = parse_records(input, delimiter)?.into_iter();

    let header = records.next().ok_or(ImportError::Empty)?;
    let headers: Vec<String> = header.fields.iter().map(|h| h.trim().to_string()).collect();

    let mut rows = Vec::new();
    for record in records {
        if record.fields.len() != headers.len() {
            return Err(ImportError::malformed(
                record.line,
                format!(
                    "expected {} fields, found {}",
                    headers.len(),
                    record.fields.len()
                ),
            ));
        }
        let row: RawRow = headers
            .iter()
            .zip(record.fields)
            .map(|(name, text)| {
                let cell = if IDENTIFIER_FIELDS.contains(&name.as_str()) || name == "parent_code" {
                    let text = text.trim();
                    if text.is_empty() {
                        CellValue::Null
                    } else {
                        CellValue::Text(text.to_string())
                    }
                } else {
                    parse_cell(&text, delimiter)
                };
                (name.clone(), cell)
            })
            .collect();
        rows.push((record.line, row));
    }

    debug!(
        columns = headers.len(),
        rows = rows.len(),
        delimiter = %delimiter.escape_default(),
        "Parsed CSV"
    );

    Ok(CsvTable {
        headers,
        delimiter,
        rows,
    })
}

fn code_candidates(level: Level) -> Vec<&'static str> {
    let mut candidates = vec!["code"];
    candidates.extend(level.code_column());
    candidates
}

fn text_cell(row: &RawRow, column: &str) -> Option<String> {
    match row.get(column)? {
        CellValue::Text(s) => Some(s.clone()),
        CellValue::Number(n) if n.fract() == 0.0 => Some(format!("{}", *n as i64)),
        CellValue::Number(n) => Some(n.to_string()),
        CellValue::Null => None,
    }
}

/// Turn stats rows into long-format observations.
///
/// Every non-identifier, non-year column is an indicator. Country-level
/// files may omit the code column; when present it must read `FR`.
///
/// Repeated (code, year, indicator) cells collapse the way `serialize`
/// does: a value replaces a null and the last value wins.
pub fn extract_observations(
    table: &CsvTable,
    level: Level,
) -> Result<Vec<Observation>, ImportError> {
    let code_column = table.find_column(&code_candidates(level));
    if code_column.is_none() && level != Level::Country {
        return Err(ImportError::MissingColumn {
            column: "code".to_string(),
        });
    }
    let Some(year_column) = table.find_column(&YEAR_FIELDS) else {
        return Err(ImportError::MissingColumn {
            column: YEAR_FIELDS[0].to_string(),
        });
    };

    let mut observations: Vec<Observation> = Vec::new();
    let mut seen: HashMap<(String, i64, String), usize> = HashMap::new();
    for (line, row) in &table.rows {
        let year = detect_year(row).ok_or_else(|| ImportError::InvalidValue {
            line: *line,
            column: year_column.to_string(),
            value: text_cell(row, year_column).unwrap_or_default(),
        })?;
        let code = match code_column {
            Some(column) => text_cell(row, column).ok_or_else(|| ImportError::InvalidValue {
                line: *line,
                column: column.to_string(),
                value: String::new(),
            })?,
            None => COUNTRY_CODE.to_string(),
        };
        if level == Level::Country && code.trim() != COUNTRY_CODE {
            return Err(ImportError::InvalidValue {
                line: *line,
                column: code_column.unwrap_or("code").to_string(),
                value: code,
            });
        }

        for (indicator, cell) in row {
            if is_reserved_column(indicator) || indicator == "parent_code" {
                continue;
            }
            let value = match cell {
                CellValue::Text(text) => {
                    return Err(ImportError::InvalidValue {
                        line: *line,
                        column: indicator.clone(),
                        value: text.clone(),
                    })
                }
                other => other.as_f64(),
            };
            let key = (code.clone(), year, indicator.clone());
            match seen.get(&key) {
                Some(&idx) => {
                    if value.is_some() {
                        observations[idx].value = value;
                    }
                }
                None => {
                    seen.insert(key, observations.len());
                    observations.push(Observation {
                        code: code.clone(),
                        year,
                        indicator: indicator.clone(),
                        value,
                    });
                }
            }
        }
    }

    Ok(observations)
}

/// Turn `code,name[,parent_code]` rows into locations.
///
/// The parent may also be given in the parent level's code column, e.g.
/// `departement_code` in a commune file.
pub fn extract_locations(table: &CsvTable, level: Level) -> Result<Vec<Location>, ImportError> {
    let code_column = table
        .find_column(&code_candidates(level))
        .ok_or_else(|| ImportError::MissingColumn {
            column: "code".to_string(),
        })?;
    if !table.has_column("name") {
        return Err(ImportError::MissingColumn {
            column: "name".to_string(),
        });
    }
    let mut parent_candidates = vec!["parent_code"];
    parent_candidates.extend(level.parent().and_then(|p| p.code_column()));
    let parent_column = table
        .find_column(&parent_candidates)
        .filter(|c| *c != code_column);

    table
        .rows
        .iter()
        .map(|(line, row)| {
            let code = text_cell(row, code_column).ok_or_else(|| ImportError::InvalidValue {
                line: *line,
                column: code_column.to_string(),
                value: String::new(),
            })?;
            let name = text_cell(row, "name").ok_or_else(|| ImportError::InvalidValue {
                line: *line,
                column: "name".to_string(),
                value: String::new(),
            })?;
            let parent_code = match (level, parent_column) {
                (Level::Country, _) => None,
                (Level::Departement, None) => Some(COUNTRY_CODE.to_string()),
                (_, Some(column)) => text_cell(row, column),
                (_, None) => None,
            };
            Ok(Location {
                level,
                code,
                name,
                parent_code,
            })
        })
        .collect()
}
