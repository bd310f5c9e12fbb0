//! CSV Append Log
//!
//! Append-only CSV files. The header is taken from the first record's
//! columns and written only when the file is new or empty, so the log can
//! be reopened across restarts without duplicating headers.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::execution::UnitResult;

use super::{AppendLog, Record};

/// An append-only CSV file.
#[derive(Debug, Clone)]
pub struct CsvLog {
    path: PathBuf,
}

impl CsvLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True when the file is missing or has no content.
    fn is_blank(&self) -> bool {
        fs::metadata(&self.path).map(|m| m.len() == 0).unwrap_or(true)
    }
}

impl AppendLog for CsvLog {
    fn append(&self, record: &Record) -> UnitResult<()> {
        if record.is_empty() {
            debug!("No data to save to {}", self.path.display());
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let write_header = self.is_blank();
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;

        let mut out = String::new();
        if write_header {
            out.push_str(&encode_row(record.iter().map(|(column, _)| column.as_str())));
        }
        out.push_str(&encode_row(record.iter().map(|(_, value)| value.as_str())));
        file.write_all(out.as_bytes())?;

        info!("Saved 1 record to {}", self.path.display());
        Ok(())
    }

    fn read_records(&self) -> UnitResult<Vec<HashMap<String, String>>> {
        if self.is_blank() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path)?;
        let mut rows = parse_rows(&content).into_iter();

        let Some(header) = rows.next() else {
            return Ok(Vec::new());
        };

        Ok(rows
            .map(|row| header.iter().cloned().zip(row).collect())
            .collect())
    }
}

/// Encodes one CSV line, including the trailing line break.
pub fn encode_row<'a>(fields: impl Iterator<Item = &'a str>) -> String {
    let mut line = fields.map(escape_field).collect::<Vec<_>>().join(",");
    line.push_str("\r\n");
    line
}

/// Quotes a field when it contains a separator, quote or line break.
fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Splits CSV content into rows of fields.
///
/// Handles quoted fields with embedded separators, doubled quotes and line
/// breaks. Blank lines are skipped.
pub fn parse_rows(content: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' => in_quotes = true,
            ',' => row.push(std::mem::take(&mut field)),
            '\r' => {}
            '\n' => {
                row.push(std::mem::take(&mut field));
                if !(row.len() == 1 && row[0].is_empty()) {
                    rows.push(std::mem::take(&mut row));
                }
                row.clear();
            }
            _ => field.push(c),
        }
    }

    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }

    rows
}
