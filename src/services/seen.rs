//! Seen Story Store
//!
//! Persists the titles of processed stories so they are not analyzed again
//! after a restart. Stored as a CSV file with `title,first_seen` columns.

use std::collections::HashSet;
use std::path::PathBuf;

use chrono::Local;
use log::debug;

use crate::execution::UnitResult;

use super::csv_log::CsvLog;
use super::{AppendLog, SeenStore};

/// File name of the store inside the data directory.
pub const SEEN_STORIES_FILE: &str = "seen_stories.csv";

/// [`SeenStore`] backed by an append-only CSV file.
#[derive(Debug, Clone)]
pub struct CsvSeenStore {
    log: CsvLog,
}

impl CsvSeenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            log: CsvLog::new(path),
        }
    }
}

impl SeenStore for CsvSeenStore {
    fn load(&self) -> UnitResult<HashSet<String>> {
        let titles: HashSet<String> = self
            .log
            .read_records()?
            .into_iter()
            .filter_map(|row| row.get("title").map(|t| t.trim().to_string()))
            .filter(|t| !t.is_empty())
            .collect();

        debug!("Loaded {} seen titles from {}", titles.len(), self.log.path().display());
        Ok(titles)
    }

    fn record(&self, title: &str) -> UnitResult<()> {
        let title = title.trim();
        if title.is_empty() {
            return Ok(());
        }

        self.log.append(&vec![
            ("title".to_string(), title.to_string()),
            ("first_seen".to_string(), Local::now().to_rfc3339()),
        ])
    }
}
