//! External Services Module
//!
//! Capabilities the agent's units call into, each behind a small trait so
//! units can be exercised with in-memory fakes.
//!
//! # Components
//!
//! - [`hackernews`]: Story source backed by the Hacker News API
//! - [`openai`]: Language model backed by the OpenAI chat API
//! - [`csv_log`]: Append-only CSV files with header handling
//! - [`seen`]: Deduplication store of already seen story titles
//! - [`sleep`]: Blocking delay

pub mod csv_log;
pub mod hackernews;
pub mod openai;
pub mod seen;
pub mod sleep;

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::execution::UnitResult;

pub use csv_log::CsvLog;
pub use hackernews::HackerNewsSource;
pub use openai::OpenAiClient;
pub use seen::CsvSeenStore;
pub use sleep::ThreadSleeper;

/// One row for an [`AppendLog`]: column names and values, in column order.
pub type Record = Vec<(String, String)>;

/// A news story.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Story {
    pub title: String,

    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub score: i64,

    /// Creation time (epoch seconds)
    #[serde(default)]
    pub time: i64,

    pub id: u64,
}

impl Story {
    pub fn new(id: u64, title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: String::new(),
            score: 0,
            time: 0,
            id,
        }
    }

    pub fn with_score(mut self, score: i64) -> Self {
        self.score = score;
        self
    }
}

/// Finite source of recent stories. May return an empty list.
pub trait StorySource {
    fn fetch_stories(&self) -> UnitResult<Vec<Story>>;
}

/// Text completion by a language model.
pub trait LanguageModel {
    fn complete(&self, prompt: &str, max_tokens: u32) -> UnitResult<String>;
}

/// Durable, append-only store of records.
pub trait AppendLog {
    /// Appends one record; the first record fixes the columns.
    fn append(&self, record: &Record) -> UnitResult<()>;

    /// Reads every stored record as column -> value.
    fn read_records(&self) -> UnitResult<Vec<HashMap<String, String>>>;
}

/// Titles that have already been processed.
pub trait SeenStore {
    fn load(&self) -> UnitResult<HashSet<String>>;

    fn record(&self, title: &str) -> UnitResult<()>;
}

/// Blocks the calling thread.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}
