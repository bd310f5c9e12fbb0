//! In-memory service fakes shared by the agent tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::execution::{UnitError, UnitResult};
use crate::services::{AppendLog, LanguageModel, Record, SeenStore, Sleeper, Story, StorySource};

/// Returns the same stories on every call, or always fails.
pub struct FakeSource {
    stories: Option<Vec<Story>>,
    calls: AtomicUsize,
}

impl FakeSource {
    pub fn new(stories: Vec<Story>) -> Self {
        Self {
            stories: Some(stories),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            stories: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl StorySource for FakeSource {
    fn fetch_stories(&self) -> UnitResult<Vec<Story>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.stories
            .clone()
            .ok_or_else(|| UnitError::Http("connection refused".to_string()))
    }
}

/// Answers every prompt with a fixed reply, or always fails.
pub struct FakeModel {
    reply: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl FakeModel {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl LanguageModel for FakeModel {
    fn complete(&self, prompt: &str, _max_tokens: u32) -> UnitResult<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.reply
            .clone()
            .ok_or_else(|| UnitError::Http("503 Service Unavailable".to_string()))
    }
}

/// Append log kept in memory.
#[derive(Default)]
pub struct MemoryLog {
    records: Mutex<Vec<Record>>,
    broken: bool,
}

impl MemoryLog {
    pub fn broken() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            broken: true,
        }
    }

    pub fn with_records(records: Vec<Record>) -> Self {
        Self {
            records: Mutex::new(records),
            broken: false,
        }
    }

    pub fn records(&self) -> Vec<Record> {
        self.records.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }
}

impl AppendLog for MemoryLog {
    fn append(&self, record: &Record) -> UnitResult<()> {
        if self.broken {
            return Err(UnitError::failed("disk full"));
        }
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }

    fn read_records(&self) -> UnitResult<Vec<HashMap<String, String>>> {
        if self.broken {
            return Err(UnitError::failed("disk unreadable"));
        }
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .map(|record| record.iter().cloned().collect())
            .collect())
    }
}

/// Seen store kept in memory.
#[derive(Default)]
pub struct MemorySeen {
    initial: HashSet<String>,
    recorded: Mutex<Vec<String>>,
    broken: bool,
}

impl MemorySeen {
    pub fn with_titles(titles: &[&str]) -> Self {
        Self {
            initial: titles.iter().map(|t| t.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn broken() -> Self {
        Self {
            broken: true,
            ..Self::default()
        }
    }

    /// Titles recorded since creation, in order.
    pub fn recorded(&self) -> Vec<String> {
        self.recorded.lock().unwrap().clone()
    }

    /// Initial plus recorded titles.
    pub fn all_titles(&self) -> HashSet<String> {
        let mut titles = self.initial.clone();
        titles.extend(self.recorded());
        titles
    }
}

impl SeenStore for MemorySeen {
    fn load(&self) -> UnitResult<HashSet<String>> {
        if self.broken {
            return Err(UnitError::failed("store unavailable"));
        }
        Ok(self.all_titles())
    }

    fn record(&self, title: &str) -> UnitResult<()> {
        if self.broken {
            return Err(UnitError::failed("store unavailable"));
        }
        self.recorded.lock().unwrap().push(title.to_string());
        Ok(())
    }
}

/// Records requested sleeps without blocking.
#[derive(Default)]
pub struct RecordingSleeper {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}
