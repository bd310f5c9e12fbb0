//! Agent Shared Context
//!
//! State threaded through every unit of the agent flow. One value lives for
//! the whole process: the seen-title set and the cycle counter carry over
//! from one cycle to the next, the per-cycle fields are cleared by the save
//! step.

use std::collections::HashSet;

use chrono::{DateTime, Local};

use crate::services::Story;

use super::analysis::Analysis;

#[derive(Debug, Clone)]
pub struct AgentContext {
    /// When the agent started
    pub started_at: DateTime<Local>,

    /// Cycles that ran to completion
    pub cycles_completed: u64,

    /// Titles already processed, here or in a previous run
    pub seen_titles: HashSet<String>,

    /// Stories collected this cycle that were not seen before
    pub new_stories: Vec<Story>,

    /// When this cycle's stories were collected
    pub collection_time: Option<DateTime<Local>>,

    /// This cycle's analysis, until it is saved
    pub analysis: Option<Analysis>,
}

impl AgentContext {
    pub fn new() -> Self {
        Self {
            started_at: Local::now(),
            cycles_completed: 0,
            seen_titles: HashSet::new(),
            new_stories: Vec::new(),
            collection_time: None,
            analysis: None,
        }
    }

    /// Drops the per-cycle data, keeping the seen titles.
    pub fn clear_cycle(&mut self) {
        self.new_stories.clear();
        self.analysis = None;
    }

    /// Time since the agent started.
    pub fn uptime(&self) -> chrono::Duration {
        Local::now() - self.started_at
    }
}

impl Default for AgentContext {
    fn default() -> Self {
        Self::new()
    }
}
