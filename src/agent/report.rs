//! Daily Report
//!
//! Last unit of every cycle. Once per report interval it summarizes the
//! most recent insights with the language model and appends the summary to
//! the reports log. The time of the last report is kept in a marker file so
//! the interval survives restarts.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use log::{debug, info, warn};

use crate::execution::{Action, Params, Unit, UnitError, UnitResult};
use crate::services::{AppendLog, LanguageModel, Record};

use super::analysis::truncate_chars;
use super::context::AgentContext;

/// Insights summarized per report.
const RECENT_INSIGHTS: usize = 10;

/// Characters of the summary kept in the reports log.
const STORED_SUMMARY_CHARS: usize = 200;

/// File holding the time of the last report.
#[derive(Debug, Clone)]
pub struct ReportMarker {
    path: PathBuf,
}

impl ReportMarker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Time of the last report, if the marker exists and parses.
    pub fn last_report(&self) -> Option<DateTime<Local>> {
        let content = fs::read_to_string(&self.path).ok()?;
        parse_timestamp(content.trim())
    }

    /// Whether more than `interval` has passed since the last report.
    ///
    /// A missing or unreadable marker means a report is due.
    pub fn is_due(&self, now: DateTime<Local>, interval: chrono::Duration) -> bool {
        match self.last_report() {
            Some(last) => now - last > interval,
            None => true,
        }
    }

    /// Records `now` as the time of the last report.
    pub fn touch(&self, now: DateTime<Local>) -> UnitResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, now.to_rfc3339())?;
        Ok(())
    }
}

/// Accepts RFC 3339 and offset-less ISO 8601 local times.
fn parse_timestamp(s: &str) -> Option<DateTime<Local>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Local));
    }
    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
    Local.from_local_datetime(&naive).earliest()
}

/// What a report check ended with.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportOutcome {
    /// The interval has not elapsed yet
    NotDue,

    /// No insights have been logged
    NoData,

    /// Insights exist but none carries a theme
    NoThemes,

    /// A report was written, with this summary
    Generated(String),

    /// Generating the report failed
    Failed(String),
}

impl fmt::Display for ReportOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotDue => write!(f, "No report needed"),
            Self::NoData => write!(f, "No data for report"),
            Self::NoThemes => write!(f, "No valid themes found for report"),
            Self::Generated(summary) => {
                write!(f, "Daily report generated: {}...", truncate_chars(summary, 100))
            }
            Self::Failed(reason) => write!(f, "Report error: {}", reason),
        }
    }
}

/// Writes a summary of recent insights once per interval.
pub struct DailyReport {
    model: Arc<dyn LanguageModel>,
    insights: Arc<dyn AppendLog>,
    reports: Arc<dyn AppendLog>,
    marker: ReportMarker,
    interval: chrono::Duration,
    max_tokens: u32,
}

impl DailyReport {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        insights: Arc<dyn AppendLog>,
        reports: Arc<dyn AppendLog>,
        marker: ReportMarker,
        interval: chrono::Duration,
        max_tokens: u32,
    ) -> Self {
        Self {
            model,
            insights,
            reports,
            marker,
            interval,
            max_tokens,
        }
    }

    fn generate(&self) -> UnitResult<ReportOutcome> {
        let records = self.insights.read_records()?;
        if records.is_empty() {
            return Ok(ReportOutcome::NoData);
        }

        let recent = &records[records.len().saturating_sub(RECENT_INSIGHTS)..];
        let themes: Vec<&str> = recent.iter().filter_map(|r| r.get("theme")).map(String::as_str).collect();
        let sentiments: Vec<&str> = recent
            .iter()
            .filter_map(|r| r.get("sentiment"))
            .map(String::as_str)
            .collect();

        if themes.is_empty() || sentiments.is_empty() {
            return Ok(ReportOutcome::NoThemes);
        }

        debug!("Summarizing {} insights", recent.len());
        let summary = self.model.complete(&report_prompt(&themes, &sentiments), self.max_tokens)?;

        let now = Local::now();
        let record: Record = vec![
            ("date".to_string(), now.date_naive().to_string()),
            ("insights_analyzed".to_string(), recent.len().to_string()),
            ("summary".to_string(), truncate_chars(&summary, STORED_SUMMARY_CHARS)),
        ];
        self.reports.append(&record)?;
        self.marker.touch(now)?;

        Ok(ReportOutcome::Generated(summary))
    }
}

fn report_prompt(themes: &[&str], sentiments: &[&str]) -> String {
    format!(
        "Create a brief daily summary based on these tech trends:\n\
         Themes: {}\n\
         Sentiments: {}\n\n\
         Provide: 1 key trend, overall sentiment, 1 prediction (max 80 words total)",
        themes.join(", "),
        sentiments.join(", ")
    )
}

impl Unit<AgentContext> for DailyReport {
    /// Whether a report is due
    type Prep = bool;
    type Output = ReportOutcome;

    fn prep(&self, _ctx: &mut AgentContext, _params: &Params) -> UnitResult<bool> {
        Ok(self.marker.is_due(Local::now(), self.interval))
    }

    fn compute(&self, due: &bool) -> UnitResult<ReportOutcome> {
        if !*due {
            return Ok(ReportOutcome::NotDue);
        }
        self.generate()
    }

    fn fallback(&self, _due: &bool, error: UnitError, _attempt: u32) -> UnitResult<ReportOutcome> {
        warn!("Daily report failed: {}", error);
        Ok(ReportOutcome::Failed(error.to_string()))
    }

    fn post(&self, ctx: &mut AgentContext, _due: bool, outcome: ReportOutcome) -> UnitResult<Action> {
        match &outcome {
            ReportOutcome::Generated(_) => info!("{}", outcome),
            _ => info!("Report check: {}", outcome),
        }
        info!("Cycle {} complete", ctx.cycles_completed + 1);
        Ok(Action::Default)
    }
}
