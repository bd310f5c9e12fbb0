//! News Monitoring Agent
//!
//! An autonomous agent built on the execution engine. Every cycle it:
//!
//! 1. Collects recent Hacker News stories and drops the ones already seen
//! 2. Classifies the new stories with a language model
//! 3. Appends the classification to `agent_insights.csv`
//! 4. Waits for the poll interval
//! 5. Writes a daily summary to `daily_reports.csv` when one is due
//!
//! When nothing new was found the cycle goes straight to the wait step.
//!
//! # Components
//!
//! - [`config`]: YAML settings and data file locations
//! - [`context`]: State shared by the units of the flow
//! - [`nodes`]: Collection, analysis, saving and waiting units
//! - [`report`]: The daily report unit
//! - [`analysis`]: Parsing of model replies
//! - [`runner`]: The endless cycle around the flow

pub mod analysis;
pub mod config;
pub mod context;
pub mod error;
pub mod nodes;
pub mod report;
pub mod runner;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use log::info;

use crate::execution::{Flow, Graph};
use crate::services::{
    AppendLog, CsvLog, CsvSeenStore, HackerNewsSource, LanguageModel, OpenAiClient, SeenStore, Sleeper,
    StorySource, ThreadSleeper,
};

pub use analysis::{parse_analysis, Analysis, Classification, Sentiment};
pub use config::{api_key_from_env, AgentConfig};
pub use context::AgentContext;
pub use error::AgentError;
pub use nodes::{AnalyzeStories, CollectStories, SaveInsights, WaitCycle, ANALYZE, WAIT};
pub use report::{DailyReport, ReportMarker, ReportOutcome};
pub use runner::AgentRunner;

/// Collaborators the agent's units call into.
#[derive(Clone)]
pub struct AgentServices {
    pub source: Arc<dyn StorySource>,
    pub model: Arc<dyn LanguageModel>,
    pub insights: Arc<dyn AppendLog>,
    pub reports: Arc<dyn AppendLog>,
    pub seen: Arc<dyn SeenStore>,
    pub sleeper: Arc<dyn Sleeper>,
}

impl AgentServices {
    /// Live services: Hacker News, OpenAI and CSV files under `data_dir`.
    pub fn production(config: &AgentConfig, api_key: &str) -> Result<Self, AgentError> {
        let source = HackerNewsSource::new(config.story_scan_limit, config.max_stories, config.keywords.clone())?;

        let mut model = OpenAiClient::new(api_key, config.model.as_str())?;
        if let Some(url) = &config.api_url {
            model = model.with_url(url.as_str());
        }

        Ok(Self {
            source: Arc::new(source),
            model: Arc::new(model),
            insights: Arc::new(CsvLog::new(config.insights_path())),
            reports: Arc::new(CsvLog::new(config.reports_path())),
            seen: Arc::new(CsvSeenStore::new(config.seen_path())),
            sleeper: Arc::new(ThreadSleeper),
        })
    }
}

/// Wires the agent flow.
///
/// ```text
/// collect --analyze--> analyze --> save --> wait --> report
///    \------wait---------------------------/
/// ```
pub fn build_flow(services: &AgentServices, config: &AgentConfig) -> Flow<AgentContext> {
    let mut graph = Graph::new();

    let collect = graph.add_with_retry(
        CollectStories::new(services.source.clone(), services.seen.clone()),
        config.collect_retry,
    );
    let analyze = graph.add_with_retry(
        AnalyzeStories::new(services.model.clone(), config.analysis_max_tokens),
        config.analyze_retry,
    );
    let save = graph.add(SaveInsights::new(services.insights.clone()));
    let wait = graph.add(WaitCycle::new(services.sleeper.clone(), config.poll_interval()));
    let report = graph.add(DailyReport::new(
        services.model.clone(),
        services.insights.clone(),
        services.reports.clone(),
        ReportMarker::new(config.last_report_path()),
        config.report_interval(),
        config.report_max_tokens,
    ));

    graph.from(collect).on(ANALYZE) >> analyze;
    graph.from(collect).on(WAIT) >> wait;
    graph.from(analyze).to(save);
    graph.from(save).to(wait);
    graph.from(wait).to(report);

    info!("Agent flow ready ({} units)", graph.len());
    Flow::new(graph, collect).named("news-agent")
}
