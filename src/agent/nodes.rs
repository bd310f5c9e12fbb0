//! Agent Units
//!
//! The steps of one monitoring cycle:
//!
//! - [`CollectStories`]: fetch stories and drop those already seen
//! - [`AnalyzeStories`]: classify the new stories with the language model
//! - [`SaveInsights`]: append the analysis to the insights log
//! - [`WaitCycle`]: pause before the next cycle
//!
//! The daily report step lives in [`super::report`].

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use log::{debug, info, warn};

use crate::execution::{Action, Params, Unit, UnitError, UnitResult};
use crate::services::{AppendLog, LanguageModel, SeenStore, Sleeper, Story, StorySource};

use super::analysis::{parse_analysis, truncate_chars, Analysis, FALLBACK_REPLY};
use super::context::AgentContext;

/// Action taken when a cycle found new stories.
pub const ANALYZE: &str = "analyze";

/// Action taken when there is nothing new to analyze.
pub const WAIT: &str = "wait";

/// Stories included in the analysis prompt.
const SUMMARY_STORIES: usize = 3;

/// Parameter overriding the wait interval, in seconds.
pub const WAIT_SECONDS_PARAM: &str = "wait_seconds";

/// Fetches stories and keeps the ones not seen before.
///
/// Produces [`ANALYZE`] when at least one story is new, [`WAIT`] otherwise.
/// A failed fetch counts as "no stories this cycle" and also produces
/// [`WAIT`].
pub struct CollectStories {
    source: Arc<dyn StorySource>,
    seen: Arc<dyn SeenStore>,
}

impl CollectStories {
    pub fn new(source: Arc<dyn StorySource>, seen: Arc<dyn SeenStore>) -> Self {
        Self { source, seen }
    }
}

impl Unit<AgentContext> for CollectStories {
    type Prep = ();
    type Output = Vec<Story>;

    fn prep(&self, ctx: &mut AgentContext, _params: &Params) -> UnitResult<()> {
        info!("[{}] Starting data collection...", Local::now().format("%Y-%m-%d %H:%M:%S"));

        match self.seen.load() {
            Ok(titles) => {
                ctx.seen_titles.extend(titles);
                debug!("{} previously seen stories", ctx.seen_titles.len());
            }
            Err(e) => warn!("Could not load seen stories: {}", e),
        }
        Ok(())
    }

    fn compute(&self, _prep: &()) -> UnitResult<Vec<Story>> {
        self.source.fetch_stories()
    }

    fn fallback(&self, _prep: &(), error: UnitError, attempt: u32) -> UnitResult<Vec<Story>> {
        warn!(
            "Data collection failed after {} attempt(s), no stories this cycle: {}",
            attempt + 1,
            error
        );
        Ok(Vec::new())
    }

    fn post(&self, ctx: &mut AgentContext, _prep: (), stories: Vec<Story>) -> UnitResult<Action> {
        let fetched = stories.len();
        let mut new_stories = Vec::new();

        for story in stories {
            let title = story.title.trim().to_string();
            if title.is_empty() || ctx.seen_titles.contains(&title) {
                debug!("Skipping seen story: {}", truncate_chars(&title, 50));
                continue;
            }

            if let Err(e) = self.seen.record(&title) {
                warn!("Could not save seen story '{}': {}", title, e);
            }
            info!("New story: {}", truncate_chars(&title, 50));
            ctx.seen_titles.insert(title);
            new_stories.push(story);
        }

        ctx.collection_time = Some(Local::now());

        if new_stories.is_empty() {
            if fetched == 0 {
                info!("No stories available this cycle");
            } else {
                info!("No new stories (all {} were duplicates)", fetched);
            }
            ctx.new_stories.clear();
            return Ok(Action::from(WAIT));
        }

        info!(
            "Found {} new stories (filtered {} duplicates)",
            new_stories.len(),
            fetched - new_stories.len()
        );
        ctx.new_stories = new_stories;
        Ok(Action::from(ANALYZE))
    }
}

/// Classifies the cycle's new stories with the language model.
pub struct AnalyzeStories {
    model: Arc<dyn LanguageModel>,
    max_tokens: u32,
}

impl AnalyzeStories {
    pub fn new(model: Arc<dyn LanguageModel>, max_tokens: u32) -> Self {
        Self { model, max_tokens }
    }
}

/// Prompt asking for a single `Theme|Sentiment|Insight` line.
fn analysis_prompt(headlines: &str) -> String {
    format!(
        "Analyze these tech/AI news headlines. Provide ONLY:\n\
         Theme (max 2 words)|Sentiment (positive/negative/neutral)|Brief insight (max 40 words)\n\n\
         Headlines:\n{}\n\n\
         Return format: Theme|Sentiment|Insight",
        headlines
    )
}

impl Unit<AgentContext> for AnalyzeStories {
    /// Headline summary, `None` when there is nothing to analyze
    type Prep = Option<String>;
    type Output = String;

    fn prep(&self, ctx: &mut AgentContext, _params: &Params) -> UnitResult<Option<String>> {
        if ctx.new_stories.is_empty() {
            return Ok(None);
        }

        let summary = ctx
            .new_stories
            .iter()
            .take(SUMMARY_STORIES)
            .map(|story| format!("- {} (Score: {})", story.title, story.score))
            .collect::<Vec<_>>()
            .join("\n");

        info!("Analyzing {} stories...", ctx.new_stories.len());
        Ok(Some(summary))
    }

    fn compute(&self, summary: &Option<String>) -> UnitResult<String> {
        match summary {
            Some(headlines) => self.model.complete(&analysis_prompt(headlines), self.max_tokens),
            None => Ok("No stories to analyze".to_string()),
        }
    }

    fn fallback(&self, _prep: &Option<String>, error: UnitError, attempt: u32) -> UnitResult<String> {
        warn!("Analysis fallback after attempt {}: {}", attempt + 1, error);
        Ok(FALLBACK_REPLY.to_string())
    }

    fn post(&self, ctx: &mut AgentContext, _prep: Option<String>, reply: String) -> UnitResult<Action> {
        debug!("LLM response: {}", reply);

        let timestamp = ctx.collection_time.unwrap_or_else(Local::now).to_rfc3339();
        let analysis = Analysis::new(timestamp, parse_analysis(&reply), ctx.new_stories.len());

        info!(
            "Analysis complete: {} ({}) - {}",
            analysis.theme, analysis.sentiment, analysis.insight
        );
        ctx.analysis = Some(analysis);
        Ok(Action::Default)
    }
}

/// Appends the cycle's analysis to the insights log.
pub struct SaveInsights {
    log: Arc<dyn AppendLog>,
}

impl SaveInsights {
    pub fn new(log: Arc<dyn AppendLog>) -> Self {
        Self { log }
    }
}

impl Unit<AgentContext> for SaveInsights {
    type Prep = Option<Analysis>;
    type Output = String;

    fn prep(&self, ctx: &mut AgentContext, _params: &Params) -> UnitResult<Option<Analysis>> {
        Ok(ctx.analysis.clone())
    }

    fn compute(&self, analysis: &Option<Analysis>) -> UnitResult<String> {
        let Some(analysis) = analysis else {
            return Ok("No valid data to save".to_string());
        };

        self.log.append(&analysis.to_record())?;
        Ok("Data saved successfully".to_string())
    }

    fn fallback(&self, _prep: &Option<Analysis>, error: UnitError, _attempt: u32) -> UnitResult<String> {
        warn!("Saving insights failed: {}", error);
        Ok("Save failed - continuing anyway".to_string())
    }

    fn post(&self, ctx: &mut AgentContext, _prep: Option<Analysis>, status: String) -> UnitResult<Action> {
        info!("{}", status);
        ctx.clear_cycle();
        Ok(Action::Default)
    }
}

/// Pauses before the next cycle.
///
/// The interval can be overridden per run with the `wait_seconds`
/// parameter. A value that is not a usable number of seconds fails the
/// prep phase.
pub struct WaitCycle {
    sleeper: Arc<dyn Sleeper>,
    interval: Duration,
}

impl WaitCycle {
    pub fn new(sleeper: Arc<dyn Sleeper>, interval: Duration) -> Self {
        Self { sleeper, interval }
    }
}

impl Unit<AgentContext> for WaitCycle {
    type Prep = Duration;
    type Output = ();

    fn prep(&self, _ctx: &mut AgentContext, params: &Params) -> UnitResult<Duration> {
        let Some(value) = params.get(WAIT_SECONDS_PARAM) else {
            return Ok(self.interval);
        };

        let secs = value.as_f64().ok_or_else(|| {
            UnitError::failed(format!("'{}' must be a number of seconds, got {}", WAIT_SECONDS_PARAM, value))
        })?;
        Duration::try_from_secs_f64(secs)
            .map_err(|e| UnitError::failed(format!("invalid '{}' value {}: {}", WAIT_SECONDS_PARAM, secs, e)))
    }

    fn compute(&self, interval: &Duration) -> UnitResult<()> {
        info!("Waiting {:.0?} before next cycle...", interval);
        self.sleeper.sleep(*interval);
        Ok(())
    }

    fn post(&self, _ctx: &mut AgentContext, _prep: Duration, _output: ()) -> UnitResult<Action> {
        info!("[{}] Wait complete", Local::now().format("%Y-%m-%d %H:%M:%S"));
        Ok(Action::Default)
    }
}
