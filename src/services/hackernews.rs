//! Hacker News Story Source
//!
//! Scans the current top stories and keeps those whose title mentions one
//! of the configured keywords. Individual items that fail to load are
//! skipped; only a failure to load the top-story list is an error.

use std::time::Duration;

use log::{debug, info, warn};
use reqwest::blocking::Client;
use serde::Deserialize;

use crate::execution::UnitResult;

use super::{Story, StorySource};

/// Public Hacker News API root.
pub const HACKER_NEWS_API: &str = "https://hacker-news.firebaseio.com/v0";

/// Timeout for the top-story list.
const LIST_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for a single item.
const ITEM_TIMEOUT: Duration = Duration::from_secs(5);

/// Item as returned by `item/{id}.json`.
#[derive(Deserialize, Debug, Default)]
struct Item {
    title: Option<String>,
    url: Option<String>,
    score: Option<i64>,
    time: Option<i64>,
}

/// [`StorySource`] backed by the Hacker News API.
pub struct HackerNewsSource {
    http: Client,
    base_url: String,
    scan_limit: usize,
    max_stories: usize,
    keywords: Vec<String>,
}

impl HackerNewsSource {
    /// Creates a source that scans `scan_limit` top stories and keeps at
    /// most `max_stories` relevant ones.
    pub fn new(scan_limit: usize, max_stories: usize, keywords: Vec<String>) -> UnitResult<Self> {
        Ok(Self {
            http: Client::builder().build()?,
            base_url: HACKER_NEWS_API.to_string(),
            scan_limit,
            max_stories,
            keywords: keywords.into_iter().map(|k| k.to_lowercase()).collect(),
        })
    }

    /// Points the source at another API root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn fetch_item(&self, id: u64) -> UnitResult<Option<Item>> {
        let url = format!("{}/item/{}.json", self.base_url, id);
        let item = self
            .http
            .get(url)
            .timeout(ITEM_TIMEOUT)
            .send()?
            .error_for_status()?
            .json::<Option<Item>>()?;
        Ok(item)
    }
}

impl StorySource for HackerNewsSource {
    fn fetch_stories(&self) -> UnitResult<Vec<Story>> {
        info!("Fetching Hacker News top stories...");

        let url = format!("{}/topstories.json", self.base_url);
        let ids: Vec<u64> = self
            .http
            .get(url)
            .timeout(LIST_TIMEOUT)
            .send()?
            .error_for_status()?
            .json()?;

        let ids: Vec<u64> = ids.into_iter().take(self.scan_limit).collect();
        debug!("Retrieved {} story ids, filtering for relevant titles", ids.len());

        let mut stories = Vec::new();
        for id in ids {
            let item = match self.fetch_item(id) {
                Ok(Some(item)) => item,
                Ok(None) => continue,
                Err(e) => {
                    warn!("Error fetching story {}: {}", id, e);
                    continue;
                }
            };

            if let Some(story) = relevant_story(id, item, &self.keywords) {
                debug!("Found relevant story: {}", story.title);
                stories.push(story);
                if stories.len() >= self.max_stories {
                    break;
                }
            }
        }

        info!("Collected {} relevant stories", stories.len());
        Ok(stories)
    }
}

/// Converts an item into a story when its title matches a keyword.
fn relevant_story(id: u64, item: Item, keywords: &[String]) -> Option<Story> {
    let title = item.title.filter(|t| !t.trim().is_empty())?;
    if !is_relevant(&title, keywords) {
        return None;
    }

    Some(Story {
        title,
        url: item.url.unwrap_or_default(),
        score: item.score.unwrap_or(0),
        time: item.time.unwrap_or(0),
        id,
    })
}

/// Case-insensitive substring match against lowercase keywords.
fn is_relevant(title: &str, keywords: &[String]) -> bool {
    let title = title.to_lowercase();
    keywords.iter().any(|k| title.contains(k.as_str()))
}
