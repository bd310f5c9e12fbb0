//! Story Analysis Parsing
//!
//! The language model is asked for a single `Theme|Sentiment|Insight` line.
//! Replies are not trusted to follow that format: anything unparseable,
//! including error text, degrades to a neutral classification.

use std::fmt;
use std::str::FromStr;

use crate::services::Record;

/// Reply substituted when every analysis attempt failed.
pub const FALLBACK_REPLY: &str = "Error|Neutral|Analysis failed due to API error";

/// Theme used when the reply has no recognizable structure.
pub const MIXED_THEME: &str = "Mixed Topics";

const NO_INSIGHT: &str = "No insight available";

/// Overall tone of a batch of stories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Sentiment {
    Positive,
    Negative,
    #[default]
    Neutral,
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Positive => write!(f, "positive"),
            Self::Negative => write!(f, "negative"),
            Self::Neutral => write!(f, "neutral"),
        }
    }
}

impl FromStr for Sentiment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "positive" => Ok(Self::Positive),
            "negative" => Ok(Self::Negative),
            "neutral" => Ok(Self::Neutral),
            other => Err(format!("unknown sentiment '{}'", other)),
        }
    }
}

/// Classification extracted from a model reply.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub theme: String,
    pub sentiment: Sentiment,
    pub insight: String,
}

/// Analysis of one collection cycle, as stored in the insights log.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    /// Collection time (RFC 3339)
    pub timestamp: String,
    pub theme: String,
    pub sentiment: Sentiment,
    pub insight: String,
    pub story_count: usize,
}

impl Analysis {
    pub fn new(timestamp: impl Into<String>, classification: Classification, story_count: usize) -> Self {
        Self {
            timestamp: timestamp.into(),
            theme: classification.theme,
            sentiment: classification.sentiment,
            insight: classification.insight,
            story_count,
        }
    }

    /// Row for the insights CSV log.
    pub fn to_record(&self) -> Record {
        vec![
            ("timestamp".to_string(), self.timestamp.clone()),
            ("theme".to_string(), self.theme.clone()),
            ("sentiment".to_string(), self.sentiment.to_string()),
            ("insight".to_string(), self.insight.clone()),
            ("story_count".to_string(), self.story_count.to_string()),
        ]
    }
}

/// Parses a `Theme|Sentiment|Insight` reply. Never fails.
pub fn parse_analysis(reply: &str) -> Classification {
    let line = reply.lines().next().unwrap_or("").trim();
    let parts: Vec<&str> = line.split('|').collect();

    if parts.len() < 3 {
        let insight = if line.is_empty() {
            NO_INSIGHT.to_string()
        } else {
            truncate_chars(line, 40)
        };
        return Classification {
            theme: MIXED_THEME.to_string(),
            sentiment: Sentiment::Neutral,
            insight,
        };
    }

    // Models sometimes number the fields
    let theme = ["1.", "2.", "3."]
        .iter()
        .fold(parts[0].trim().to_string(), |theme, marker| theme.replace(marker, ""))
        .trim()
        .to_string();

    Classification {
        theme,
        sentiment: parts[1].parse().unwrap_or_default(),
        insight: parts[2].trim().to_string(),
    }
}

/// First `max` characters of `s`.
pub(crate) fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
