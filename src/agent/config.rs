//! Agent Configuration
//!
//! Settings for the monitoring agent, loaded from an optional YAML file.
//! Every field has a default, so a missing file or a partial file is fine.
//!
//! # Example YAML Format
//!
//! ```yaml
//! data_dir: /var/lib/flowrunner
//! poll_interval_minutes: 15
//! report_interval_hours: 24
//! model: gpt-4o-mini
//! keywords: [ai, llm, rust]
//! analyze_retry:
//!   max_attempts: 3
//!   delay: 2.5
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::info;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::execution::RetryPolicy;
use crate::services::openai::DEFAULT_MODEL;
use crate::services::seen::SEEN_STORIES_FILE;

use super::error::AgentError;

/// Name of the config file looked up when none is given.
pub const CONFIG_FILE_NAME: &str = "flowrunner.yaml";

/// Environment variable holding the OpenAI API key.
pub const API_KEY_VAR: &str = "OPENAI_API_KEY";

pub const INSIGHTS_FILE: &str = "agent_insights.csv";
pub const REPORTS_FILE: &str = "daily_reports.csv";
pub const LAST_REPORT_FILE: &str = "last_report.txt";

/// Lazily-resolved default config path.
pub static CONFIG_PATH: Lazy<PathBuf> = Lazy::new(|| {
    // Priority 1: next to the executable
    if let Ok(exe_path) = env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            let prod_path = exe_dir.join(CONFIG_FILE_NAME);
            if prod_path.exists() {
                info!("Using config next to executable: {}", prod_path.display());
                return prod_path;
            }
        }
    }

    // Priority 2: current working directory
    PathBuf::from(CONFIG_FILE_NAME)
});

/// Title keywords that mark a story as relevant.
const DEFAULT_KEYWORDS: &[&str] = &[
    "ai",
    "llm",
    "gpt",
    "machine learning",
    "artificial intelligence",
    "tech",
    "startup",
    "programming",
    "software",
    "data",
    "algorithm",
];

/// Monitoring agent settings.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AgentConfig {
    /// Directory holding the CSV logs and the report marker
    pub data_dir: PathBuf,

    /// Pause at the end of every cycle
    pub poll_interval_minutes: u64,

    /// Pause after a failed cycle
    pub error_pause_seconds: u64,

    /// Minimum time between two daily reports
    pub report_interval_hours: u64,

    /// Chat model name
    pub model: String,

    /// OpenAI-compatible endpoint override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    pub analysis_max_tokens: u32,
    pub report_max_tokens: u32,

    /// Relevant stories kept per cycle
    pub max_stories: usize,

    /// Top stories inspected per cycle
    pub story_scan_limit: usize,

    pub keywords: Vec<String>,

    pub collect_retry: RetryPolicy,
    pub analyze_retry: RetryPolicy,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            poll_interval_minutes: 15,
            error_pause_seconds: 60,
            report_interval_hours: 24,
            model: DEFAULT_MODEL.to_string(),
            api_url: None,
            analysis_max_tokens: 150,
            report_max_tokens: 150,
            max_stories: 5,
            story_scan_limit: 15,
            keywords: DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            collect_retry: RetryPolicy::new(2, Duration::from_secs(5)),
            analyze_retry: RetryPolicy::new(2, Duration::from_secs(3)),
        }
    }
}

impl AgentConfig {
    /// Loads the config from `path`; a missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AgentError> {
        let path = path.as_ref();

        if !path.exists() {
            info!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|source| AgentError::ConfigRead {
            path: path.display().to_string(),
            source,
        })?;

        let config = Self::from_yaml(&content).map_err(|e| match e {
            AgentError::ConfigParse { source, .. } => AgentError::ConfigParse {
                path: path.display().to_string(),
                source,
            },
            other => other,
        })?;

        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Loads the config from the default location.
    pub fn load_default() -> Result<Self, AgentError> {
        Self::load(CONFIG_PATH.as_path())
    }

    /// Parses and validates YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, AgentError> {
        // An empty document means "all defaults"
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Self = serde_yaml::from_str(content).map_err(|source| AgentError::ConfigParse {
            path: "<inline>".to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AgentError> {
        if self.max_stories == 0 {
            return Err(AgentError::InvalidConfig("max_stories must be at least 1".to_string()));
        }
        if self.keywords.iter().all(|k| k.trim().is_empty()) {
            return Err(AgentError::InvalidConfig("keywords must not be empty".to_string()));
        }
        if self.model.trim().is_empty() {
            return Err(AgentError::InvalidConfig("model must not be empty".to_string()));
        }
        if self.poll_interval_minutes.checked_mul(60).is_none() {
            return Err(AgentError::InvalidConfig(format!(
                "poll_interval_minutes {} is out of range",
                self.poll_interval_minutes
            )));
        }
        if checked_hours(self.report_interval_hours).is_none() {
            return Err(AgentError::InvalidConfig(format!(
                "report_interval_hours {} is out of range",
                self.report_interval_hours
            )));
        }
        Ok(())
    }

    /// Creates the data directory if it does not exist yet.
    pub fn ensure_data_dir(&self) -> Result<(), AgentError> {
        fs::create_dir_all(&self.data_dir).map_err(|source| AgentError::DataDir {
            path: self.data_dir.display().to_string(),
            source,
        })
    }

    /// Saturates for values that `validate` rejects.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_minutes.saturating_mul(60))
    }

    pub fn error_pause(&self) -> Duration {
        Duration::from_secs(self.error_pause_seconds)
    }

    /// Saturates for values that `validate` rejects.
    pub fn report_interval(&self) -> chrono::Duration {
        checked_hours(self.report_interval_hours).unwrap_or(chrono::Duration::MAX)
    }

    pub fn insights_path(&self) -> PathBuf {
        self.data_dir.join(INSIGHTS_FILE)
    }

    pub fn reports_path(&self) -> PathBuf {
        self.data_dir.join(REPORTS_FILE)
    }

    pub fn seen_path(&self) -> PathBuf {
        self.data_dir.join(SEEN_STORIES_FILE)
    }

    pub fn last_report_path(&self) -> PathBuf {
        self.data_dir.join(LAST_REPORT_FILE)
    }
}

fn checked_hours(hours: u64) -> Option<chrono::Duration> {
    i64::try_from(hours).ok().and_then(chrono::Duration::try_hours)
}

/// Reads the API key from the environment.
pub fn api_key_from_env() -> Result<String, AgentError> {
    env::var(API_KEY_VAR)
        .ok()
        .filter(|key| !key.trim().is_empty())
        .ok_or(AgentError::MissingApiKey(API_KEY_VAR))
}
