//! Agent Errors

use thiserror::Error;

use crate::execution::UnitError;

/// Failures while setting up the agent.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Failed to read config file '{path}': {source}")]
    ConfigRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Failed to create data directory '{path}': {source}")]
    DataDir {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("{0} environment variable not set")]
    MissingApiKey(&'static str),

    #[error("Failed to initialize service: {0}")]
    Service(#[from] UnitError),
}
