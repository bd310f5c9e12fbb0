//! Execution Errors
//!
//! Failure types raised by units and by the orchestration loop.
//!
//! A [`UnitError`] is what a single phase of a unit returns. When it is
//! raised by `compute` it is transient: the retry wrapper may try again and
//! the unit's fallback may absorb it. Anything that is not absorbed is
//! wrapped into a [`FlowError`] and aborts the current run.

use std::fmt;

use thiserror::Error;

use super::graph::NodeId;

/// Lifecycle phase of a unit, used to locate a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Prep,
    Compute,
    Post,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Prep => write!(f, "prep"),
            Self::Compute => write!(f, "compute"),
            Self::Post => write!(f, "post"),
        }
    }
}

/// Failure raised by one phase of a unit.
#[derive(Debug, Error)]
pub enum UnitError {
    #[error("{0}")]
    Failed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(String),
}

impl UnitError {
    /// Creates a failure from a plain message.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

impl From<reqwest::Error> for UnitError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e.to_string())
    }
}

/// Failure that escapes the orchestration loop.
#[derive(Debug, Error)]
pub enum FlowError {
    /// A unit phase failed and nothing absorbed the failure.
    #[error("unit '{unit}' failed during {phase}: {source}")]
    Unit {
        unit: String,
        phase: Phase,
        #[source]
        source: UnitError,
    },

    #[error("node {0} does not belong to this graph")]
    UnknownNode(NodeId),

    #[error("flow has no start node")]
    NoStartNode,
}

impl FlowError {
    pub(crate) fn unit(unit: &str, phase: Phase, source: UnitError) -> Self {
        Self::Unit {
            unit: unit.to_string(),
            phase,
            source,
        }
    }

    /// Phase in which the failure happened, if it came from a unit.
    pub fn phase(&self) -> Option<Phase> {
        match self {
            Self::Unit { phase, .. } => Some(*phase),
            _ => None,
        }
    }
}
