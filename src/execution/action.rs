//! Action Labels
//!
//! The label a unit returns from `post` to select its successor.

use std::fmt;

/// Name used for the default action in textual form.
pub const DEFAULT_ACTION: &str = "default";

/// Transition label produced by a unit.
///
/// `Action::Default` is selected when a unit has nothing specific to say.
/// The textual label `"default"` and an empty label both map to it, so
/// `Action::from("default") == Action::Default`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Action {
    #[default]
    Default,
    Named(String),
}

impl Action {
    /// Creates an action from a label.
    pub fn new(label: impl Into<String>) -> Self {
        let label = label.into();
        let trimmed = label.trim();
        if trimmed.is_empty() || trimmed == DEFAULT_ACTION {
            Self::Default
        } else {
            Self::Named(trimmed.to_string())
        }
    }

    /// Returns the textual label.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Default => DEFAULT_ACTION,
            Self::Named(label) => label,
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self, Self::Default)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Action {
    fn from(label: &str) -> Self {
        Self::new(label)
    }
}

impl From<String> for Action {
    fn from(label: String) -> Self {
        Self::new(label)
    }
}

impl From<Option<&str>> for Action {
    fn from(label: Option<&str>) -> Self {
        label.map(Self::new).unwrap_or_default()
    }
}
