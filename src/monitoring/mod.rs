//! Run Monitoring Module
//!
//! Provides utilities for tracking the execution of flow runs.
//!
//! # Components
//!
//! - [`ExecutionTimeline`]: Unit start/end timing and the traversal path

pub mod timeline;

pub use timeline::{EventType, ExecutionTimeline, TimelineEvent};
