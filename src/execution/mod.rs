//! Flow Execution Module
//!
//! Provides the orchestration engine: units with a three-phase lifecycle,
//! labeled transitions between them, bounded retry, and the flow that walks
//! the resulting graph.
//!
//! # Architecture
//!
//! - [`action`]: Transition labels
//! - [`unit`]: The unit lifecycle (`prep`, `compute`, `post`)
//! - [`retry`]: Bounded retry with delay and fallback
//! - [`graph`]: Node arena and transition tables
//! - [`flow`]: The orchestration loop
//! - [`error`]: Unit and flow failures

pub mod action;
pub mod error;
pub mod flow;
pub mod graph;
pub mod retry;
pub mod unit;

#[cfg(test)]
pub(crate) mod testing;

pub use action::Action;
pub use error::{FlowError, Phase, UnitError};
pub use flow::Flow;
pub use graph::{Graph, NodeId, Transition};
pub use retry::RetryPolicy;
pub use unit::{Params, Runnable, Unit, UnitResult};
