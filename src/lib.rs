//! FlowRunner - Graph-Based Task Orchestration
//!
//! A small engine for running units of work connected by labeled
//! transitions, and an autonomous news-monitoring agent built on it.
//!
//! # Architecture
//!
//! The library is organized into four main modules:
//!
//! - [`execution`]: Units, retry policies, the transition graph and flows
//! - [`monitoring`]: Execution timeline of a traced flow run
//! - [`services`]: Story source, language model, CSV logs and other I/O
//! - [`agent`]: The monitoring agent's units, flow and run loop
//!
//! # Example
//!
//! ```rust,no_run
//! use flowrunner::agent::{api_key_from_env, build_flow, AgentConfig, AgentRunner, AgentServices};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Load settings (defaults when the file is missing)
//!     let config = AgentConfig::load("flowrunner.yaml")?;
//!
//!     // Wire the live services and the flow
//!     let services = AgentServices::production(&config, &api_key_from_env()?)?;
//!     let flow = build_flow(&services, &config);
//!
//!     // Run three cycles
//!     let mut runner = AgentRunner::new(flow, services.sleeper.clone(), config.error_pause());
//!     runner.run(Some(3));
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod execution;
pub mod monitoring;
pub mod services;

// Re-export commonly used types
pub use agent::{build_flow, AgentConfig, AgentContext, AgentRunner, AgentServices};
pub use execution::{Action, Flow, FlowError, Graph, NodeId, RetryPolicy, Unit, UnitError};
pub use monitoring::ExecutionTimeline;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "FlowRunner";
