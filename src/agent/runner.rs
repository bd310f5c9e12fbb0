//! Agent Runner
//!
//! Drives the agent flow in an endless cycle. One [`AgentContext`] lives
//! for the whole process so the seen-title set carries over between
//! cycles. A failed cycle is logged and followed by a pause; it never stops
//! the loop.

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, error, info};

use crate::execution::{Action, Flow, FlowError};
use crate::services::Sleeper;

use super::context::AgentContext;

pub struct AgentRunner {
    flow: Flow<AgentContext>,
    ctx: AgentContext,
    sleeper: Arc<dyn Sleeper>,
    error_pause: Duration,
}

impl AgentRunner {
    pub fn new(flow: Flow<AgentContext>, sleeper: Arc<dyn Sleeper>, error_pause: Duration) -> Self {
        Self {
            flow,
            ctx: AgentContext::new(),
            sleeper,
            error_pause,
        }
    }

    pub fn context(&self) -> &AgentContext {
        &self.ctx
    }

    /// Runs the flow once.
    pub fn run_cycle(&mut self) -> Result<Action, FlowError> {
        let cycle = self.ctx.cycles_completed + 1;
        info!("\n=== Cycle {} ===", cycle);

        let started = Instant::now();
        let (result, timeline) = self.flow.run_traced(&mut self.ctx);
        debug!("Cycle path: {}", timeline.path().join(" -> "));
        debug!("{}", timeline.gantt_chart());

        let action = result?;
        self.ctx.cycles_completed += 1;
        info!(
            "Cycle {} finished in {:.1}s",
            cycle,
            started.elapsed().as_secs_f64()
        );
        Ok(action)
    }

    /// Runs cycles until `max_cycles` have been attempted, or forever.
    ///
    /// Failed cycles count as attempted.
    pub fn run(&mut self, max_cycles: Option<u64>) {
        let mut attempted = 0u64;

        while max_cycles.map_or(true, |max| attempted < max) {
            attempted += 1;

            if let Err(e) = self.run_cycle() {
                error!("Agent cycle failed: {}", e);
                info!("Pausing {}s before the next cycle", self.error_pause.as_secs());
                self.sleeper.sleep(self.error_pause);
            }
        }

        let uptime = self.ctx.uptime();
        info!(
            "Agent stopped after {} cycle(s) ({} completed, uptime {}m)",
            attempted,
            self.ctx.cycles_completed,
            uptime.num_minutes()
        );
    }
}
