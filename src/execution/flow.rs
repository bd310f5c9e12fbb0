//! Flow Orchestration
//!
//! A [`Flow`] walks a [`Graph`]: it runs the start node, looks up the
//! successor registered for the action that node produced, and repeats
//! until a node produces an action with no successor. That last action is
//! the flow's result, so an enclosing flow can branch on it.
//!
//! Every step runs against the same `&mut C` context. The flow never
//! clones or resets it, which lets callers carry state across repeated
//! runs of the same flow.
//!
//! Parameters for a run belong to the run itself: they are borrowed by
//! each step in turn and never written into the graph, so nodes reached
//! from several predecessors (or revisited in a cycle) cannot leak
//! parameters into each other.
//!
//! The graph is not checked for cycles or reachability. A cycle that never
//! produces an unmatched action runs forever.

use std::fmt;

use log::{debug, warn};

use crate::monitoring::{EventType, ExecutionTimeline};

use super::action::Action;
use super::error::{FlowError, Phase};
use super::graph::{Graph, NodeId};
use super::retry::RetryPolicy;
use super::unit::{Params, Runnable, UnitResult};

/// Hook run before the orchestration loop.
pub type PrepHook<C> = Box<dyn Fn(&mut C, &Params) -> UnitResult<()>>;

/// Hook run after the orchestration loop, mapping the final action.
pub type PostHook<C> = Box<dyn Fn(&mut C, Action) -> UnitResult<Action>>;

/// Executes a graph of units from a start node until no successor remains.
///
/// # Example
///
/// ```rust,ignore
/// let mut graph = Graph::new();
/// let a = graph.add(First);
/// let b = graph.add(Second);
/// graph.from(a).on("go") >> b;
///
/// let flow = Flow::new(graph, a);
/// let mut ctx = Vec::new();
/// let last = flow.run(&mut ctx)?;
/// ```
pub struct Flow<C> {
    graph: Graph<C>,
    start: Option<NodeId>,
    params: Params,
    name: String,
    prep: Option<PrepHook<C>>,
    post: Option<PostHook<C>>,
}

impl<C> Flow<C> {
    /// Creates a flow over `graph` starting at `start`.
    pub fn new(graph: Graph<C>, start: NodeId) -> Self {
        let mut flow = Self::from_graph(graph);
        flow.start = Some(start);
        flow
    }

    /// Creates a flow with no start node yet.
    pub fn from_graph(graph: Graph<C>) -> Self {
        Self {
            graph,
            start: None,
            params: Params::new(),
            name: "Flow".to_string(),
            prep: None,
            post: None,
        }
    }

    /// Sets the name used in logs and when nested in another flow.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Replaces the hook run before the first step.
    ///
    /// The hook sees the context and the parameters of the run. A failure
    /// aborts the run before any unit executes.
    pub fn with_prep<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut C, &Params) -> UnitResult<()> + 'static,
    {
        self.prep = Some(Box::new(hook));
        self
    }

    /// Replaces the hook that maps the final action.
    ///
    /// Without a hook the final action is passed through unchanged.
    pub fn with_post<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut C, Action) -> UnitResult<Action> + 'static,
    {
        self.post = Some(Box::new(hook));
        self
    }

    /// Changes the start node; returns it for chaining.
    pub fn set_start(&mut self, start: NodeId) -> NodeId {
        self.start = Some(start);
        start
    }

    pub fn start(&self) -> Option<NodeId> {
        self.start
    }

    pub fn graph(&self) -> &Graph<C> {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut Graph<C> {
        &mut self.graph
    }

    /// Replaces the flow's default parameters.
    pub fn set_params(&mut self, params: Params) {
        self.params = params;
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Runs the flow with its own parameters.
    pub fn run(&self, ctx: &mut C) -> Result<Action, FlowError> {
        self.execute(ctx, &self.params, None)
    }

    /// Runs the flow with `params` instead of its own.
    pub fn run_with_params(&self, ctx: &mut C, params: &Params) -> Result<Action, FlowError> {
        self.execute(ctx, params, None)
    }

    /// Runs the flow and records every step in a timeline.
    ///
    /// The timeline is returned even when the run fails.
    pub fn run_traced(&self, ctx: &mut C) -> (Result<Action, FlowError>, ExecutionTimeline) {
        let mut timeline = ExecutionTimeline::new();
        let result = self.execute(ctx, &self.params, Some(&mut timeline));
        (result, timeline)
    }

    fn execute(
        &self,
        ctx: &mut C,
        params: &Params,
        timeline: Option<&mut ExecutionTimeline>,
    ) -> Result<Action, FlowError> {
        if let Some(hook) = &self.prep {
            hook(ctx, params).map_err(|e| FlowError::unit(&self.name, Phase::Prep, e))?;
        }

        let last = self.orchestrate(ctx, params, timeline)?;

        match &self.post {
            Some(hook) => hook(ctx, last).map_err(|e| FlowError::unit(&self.name, Phase::Post, e)),
            None => Ok(last),
        }
    }

    /// The orchestration loop.
    fn orchestrate(
        &self,
        ctx: &mut C,
        params: &Params,
        mut timeline: Option<&mut ExecutionTimeline>,
    ) -> Result<Action, FlowError> {
        let mut current = self.start.ok_or(FlowError::NoStartNode)?;
        let mut steps = 0usize;

        loop {
            let name = self.graph.name(current).ok_or(FlowError::UnknownNode(current))?;
            debug!("Flow '{}' step {}: running '{}'", self.name, steps, name);

            if let Some(timeline) = timeline.as_deref_mut() {
                timeline.add_event(steps, name, EventType::Started);
            }

            let action = match self.graph.step(current, ctx, params) {
                Ok(action) => action,
                Err(e) => {
                    if let Some(timeline) = timeline.as_deref_mut() {
                        timeline.add_event(steps, name, EventType::Failed);
                    }
                    return Err(e);
                }
            };

            if let Some(timeline) = timeline.as_deref_mut() {
                timeline.add_event(steps, name, EventType::Completed(action.clone()));
            }
            steps += 1;

            match self.graph.successor(current, &action) {
                Some(next) => current = next,
                None => {
                    self.report_dead_end(current, name, &action);
                    debug!(
                        "Flow '{}' finished after {} step(s) with action '{}'",
                        self.name, steps, action
                    );
                    return Ok(action);
                }
            }
        }
    }

    fn report_dead_end(&self, node: NodeId, name: &str, action: &Action) {
        let Some(successors) = self.graph.successors(node) else {
            return;
        };
        if successors.is_empty() {
            return;
        }

        let mut known: Vec<&str> = successors.keys().map(Action::as_str).collect();
        known.sort_unstable();
        warn!(
            "Flow '{}' ends: action '{}' of unit '{}' not found in {:?}",
            self.name, action, name, known
        );
    }
}

/// A flow nested in another graph runs with the enclosing step's
/// parameters. Retry policies do not apply to whole flows.
impl<C> Runnable<C> for Flow<C> {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, ctx: &mut C, params: &Params, _policy: &RetryPolicy) -> Result<Action, FlowError> {
        self.execute(ctx, params, None)
    }
}

impl<C> fmt::Debug for Flow<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Flow")
            .field("name", &self.name)
            .field("start", &self.start)
            .field("params", &self.params)
            .field("graph", &self.graph)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::testing::capture_warnings;
    use crate::execution::{Unit, UnitError};
    use serde_json::json;
    use std::cell::Cell;
    use std::time::Duration;

    /// Test context: the path taken plus a step budget for cyclic graphs.
    #[derive(Default)]
    struct Trail {
        path: Vec<String>,
        budget: Option<usize>,
    }

    /// Records its name (and the `tag` param) and returns a fixed action.
    struct Step {
        name: &'static str,
        action: &'static str,
    }

    impl Unit<Trail> for Step {
        type Prep = Option<String>;
        type Output = ();

        fn name(&self) -> &str {
            self.name
        }

        fn prep(&self, _ctx: &mut Trail, params: &Params) -> UnitResult<Option<String>> {
            Ok(params.get("tag").and_then(|v| v.as_str()).map(str::to_string))
        }

        fn compute(&self, _prep: &Option<String>) -> UnitResult<()> {
            Ok(())
        }

        fn post(&self, ctx: &mut Trail, tag: Option<String>, _output: ()) -> UnitResult<Action> {
            match tag {
                Some(tag) => ctx.path.push(format!("{}:{}", self.name, tag)),
                None => ctx.path.push(self.name.to_string()),
            }

            if let Some(budget) = ctx.budget.as_mut() {
                if *budget == 0 {
                    return Ok(Action::from("stop"));
                }
                *budget -= 1;
            }
            Ok(Action::from(self.action))
        }
    }

    /// Fails in the chosen phase.
    struct Failing {
        phase: Phase,
        compute_calls: Cell<u32>,
    }

    impl Unit<Trail> for Failing {
        type Prep = ();
        type Output = ();

        fn prep(&self, _ctx: &mut Trail, _params: &Params) -> UnitResult<()> {
            if self.phase == Phase::Prep {
                return Err(UnitError::failed("prep broke"));
            }
            Ok(())
        }

        fn compute(&self, _prep: &()) -> UnitResult<()> {
            self.compute_calls.set(self.compute_calls.get() + 1);
            if self.phase == Phase::Compute {
                return Err(UnitError::failed("compute broke"));
            }
            Ok(())
        }

        fn post(&self, ctx: &mut Trail, _prep: (), _output: ()) -> UnitResult<Action> {
            if self.phase == Phase::Post {
                return Err(UnitError::failed("post broke"));
            }
            ctx.path.push("failing".to_string());
            Ok(Action::Default)
        }
    }

    fn step(name: &'static str, action: &'static str) -> Step {
        Step { name, action }
    }

    fn failing(phase: Phase) -> Failing {
        Failing {
            phase,
            compute_calls: Cell::new(0),
        }
    }

    #[test]
    fn test_single_node_without_successor() {
        let mut graph = Graph::new();
        let a = graph.add(step("a", "done"));
        let flow = Flow::new(graph, a);

        let mut ctx = Trail::default();
        let action = flow.run(&mut ctx).unwrap();

        assert_eq!(action, Action::from("done"));
        assert_eq!(ctx.path, vec!["a"]);
    }

    #[test]
    fn test_labeled_branch_then_default_dead_end() {
        let mut graph = Graph::new();
        let a = graph.add(step("a", "go"));
        let b = graph.add(step("b", "default"));
        graph.from(a).on("go") >> b;

        let flow = Flow::new(graph, a);
        let mut ctx = Trail::default();
        let action = flow.run(&mut ctx).unwrap();

        assert_eq!(ctx.path, vec!["a", "b"]);
        assert_eq!(action, Action::Default);
    }

    #[test]
    fn test_unmatched_action_ends_flow() {
        let mut graph = Graph::new();
        let a = graph.add(step("a", "elsewhere"));
        let b = graph.add(step("b", "default"));
        graph.connect_on(a, "go", b);

        let flow = Flow::new(graph, a);
        let mut ctx = Trail::default();
        let (action, warnings) = capture_warnings(|| flow.run(&mut ctx).unwrap());

        assert_eq!(action, Action::from("elsewhere"));
        assert_eq!(ctx.path, vec!["a"]);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("action 'elsewhere' of unit 'a' not found"));
    }

    #[test]
    fn test_terminal_node_ends_without_warning() {
        let mut graph = Graph::new();
        let a = graph.add(step("a", "done"));
        let flow = Flow::new(graph, a);

        let (_, warnings) = capture_warnings(|| flow.run(&mut Trail::default()).unwrap());
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_cycle_runs_until_unmatched_action() {
        let mut graph = Graph::new();
        let a = graph.add(step("a", "default"));
        let b = graph.add(step("b", "default"));
        graph.from(a).to(b);
        graph.from(b).to(a);

        let flow = Flow::new(graph, a);
        let mut ctx = Trail {
            budget: Some(5),
            ..Trail::default()
        };

        let action = flow.run(&mut ctx).unwrap();

        assert_eq!(action, Action::from("stop"));
        assert_eq!(ctx.path, vec!["a", "b", "a", "b", "a", "b"]);
    }

    #[test]
    fn test_context_persists_across_runs() {
        let mut graph = Graph::new();
        let a = graph.add(step("a", "default"));
        let flow = Flow::new(graph, a);

        let mut ctx = Trail::default();
        flow.run(&mut ctx).unwrap();
        flow.run(&mut ctx).unwrap();

        assert_eq!(ctx.path, vec!["a", "a"]);
    }

    #[test]
    fn test_flow_params_reach_every_step() {
        let mut graph = Graph::new();
        let a = graph.add(step("a", "default"));
        let b = graph.add(step("b", "default"));
        graph.connect(a, b);

        let mut own = Params::new();
        own.insert("tag".to_string(), json!("x"));
        graph.set_params(b, own).unwrap();

        let mut flow = Flow::new(graph, a);
        let mut params = Params::new();
        params.insert("tag".to_string(), json!("flow"));
        flow.set_params(params);

        let mut ctx = Trail::default();
        flow.run(&mut ctx).unwrap();

        assert_eq!(ctx.path, vec!["a:flow", "b:flow"]);
        // node parameters are left untouched by the run
        assert_eq!(flow.graph().params(b).unwrap().get("tag"), Some(&json!("x")));
    }

    #[test]
    fn test_run_with_override_params() {
        let mut graph = Graph::new();
        let a = graph.add(step("a", "default"));
        let mut flow = Flow::new(graph, a);
        let mut own = Params::new();
        own.insert("tag".to_string(), json!("own"));
        flow.set_params(own);

        let mut params = Params::new();
        params.insert("tag".to_string(), json!("override"));

        let mut ctx = Trail::default();
        flow.run_with_params(&mut ctx, &params).unwrap();

        assert_eq!(ctx.path, vec!["a:override"]);
        assert_eq!(flow.params().get("tag"), Some(&json!("own")));
    }

    #[test]
    fn test_reassign_start() {
        let mut graph = Graph::new();
        let a = graph.add(step("a", "default"));
        let b = graph.add(step("b", "default"));

        let mut flow = Flow::new(graph, a);
        assert_eq!(flow.set_start(b), b);

        let mut ctx = Trail::default();
        flow.run(&mut ctx).unwrap();
        assert_eq!(ctx.path, vec!["b"]);
    }

    #[test]
    fn test_missing_start_node() {
        let flow: Flow<Trail> = Flow::from_graph(Graph::new());
        assert!(matches!(flow.run(&mut Trail::default()), Err(FlowError::NoStartNode)));

        let mut flow: Flow<Trail> = Flow::from_graph(Graph::new());
        flow.set_start(NodeId(0));
        assert!(matches!(flow.run(&mut Trail::default()), Err(FlowError::UnknownNode(_))));
    }

    #[test]
    fn test_failures_propagate_without_retry() {
        for phase in [Phase::Prep, Phase::Compute, Phase::Post] {
            let mut graph = Graph::new();
            let a = graph.add(step("a", "default"));
            let f = graph.add(failing(phase));
            let after = graph.add(step("after", "default"));
            graph.connect(a, f);
            graph.connect(f, after);

            let flow = Flow::new(graph, a);
            let mut ctx = Trail::default();
            let err = flow.run(&mut ctx).unwrap_err();

            assert_eq!(err.phase(), Some(phase));
            // the context keeps what completed before the failure
            assert_eq!(ctx.path, vec!["a"]);
        }
    }

    #[test]
    fn test_prep_failure_is_not_retried() {
        let mut graph = Graph::new();
        let f = graph.add_with_retry(failing(Phase::Prep), RetryPolicy::new(3, Duration::ZERO));
        let flow = Flow::new(graph, f);

        let err = flow.run(&mut Trail::default()).unwrap_err();
        assert_eq!(err.phase(), Some(Phase::Prep));
    }

    #[test]
    fn test_nested_flow_passes_final_action() {
        let mut inner_graph = Graph::new();
        let x = inner_graph.add(step("x", "default"));
        let y = inner_graph.add(step("y", "inner_done"));
        inner_graph.connect(x, y);
        let inner = Flow::new(inner_graph, x).named("inner");

        let mut outer_graph = Graph::new();
        let start = outer_graph.add(step("start", "default"));
        let nested = outer_graph.add_flow(inner);
        let finish = outer_graph.add(step("finish", "default"));
        outer_graph.connect(start, nested);
        outer_graph.connect_on(nested, "inner_done", finish);

        let outer = Flow::new(outer_graph, start);
        let mut ctx = Trail::default();
        let action = outer.run(&mut ctx).unwrap();

        assert_eq!(action, Action::Default);
        assert_eq!(ctx.path, vec!["start", "x", "y", "finish"]);
        assert_eq!(outer.graph().name(nested), Some("inner"));
    }

    #[test]
    fn test_nested_flow_uses_enclosing_params() {
        let mut inner_graph = Graph::new();
        let x = inner_graph.add(step("x", "default"));
        let inner = Flow::new(inner_graph, x);

        let mut outer_graph = Graph::new();
        let nested = outer_graph.add_flow(inner);
        let mut outer = Flow::new(outer_graph, nested);
        let mut params = Params::new();
        params.insert("tag".to_string(), json!("outer"));
        outer.set_params(params);

        let mut ctx = Trail::default();
        outer.run(&mut ctx).unwrap();
        assert_eq!(ctx.path, vec!["x:outer"]);
    }

    #[test]
    fn test_post_hook_maps_final_action() {
        let mut graph = Graph::new();
        let a = graph.add(step("a", "raw"));
        let flow = Flow::new(graph, a).with_post(|ctx: &mut Trail, action| {
            ctx.path.push(format!("post:{}", action));
            Ok(Action::from("mapped"))
        });

        let mut ctx = Trail::default();
        assert_eq!(flow.run(&mut ctx).unwrap(), Action::from("mapped"));
        assert_eq!(ctx.path, vec!["a", "post:raw"]);
    }

    #[test]
    fn test_prep_hook_runs_before_first_step() {
        let mut graph = Graph::new();
        let a = graph.add(step("a", "default"));
        let flow = Flow::new(graph, a).with_prep(|ctx: &mut Trail, params: &Params| {
            let tag = params.get("tag").and_then(|v| v.as_str()).unwrap_or("none");
            ctx.path.push(format!("prep:{}", tag));
            Ok(())
        });

        let mut params = Params::new();
        params.insert("tag".to_string(), json!("run"));
        let mut ctx = Trail::default();
        flow.run_with_params(&mut ctx, &params).unwrap();

        assert_eq!(ctx.path, vec!["prep:run", "a:run"]);
    }

    #[test]
    fn test_prep_hook_failure_skips_units() {
        let mut graph = Graph::new();
        let a = graph.add(step("a", "default"));
        let flow = Flow::new(graph, a)
            .named("guarded")
            .with_prep(|_ctx: &mut Trail, _params: &Params| Err(UnitError::failed("not ready")));

        let mut ctx = Trail::default();
        let err = flow.run(&mut ctx).unwrap_err();

        assert_eq!(err.phase(), Some(Phase::Prep));
        assert!(err.to_string().contains("guarded"));
        assert!(ctx.path.is_empty());
    }

    #[test]
    fn test_post_hook_failure() {
        let mut graph = Graph::new();
        let a = graph.add(step("a", "default"));
        let flow = Flow::new(graph, a)
            .named("hooked")
            .with_post(|_ctx: &mut Trail, _action| Err(UnitError::failed("hook broke")));

        let err = flow.run(&mut Trail::default()).unwrap_err();
        assert_eq!(err.phase(), Some(Phase::Post));
        assert!(err.to_string().contains("hooked"));
    }

    #[test]
    fn test_run_traced_records_path() {
        let mut graph = Graph::new();
        let a = graph.add(step("a", "go"));
        let b = graph.add(step("b", "default"));
        graph.connect_on(a, "go", b);
        let flow = Flow::new(graph, a);

        let (result, timeline) = flow.run_traced(&mut Trail::default());

        assert_eq!(result.unwrap(), Action::Default);
        assert_eq!(timeline.path(), vec!["a", "b"]);
        assert_eq!(timeline.actions(), vec![Action::from("go"), Action::Default]);
    }

    #[test]
    fn test_run_traced_records_failure() {
        let mut graph = Graph::new();
        let f = graph.add(failing(Phase::Compute));
        let flow = Flow::new(graph, f);

        let (result, timeline) = flow.run_traced(&mut Trail::default());

        assert!(result.is_err());
        let events = timeline.get_events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].event_type, EventType::Failed);
    }
}
