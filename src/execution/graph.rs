//! Orchestration Graph
//!
//! Owns the units of a flow and the labeled transitions between them.
//!
//! Units are stored in an arena and addressed by [`NodeId`]. A node refers
//! to its successors by id only, so one unit can be the successor of many
//! predecessors (and of itself) without shared ownership. The topology is
//! read-only while a flow runs.
//!
//! # Example
//!
//! ```rust,ignore
//! let mut graph = Graph::new();
//! let collect = graph.add(Collect);
//! let analyze = graph.add(Analyze);
//! let wait = graph.add(Wait);
//!
//! graph.from(collect).on("analyze") >> analyze;
//! graph.from(collect).on("wait").to(wait);
//! graph.from(analyze).to(wait);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::ops::Shr;

use log::warn;

use super::action::Action;
use super::error::FlowError;
use super::flow::Flow;
use super::retry::RetryPolicy;
use super::unit::{Params, Runnable, Unit, UnitNode};

/// Handle of a node inside a [`Graph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

struct Slot<C> {
    unit: Box<dyn Runnable<C>>,
    successors: HashMap<Action, NodeId>,
    params: Params,
    retry: RetryPolicy,
}

/// Arena of units plus their transition tables.
pub struct Graph<C> {
    slots: Vec<Slot<C>>,
}

impl<C> Graph<C> {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Adds a unit that runs `compute` once.
    pub fn add<U>(&mut self, unit: U) -> NodeId
    where
        U: Unit<C> + 'static,
    {
        self.add_runnable(Box::new(UnitNode(unit)), RetryPolicy::once())
    }

    /// Adds a unit whose `compute` is retried under `policy`.
    pub fn add_with_retry<U>(&mut self, unit: U, policy: RetryPolicy) -> NodeId
    where
        U: Unit<C> + 'static,
    {
        self.add_runnable(Box::new(UnitNode(unit)), policy)
    }

    /// Adds a whole flow as a single node.
    pub fn add_flow(&mut self, flow: Flow<C>) -> NodeId
    where
        C: 'static,
    {
        self.add_runnable(Box::new(flow), RetryPolicy::once())
    }

    /// Adds an already type-erased node.
    pub fn add_runnable(&mut self, unit: Box<dyn Runnable<C>>, retry: RetryPolicy) -> NodeId {
        let id = NodeId(self.slots.len());
        self.slots.push(Slot {
            unit,
            successors: HashMap::new(),
            params: Params::new(),
            retry,
        });
        id
    }

    /// Registers `to` as the successor of `from` on the default action.
    ///
    /// Returns `to` so calls can be chained.
    ///
    /// # Panics
    ///
    /// Panics if `from` does not belong to this graph.
    pub fn connect(&mut self, from: NodeId, to: NodeId) -> NodeId {
        self.connect_on(from, Action::Default, to)
    }

    /// Registers `to` as the successor of `from` for `action`.
    ///
    /// An existing transition for the same action is replaced, with a
    /// warning.
    ///
    /// # Panics
    ///
    /// Panics if `from` does not belong to this graph.
    pub fn connect_on(&mut self, from: NodeId, action: impl Into<Action>, to: NodeId) -> NodeId {
        let action = action.into();
        let slot = &mut self.slots[from.0];

        if let Some(previous) = slot.successors.insert(action.clone(), to) {
            warn!(
                "Overwriting successor for action '{}' of unit '{}' ({} -> {})",
                action,
                slot.unit.name(),
                previous,
                to
            );
        }
        to
    }

    /// Starts a transition from `from`, on the default action until
    /// [`Transition::on`] picks another one.
    pub fn from(&mut self, from: NodeId) -> Transition<'_, C> {
        Transition {
            graph: self,
            from,
            action: Action::Default,
        }
    }

    /// Successor of `from` for `action`, if one is registered.
    pub fn successor(&self, from: NodeId, action: &Action) -> Option<NodeId> {
        self.slots.get(from.0)?.successors.get(action).copied()
    }

    /// All outgoing transitions of a node.
    pub fn successors(&self, id: NodeId) -> Option<&HashMap<Action, NodeId>> {
        self.slots.get(id.0).map(|slot| &slot.successors)
    }

    /// Replaces the parameters used when the node runs on its own.
    pub fn set_params(&mut self, id: NodeId, params: Params) -> Result<(), FlowError> {
        self.slot_mut(id)?.params = params;
        Ok(())
    }

    pub fn params(&self, id: NodeId) -> Option<&Params> {
        self.slots.get(id.0).map(|slot| &slot.params)
    }

    /// Replaces the retry policy of a node.
    pub fn set_retry(&mut self, id: NodeId, retry: RetryPolicy) -> Result<(), FlowError> {
        self.slot_mut(id)?.retry = retry;
        Ok(())
    }

    pub fn retry(&self, id: NodeId) -> Option<RetryPolicy> {
        self.slots.get(id.0).map(|slot| slot.retry)
    }

    /// Name of the unit stored at `id`.
    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.slots.get(id.0).map(|slot| slot.unit.name())
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.0 < self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Runs a single node once with its own parameters.
    ///
    /// Successors are not followed. This is meant for exercising one unit
    /// in isolation; use a [`Flow`] to walk the graph.
    pub fn run_node(&self, id: NodeId, ctx: &mut C) -> Result<Action, FlowError> {
        let slot = self.slot(id)?;
        if !slot.successors.is_empty() {
            warn!(
                "Unit '{}' has successors that a standalone run will not follow. Use a Flow.",
                slot.unit.name()
            );
        }
        slot.unit.run(ctx, &slot.params, &slot.retry)
    }

    /// Runs a node with the given step parameters.
    pub(crate) fn step(&self, id: NodeId, ctx: &mut C, params: &Params) -> Result<Action, FlowError> {
        let slot = self.slot(id)?;
        slot.unit.run(ctx, params, &slot.retry)
    }

    fn slot(&self, id: NodeId) -> Result<&Slot<C>, FlowError> {
        self.slots.get(id.0).ok_or(FlowError::UnknownNode(id))
    }

    fn slot_mut(&mut self, id: NodeId) -> Result<&mut Slot<C>, FlowError> {
        self.slots.get_mut(id.0).ok_or(FlowError::UnknownNode(id))
    }
}

impl<C> Default for Graph<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for Graph<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        for (index, slot) in self.slots.iter().enumerate() {
            list.entry(&(NodeId(index), slot.unit.name(), &slot.successors));
        }
        list.finish()
    }
}

/// A transition under construction: source node plus action label.
pub struct Transition<'g, C> {
    graph: &'g mut Graph<C>,
    from: NodeId,
    action: Action,
}

impl<'g, C> Transition<'g, C> {
    /// Binds the action label the transition fires on.
    pub fn on(mut self, action: impl Into<Action>) -> Self {
        self.action = action.into();
        self
    }

    /// Completes the transition; returns the target.
    pub fn to(self, target: NodeId) -> NodeId {
        self.graph.connect_on(self.from, self.action, target)
    }
}

impl<'g, C> Shr<NodeId> for Transition<'g, C> {
    type Output = NodeId;

    fn shr(self, target: NodeId) -> NodeId {
        self.to(target)
    }
}
