//! Execution Units
//!
//! A unit is one step of an orchestration graph. It runs in three phases:
//!
//! - `prep`: reads the shared context and the step parameters
//! - `compute`: the unit's core work, without context access (retried)
//! - `post`: writes results back into the context and picks the next action
//!
//! Units are written against [`Unit`], which keeps the intermediate values
//! strongly typed. A graph stores them behind [`Runnable`], the object-safe
//! form that only knows about the context type.

use std::collections::HashMap;

use log::debug;

use super::action::Action;
use super::error::{FlowError, Phase, UnitError};
use super::retry::{run_compute, RetryPolicy};

/// Parameters handed to a unit for one step.
pub type Params = HashMap<String, serde_json::Value>;

/// Result of a single unit phase.
pub type UnitResult<T> = Result<T, UnitError>;

/// A single step in an orchestration graph.
///
/// `C` is the shared context threaded through every phase of every unit in
/// a run. Only `prep` and `post` see it.
///
/// # Example
///
/// ```
/// use flowrunner::execution::{Action, Params, Unit, UnitResult};
///
/// struct Double;
///
/// impl Unit<Vec<i64>> for Double {
///     type Prep = i64;
///     type Output = i64;
///
///     fn prep(&self, ctx: &mut Vec<i64>, _params: &Params) -> UnitResult<i64> {
///         Ok(ctx.last().copied().unwrap_or(1))
///     }
///
///     fn compute(&self, value: &i64) -> UnitResult<i64> {
///         Ok(value * 2)
///     }
///
///     fn post(&self, ctx: &mut Vec<i64>, _prep: i64, doubled: i64) -> UnitResult<Action> {
///         ctx.push(doubled);
///         Ok(Action::Default)
///     }
/// }
/// ```
pub trait Unit<C> {
    /// Value produced by `prep` and consumed by `compute` and `post`.
    type Prep;

    /// Value produced by `compute` (or by `fallback`).
    type Output;

    /// Name used in logs, errors and timelines.
    fn name(&self) -> &str {
        short_type_name(std::any::type_name::<Self>())
    }

    /// Reads what the unit needs from the context.
    ///
    /// Runs once per invocation, never per retry attempt.
    fn prep(&self, ctx: &mut C, params: &Params) -> UnitResult<Self::Prep>;

    /// Core work of the unit. May be attempted several times.
    fn compute(&self, prep: &Self::Prep) -> UnitResult<Self::Output>;

    /// Called once when the final compute attempt failed.
    ///
    /// `attempt` is the zero-based index of that final attempt. The default
    /// gives the failure back, which aborts the run.
    fn fallback(&self, prep: &Self::Prep, error: UnitError, attempt: u32) -> UnitResult<Self::Output> {
        let _ = (prep, attempt);
        Err(error)
    }

    /// Stores results in the context and returns the action label.
    fn post(&self, ctx: &mut C, prep: Self::Prep, output: Self::Output) -> UnitResult<Action>;
}

/// Object-safe form of a unit, as stored in a graph.
pub trait Runnable<C> {
    fn name(&self) -> &str;

    /// Executes one full `prep -> compute -> post` cycle.
    fn run(&self, ctx: &mut C, params: &Params, policy: &RetryPolicy) -> Result<Action, FlowError>;
}

/// Adapts a [`Unit`] to [`Runnable`].
pub(crate) struct UnitNode<U>(pub U);

impl<C, U> Runnable<C> for UnitNode<U>
where
    U: Unit<C>,
{
    fn name(&self) -> &str {
        self.0.name()
    }

    fn run(&self, ctx: &mut C, params: &Params, policy: &RetryPolicy) -> Result<Action, FlowError> {
        let unit = &self.0;
        let name = unit.name();

        let prep = unit
            .prep(ctx, params)
            .map_err(|e| FlowError::unit(name, Phase::Prep, e))?;

        let output = run_compute::<C, U>(unit, &prep, policy)?;

        let action = unit
            .post(ctx, prep, output)
            .map_err(|e| FlowError::unit(name, Phase::Post, e))?;

        debug!("Unit '{}' produced action '{}'", name, action);
        Ok(action)
    }
}

/// Strips the module path and generic arguments from a type name.
fn short_type_name(full: &str) -> &str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
