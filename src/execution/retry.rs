//! Bounded Retry
//!
//! Wraps a unit's `compute` phase with a fixed number of attempts, an
//! optional pause between attempts and a final fallback.

use std::thread;
use std::time::Duration;

use log::warn;
use serde::{Deserialize, Deserializer, Serialize};

use super::error::{FlowError, Phase};
use super::unit::Unit;

/// Retry settings for one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total number of compute attempts (at least 1)
    #[serde(default = "default_max_attempts", deserialize_with = "at_least_one")]
    pub max_attempts: u32,

    /// Pause between two attempts
    #[serde(default, with = "duration_secs")]
    pub delay: Duration,
}

fn default_max_attempts() -> u32 {
    1
}

fn at_least_one<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    Ok(u32::deserialize(deserializer)?.max(1))
}

impl RetryPolicy {
    /// Creates a policy. `max_attempts` below 1 is raised to 1.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// A single attempt with no delay.
    pub fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::once()
    }
}

/// Runs `compute` under `policy`.
///
/// Attempts are numbered from 0. After the last failed attempt the unit's
/// fallback is called exactly once and its result is returned; a fallback
/// error becomes a [`FlowError`] for the compute phase.
pub(crate) fn run_compute<C, U>(
    unit: &U,
    prep: &U::Prep,
    policy: &RetryPolicy,
) -> Result<U::Output, FlowError>
where
    U: Unit<C>,
{
    let attempts = policy.attempts();
    let mut attempt = 0;

    loop {
        match unit.compute(prep) {
            Ok(output) => return Ok(output),
            Err(e) if attempt + 1 >= attempts => {
                if attempts > 1 {
                    warn!(
                        "Unit '{}' failed after {} attempts: {}",
                        unit.name(),
                        attempts,
                        e
                    );
                }
                return unit
                    .fallback(prep, e, attempt)
                    .map_err(|e| FlowError::unit(unit.name(), Phase::Compute, e));
            }
            Err(e) => {
                warn!(
                    "Unit '{}' attempt {}/{} failed: {}",
                    unit.name(),
                    attempt + 1,
                    attempts,
                    e
                );
                if !policy.delay.is_zero() {
                    thread::sleep(policy.delay);
                }
                attempt += 1;
            }
        }
    }
}

/// Serializes a [`Duration`] as (fractional) seconds.
mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|e| {
            serde::de::Error::custom(format!(
                "delay must be a non-negative number of seconds, got {}: {}",
                secs, e
            ))
        })
    }
}
