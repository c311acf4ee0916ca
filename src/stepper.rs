//! Fixed-substep time accumulator.
//!
//! Display frames arrive at a variable rate; the solver wants a fixed,
//! small timestep. The stepper accumulates frame time and drains it in
//! whole substeps, carrying the remainder to the next frame. Accumulated
//! time is capped so a long stall (a debugger pause, a backgrounded
//! window) produces a bounded burst of catch-up work instead of a spiral.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{RagdollError, Result};
use crate::skeleton::Skeleton;
use crate::solver::VerletSolver;

/// Default solver substep, in seconds (120 Hz).
pub const DEFAULT_SUBSTEP: f64 = 1.0 / 120.0;

/// Default cap on accumulated frame time, in seconds.
pub const DEFAULT_MAX_ACCUMULATED: f64 = 0.25;

/// Drains variable frame time into fixed solver substeps.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Stepper {
    substep_dt: f64,
    max_accumulated: f64,
    accumulator: f64,
}

impl Default for Stepper {
    fn default() -> Self {
        Self::new()
    }
}

impl Stepper {
    /// Create a stepper with the default 120 Hz substep.
    #[must_use]
    pub fn new() -> Self {
        Self {
            substep_dt: DEFAULT_SUBSTEP,
            max_accumulated: DEFAULT_MAX_ACCUMULATED,
            accumulator: 0.0,
        }
    }

    /// Create a stepper with a custom substep duration.
    ///
    /// # Errors
    ///
    /// Returns [`RagdollError::InvalidConfig`] if `substep_dt` is not
    /// finite and positive.
    pub fn with_substep(substep_dt: f64) -> Result<Self> {
        if !substep_dt.is_finite() || substep_dt <= 0.0 {
            return Err(RagdollError::invalid_config(format!(
                "substep must be finite and positive, got {substep_dt}"
            )));
        }
        Ok(Self {
            substep_dt,
            max_accumulated: DEFAULT_MAX_ACCUMULATED,
            accumulator: 0.0,
        })
    }

    /// The fixed substep duration, in seconds.
    #[must_use]
    pub fn substep_dt(&self) -> f64 {
        self.substep_dt
    }

    /// Time currently carried toward the next substep, in seconds.
    #[must_use]
    pub fn accumulated(&self) -> f64 {
        self.accumulator
    }

    /// Discard any carried time, e.g. after a skeleton reset.
    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }

    /// Advance the simulation by one display frame.
    ///
    /// Adds `frame_dt` to the accumulator (capped), runs as many whole
    /// substeps as fit, and carries the remainder. Returns the number of
    /// substeps executed, which may be zero for a short frame.
    ///
    /// # Errors
    ///
    /// Returns the first error from [`VerletSolver::step`]; carried time
    /// for the failed substep is not consumed. Negative or non-finite
    /// `frame_dt` is rejected up front.
    pub fn advance(
        &mut self,
        solver: &VerletSolver,
        skeleton: &mut Skeleton,
        frame_dt: f64,
    ) -> Result<u32> {
        if !frame_dt.is_finite() || frame_dt < 0.0 {
            return Err(RagdollError::invalid_config(format!(
                "frame time must be finite and non-negative, got {frame_dt}"
            )));
        }

        self.accumulator = (self.accumulator + frame_dt).min(self.max_accumulated);

        let mut steps = 0u32;
        while self.accumulator >= self.substep_dt {
            solver.step(skeleton, self.substep_dt)?;
            self.accumulator -= self.substep_dt;
            steps += 1;
        }
        if steps > 1 {
            tracing::debug!(steps, "catch-up frame ran multiple substeps");
        }
        Ok(steps)
    }
}
