//! Action dispatch loop.
//!
//! [`Revolver`] owns one scheduler, one checkpoint store and the single
//! live state, and executes the schedule against the collaborator
//! operators. The traversal runs in two phases:
//!
//! 1. [`apply_forward`](Revolver::apply_forward) sweeps forward, placing
//!    checkpoints, up to the turn, and returns the terminal state so the
//!    caller can evaluate its objective and seed the adjoint.
//! 2. [`apply_reverse`](Revolver::apply_reverse) reverses every step,
//!    restoring and replaying as scheduled, and returns the final adjoint.
//!
//! [`step`](Revolver::step) executes a single action instead, for callers
//! that interleave their own work with the schedule.
//!
//! # Example
//!
//! ```rust
//! use revolve_core::driver::{AdjointOperator, Revolver};
//! use revolve_core::RevolveConfig;
//!
//! // x_{i+1} = 0.5 * x_i^2; the adjoint accumulates d x_n / d x_0
//! struct Square;
//!
//! impl AdjointOperator<f64> for Square {
//!     type Adjoint = f64;
//!     fn step_backward(&mut self, x: &f64, lambda: &mut f64, _step: usize) {
//!         *lambda *= *x;
//!     }
//! }
//!
//! let config = RevolveConfig::new(4, 2).unwrap();
//! let forward = |x: &mut f64, _step: usize| *x = 0.5 * *x * *x;
//! let mut revolver = Revolver::new(config, forward, Square, 1.5_f64);
//!
//! let terminal = revolver.apply_forward().unwrap();
//! let gradient = revolver.apply_reverse(1.0).unwrap();
//!
//! assert!(terminal > 0.0);
//! assert!(gradient > 0.0);
//! assert_eq!(revolver.stats().schedule.reverses, 4);
//! ```

use super::operator::{AdjointOperator, ForwardOperator};
use crate::checkpoint::{CheckpointStore, MemoryBudget, Snapshot};
use crate::config::RevolveConfig;
use crate::error::{RevolveResult, ScheduleError};
use crate::schedule::{Action, Phase, Revolve, ScheduleStats};

/// Statistics of an executed traversal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RunStats {
    /// Action counts reported by the scheduler
    pub schedule: ScheduleStats,
    /// Forward operator invocations, the turn step included
    pub forward_calls: usize,
    /// Adjoint operator invocations
    pub adjoint_calls: usize,
    /// Largest number of occupied store slots
    pub peak_slots_in_use: usize,
    /// Largest store memory usage in bytes
    pub peak_memory: usize,
}

/// Driver executing a revolve schedule.
///
/// Exactly one live state exists at any time; checkpoints are independent
/// copies owned by the store. Between the turn and the first reversal the
/// driver also holds the state the turn advance started from.
#[derive(Debug)]
pub struct Revolver<S, F, B> {
    config: RevolveConfig,
    revolve: Revolve,
    store: CheckpointStore<S>,
    forward: F,
    adjoint: B,
    live: S,
    live_step: usize,
    /// State at `n_steps - 1`, kept by the turn advance for the first reversal.
    before_turn: Option<S>,
    stats: RunStats,
}

impl<S, F, B> Revolver<S, F, B>
where
    S: Snapshot,
    F: ForwardOperator<S>,
    B: AdjointOperator<S>,
{
    /// Creates a driver starting from `initial` at step 0.
    pub fn new(config: RevolveConfig, forward: F, adjoint: B, initial: S) -> Self {
        Self {
            config,
            revolve: Revolve::from_config(&config),
            store: CheckpointStore::new(config.n_slots()),
            forward,
            adjoint,
            live: initial,
            live_step: 0,
            before_turn: None,
            stats: RunStats::default(),
        }
    }

    /// Attaches a memory budget to the checkpoint store.
    pub fn with_memory_budget(mut self, budget: MemoryBudget) -> Self {
        self.store = self.store.with_memory_budget(budget);
        self
    }

    /// Returns the configuration.
    #[inline]
    pub fn config(&self) -> &RevolveConfig {
        &self.config
    }

    /// Returns the scheduler.
    #[inline]
    pub fn scheduler(&self) -> &Revolve {
        &self.revolve
    }

    /// Returns the checkpoint store.
    #[inline]
    pub fn store(&self) -> &CheckpointStore<S> {
        &self.store
    }

    /// Returns the live state and its step.
    #[inline]
    pub fn live(&self) -> (usize, &S) {
        (self.live_step, &self.live)
    }

    /// Returns the adjoint operator, e.g. to read an accumulated gradient.
    #[inline]
    pub fn adjoint_operator(&self) -> &B {
        &self.adjoint
    }

    /// Mutable access to the adjoint operator, e.g. to build the seed from
    /// the terminal state between the two phases.
    #[inline]
    pub fn adjoint_operator_mut(&mut self) -> &mut B {
        &mut self.adjoint
    }

    /// Returns the statistics so far.
    #[inline]
    pub fn stats(&self) -> RunStats {
        let mut stats = self.stats;
        stats.schedule = *self.revolve.stats();
        stats
    }

    /// Releases the operators.
    pub fn into_operators(self) -> (F, B) {
        (self.forward, self.adjoint)
    }

    /// Sweeps forward to the turn and returns a copy of the state at
    /// `n_steps`.
    ///
    /// # Errors
    ///
    /// Returns `RevolveError` on store misuse or a scheduler invariant
    /// violation, or if the forward sweep already ran.
    pub fn apply_forward(&mut self) -> RevolveResult<S> {
        if self.revolve.phase() != Phase::Descent {
            return Err(ScheduleError::UnexpectedAction {
                phase: "forward",
                action: "forward sweep already completed".to_string(),
            }
            .into());
        }
        tracing::debug!(
            n_steps = self.config.n_steps(),
            n_slots = self.config.n_slots(),
            "starting forward sweep"
        );

        while self.revolve.phase() == Phase::Descent {
            let action = self.revolve.next_action()?;
            match action {
                Action::Advance { step } => self.advance(step)?,
                Action::TakeShot { slot, step } => self.take_shot(slot, step)?,
                Action::Restore { .. } | Action::Reverse { .. } | Action::Finished => {
                    return Err(ScheduleError::UnexpectedAction {
                        phase: "forward",
                        action: action.to_string(),
                    }
                    .into());
                }
            }
        }

        tracing::debug!(
            forward_calls = self.stats.forward_calls,
            slots_in_use = self.store.slots_in_use(),
            "forward sweep reached turn"
        );
        Ok(self.live.snapshot())
    }

    /// Reverses every step starting from `seed`, the adjoint at `n_steps`,
    /// and returns the adjoint at step 0.
    ///
    /// # Errors
    ///
    /// Returns `RevolveError` if called before [`apply_forward`](Self::apply_forward),
    /// on store misuse, or on a scheduler invariant violation.
    pub fn apply_reverse(&mut self, seed: B::Adjoint) -> RevolveResult<B::Adjoint> {
        if self.revolve.phase() != Phase::Turn {
            return Err(ScheduleError::UnexpectedAction {
                phase: "reverse",
                action: "REVERSE before the forward sweep reached the turn".to_string(),
            }
            .into());
        }

        let mut adjoint = seed;
        while !self.step(&mut adjoint)?.is_finished() {}

        let stats = self.stats();
        tracing::info!(
            n_steps = self.config.n_steps(),
            n_slots = self.config.n_slots(),
            forward_calls = stats.forward_calls,
            recomputations = stats.schedule.recomputations(self.config.n_steps()),
            restores = stats.schedule.restores,
            peak_slots_in_use = stats.peak_slots_in_use,
            peak_memory = stats.peak_memory,
            "adjoint traversal complete"
        );
        Ok(adjoint)
    }

    /// Runs both phases; `seed` maps the terminal state to the adjoint
    /// at `n_steps`.
    pub fn run<G>(&mut self, seed: G) -> RevolveResult<B::Adjoint>
    where
        G: FnOnce(&S) -> B::Adjoint,
    {
        let terminal = self.apply_forward()?;
        self.apply_reverse(seed(&terminal))
    }

    /// Fetches the next action from the scheduler, executes it and returns it.
    ///
    /// `adjoint` is only touched by `Reverse`; when the first one arrives
    /// it must hold the seed. After `Finished`, further calls return
    /// `Finished` without doing anything.
    ///
    /// # Errors
    ///
    /// Returns `RevolveError` on store misuse or a scheduler invariant
    /// violation.
    pub fn step(&mut self, adjoint: &mut B::Adjoint) -> RevolveResult<Action> {
        let action = self.revolve.next_action()?;
        match action {
            Action::Advance { step } => self.advance(step)?,
            Action::TakeShot { slot, step } => self.take_shot(slot, step)?,
            Action::Restore { slot, step } => self.restore(slot, step)?,
            Action::Reverse { step } => self.reverse(step, adjoint)?,
            Action::Finished => {}
        }
        Ok(action)
    }

    fn advance(&mut self, step: usize) -> RevolveResult<()> {
        self.expect_live_step(step)?;
        if self.revolve.phase() == Phase::Turn {
            self.before_turn = Some(self.live.snapshot());
        }
        self.forward.step_forward(&mut self.live, step);
        self.live_step += 1;
        self.stats.forward_calls += 1;
        Ok(())
    }

    fn take_shot(&mut self, slot: usize, step: usize) -> RevolveResult<()> {
        self.expect_live_step(step)?;
        self.store.save(slot, step, &self.live)?;
        self.stats.peak_slots_in_use = self.stats.peak_slots_in_use.max(self.store.slots_in_use());
        self.stats.peak_memory = self.stats.peak_memory.max(self.store.memory_usage());
        Ok(())
    }

    fn restore(&mut self, slot: usize, step: usize) -> RevolveResult<()> {
        let restored = self.store.restore_into(slot, &mut self.live)?;
        if restored != step {
            return Err(ScheduleError::LiveStepMismatch {
                expected: step,
                actual: restored,
            }
            .into());
        }
        self.live_step = restored;
        Ok(())
    }

    fn reverse(&mut self, step: usize, adjoint: &mut B::Adjoint) -> RevolveResult<()> {
        match self.before_turn.take() {
            // Live holds the terminal state; step back to the kept one
            Some(state) => {
                self.expect_live_step(step + 1)?;
                self.live = state;
                self.live_step = step;
            }
            None => self.expect_live_step(step)?,
        }
        self.adjoint.step_backward(&self.live, adjoint, step);
        self.stats.adjoint_calls += 1;

        // The scheduler pops a checkpoint once its step has been reversed
        let freed = self.revolve.resident();
        if self.store.step_of(freed).is_some() {
            self.store.release(freed)?;
            tracing::trace!(slot = freed, "released checkpoint slot");
        }
        Ok(())
    }

    fn expect_live_step(&self, expected: usize) -> RevolveResult<()> {
        if self.live_step != expected {
            return Err(ScheduleError::LiveStepMismatch {
                expected,
                actual: self.live_step,
            }
            .into());
        }
        Ok(())
    }
}
