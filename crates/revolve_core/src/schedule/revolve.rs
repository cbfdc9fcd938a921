//! The revolve state machine.
//!
//! [`Revolve`] drives a combined forward and adjoint traversal of
//! `n_steps` steps with at most `n_slots` checkpoints resident. Each call to
//! [`Revolve::next_action`] performs exactly one decision:
//!
//! | `fine - capo` | decision                                              |
//! |---------------|-------------------------------------------------------|
//! | pending jump  | `Advance` one step towards the placement target       |
//! | `0`, turn     | `Reverse` the last step                               |
//! | `0`           | `Restore` the top checkpoint, or `Finished`           |
//! | `1`, descent  | `Advance` to the terminal state (the turn)            |
//! | `1`           | `Reverse` step `capo` and move `fine` down            |
//! | `>= 2`        | `TakeShot` at `capo` if not yet stored, else plan a   |
//! |               | jump with [`place_checkpoint`] and start advancing    |
//!
//! Resident checkpoints form a stack: slot `k` holds the `k`-th checkpoint
//! from the bottom, and slot 0 always holds state 0. A reversal that
//! consumes the top checkpoint pops it, freeing its slot.
//!
//! The turn advance is the only one that reaches `n_steps`. The reversal
//! that follows it consumes the state the advance started from, so the
//! driver keeps that state until then.

use super::action::Action;
use super::cost::place_checkpoint;
use crate::config::RevolveConfig;
use crate::error::{ConfigError, ScheduleError};

/// Phase of the traversal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Phase {
    /// Initial forward sweep placing the first checkpoints.
    #[default]
    Descent,
    /// The terminal state has been reached; nothing reversed yet.
    Turn,
    /// At least one step has been reversed.
    Reversal,
    /// All steps reversed.
    Done,
}

/// Counts of emitted actions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScheduleStats {
    /// Single-step forward advances
    pub advances: usize,
    /// Checkpoints written
    pub takeshots: usize,
    /// Checkpoints read back
    pub restores: usize,
    /// Adjoint steps
    pub reverses: usize,
    /// Largest number of simultaneously resident checkpoints
    pub peak_resident: usize,
}

impl ScheduleStats {
    /// Forward steps, the turn advance included.
    #[inline]
    pub fn forward_steps(&self) -> usize {
        self.advances
    }

    /// Forward steps beyond the `n_steps` an uninterrupted sweep takes.
    #[inline]
    pub fn recomputations(&self, n_steps: usize) -> usize {
        self.forward_steps().saturating_sub(n_steps)
    }
}

/// Binomial checkpoint scheduler (Griewank-Walther revolve).
///
/// # Examples
///
/// ```
/// use revolve_core::schedule::{Action, Revolve};
///
/// let mut revolve = Revolve::new(3, 3).unwrap();
/// assert_eq!(revolve.next_action().unwrap(), Action::TakeShot { slot: 0, step: 0 });
/// assert_eq!(revolve.next_action().unwrap(), Action::Advance { step: 0 });
///
/// let rest: Vec<Action> = revolve.map(Result::unwrap).collect();
/// assert_eq!(rest.last(), Some(&Action::Finished));
/// ```
#[derive(Clone, Debug)]
pub struct Revolve {
    n_steps: usize,
    n_slots: usize,
    /// Forward pointer: step index of the live state.
    capo: usize,
    /// `capo` at the start of the current advance run.
    oldcapo: usize,
    /// Adjoint pointer: every step `>= fine` has been reversed.
    fine: usize,
    /// Step held by each resident slot, bottom first.
    resident: Vec<usize>,
    /// Placement target while an advance run is in progress.
    target: Option<usize>,
    phase: Phase,
    stats: ScheduleStats,
    /// Set once `Finished` has been yielded through the iterator.
    exhausted: bool,
}

impl Revolve {
    /// Creates a scheduler for `n_steps` steps with `n_slots` checkpoints.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if either count is zero.
    pub fn new(n_steps: usize, n_slots: usize) -> Result<Self, ConfigError> {
        if n_steps == 0 {
            return Err(ConfigError::InvalidStepCount(n_steps));
        }
        if n_slots == 0 {
            return Err(ConfigError::InvalidSlotCount(n_slots));
        }
        Ok(Self::with_counts(n_steps, n_slots))
    }

    /// Creates a scheduler from a validated configuration.
    pub fn from_config(config: &RevolveConfig) -> Self {
        Self::with_counts(config.n_steps(), config.n_slots())
    }

    fn with_counts(n_steps: usize, n_slots: usize) -> Self {
        // More slots than steps are never used
        let n_slots = n_slots.min(n_steps);
        Self {
            n_steps,
            n_slots,
            capo: 0,
            oldcapo: 0,
            fine: n_steps,
            resident: Vec::with_capacity(n_slots),
            target: None,
            phase: Phase::Descent,
            stats: ScheduleStats::default(),
            exhausted: false,
        }
    }

    /// Storage-free mode: only state 0 is ever stored, and every reversal
    /// replays forward from it.
    pub fn recompute_all(n_steps: usize) -> Result<Self, ConfigError> {
        Self::new(n_steps, 1)
    }

    /// Returns the number of steps.
    #[inline]
    pub fn n_steps(&self) -> usize {
        self.n_steps
    }

    /// Returns the number of usable checkpoint slots, at most `n_steps`.
    #[inline]
    pub fn n_slots(&self) -> usize {
        self.n_slots
    }

    /// Returns the forward pointer.
    #[inline]
    pub fn capo(&self) -> usize {
        self.capo
    }

    /// Returns the forward pointer at the start of the last advance run.
    #[inline]
    pub fn oldcapo(&self) -> usize {
        self.oldcapo
    }

    /// Returns the adjoint pointer.
    #[inline]
    pub fn fine(&self) -> usize {
        self.fine
    }

    /// Returns the number of checkpoints currently committed.
    #[inline]
    pub fn resident(&self) -> usize {
        self.resident.len()
    }

    /// Returns the step stored in `slot`, if that slot is resident.
    #[inline]
    pub fn slot_step(&self, slot: usize) -> Option<usize> {
        self.resident.get(slot).copied()
    }

    /// Returns the current phase.
    #[inline]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Returns `true` once `Finished` has been emitted.
    #[inline]
    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Done
    }

    /// Returns action counts so far.
    #[inline]
    pub fn stats(&self) -> &ScheduleStats {
        &self.stats
    }

    /// Computes the next action and advances the scheduler state.
    ///
    /// After `Finished`, every further call returns `Finished` again.
    ///
    /// # Errors
    ///
    /// Returns `ScheduleError` on an internal invariant violation.
    pub fn next_action(&mut self) -> Result<Action, ScheduleError> {
        if self.phase == Phase::Done {
            return Ok(Action::Finished);
        }
        let action = if self.target.is_some() {
            self.advance()
        } else {
            if self.capo > self.fine {
                return Err(ScheduleError::PointerOrder {
                    capo: self.capo,
                    fine: self.fine,
                });
            }
            match (self.fine - self.capo, self.phase) {
                (0, Phase::Turn) => self.reverse(),
                (0, _) => self.rewind(),
                // State 0 is stored even when no jump is ever planned
                (1, Phase::Descent) if self.resident.is_empty() => self.descend()?,
                (1, Phase::Descent) => self.turn(),
                (1, _) => self.reverse(),
                _ => self.descend()?,
            }
        };

        tracing::trace!(
            %action,
            capo = self.capo,
            fine = self.fine,
            resident = self.resident.len(),
            "revolve decision"
        );
        Ok(action)
    }

    /// Runs the scheduler to completion and returns every action,
    /// `Finished` included.
    pub fn schedule(mut self) -> Result<Vec<Action>, ScheduleError> {
        let mut actions = Vec::new();
        loop {
            let action = self.next_action()?;
            actions.push(action);
            if action.is_finished() {
                return Ok(actions);
            }
        }
    }

    fn advance(&mut self) -> Action {
        let step = self.capo;
        self.capo += 1;
        if self.target == Some(self.capo) {
            self.target = None;
        }
        self.stats.advances += 1;
        Action::Advance { step }
    }

    fn rewind(&mut self) -> Action {
        match self.resident.last() {
            Some(&step) if self.capo != self.resident[0] => {
                let slot = self.resident.len() - 1;
                self.capo = step;
                self.stats.restores += 1;
                Action::Restore { slot, step }
            }
            _ => {
                self.phase = Phase::Done;
                tracing::debug!(
                    n_steps = self.n_steps,
                    n_slots = self.n_slots,
                    advances = self.stats.advances,
                    "revolve schedule finished"
                );
                Action::Finished
            }
        }
    }

    fn turn(&mut self) -> Action {
        let action = self.advance();
        self.phase = Phase::Turn;
        tracing::debug!(
            n_steps = self.n_steps,
            advances = self.stats.advances,
            resident = self.resident.len(),
            "revolve forward sweep reached the turn"
        );
        action
    }

    fn reverse(&mut self) -> Action {
        self.fine -= 1;
        // At the turn the live state steps back to the retained state
        self.capo = self.fine;
        if self.resident.last() == Some(&self.capo) {
            self.resident.pop();
        }
        self.phase = Phase::Reversal;
        self.stats.reverses += 1;
        Action::Reverse { step: self.fine }
    }

    fn descend(&mut self) -> Result<Action, ScheduleError> {
        let top = self.resident.last().copied();
        if top != Some(self.capo) {
            if self.resident.len() >= self.n_slots {
                return Err(ScheduleError::SlotsExhausted {
                    required: self.resident.len() + 1,
                    available: self.n_slots,
                });
            }
            self.resident.push(self.capo);
            self.stats.takeshots += 1;
            self.stats.peak_resident = self.stats.peak_resident.max(self.resident.len());
            return Ok(Action::TakeShot {
                slot: self.resident.len() - 1,
                step: self.capo,
            });
        }

        // The slot holding capo counts towards the segment's budget
        let free = self.n_slots + 1 - self.resident.len();
        let target = place_checkpoint(self.capo, self.fine, free)?;
        if target >= self.fine {
            return Err(ScheduleError::PointerOrder {
                capo: target,
                fine: self.fine,
            });
        }
        self.oldcapo = self.capo;
        self.target = Some(target);
        Ok(self.advance())
    }
}

impl Iterator for Revolve {
    type Item = Result<Action, ScheduleError>;

    /// Yields actions up to and including `Finished`, then `None`.
    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }
        let item = self.next_action();
        if matches!(item, Ok(Action::Finished) | Err(_)) {
            self.exhausted = true;
        }
        Some(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::cost::forward_cost;

    fn actions(n_steps: usize, n_slots: usize) -> Vec<Action> {
        Revolve::new(n_steps, n_slots).unwrap().schedule().unwrap()
    }

    fn count(actions: &[Action], kind: &str) -> usize {
        actions.iter().filter(|a| a.kind() == kind).count()
    }

    // ========================================================================
    // Construction Tests
    // ========================================================================

    #[test]
    fn test_new_rejects_zero_steps() {
        assert_eq!(
            Revolve::new(0, 3).unwrap_err(),
            ConfigError::InvalidStepCount(0)
        );
    }

    #[test]
    fn test_new_rejects_zero_slots() {
        assert_eq!(
            Revolve::new(10, 0).unwrap_err(),
            ConfigError::InvalidSlotCount(0)
        );
    }

    #[test]
    fn test_initial_state() {
        let revolve = Revolve::new(10, 3).unwrap();
        assert_eq!(revolve.capo(), 0);
        assert_eq!(revolve.fine(), 10);
        assert_eq!(revolve.resident(), 0);
        assert_eq!(revolve.phase(), Phase::Descent);
        assert!(!revolve.is_finished());
    }

    #[test]
    fn test_excess_slots_are_clamped() {
        let revolve = Revolve::new(6, usize::MAX).unwrap();
        assert_eq!(revolve.n_slots(), 6);
        assert_eq!(revolve.schedule().unwrap(), actions(6, 6));
    }

    #[test]
    fn test_from_config_matches_new() {
        let config = RevolveConfig::new(25, 4).unwrap();
        let a = Revolve::from_config(&config).schedule().unwrap();
        let b = actions(25, 4);
        assert_eq!(a, b);
    }

    // ========================================================================
    // Reference Schedules
    // ========================================================================

    #[test]
    fn test_single_step_schedule() {
        use Action::*;
        assert_eq!(
            actions(1, 1),
            vec![
                TakeShot { slot: 0, step: 0 },
                Advance { step: 0 },
                Reverse { step: 0 },
                Finished,
            ]
        );
    }

    #[test]
    fn test_three_steps_three_slots() {
        use Action::*;
        assert_eq!(
            actions(3, 3),
            vec![
                TakeShot { slot: 0, step: 0 },
                Advance { step: 0 },
                TakeShot { slot: 1, step: 1 },
                Advance { step: 1 },
                Advance { step: 2 },
                Reverse { step: 2 },
                Restore { slot: 1, step: 1 },
                Reverse { step: 1 },
                Restore { slot: 0, step: 0 },
                Reverse { step: 0 },
                Finished,
            ]
        );
    }

    #[test]
    fn test_four_steps_single_slot() {
        use Action::*;
        assert_eq!(
            actions(4, 1),
            vec![
                TakeShot { slot: 0, step: 0 },
                Advance { step: 0 },
                Advance { step: 1 },
                Advance { step: 2 },
                Advance { step: 3 },
                Reverse { step: 3 },
                Restore { slot: 0, step: 0 },
                Advance { step: 0 },
                Advance { step: 1 },
                Reverse { step: 2 },
                Restore { slot: 0, step: 0 },
                Advance { step: 0 },
                Reverse { step: 1 },
                Restore { slot: 0, step: 0 },
                Reverse { step: 0 },
                Finished,
            ]
        );
    }

    #[test]
    fn test_ten_steps_three_slots_placement() {
        let actions = actions(10, 3);
        let shots: Vec<(usize, usize)> = actions
            .iter()
            .filter_map(|a| match a {
                Action::TakeShot { slot, step } => Some((*slot, *step)),
                _ => None,
            })
            .collect();
        assert_eq!(&shots[..3], &[(0, 0), (1, 4), (2, 7)]);
        assert_eq!(count(&actions, "ADVANCE"), 16);
    }

    // ========================================================================
    // Optimality and Coverage
    // ========================================================================

    #[test]
    fn test_advances_match_binomial_bound() {
        for n_steps in 1..80 {
            for n_slots in 1..12 {
                let actions = actions(n_steps, n_slots);
                let expected = forward_cost(n_steps, n_slots).unwrap() as usize;
                assert_eq!(
                    count(&actions, "ADVANCE"),
                    expected,
                    "n_steps={n_steps} n_slots={n_slots}"
                );
            }
        }
    }

    #[test]
    fn test_reverses_cover_every_step_in_descending_order() {
        for (n_steps, n_slots) in [(1, 1), (7, 2), (30, 4), (64, 64)] {
            let reversed: Vec<usize> = actions(n_steps, n_slots)
                .iter()
                .filter_map(|a| match a {
                    Action::Reverse { step } => Some(*step),
                    _ => None,
                })
                .collect();
            let expected: Vec<usize> = (0..n_steps).rev().collect();
            assert_eq!(reversed, expected);
        }
    }

    #[test]
    fn test_store_all_has_no_recomputation() {
        for n_steps in [1, 5, 12] {
            let actions = actions(n_steps, n_steps);
            assert_eq!(count(&actions, "ADVANCE"), n_steps, "n_steps={n_steps}");

            let mut revolve = Revolve::new(n_steps, n_steps).unwrap();
            while !revolve.next_action().unwrap().is_finished() {}
            let stats = revolve.stats();
            assert_eq!(stats.forward_steps(), n_steps);
            assert_eq!(stats.recomputations(n_steps), 0);
            assert_eq!(stats.restores, n_steps - 1);
        }
    }

    #[test]
    fn test_every_step_advanced_once_before_first_reverse() {
        let actions = actions(20, 4);
        let first_reverse = actions
            .iter()
            .position(|a| matches!(a, Action::Reverse { .. }))
            .unwrap();
        assert_eq!(actions[first_reverse], Action::Reverse { step: 19 });
        assert_eq!(actions[first_reverse - 1], Action::Advance { step: 19 });
        assert_eq!(count(&actions[..first_reverse], "ADVANCE"), 20);
    }

    #[test]
    fn test_state_zero_is_always_stored() {
        for (n_steps, n_slots) in [(1, 1), (2, 1), (9, 3), (40, 40)] {
            assert_eq!(
                actions(n_steps, n_slots)[0],
                Action::TakeShot { slot: 0, step: 0 }
            );
        }
    }

    #[test]
    fn test_recompute_all_is_single_slot() {
        let a = Revolve::recompute_all(9).unwrap().schedule().unwrap();
        assert_eq!(a, actions(9, 1));
        assert_eq!(count(&a, "TAKESHOT"), 1);
        assert_eq!(count(&a, "ADVANCE"), 9 * 8 / 2 + 1);
    }

    #[test]
    fn test_peak_resident_within_slots() {
        for n_slots in 1..8 {
            let mut revolve = Revolve::new(50, n_slots).unwrap();
            while !revolve.next_action().unwrap().is_finished() {
                assert!(revolve.resident() <= n_slots);
            }
            assert!(revolve.stats().peak_resident <= n_slots);
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    #[test]
    fn test_finished_is_sticky() {
        let mut revolve = Revolve::new(2, 1).unwrap();
        while !revolve.next_action().unwrap().is_finished() {}
        assert_eq!(revolve.phase(), Phase::Done);
        assert_eq!(revolve.next_action().unwrap(), Action::Finished);
        assert_eq!(revolve.next_action().unwrap(), Action::Finished);
    }

    #[test]
    fn test_iterator_stops_after_finished() {
        let revolve = Revolve::new(5, 2).unwrap();
        let all: Vec<Action> = revolve.map(Result::unwrap).collect();
        assert_eq!(all.last(), Some(&Action::Finished));
        assert_eq!(count(&all, "FINISHED"), 1);
    }

    #[test]
    fn test_phase_transitions() {
        let mut revolve = Revolve::new(3, 2).unwrap();
        let mut seen_turn = false;
        let mut seen_reverse = false;
        loop {
            let action = revolve.next_action().unwrap();
            match action {
                Action::Advance { step: 2 } => seen_turn = true,
                Action::Reverse { .. } => seen_reverse = true,
                Action::Finished => break,
                _ => {}
            }
            let expected = match (seen_turn, seen_reverse) {
                (_, true) => Phase::Reversal,
                (true, false) => Phase::Turn,
                (false, false) => Phase::Descent,
            };
            assert_eq!(revolve.phase(), expected, "after {action}");
        }
        assert_eq!(revolve.phase(), Phase::Done);
    }

    #[test]
    fn test_turn_reverse_steps_capo_back() {
        let mut revolve = Revolve::new(2, 2).unwrap();
        while revolve.phase() != Phase::Turn {
            revolve.next_action().unwrap();
        }
        assert_eq!((revolve.capo(), revolve.fine()), (2, 2));
        assert_eq!(revolve.next_action().unwrap(), Action::Reverse { step: 1 });
        assert_eq!((revolve.capo(), revolve.fine()), (1, 1));
    }

    #[test]
    fn test_oldcapo_marks_start_of_run() {
        let mut revolve = Revolve::new(10, 3).unwrap();
        revolve.next_action().unwrap(); // TAKESHOT 0
        revolve.next_action().unwrap(); // ADVANCE 0
        assert_eq!(revolve.oldcapo(), 0);
        assert_eq!(revolve.capo(), 1);
        for _ in 0..3 {
            revolve.next_action().unwrap();
        }
        assert_eq!(revolve.capo(), 4);
        assert_eq!(
            revolve.next_action().unwrap(),
            Action::TakeShot { slot: 1, step: 4 }
        );
        assert_eq!(revolve.slot_step(1), Some(4));
    }
}
