//! Binomial cost model for optimal checkpointing.
//!
//! With `c` checkpoint slots and `r` allowed repetitions, at most
//! `C(c + r, c)` steps can be reversed (Griewank, 1992). Inverting that
//! bound gives the repetition number of a run, and from it the minimal
//! number of forward steps any schedule must take, the last step before
//! the turn included:
//!
//! ```text
//! t(l, c) = r * l - C(c + r, c + 1) + 1,   r = min { r : C(c + r, c) >= l }
//! ```
//!
//! [`place_checkpoint`] is the placement rule of Algorithm 799 that attains
//! this bound; the [`Revolve`](super::Revolve) state machine delegates every
//! jump decision to it.

use crate::error::ScheduleError;

/// Binomial coefficient `C(n, k)`, or `None` on `u64` overflow.
///
/// # Examples
///
/// ```
/// use revolve_core::schedule::cost::binomial;
///
/// assert_eq!(binomial(5, 2), Some(10));
/// assert_eq!(binomial(3, 4), Some(0));
/// assert_eq!(binomial(200, 100), None);
/// ```
pub fn binomial(n: u64, k: u64) -> Option<u64> {
    if k > n {
        return Some(0);
    }
    let k = k.min(n - k);
    let mut acc: u128 = 1;
    for i in 0..k {
        // acc == C(n, i) here, so the division is exact
        acc = acc * u128::from(n - i) / u128::from(i + 1);
        if acc > u128::from(u64::MAX) {
            return None;
        }
    }
    Some(acc as u64)
}

/// Longest run reversible with `slots` checkpoints and `reps` repetitions.
///
/// Saturates at `u64::MAX`.
#[inline]
pub fn max_steps(slots: usize, reps: usize) -> u64 {
    binomial((slots as u64).saturating_add(reps as u64), slots as u64).unwrap_or(u64::MAX)
}

/// Smallest `r` such that `C(r + slots, slots) >= steps`.
///
/// Returns `None` when `slots == 0`, since no finite repetition count
/// reverses more than one step without storage.
pub fn repetition_number(steps: usize, slots: usize) -> Option<usize> {
    if slots == 0 {
        return None;
    }
    let target = steps as u64;
    let mut reps = 0;
    while max_steps(slots, reps) < target {
        reps += 1;
    }
    Some(reps)
}

/// Minimal number of single-step forward advances needed to reverse
/// `steps` steps with `slots` checkpoints.
///
/// Includes the advance from `steps - 1` to the terminal state at the turn.
///
/// # Examples
///
/// ```
/// use revolve_core::schedule::cost::forward_cost;
///
/// // Store-all: every step advanced exactly once
/// assert_eq!(forward_cost(10, 10), Some(10));
/// // Single slot: quadratic recomputation
/// assert_eq!(forward_cost(4, 1), Some(7));
/// assert_eq!(forward_cost(10, 3), Some(16));
/// ```
pub fn forward_cost(steps: usize, slots: usize) -> Option<u64> {
    // Slots beyond one per step are never used
    let slots = slots.min(steps.max(1));
    let reps = repetition_number(steps, slots)?;
    let bound = binomial((slots + reps) as u64, (slots + 1) as u64)?;
    (reps as u64)
        .checked_mul(steps as u64)?
        .checked_sub(bound)?
        .checked_add(1)
}

/// Forward advances per simulated step.
///
/// Equals `1.0` when nothing is recomputed.
pub fn recomputation_ratio(steps: usize, slots: usize) -> Option<f64> {
    if steps == 0 {
        return None;
    }
    let advances = forward_cost(steps, slots)?;
    Some(advances as f64 / steps as f64)
}

/// Slot count that balances storage against repetitions for `steps` steps.
///
/// Picks `(slots, reps)` on the diagonal of the binomial table that just
/// covers `steps`, then trims whichever of the two is larger while the
/// range still suffices. Always at least 1.
///
/// # Examples
///
/// ```
/// use revolve_core::schedule::cost::adjust_slots;
///
/// assert_eq!(adjust_slots(10), 3);
/// assert_eq!(adjust_slots(1000), 7);
/// ```
pub fn adjust_slots(steps: usize) -> usize {
    fn range(slots: i64, reps: i64) -> u64 {
        if slots < 0 || reps < 0 {
            0
        } else {
            max_steps(slots as usize, reps as usize)
        }
    }

    let steps = steps as u64;
    let (mut slots, mut reps, mut shift) = (1_i64, 1_i64, 0_i64);
    while range(slots + shift, reps + shift) > steps {
        shift -= 1;
    }
    while range(slots + shift, reps + shift) < steps {
        shift += 1;
    }
    slots += shift;
    reps += shift;

    let mut trimmed = None;
    while range(slots, reps) >= steps {
        if slots > reps {
            slots -= 1;
            trimmed = Some(true);
        } else {
            reps -= 1;
            trimmed = Some(false);
        }
    }
    if trimmed == Some(true) {
        slots += 1;
    }
    slots.max(1) as usize
}

/// Next forward target for a segment `[capo, fine]` with `free_slots`
/// unused checkpoints, one of which has just been committed at `capo`.
///
/// Requires `fine - capo >= 2`. The returned position is strictly greater
/// than `capo` and strictly less than `fine`.
///
/// # Errors
///
/// [`ScheduleError::SlotsExhausted`] when `free_slots == 0`,
/// [`ScheduleError::RangeOverflow`] when the binomial range leaves `u64`.
pub fn place_checkpoint(capo: usize, fine: usize, free_slots: usize) -> Result<usize, ScheduleError> {
    if capo > fine {
        return Err(ScheduleError::PointerOrder { capo, fine });
    }
    if free_slots == 0 {
        return Err(ScheduleError::SlotsExhausted {
            required: 1,
            available: 0,
        });
    }

    let steps = (fine - capo) as u64;
    let ds = free_slots as u64;
    let overflow = ScheduleError::RangeOverflow {
        steps: fine - capo,
        free_slots,
    };

    let mut reps: u64 = 0;
    let mut range: u64 = 1;
    while range < steps {
        reps += 1;
        range = range
            .checked_mul(reps + ds)
            .ok_or_else(|| overflow.clone())?
            / reps;
    }

    let bino1 = range * reps / (ds + reps);
    let bino2 = if ds > 1 { bino1 * ds / (ds + reps - 1) } else { 1 };
    let bino3 = match ds {
        1 => 0,
        2 => 1,
        _ => bino2 * (ds - 1) / (ds + reps - 2),
    };
    let bino4 = bino2 * (reps - 1) / ds;
    let bino5 = match ds {
        1 | 2 => 0,
        3 => 1,
        _ => bino3 * (ds - 2) / reps,
    };

    let jump = if steps <= bino1 + bino3 {
        bino4
    } else if steps >= range - bino5 {
        bino1
    } else {
        steps - bino2 - bino3
    };

    Ok(capo + (jump.max(1) as usize))
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================================================
    // Binomial Tests
    // ========================================================================

    #[test]
    fn test_binomial_small_values() {
        assert_eq!(binomial(0, 0), Some(1));
        assert_eq!(binomial(4, 0), Some(1));
        assert_eq!(binomial(4, 4), Some(1));
        assert_eq!(binomial(6, 3), Some(20));
        assert_eq!(binomial(10, 7), Some(120));
    }

    #[test]
    fn test_binomial_k_greater_than_n() {
        assert_eq!(binomial(2, 3), Some(0));
    }

    #[test]
    fn test_binomial_overflow() {
        assert_eq!(binomial(68, 34), None);
        assert!(binomial(66, 33).is_some());
    }

    #[test]
    fn test_max_steps_saturates() {
        assert_eq!(max_steps(3, 2), 10);
        assert_eq!(max_steps(100, 100), u64::MAX);
    }

    // ========================================================================
    // Repetition Number Tests
    // ========================================================================

    #[test]
    fn test_repetition_number() {
        assert_eq!(repetition_number(1, 1), Some(0));
        assert_eq!(repetition_number(10, 3), Some(2));
        assert_eq!(repetition_number(11, 3), Some(3));
        assert_eq!(repetition_number(1000, 10), Some(4));
    }

    #[test]
    fn test_repetition_number_single_slot() {
        for steps in 1..50 {
            assert_eq!(repetition_number(steps, 1), Some(steps - 1));
        }
    }

    #[test]
    fn test_repetition_number_no_slots() {
        assert_eq!(repetition_number(10, 0), None);
    }

    // ========================================================================
    // Forward Cost Tests
    // ========================================================================

    #[test]
    fn test_forward_cost_reference_values() {
        assert_eq!(forward_cost(1, 1), Some(1));
        assert_eq!(forward_cost(2, 1), Some(2));
        assert_eq!(forward_cost(5, 2), Some(7));
        assert_eq!(forward_cost(6, 2), Some(9));
        assert_eq!(forward_cost(10, 3), Some(16));
        assert_eq!(forward_cost(100, 10), Some(223));
        assert_eq!(forward_cost(1000, 10), Some(3637));
    }

    #[test]
    fn test_forward_cost_single_slot_is_triangular() {
        for steps in 1..40_u64 {
            let expected = steps * (steps - 1) / 2 + 1;
            assert_eq!(forward_cost(steps as usize, 1), Some(expected));
        }
    }

    #[test]
    fn test_forward_cost_store_all() {
        for steps in 1..30 {
            assert_eq!(forward_cost(steps, steps), Some(steps as u64));
            assert_eq!(forward_cost(steps, steps + 5), Some(steps as u64));
        }
    }

    #[test]
    fn test_forward_cost_monotone_in_slots() {
        let steps = 200;
        let mut previous = u64::MAX;
        for slots in 1..20 {
            let cost = forward_cost(steps, slots).unwrap();
            assert!(cost <= previous);
            previous = cost;
        }
    }

    #[test]
    fn test_recomputation_ratio() {
        assert_eq!(recomputation_ratio(0, 3), None);
        let ratio = recomputation_ratio(10, 10).unwrap();
        assert!((ratio - 1.0).abs() < 1e-12);
        let ratio = recomputation_ratio(10, 3).unwrap();
        assert!((ratio - 1.6).abs() < 1e-12);
    }

    // ========================================================================
    // Adjust Tests
    // ========================================================================

    #[test]
    fn test_adjust_slots_reference_values() {
        assert_eq!(adjust_slots(1), 1);
        assert_eq!(adjust_slots(2), 1);
        assert_eq!(adjust_slots(3), 2);
        assert_eq!(adjust_slots(5), 2);
        assert_eq!(adjust_slots(20), 3);
        assert_eq!(adjust_slots(100), 5);
        assert_eq!(adjust_slots(10_000), 8);
    }

    // ========================================================================
    // Placement Tests
    // ========================================================================

    #[test]
    fn test_place_checkpoint_stays_inside_segment() {
        for free in 1..6 {
            for len in 2..60 {
                let next = place_checkpoint(10, 10 + len, free).unwrap();
                assert!(next > 10 && next < 10 + len, "free={free} len={len}");
            }
        }
    }

    #[test]
    fn test_place_checkpoint_single_slot_runs_to_end() {
        // One free slot: nothing to split, advance to the step before fine
        assert_eq!(place_checkpoint(0, 4, 1).unwrap(), 3);
    }

    #[test]
    fn test_place_checkpoint_reference_split() {
        // 10 steps with 3 slots: first split at 4
        assert_eq!(place_checkpoint(0, 10, 3).unwrap(), 4);
        assert_eq!(place_checkpoint(4, 10, 2).unwrap(), 7);
    }

    #[test]
    fn test_place_checkpoint_no_free_slots() {
        let err = place_checkpoint(0, 5, 0).unwrap_err();
        assert!(matches!(err, ScheduleError::SlotsExhausted { .. }));
    }

    #[test]
    fn test_place_checkpoint_pointer_order() {
        let err = place_checkpoint(6, 5, 2).unwrap_err();
        assert_eq!(err, ScheduleError::PointerOrder { capo: 6, fine: 5 });
    }
}
