//! Collaborator contracts for the driver.
//!
//! The scheduler never touches physics. It only needs a way to advance the
//! live state by one step and a way to take one adjoint step given the
//! forward state at that step.

/// Advances a simulation state by one step.
///
/// Must be deterministic: replaying from a restored checkpoint has to
/// reproduce the original forward trajectory bit for bit.
///
/// Any `FnMut(&mut S, usize)` closure is a forward operator.
pub trait ForwardOperator<S> {
    /// Moves `state` from step `step` to step `step + 1` in place.
    fn step_forward(&mut self, state: &mut S, step: usize);
}

impl<S, F> ForwardOperator<S> for F
where
    F: FnMut(&mut S, usize),
{
    #[inline]
    fn step_forward(&mut self, state: &mut S, step: usize) {
        self(state, step)
    }
}

/// Takes one adjoint step.
///
/// Owns whatever gradient the traversal accumulates; the driver only
/// sequences the calls.
pub trait AdjointOperator<S> {
    /// Adjoint state carried backwards through time.
    type Adjoint;

    /// Maps the adjoint at `step + 1` to the adjoint at `step` in place,
    /// given the forward state at `step`.
    fn step_backward(&mut self, forward: &S, adjoint: &mut Self::Adjoint, step: usize);
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Doubling;

    impl AdjointOperator<f64> for Doubling {
        type Adjoint = f64;

        fn step_backward(&mut self, forward: &f64, adjoint: &mut f64, _step: usize) {
            *adjoint *= 2.0 * forward;
        }
    }

    #[test]
    fn test_closure_is_forward_operator() {
        let mut calls = Vec::new();
        let mut op = |state: &mut f64, step: usize| {
            calls.push(step);
            *state += 1.0;
        };
        let mut state = 0.0;
        op.step_forward(&mut state, 0);
        op.step_forward(&mut state, 1);
        assert_eq!(state, 2.0);
        assert_eq!(calls, vec![0, 1]);
    }

    #[test]
    fn test_adjoint_operator_updates_in_place() {
        let mut adjoint = 1.0;
        Doubling.step_backward(&3.0, &mut adjoint, 0);
        assert_eq!(adjoint, 6.0);
    }
}
