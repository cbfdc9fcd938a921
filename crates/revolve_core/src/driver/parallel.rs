//! Parallel execution of independent traversals.
//!
//! A single schedule is inherently sequential. Independent problems, for
//! example one adjoint per source in a survey, each get their own
//! [`Revolver`](super::Revolver) and run on the rayon pool.

use rayon::prelude::*;

use crate::error::{RevolveError, RevolveResult};

/// Runs `job` on every item in parallel.
///
/// Results are returned in input order.
///
/// # Example
///
/// ```rust
/// use revolve_core::driver::{run_independent, Revolver, AdjointOperator};
/// use revolve_core::RevolveConfig;
///
/// struct Count;
/// impl AdjointOperator<f64> for Count {
///     type Adjoint = usize;
///     fn step_backward(&mut self, _: &f64, n: &mut usize, _: usize) {
///         *n += 1;
///     }
/// }
///
/// let sizes = [4_usize, 9, 16];
/// let results = run_independent(&sizes, |&n_steps| {
///     let config = RevolveConfig::new(n_steps, 2)?;
///     let forward = |x: &mut f64, _: usize| *x += 1.0;
///     Revolver::new(config, forward, Count, 0.0).run(|_| 0)
/// });
///
/// let counts: Vec<usize> = results.into_iter().map(Result::unwrap).collect();
/// assert_eq!(counts, vec![4, 9, 16]);
/// ```
pub fn run_independent<T, R, F>(items: &[T], job: F) -> Vec<RevolveResult<R>>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> RevolveResult<R> + Sync + Send,
{
    tracing::debug!(jobs = items.len(), "running independent traversals");
    items.par_iter().map(job).collect()
}

/// Runs `job` on every item in parallel and sums the returned vectors.
///
/// The summation happens sequentially in input order after all jobs
/// finish, so the result does not depend on thread scheduling.
///
/// # Errors
///
/// Returns the first error in input order, or
/// [`RevolveError::LengthMismatch`] if the jobs return vectors of different
/// lengths. An empty input yields an empty vector.
pub fn sum_independent<T, F>(items: &[T], job: F) -> RevolveResult<Vec<f64>>
where
    T: Sync,
    F: Fn(&T) -> RevolveResult<Vec<f64>> + Sync + Send,
{
    let mut total: Option<Vec<f64>> = None;
    for (index, result) in run_independent(items, job).into_iter().enumerate() {
        let part = result?;
        match &mut total {
            None => total = Some(part),
            Some(acc) if acc.len() != part.len() => {
                return Err(RevolveError::LengthMismatch {
                    index,
                    expected: acc.len(),
                    actual: part.len(),
                });
            }
            Some(acc) => {
                for (a, p) in acc.iter_mut().zip(&part) {
                    *a += p;
                }
            }
        }
    }
    Ok(total.unwrap_or_default())
}
