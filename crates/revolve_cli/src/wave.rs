//! 1-D acoustic wave toy model for gradient verification.
//!
//! Second-order leapfrog in time, three-point Laplacian in space, zero
//! Dirichlet boundaries. The model parameter is the squared velocity `c2`
//! on the grid. The adjoint is the exact discrete transpose of the forward
//! step, so the gradient it accumulates is exact up to rounding.
//!
//! The forward state at step `i` is the pair `(u^{i-1}, u^i)`.

use num_traits::Float;
use revolve_core::driver::{AdjointOperator, ForwardOperator};

/// Wavefield pair `(previous, current)`.
pub type Wavefield<T> = (Vec<T>, Vec<T>);

/// Grid, time axis and acquisition geometry.
#[derive(Clone, Debug, PartialEq)]
pub struct Survey<T> {
    /// Number of grid points
    pub nx: usize,
    /// Grid spacing
    pub dx: T,
    /// Time step
    pub dt: T,
    /// Number of time steps
    pub n_steps: usize,
    /// Source grid index
    pub source: usize,
    /// Receiver grid indices
    pub receivers: Vec<usize>,
    /// Source amplitude at each step
    pub wavelet: Vec<T>,
}

impl<T: Float> Survey<T> {
    /// Builds a survey with a Ricker source in the middle of the grid and
    /// receivers at every grid point.
    ///
    /// `dt` is set to 80% of the CFL limit for `max_velocity`, and the
    /// step count covers `duration`.
    pub fn centered(nx: usize, dx: T, max_velocity: T, duration: T, peak_frequency: T) -> Self {
        let dt = cast::<T>(0.8) * dx / max_velocity;
        let n_steps = (duration / dt).ceil().to_usize().unwrap_or(1).max(1);
        let wavelet = (0..=n_steps)
            .map(|i| ricker(cast::<T>(i as f64) * dt, peak_frequency))
            .collect();
        Self {
            nx,
            dx,
            dt,
            n_steps,
            source: nx / 2,
            receivers: (0..nx).collect(),
            wavelet,
        }
    }

    /// Zero wavefield at step 0.
    pub fn initial_state(&self) -> Wavefield<T> {
        (vec![T::zero(); self.nx], vec![T::zero(); self.nx])
    }

    /// Records receiver traces at every step `0..=n_steps` for `c2`.
    pub fn model(&self, c2: &[T]) -> Vec<Vec<T>> {
        let mut propagator = Propagator { survey: self, c2 };
        let mut state = self.initial_state();
        let mut traces = Vec::with_capacity(self.n_steps + 1);
        traces.push(self.sample(&state.1));
        for step in 0..self.n_steps {
            propagator.step_forward(&mut state, step);
            traces.push(self.sample(&state.1));
        }
        traces
    }

    /// Misfit `0.5 * |d(c2) - observed|^2` over all steps.
    pub fn misfit(&self, c2: &[T], observed: &[Vec<T>]) -> T {
        let half = cast::<T>(0.5);
        self.model(c2)
            .iter()
            .zip(observed)
            .flat_map(|(pred, obs)| pred.iter().zip(obs))
            .fold(T::zero(), |acc, (&p, &o)| acc + half * (p - o) * (p - o))
    }

    fn sample(&self, u: &[T]) -> Vec<T> {
        self.receivers.iter().map(|&r| u[r]).collect()
    }
}

/// Ricker wavelet with peak frequency `f0`, delayed by `1 / f0`.
pub fn ricker<T: Float>(t: T, f0: T) -> T {
    let pi = cast::<T>(std::f64::consts::PI);
    let r = pi * f0 * (t - T::one() / f0);
    let r2 = r * r;
    (T::one() - cast::<T>(2.0) * r2) * (-r2).exp()
}

/// Two-layer squared-velocity model with the interface at `interface`.
pub fn two_layer<T: Float>(nx: usize, interface: usize, upper: T, lower: T) -> Vec<T> {
    (0..nx)
        .map(|i| if i < interface { upper * upper } else { lower * lower })
        .collect()
}

fn cast<T: Float>(value: f64) -> T {
    T::from(value).unwrap_or_else(T::nan)
}

/// `out += scale * L u` on interior points.
fn laplacian<T: Float>(u: &[T], scale: T, out: &mut [T]) {
    for j in 1..u.len().saturating_sub(1) {
        out[j] = out[j] + scale * (u[j - 1] - u[j] - u[j] + u[j + 1]);
    }
}

/// `out += scale * L^T v`.
fn laplacian_transpose<T: Float>(v: &[T], scale: T, out: &mut [T]) {
    for j in 1..v.len().saturating_sub(1) {
        let s = scale * v[j];
        out[j - 1] = out[j - 1] + s;
        out[j] = out[j] - s - s;
        out[j + 1] = out[j + 1] + s;
    }
}

/// Forward leapfrog step.
pub struct Propagator<'a, T> {
    survey: &'a Survey<T>,
    c2: &'a [T],
}

impl<'a, T: Float> Propagator<'a, T> {
    /// Propagator for squared velocity `c2`.
    pub fn new(survey: &'a Survey<T>, c2: &'a [T]) -> Self {
        Self { survey, c2 }
    }
}

impl<T: Float> ForwardOperator<Wavefield<T>> for Propagator<'_, T> {
    fn step_forward(&mut self, state: &mut Wavefield<T>, step: usize) {
        let survey = self.survey;
        let dt2 = survey.dt * survey.dt;
        let inv_dx2 = T::one() / (survey.dx * survey.dx);

        let (prev, curr) = state;
        let mut lap = vec![T::zero(); curr.len()];
        laplacian(curr, inv_dx2, &mut lap);
        lap[survey.source] = lap[survey.source] + survey.wavelet[step];

        // prev becomes u^{i+1}; swap so the pair reads (u^i, u^{i+1})
        for j in 0..curr.len() {
            prev[j] = curr[j] + curr[j] - prev[j] + dt2 * self.c2[j] * lap[j];
        }
        std::mem::swap(prev, curr);
    }
}

/// Discrete adjoint of [`Propagator`] with misfit and gradient accumulation.
///
/// The adjoint pair `(alpha, beta)` holds the sensitivities of the misfit
/// with respect to `(u^{i-1}, u^i)`.
pub struct WaveAdjoint<'a, T> {
    survey: &'a Survey<T>,
    c2: &'a [T],
    observed: &'a [Vec<T>],
    gradient: Vec<T>,
    misfit: T,
}

impl<'a, T: Float> WaveAdjoint<'a, T> {
    /// Adjoint for squared velocity `c2` against `observed` traces.
    pub fn new(survey: &'a Survey<T>, c2: &'a [T], observed: &'a [Vec<T>]) -> Self {
        Self {
            survey,
            c2,
            observed,
            gradient: vec![T::zero(); survey.nx],
            misfit: T::zero(),
        }
    }

    /// Adjoint at the final step: the residual of the terminal wavefield.
    pub fn seed(&mut self, terminal: &Wavefield<T>) -> Wavefield<T> {
        let mut adjoint = (vec![T::zero(); self.survey.nx], vec![T::zero(); self.survey.nx]);
        self.inject_residual(&terminal.1, self.survey.n_steps, &mut adjoint.1);
        adjoint
    }

    /// Consumes the adjoint, returning the gradient and the misfit.
    pub fn into_result(self) -> (Vec<T>, T) {
        (self.gradient, self.misfit)
    }

    fn inject_residual(&mut self, u: &[T], step: usize, beta: &mut [T]) {
        let half = cast::<T>(0.5);
        for (k, &r) in self.survey.receivers.iter().enumerate() {
            let residual = u[r] - self.observed[step][k];
            beta[r] = beta[r] + residual;
            self.misfit = self.misfit + half * residual * residual;
        }
    }
}

impl<T: Float> AdjointOperator<Wavefield<T>> for WaveAdjoint<'_, T> {
    type Adjoint = Wavefield<T>;

    fn step_backward(&mut self, forward: &Wavefield<T>, adjoint: &mut Wavefield<T>, step: usize) {
        let survey = self.survey;
        let dt2 = survey.dt * survey.dt;
        let inv_dx2 = T::one() / (survey.dx * survey.dx);
        let curr = &forward.1;
        let (alpha, beta) = adjoint;

        let mut lap = vec![T::zero(); curr.len()];
        laplacian(curr, inv_dx2, &mut lap);
        lap[survey.source] = lap[survey.source] + survey.wavelet[step];

        let mut weighted = vec![T::zero(); curr.len()];
        for j in 0..curr.len() {
            self.gradient[j] = self.gradient[j] + dt2 * lap[j] * beta[j];
            weighted[j] = dt2 * self.c2[j] * beta[j];
        }

        // (alpha', beta') -> sensitivities of (u^{i-1}, u^i)
        let mut next_beta = vec![T::zero(); curr.len()];
        for j in 0..curr.len() {
            next_beta[j] = alpha[j] + beta[j] + beta[j];
        }
        laplacian_transpose(&weighted, inv_dx2, &mut next_beta);
        for j in 0..curr.len() {
            alpha[j] = -beta[j];
        }
        *beta = next_beta;

        self.inject_residual(curr, step, beta);
    }
}

/// Gradient computed with every wavefield kept in memory.
pub fn gradient_store_all<T: Float>(
    survey: &Survey<T>,
    c2: &[T],
    observed: &[Vec<T>],
) -> (Vec<T>, T) {
    let mut propagator = Propagator::new(survey, c2);
    let mut states = Vec::with_capacity(survey.n_steps + 1);
    states.push(survey.initial_state());
    for step in 0..survey.n_steps {
        let mut next = states[step].clone();
        propagator.step_forward(&mut next, step);
        states.push(next);
    }

    let mut adjoint_op = WaveAdjoint::new(survey, c2, observed);
    let mut adjoint = adjoint_op.seed(&states[survey.n_steps]);
    for step in (0..survey.n_steps).rev() {
        adjoint_op.step_backward(&states[step], &mut adjoint, step);
    }
    adjoint_op.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use revolve_core::{RevolveConfig, Revolver};

    fn small_survey() -> Survey<f64> {
        Survey::centered(41, 10.0, 2.5, 300.0, 0.015)
    }

    fn models(survey: &Survey<f64>) -> (Vec<f64>, Vec<f64>) {
        let truth = two_layer(survey.nx, 25, 1.5, 2.5);
        let background = vec![1.5 * 1.5; survey.nx];
        (truth, background)
    }

    #[test]
    fn test_ricker_peak() {
        let f0 = 0.01;
        assert_relative_eq!(ricker(1.0 / f0, f0), 1.0);
        assert!(ricker(0.0, f0).abs() < 1e-3);
    }

    #[test]
    fn test_survey_respects_cfl() {
        let survey = small_survey();
        assert!(2.5 * survey.dt / survey.dx <= 0.8 + 1e-12);
        assert_eq!(survey.wavelet.len(), survey.n_steps + 1);
    }

    #[test]
    fn test_laplacian_transpose_is_adjoint() {
        let u: Vec<f64> = (0..9).map(|i| (i as f64 * 0.7).sin()).collect();
        let v: Vec<f64> = (0..9).map(|i| (i as f64 * 1.3).cos()).collect();
        let mut lu = vec![0.0; 9];
        let mut ltv = vec![0.0; 9];
        laplacian(&u, 1.0, &mut lu);
        laplacian_transpose(&v, 1.0, &mut ltv);

        let lhs: f64 = lu.iter().zip(&v).map(|(a, b)| a * b).sum();
        let rhs: f64 = u.iter().zip(&ltv).map(|(a, b)| a * b).sum();
        assert_relative_eq!(lhs, rhs, max_relative = 1e-12);
    }

    #[test]
    fn test_wave_reaches_receivers() {
        let survey = small_survey();
        let (truth, _) = models(&survey);
        let traces = survey.model(&truth);
        assert_eq!(traces.len(), survey.n_steps + 1);
        let energy: f64 = traces.iter().flatten().map(|x| x * x).sum();
        assert!(energy > 0.0);
    }

    #[test]
    fn test_misfit_matches_adjoint_accumulation() {
        let survey = small_survey();
        let (truth, background) = models(&survey);
        let observed = survey.model(&truth);

        let (_, misfit) = gradient_store_all(&survey, &background, &observed);
        assert_relative_eq!(misfit, survey.misfit(&background, &observed), max_relative = 1e-12);
        assert!(misfit > 0.0);
    }

    #[test]
    fn test_gradient_matches_finite_difference() {
        let survey = small_survey();
        let (truth, background) = models(&survey);
        let observed = survey.model(&truth);
        let (gradient, _) = gradient_store_all(&survey, &background, &observed);

        // Directional derivative along the lower layer
        let direction: Vec<f64> = (0..survey.nx).map(|i| if i >= 25 { 1.0 } else { 0.0 }).collect();
        let h = 1e-5;
        let shifted = |sign: f64| -> Vec<f64> {
            background
                .iter()
                .zip(&direction)
                .map(|(c, d)| c + sign * h * d)
                .collect()
        };
        let fd = (survey.misfit(&shifted(1.0), &observed) - survey.misfit(&shifted(-1.0), &observed))
            / (2.0 * h);
        let analytic: f64 = gradient.iter().zip(&direction).map(|(g, d)| g * d).sum();

        assert_relative_eq!(analytic, fd, max_relative = 1e-5);
    }

    #[test]
    fn test_checkpointed_gradient_is_exact() {
        let survey = small_survey();
        let (truth, background) = models(&survey);
        let observed = survey.model(&truth);
        let (reference, reference_misfit) = gradient_store_all(&survey, &background, &observed);

        for n_slots in [1, 3, 8] {
            let config = RevolveConfig::new(survey.n_steps, n_slots).unwrap();
            let mut revolver = Revolver::new(
                config,
                Propagator::new(&survey, &background),
                WaveAdjoint::new(&survey, &background, &observed),
                survey.initial_state(),
            );
            let terminal = revolver.apply_forward().unwrap();
            let seed = revolver.adjoint_operator_mut().seed(&terminal);
            revolver.apply_reverse(seed).unwrap();
            let (_, adjoint_op) = revolver.into_operators();
            let (gradient, misfit) = adjoint_op.into_result();

            assert_eq!(gradient, reference, "n_slots={n_slots}");
            assert_eq!(misfit, reference_misfit, "n_slots={n_slots}");
        }
    }
}
