//! Verify command implementation
//!
//! Computes the misfit gradient of a 1-D acoustic survey twice, once with
//! every wavefield stored and once through the checkpoint driver, and
//! requires the two to agree exactly.

use serde::Serialize;
use tracing::info;

use revolve_core::{RevolveConfig, Revolver, RunStats};

use crate::config::{CliConfig, OutputFormat};
use crate::wave::{gradient_store_all, two_layer, Propagator, Survey, WaveAdjoint};
use crate::{CliError, Result};

/// Grid spacing in metres.
const DX: f64 = 10.0;
/// Slow layer velocity in km/s.
const V_UPPER: f64 = 1.5;
/// Fast layer velocity in km/s.
const V_LOWER: f64 = 2.5;
/// Ricker peak frequency in kHz.
const PEAK_FREQUENCY: f64 = 0.010;

/// Verification outcome.
#[derive(Debug, Serialize)]
pub struct VerifyReport {
    /// Grid points
    pub nx: usize,
    /// Time steps
    pub n_steps: usize,
    /// Checkpoint slots used by the checkpointed run
    pub n_slots: usize,
    /// Misfit from the store-all run
    pub misfit_store_all: f64,
    /// Misfit from the checkpointed run
    pub misfit_checkpointed: f64,
    /// Misfit from a plain forward modelling run
    pub misfit_forward: f64,
    /// L2 norm of the gradient difference
    pub error: f64,
    /// Driver statistics of the checkpointed run
    pub stats: RunStats,
}

/// Run both gradients and compare them
pub fn verify(nx: usize, duration: f64, slots: Option<usize>) -> Result<VerifyReport> {
    if nx < 3 {
        return Err(CliError::InvalidArgument(format!(
            "grid needs at least 3 points, got {}",
            nx
        )));
    }
    if duration.is_nan() || duration <= 0.0 {
        return Err(CliError::InvalidArgument(format!(
            "duration must be positive, got {}",
            duration
        )));
    }

    let survey = Survey::centered(nx, DX, V_LOWER, duration, PEAK_FREQUENCY);
    let truth = two_layer(nx, nx / 2 + 1, V_UPPER, V_LOWER);
    let background = vec![V_UPPER * V_UPPER; nx];
    let observed = survey.model(&truth);

    let config = match slots {
        Some(n) => RevolveConfig::new(survey.n_steps, n)?,
        None => RevolveConfig::builder()
            .n_steps(survey.n_steps)
            .adjusted_slots()
            .build()?,
    };
    info!(
        nx,
        n_steps = survey.n_steps,
        n_slots = config.n_slots(),
        dt = survey.dt,
        "Running gradient verification"
    );

    let (g1, f1) = gradient_store_all(&survey, &background, &observed);

    let mut revolver = Revolver::new(
        config,
        Propagator::new(&survey, &background),
        WaveAdjoint::new(&survey, &background, &observed),
        survey.initial_state(),
    );
    let terminal = revolver.apply_forward()?;
    let seed = revolver.adjoint_operator_mut().seed(&terminal);
    revolver.apply_reverse(seed)?;
    let stats = revolver.stats();
    let (_, adjoint) = revolver.into_operators();
    let (g2, f2) = adjoint.into_result();

    let error = g1
        .iter()
        .zip(&g2)
        .map(|(a, b)| (a - b) * (a - b))
        .sum::<f64>()
        .sqrt();

    Ok(VerifyReport {
        nx,
        n_steps: survey.n_steps,
        n_slots: config.n_slots(),
        misfit_store_all: f1,
        misfit_checkpointed: f2,
        misfit_forward: survey.misfit(&background, &observed),
        error,
        stats,
    })
}

/// Run the verify command
pub fn run(nx: usize, duration: f64, slots: Option<usize>, config: &CliConfig) -> Result<()> {
    let slots = slots.or(config.default_slots);
    let report = verify(nx, duration, slots)?;

    match config.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Table => {
            println!(
                "\n1-D acoustic survey: {} points, {} steps, {} slots",
                report.nx, report.n_steps, report.n_slots
            );
            println!("  misfit (store-all):    {:e}", report.misfit_store_all);
            println!("  misfit (checkpointed): {:e}", report.misfit_checkpointed);
            println!("  misfit (forward only): {:e}", report.misfit_forward);
            println!(
                "  forward steps: {} ({} recomputed), restores: {}, peak slots: {}",
                report.stats.forward_calls,
                report.stats.schedule.recomputations(report.n_steps),
                report.stats.schedule.restores,
                report.stats.peak_slots_in_use
            );
            println!("Error: {:e}", report.error);
        }
    }

    if report.error != 0.0 || report.misfit_store_all != report.misfit_checkpointed {
        return Err(CliError::VerificationFailed {
            error: report.error,
        });
    }
    info!("Verification passed");
    Ok(())
}
