//! Check command implementation
//!
//! Reports the build configuration and replays a grid of small schedules
//! against the closed-form cost model.

use tracing::{info, warn};

use revolve_core::schedule::cost::forward_cost;
use revolve_core::{Action, Revolve};

use crate::config::CliConfig;
use crate::{CliError, Result};

/// Largest step count replayed by the self-test.
const CHECK_STEPS: usize = 64;
/// Largest slot count replayed by the self-test.
const CHECK_SLOTS: usize = 8;

/// Replay every `(steps, slots)` pair up to the given limits and return the
/// pairs whose schedule is not optimal or does not reverse every step.
pub fn self_test(max_steps: usize, max_slots: usize) -> Result<Vec<(usize, usize)>> {
    let mut failures = Vec::new();
    for n_steps in 1..=max_steps {
        for n_slots in 1..=max_slots {
            let schedule = Revolve::new(n_steps, n_slots)?
                .schedule()
                .map_err(revolve_core::RevolveError::from)?;

            let advances = schedule
                .iter()
                .filter(|a| matches!(a, Action::Advance { .. }))
                .count() as u64;
            let reversed: Vec<usize> = schedule
                .iter()
                .filter_map(|a| match a {
                    Action::Reverse { step } => Some(*step),
                    _ => None,
                })
                .collect();

            let in_order = reversed.iter().copied().eq((0..n_steps).rev());
            if Some(advances) != forward_cost(n_steps, n_slots) || !in_order {
                warn!(n_steps, n_slots, advances, "Schedule check failed");
                failures.push((n_steps, n_slots));
            }
        }
    }
    Ok(failures)
}

/// Run the check command
pub fn run(config: &CliConfig) -> Result<()> {
    println!("revolve {}", env!("CARGO_PKG_VERSION"));
    println!("  log level:      {}", config.log_level);
    println!("  output format:  {}", config.format);
    match config.default_slots {
        Some(slots) => println!("  default slots:  {}", slots),
        None => println!("  default slots:  (adjusted per problem)"),
    }
    match config.memory_budget_mb {
        Some(mb) => println!("  memory budget:  {} MiB", mb),
        None => println!("  memory budget:  (none)"),
    }

    info!(
        max_steps = CHECK_STEPS,
        max_slots = CHECK_SLOTS,
        "Replaying schedules"
    );
    let failures = self_test(CHECK_STEPS, CHECK_SLOTS)?;
    if !failures.is_empty() {
        return Err(CliError::CheckFailed(format!(
            "{} schedules not optimal, first {:?}",
            failures.len(),
            failures[0]
        )));
    }
    println!(
        "  self-test:      {} schedules optimal",
        CHECK_STEPS * CHECK_SLOTS
    );
    Ok(())
}
