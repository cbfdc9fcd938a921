//! Cost command implementation
//!
//! Tabulates the optimal recomputation cost over a range of slot counts.

use serde::Serialize;
use tracing::info;

use revolve_core::schedule::cost::{forward_cost, recomputation_ratio, repetition_number};

use crate::config::{CliConfig, OutputFormat};
use crate::{CliError, Result};

/// One row of the cost table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostRow {
    /// Checkpoint slots
    pub slots: usize,
    /// Maximum number of times any step is recomputed
    pub repetitions: usize,
    /// Single-step advances, the turn step included
    pub advances: u64,
    /// Advances beyond one per time step
    pub recomputed: u64,
    /// Forward steps per time step
    pub ratio: f64,
}

/// Compute cost rows for `min_slots..=max_slots`
///
/// Rows whose binomial terms leave `u64` are skipped.
pub fn cost_table(n_steps: usize, min_slots: usize, max_slots: usize) -> Result<Vec<CostRow>> {
    if n_steps == 0 {
        return Err(CliError::InvalidArgument(
            "steps must be at least 1".to_string(),
        ));
    }
    if min_slots == 0 || min_slots > max_slots {
        return Err(CliError::InvalidArgument(format!(
            "slot range {}..={} must be non-empty and start at 1 or more",
            min_slots, max_slots
        )));
    }

    let rows = (min_slots..=max_slots)
        .filter_map(|slots| {
            let advances = forward_cost(n_steps, slots)?;
            Some(CostRow {
                slots,
                repetitions: repetition_number(n_steps, slots)?,
                advances,
                recomputed: advances.saturating_sub(n_steps as u64),
                ratio: recomputation_ratio(n_steps, slots)?,
            })
        })
        .collect();
    Ok(rows)
}

/// Run the cost command
pub fn run(n_steps: usize, min_slots: usize, max_slots: usize, config: &CliConfig) -> Result<()> {
    info!(n_steps, min_slots, max_slots, "Computing cost table");
    let rows = cost_table(n_steps, min_slots, max_slots)?;

    match config.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
        OutputFormat::Table => {
            println!("\nOptimal cost for {} steps", n_steps);
            println!("┌────────┬────────┬────────────┬────────────┬──────────┐");
            println!("│ Slots  │ Reps   │ Advances   │ Recomputed │ Ratio    │");
            println!("├────────┼────────┼────────────┼────────────┼──────────┤");
            for row in &rows {
                println!(
                    "│ {:<6} │ {:<6} │ {:<10} │ {:<10} │ {:<8.3} │",
                    row.slots, row.repetitions, row.advances, row.recomputed, row.ratio
                );
            }
            println!("└────────┴────────┴────────────┴────────────┴──────────┘");
        }
    }
    Ok(())
}
