//! Plan command implementation
//!
//! Prints the complete action sequence for a problem size.

use serde::Serialize;
use tracing::info;

use revolve_core::checkpoint::MemoryBudget;
use revolve_core::schedule::cost::adjust_slots;
use revolve_core::schedule::ScheduleStats;
use revolve_core::{Action, Revolve, RevolveConfig};

use crate::config::{CliConfig, OutputFormat};
use crate::{CliError, Result};

/// Where the slot count of a plan came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotSource {
    /// `--slots` flag
    Flag,
    /// `default_slots` setting
    Config,
    /// Memory budget divided by the snapshot size
    Budget,
    /// Balanced against repetitions
    Adjusted,
}

/// Serialisable plan output.
#[derive(Debug, Serialize)]
pub struct PlanReport {
    /// Number of time steps
    pub n_steps: usize,
    /// Number of checkpoint slots
    pub n_slots: usize,
    /// Origin of `n_slots`
    pub slot_source: SlotSource,
    /// Action counts
    pub stats: ScheduleStats,
    /// Every action, `Finished` included
    pub actions: Vec<Action>,
}

/// Resolve the slot count: flag, then config, then memory budget, then
/// [`adjust_slots`].
pub fn resolve_slots(
    n_steps: usize,
    slots: Option<usize>,
    state_bytes: Option<usize>,
    config: &CliConfig,
) -> Result<(RevolveConfig, SlotSource)> {
    let builder = RevolveConfig::builder().n_steps(n_steps);
    let (builder, source) = if let Some(n) = slots {
        (builder.n_slots(n), SlotSource::Flag)
    } else if let Some(n) = config.default_slots {
        (builder.n_slots(n), SlotSource::Config)
    } else if let (Some(mb), Some(bytes)) = (config.memory_budget_mb, state_bytes) {
        (
            builder.memory_budget(MemoryBudget::from_mb(mb), bytes),
            SlotSource::Budget,
        )
    } else {
        (builder.adjusted_slots(), SlotSource::Adjusted)
    };
    Ok((builder.build()?, source))
}

/// Run the scheduler to completion, recording every action
pub fn build_plan(config: RevolveConfig, slot_source: SlotSource) -> Result<PlanReport> {
    let mut scheduler = Revolve::from_config(&config);
    let mut actions = Vec::new();
    loop {
        let action = scheduler.next_action().map_err(revolve_core::RevolveError::from)?;
        actions.push(action);
        if action.is_finished() {
            break;
        }
    }

    Ok(PlanReport {
        n_steps: config.n_steps(),
        n_slots: config.n_slots(),
        slot_source,
        stats: *scheduler.stats(),
        actions,
    })
}

/// Run the plan command
pub fn run(
    n_steps: usize,
    slots: Option<usize>,
    state_bytes: Option<usize>,
    config: &CliConfig,
) -> Result<()> {
    if n_steps == 0 {
        return Err(CliError::InvalidArgument(
            "steps must be at least 1".to_string(),
        ));
    }
    let (revolve_config, source) = resolve_slots(n_steps, slots, state_bytes, config)?;
    info!(
        n_steps,
        n_slots = revolve_config.n_slots(),
        source = ?source,
        suggested = adjust_slots(n_steps),
        "Planning schedule"
    );

    let report = build_plan(revolve_config, source)?;

    match config.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Table => print_table(&report),
    }
    Ok(())
}

fn print_table(report: &PlanReport) {
    println!(
        "\nSchedule for {} steps with {} slots ({:?})",
        report.n_steps, report.n_slots, report.slot_source
    );
    println!("┌────────┬──────────────────────────────┐");
    println!("│ #      │ Action                       │");
    println!("├────────┼──────────────────────────────┤");
    for (index, action) in report.actions.iter().enumerate() {
        println!("│ {:<6} │ {:<28} │", index, action.to_string());
    }
    println!("└────────┴──────────────────────────────┘");

    let stats = &report.stats;
    println!(
        "advances {}  takeshots {}  restores {}  reverses {}  peak slots {}",
        stats.advances, stats.takeshots, stats.restores, stats.reverses, stats.peak_resident
    );
    println!(
        "forward steps {} ({} recomputed)",
        stats.forward_steps(),
        stats.recomputations(report.n_steps)
    );
}
