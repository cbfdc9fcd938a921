//! Error types for checkpoint scheduling.
//!
//! Errors are split by the component that raises them. None of them is
//! transient: every action is deterministic given the scheduler state, so
//! an error always points at a configuration mistake or a logic bug and is
//! never retried.

use thiserror::Error;

/// Invalid scheduler configuration.
///
/// Raised at construction; no partially built scheduler is ever returned.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Step count must be at least 1.
    #[error("Invalid step count {0}: must be at least 1")]
    InvalidStepCount(usize),

    /// Slot count must be at least 1.
    #[error("Invalid checkpoint slot count {0}: must be at least 1 (use Revolve::recompute_all for a single initial snapshot)")]
    InvalidSlotCount(usize),

    /// Required builder parameter was never set.
    #[error("Missing configuration parameter '{0}'")]
    MissingParameter(&'static str),
}

/// Checkpoint store misuse by the driver.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Slot index outside `[0, capacity)`.
    #[error("Checkpoint slot {slot} out of range (capacity: {capacity})")]
    Capacity {
        /// The requested slot
        slot: usize,
        /// Configured number of slots
        capacity: usize,
    },

    /// Restore of a slot that was never saved.
    #[error("Checkpoint slot {slot} is empty")]
    EmptySlot {
        /// The requested slot
        slot: usize,
    },
}

/// Internal scheduler invariant violation.
///
/// Indicates a bug in the schedule bookkeeping. Fatal.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ScheduleError {
    /// Placement needs more checkpoints than there are slots.
    #[error("Schedule requires checkpoint {required} but only {available} slots exist")]
    SlotsExhausted {
        /// Number of checkpoints the placement needs resident
        required: usize,
        /// Configured number of slots
        available: usize,
    },

    /// Binomial range computation overflowed `u64`.
    #[error("Binomial range overflow for {steps} steps with {free_slots} free slots")]
    RangeOverflow {
        /// Remaining steps in the segment
        steps: usize,
        /// Free slots at the time of placement
        free_slots: usize,
    },

    /// Pointers left their admissible order (`capo <= fine`).
    #[error("Scheduler pointers out of order: capo {capo} > fine {fine}")]
    PointerOrder {
        /// Forward pointer
        capo: usize,
        /// Adjoint pointer
        fine: usize,
    },

    /// The live state is not at the step an action expects.
    #[error("Live state at step {actual}, action expects step {expected}")]
    LiveStepMismatch {
        /// Step the action refers to
        expected: usize,
        /// Step of the live state
        actual: usize,
    },

    /// The driver observed an action that its phase cannot execute.
    #[error("Unexpected action in {phase} phase: {action}")]
    UnexpectedAction {
        /// Driver phase name
        phase: &'static str,
        /// Rendered action
        action: String,
    },
}

/// Any error raised while planning or running a checkpointed traversal.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RevolveError {
    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Checkpoint store misuse.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Scheduler invariant violation.
    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    /// Results of independent traversals cannot be combined.
    #[error("Result {index} has length {actual}, expected {expected}")]
    LengthMismatch {
        /// Position of the offending result in input order
        index: usize,
        /// Length of the first result
        expected: usize,
        /// Length of the offending result
        actual: usize,
    },
}

/// Result type for scheduling operations.
pub type RevolveResult<T> = Result<T, RevolveError>;
