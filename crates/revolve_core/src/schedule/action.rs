//! Actions emitted by the scheduler.

use std::fmt;

/// One decision of a checkpoint schedule.
///
/// Steps are indexed so that step `i` maps state `i` to state `i + 1`.
/// Actions are immutable once emitted; the driver executes each one before
/// asking for the next.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "action", rename_all = "snake_case"))]
pub enum Action {
    /// Take forward step `step` on the live state without recording it.
    Advance {
        /// Step being taken (live state moves from `step` to `step + 1`)
        step: usize,
    },

    /// Copy the live state (at `step`) into `slot`.
    TakeShot {
        /// Destination slot
        slot: usize,
        /// State index held by the live state
        step: usize,
    },

    /// Replace the live state with the contents of `slot`.
    Restore {
        /// Source slot
        slot: usize,
        /// State index stored in the slot
        step: usize,
    },

    /// Adjoint step `step`: consumes forward state `step` and the adjoint
    /// at `step + 1`.
    Reverse {
        /// Step being reversed
        step: usize,
    },

    /// Every step has been reversed.
    Finished,
}

impl Action {
    /// Short upper-case tag of the action kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Action::Advance { .. } => "ADVANCE",
            Action::TakeShot { .. } => "TAKESHOT",
            Action::Restore { .. } => "RESTORE",
            Action::Reverse { .. } => "REVERSE",
            Action::Finished => "FINISHED",
        }
    }

    /// Returns `true` for [`Action::Finished`].
    #[inline]
    pub fn is_finished(&self) -> bool {
        matches!(self, Action::Finished)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Advance { step } => write!(f, "ADVANCE {} -> {}", step, step + 1),
            Action::TakeShot { slot, step } => write!(f, "TAKESHOT step {} -> slot {}", step, slot),
            Action::Restore { slot, step } => write!(f, "RESTORE slot {} -> step {}", slot, step),
            Action::Reverse { step } => write!(f, "REVERSE {}", step),
            Action::Finished => write!(f, "FINISHED"),
        }
    }
}
