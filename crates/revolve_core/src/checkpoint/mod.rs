//! Checkpoint storage for reversed time-stepping.
//!
//! - [`Snapshot`]: explicit deep copy of simulation state
//! - [`Checkpoint`]: a `(step, state)` pair owned by a slot
//! - [`CheckpointStore`]: fixed-capacity arena of slots
//! - [`MemoryBudget`]: derives a slot count from available memory

mod budget;
mod state;
mod store;

pub use budget::MemoryBudget;
pub use state::{Checkpoint, Snapshot};
pub use store::CheckpointStore;
