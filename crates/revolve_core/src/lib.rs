//! # revolve_core: Optimal Checkpointing for Adjoint Time-Stepping
//!
//! Reversing a time-stepping simulation needs the forward state at every
//! step in reverse order. Storing all of them is often impossible, so a
//! fixed number of snapshots is kept and the missing states are
//! recomputed. The binomial (Griewank–Walther "revolve") schedule places
//! those snapshots so that the number of recomputed forward steps is
//! minimal.
//!
//! ## Layout
//!
//! - [`schedule`]: the [`Revolve`] state machine and its cost model
//! - [`checkpoint`]: the slot store and the [`Snapshot`](checkpoint::Snapshot) codec
//! - [`driver`]: the [`Revolver`] loop dispatching actions to user operators
//! - [`config`]: validated step and slot counts
//!
//! ## Usage Example
//!
//! ```rust
//! use revolve_core::{Action, Revolve};
//!
//! let schedule = Revolve::new(10, 3).unwrap().schedule().unwrap();
//!
//! let advances = schedule
//!     .iter()
//!     .filter(|a| matches!(a, Action::Advance { .. }))
//!     .count();
//! assert_eq!(advances, 16);
//! assert_eq!(schedule.last(), Some(&Action::Finished));
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: serialisation for [`Action`], [`RevolveConfig`] and statistics

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod checkpoint;
pub mod config;
pub mod driver;
pub mod error;
pub mod schedule;

pub use checkpoint::{CheckpointStore, MemoryBudget};
pub use config::RevolveConfig;
pub use driver::{AdjointOperator, ForwardOperator, Revolver, RunStats};
pub use error::{ConfigError, RevolveError, RevolveResult, ScheduleError, StoreError};
pub use schedule::{Action, Revolve};
