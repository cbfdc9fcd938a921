//! Optimal checkpoint scheduling.
//!
//! - [`Revolve`]: the action-by-action state machine
//! - [`Action`]: decisions handed to the driver
//! - [`cost`]: binomial cost model and placement rule

mod action;
pub mod cost;
mod revolve;

pub use action::Action;
pub use revolve::{Phase, Revolve, ScheduleStats};
