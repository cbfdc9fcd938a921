//! CLI command implementations
//!
//! Each submodule implements a specific CLI command.

pub mod check;
pub mod cost;
pub mod plan;
pub mod verify;
