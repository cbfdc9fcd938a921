//! CLI error types

use thiserror::Error;

use crate::config::ConfigError;

/// Errors surfaced by CLI commands
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid command line argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration loading failed
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Scheduling or traversal failed
    #[error(transparent)]
    Revolve(#[from] revolve_core::RevolveError),

    /// Output serialisation failed
    #[error("Serialisation error: {0}")]
    Serialisation(#[from] serde_json::Error),

    /// Scheduler self-test found a non-optimal schedule
    #[error("Self-test failed: {0}")]
    CheckFailed(String),

    /// Checkpointed and store-all gradients differ
    #[error("Verification failed: gradient error {error:e} (expected exactly 0)")]
    VerificationFailed {
        /// L2 norm of the gradient difference
        error: f64,
    },
}

impl From<revolve_core::ConfigError> for CliError {
    fn from(err: revolve_core::ConfigError) -> Self {
        CliError::Revolve(err.into())
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CliError::InvalidArgument("bad format".to_string());
        assert_eq!(err.to_string(), "Invalid argument: bad format");

        let err = CliError::VerificationFailed { error: 1.5e-3 };
        assert!(err.to_string().contains("1.5e-3"));
    }

    #[test]
    fn test_core_config_error_converts() {
        let err: CliError = revolve_core::ConfigError::InvalidSlotCount(0).into();
        assert!(matches!(
            err,
            CliError::Revolve(revolve_core::RevolveError::Config(_))
        ));
    }
}
