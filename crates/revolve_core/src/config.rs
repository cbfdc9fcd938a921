//! Scheduler configuration.
//!
//! The only tunables of a schedule are the number of steps and the number
//! of checkpoint slots. The builder also derives the slot count from a
//! memory budget or from the classic `adjust` heuristic.

use crate::checkpoint::MemoryBudget;
use crate::error::ConfigError;
use crate::schedule::cost::adjust_slots;

/// Validated `(n_steps, n_slots)` pair.
///
/// # Examples
///
/// ```rust
/// use revolve_core::RevolveConfig;
///
/// let config = RevolveConfig::builder()
///     .n_steps(1000)
///     .n_slots(10)
///     .build()
///     .expect("valid configuration");
///
/// assert_eq!(config.n_steps(), 1000);
/// assert_eq!(config.n_slots(), 10);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawConfig"))]
pub struct RevolveConfig {
    /// Number of time steps.
    n_steps: usize,
    /// Number of checkpoint slots.
    n_slots: usize,
}

impl RevolveConfig {
    /// Creates a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if either count is zero.
    pub fn new(n_steps: usize, n_slots: usize) -> Result<Self, ConfigError> {
        let config = Self { n_steps, n_slots };
        config.validate()?;
        Ok(config)
    }

    /// Creates a new configuration builder.
    #[inline]
    pub fn builder() -> RevolveConfigBuilder {
        RevolveConfigBuilder::default()
    }

    /// Returns the number of time steps.
    #[inline]
    pub fn n_steps(&self) -> usize {
        self.n_steps
    }

    /// Returns the number of checkpoint slots.
    #[inline]
    pub fn n_slots(&self) -> usize {
        self.n_slots
    }

    /// Returns `true` if every state fits in storage, so nothing is
    /// recomputed.
    #[inline]
    pub fn is_store_all(&self) -> bool {
        self.n_slots + 1 >= self.n_steps
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - `n_steps` is 0
    /// - `n_slots` is 0
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_steps == 0 {
            return Err(ConfigError::InvalidStepCount(self.n_steps));
        }
        if self.n_slots == 0 {
            return Err(ConfigError::InvalidSlotCount(self.n_slots));
        }
        Ok(())
    }
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawConfig {
    n_steps: usize,
    n_slots: usize,
}

#[cfg(feature = "serde")]
impl TryFrom<RawConfig> for RevolveConfig {
    type Error = ConfigError;

    fn try_from(raw: RawConfig) -> Result<Self, Self::Error> {
        RevolveConfig::new(raw.n_steps, raw.n_slots)
    }
}

/// How the builder chooses the slot count.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
enum SlotSource {
    #[default]
    Unset,
    Fixed(usize),
    Budget {
        budget: MemoryBudget,
        state_bytes: usize,
    },
    Adjusted,
}

/// Builder for [`RevolveConfig`].
///
/// # Examples
///
/// ```rust
/// use revolve_core::RevolveConfig;
/// use revolve_core::checkpoint::MemoryBudget;
///
/// // 1 MiB of checkpoint memory, 64 KiB per snapshot -> 16 slots
/// let config = RevolveConfig::builder()
///     .n_steps(500)
///     .memory_budget(MemoryBudget::from_mb(1), 64 * 1024)
///     .build()
///     .unwrap();
/// assert_eq!(config.n_slots(), 16);
/// ```
#[derive(Clone, Debug, Default)]
pub struct RevolveConfigBuilder {
    n_steps: Option<usize>,
    slots: SlotSource,
}

impl RevolveConfigBuilder {
    /// Sets the number of time steps.
    #[inline]
    pub fn n_steps(mut self, n_steps: usize) -> Self {
        self.n_steps = Some(n_steps);
        self
    }

    /// Sets a fixed number of checkpoint slots.
    #[inline]
    pub fn n_slots(mut self, n_slots: usize) -> Self {
        self.slots = SlotSource::Fixed(n_slots);
        self
    }

    /// Derives the slot count from a memory budget and snapshot size.
    #[inline]
    pub fn memory_budget(mut self, budget: MemoryBudget, state_bytes: usize) -> Self {
        self.slots = SlotSource::Budget {
            budget,
            state_bytes,
        };
        self
    }

    /// Derives the slot count from the step count alone, balancing slots
    /// against repetitions.
    #[inline]
    pub fn adjusted_slots(mut self) -> Self {
        self.slots = SlotSource::Adjusted;
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - `n_steps` not set or zero
    /// - no slot source set, or it yields zero slots
    pub fn build(self) -> Result<RevolveConfig, ConfigError> {
        let n_steps = self
            .n_steps
            .ok_or(ConfigError::MissingParameter("n_steps"))?;

        let n_slots = match self.slots {
            SlotSource::Unset => return Err(ConfigError::MissingParameter("n_slots")),
            SlotSource::Fixed(n) => n,
            SlotSource::Budget {
                budget,
                state_bytes,
            } => budget.max_slots(state_bytes),
            SlotSource::Adjusted => adjust_slots(n_steps),
        };

        RevolveConfig::new(n_steps, n_slots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_new_valid() {
        let config = RevolveConfig::new(100, 5).unwrap();
        assert_eq!(config.n_steps(), 100);
        assert_eq!(config.n_slots(), 5);
        assert!(!config.is_store_all());
    }

    #[test]
    fn test_config_new_invalid() {
        assert_eq!(
            RevolveConfig::new(0, 5).unwrap_err(),
            ConfigError::InvalidStepCount(0)
        );
        assert_eq!(
            RevolveConfig::new(5, 0).unwrap_err(),
            ConfigError::InvalidSlotCount(0)
        );
    }

    #[test]
    fn test_is_store_all() {
        assert!(RevolveConfig::new(10, 10).unwrap().is_store_all());
        assert!(RevolveConfig::new(10, 9).unwrap().is_store_all());
        assert!(!RevolveConfig::new(10, 8).unwrap().is_store_all());
    }

    #[test]
    fn test_builder_missing_steps() {
        let err = RevolveConfig::builder().n_slots(3).build().unwrap_err();
        assert_eq!(err, ConfigError::MissingParameter("n_steps"));
    }

    #[test]
    fn test_builder_missing_slots() {
        let err = RevolveConfig::builder().n_steps(3).build().unwrap_err();
        assert_eq!(err, ConfigError::MissingParameter("n_slots"));
    }

    #[test]
    fn test_builder_adjusted_slots() {
        let config = RevolveConfig::builder()
            .n_steps(100)
            .adjusted_slots()
            .build()
            .unwrap();
        assert_eq!(config.n_slots(), 5);
    }

    #[test]
    fn test_builder_budget_too_small() {
        let err = RevolveConfig::builder()
            .n_steps(100)
            .memory_budget(MemoryBudget::new(10), 1024)
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::InvalidSlotCount(0));
    }

    #[test]
    fn test_builder_last_slot_source_wins() {
        let config = RevolveConfig::builder()
            .n_steps(50)
            .adjusted_slots()
            .n_slots(7)
            .build()
            .unwrap();
        assert_eq!(config.n_slots(), 7);
    }
}
