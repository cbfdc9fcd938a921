//! Memory budget for checkpoint storage.
//!
//! Translates a byte budget into a number of checkpoint slots and monitors
//! store usage against it.

/// Byte limit for the snapshots held by a [`CheckpointStore`](super::CheckpointStore).
///
/// # Example
///
/// ```rust
/// use revolve_core::checkpoint::MemoryBudget;
///
/// // A 101 x 101 f32 wavefield with three time levels
/// let state_bytes = 3 * 101 * 101 * std::mem::size_of::<f32>();
/// let budget = MemoryBudget::from_mb(4);
///
/// let slots = budget.max_slots(state_bytes);
/// assert_eq!(slots, 34);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MemoryBudget {
    limit: usize,
    /// Fraction of `limit` above which the store logs a warning.
    warn_fraction: f64,
}

const MIB: usize = 1024 * 1024;

impl MemoryBudget {
    /// Budget of `limit` bytes, warning at 80% usage.
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            warn_fraction: 0.8,
        }
    }

    /// Budget of `mb` mebibytes.
    pub fn from_mb(mb: usize) -> Self {
        Self::new(mb.saturating_mul(MIB))
    }

    /// Sets the usage fraction above which the store warns.
    ///
    /// # Panics
    ///
    /// Panics unless `fraction` lies in `[0, 1]`.
    pub fn with_warning_threshold(mut self, fraction: f64) -> Self {
        assert!(
            (0.0..=1.0).contains(&fraction),
            "warning fraction {fraction} outside [0, 1]"
        );
        self.warn_fraction = fraction;
        self
    }

    /// Byte limit.
    #[inline]
    pub fn max_bytes(&self) -> usize {
        self.limit
    }

    /// Number of snapshots of `state_bytes` each that fit in the budget.
    ///
    /// Zero-sized snapshots are unbounded.
    #[inline]
    pub fn max_slots(&self, state_bytes: usize) -> usize {
        match state_bytes {
            0 => usize::MAX,
            bytes => self.limit / bytes,
        }
    }

    /// Whether `used` bytes fit the limit.
    #[inline]
    pub fn fits(&self, used: usize) -> bool {
        used <= self.limit
    }

    /// Whether `used` bytes are above the warning fraction.
    #[inline]
    pub fn above_warning(&self, used: usize) -> bool {
        used as f64 > self.limit as f64 * self.warn_fraction
    }

    /// Usage as a percentage of the limit. An empty budget reports 100.
    pub fn percent_used(&self, used: usize) -> f64 {
        if self.limit == 0 {
            100.0
        } else {
            100.0 * used as f64 / self.limit as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_mb() {
        assert_eq!(MemoryBudget::from_mb(50).max_bytes(), 50 * MIB);
        assert_eq!(MemoryBudget::from_mb(usize::MAX).max_bytes(), usize::MAX);
    }

    #[test]
    #[should_panic(expected = "outside [0, 1]")]
    fn test_rejects_bad_warning_fraction() {
        MemoryBudget::new(1000).with_warning_threshold(1.5);
    }

    #[test]
    fn test_max_slots() {
        let budget = MemoryBudget::new(1000);
        assert_eq!(budget.max_slots(100), 10);
        assert_eq!(budget.max_slots(333), 3);
        assert_eq!(budget.max_slots(2000), 0);
        assert_eq!(MemoryBudget::new(10).max_slots(0), usize::MAX);
    }

    #[test]
    fn test_usage_checks() {
        let budget = MemoryBudget::new(1000).with_warning_threshold(0.5);
        assert!(budget.fits(1000));
        assert!(!budget.fits(1001));
        assert!(!budget.above_warning(500));
        assert!(budget.above_warning(501));
        assert_eq!(budget.percent_used(250), 25.0);
        assert_eq!(MemoryBudget::new(0).percent_used(1), 100.0);
    }
}
