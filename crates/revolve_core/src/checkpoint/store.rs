//! Fixed-capacity checkpoint store.
//!
//! Slots form an arena indexed by integer. Each slot owns an independent
//! snapshot; saving into an occupied slot replaces the previous contents.
//! The driver releases a slot once the scheduler no longer needs it, so
//! occupancy always matches the scheduler's resident count.

use super::budget::MemoryBudget;
use super::state::{Checkpoint, Snapshot};
use crate::error::StoreError;

/// Indexed collection of checkpoint slots.
///
/// Slots are allocated lazily, so a large configured capacity costs nothing
/// until it is used.
///
/// # Example
///
/// ```rust
/// use revolve_core::checkpoint::CheckpointStore;
///
/// let mut store: CheckpointStore<Vec<f64>> = CheckpointStore::new(2);
/// store.save(0, 0, &vec![1.0, 2.0]).unwrap();
///
/// let (step, state) = store.restore(0).unwrap();
/// assert_eq!(step, 0);
/// assert_eq!(state, vec![1.0, 2.0]);
///
/// assert!(store.save(2, 5, &vec![0.0]).is_err());
/// ```
#[derive(Clone, Debug)]
pub struct CheckpointStore<S> {
    slots: Vec<Option<Checkpoint<S>>>,
    capacity: usize,
    budget: Option<MemoryBudget>,
}

impl<S: Snapshot> CheckpointStore<S> {
    /// Creates an empty store with `capacity` slots.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Vec::new(),
            capacity,
            budget: None,
        }
    }

    /// Attaches a memory budget that is checked after every save.
    pub fn with_memory_budget(mut self, budget: MemoryBudget) -> Self {
        self.budget = Some(budget);
        self
    }

    /// Returns the memory budget if set.
    pub fn memory_budget(&self) -> Option<&MemoryBudget> {
        self.budget.as_ref()
    }

    /// Copies `state` into `slot`, recording `step`.
    ///
    /// Overwrites any previous occupant of the slot.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Capacity` if `slot >= capacity`.
    pub fn save(&mut self, slot: usize, step: usize, state: &S) -> Result<(), StoreError> {
        self.check_range(slot)?;
        if slot >= self.slots.len() {
            self.slots.resize_with(slot + 1, || None);
        }

        match &mut self.slots[slot] {
            Some(existing) => {
                existing.step = step;
                existing.state.restore_from(state);
            }
            empty => *empty = Some(Checkpoint::capture(step, state)),
        }

        if let Some(budget) = &self.budget {
            let usage = self.memory_usage();
            if !budget.fits(usage) {
                tracing::warn!(
                    usage,
                    max_bytes = budget.max_bytes(),
                    "checkpoint store exceeds memory budget"
                );
            } else if budget.above_warning(usage) {
                tracing::debug!(
                    usage,
                    percent = budget.percent_used(usage),
                    "checkpoint store above warning threshold"
                );
            }
        }
        Ok(())
    }

    /// Returns the step and an independent copy of the state in `slot`.
    ///
    /// The slot keeps its contents and can be restored again.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Capacity` for an out-of-range slot and
    /// `StoreError::EmptySlot` if the slot was never saved.
    pub fn restore(&self, slot: usize) -> Result<(usize, S), StoreError> {
        let checkpoint = self.get(slot)?;
        Ok((checkpoint.step, checkpoint.state.snapshot()))
    }

    /// Overwrites `live` with the contents of `slot` and returns its step.
    ///
    /// Same as [`restore`](Self::restore) but reuses `live`'s storage.
    pub fn restore_into(&self, slot: usize, live: &mut S) -> Result<usize, StoreError> {
        let checkpoint = self.get(slot)?;
        live.restore_from(&checkpoint.state);
        Ok(checkpoint.step)
    }

    /// Frees `slot`, dropping its snapshot.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Capacity` for an out-of-range slot and
    /// `StoreError::EmptySlot` if the slot holds nothing.
    pub fn release(&mut self, slot: usize) -> Result<(), StoreError> {
        self.check_range(slot)?;
        match self.slots.get_mut(slot).and_then(Option::take) {
            Some(_) => Ok(()),
            None => Err(StoreError::EmptySlot { slot }),
        }
    }

    /// Borrows the checkpoint in `slot`.
    pub fn get(&self, slot: usize) -> Result<&Checkpoint<S>, StoreError> {
        self.check_range(slot)?;
        self.slots
            .get(slot)
            .and_then(Option::as_ref)
            .ok_or(StoreError::EmptySlot { slot })
    }

    /// Returns the step held by `slot`, if occupied.
    pub fn step_of(&self, slot: usize) -> Option<usize> {
        self.slots
            .get(slot)
            .and_then(Option::as_ref)
            .map(|checkpoint| checkpoint.step)
    }

    /// Returns the number of occupied slots.
    pub fn slots_in_use(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Returns the configured number of slots.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns `true` if at least one slot is free.
    pub fn has_free_slot(&self) -> bool {
        self.slots_in_use() < self.capacity
    }

    /// Empties every slot.
    pub fn clear(&mut self) {
        self.slots.clear();
    }

    /// Returns the total memory usage of stored checkpoints in bytes.
    pub fn memory_usage(&self) -> usize {
        self.slots
            .iter()
            .flatten()
            .map(Checkpoint::memory_size)
            .sum()
    }

    fn check_range(&self, slot: usize) -> Result<(), StoreError> {
        if slot >= self.capacity {
            return Err(StoreError::Capacity {
                slot,
                capacity: self.capacity,
            });
        }
        Ok(())
    }
}
