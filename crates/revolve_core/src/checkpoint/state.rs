//! Snapshot codec for simulation state.
//!
//! A checkpoint must never alias the live state: the forward and adjoint
//! operators mutate the live state in place, and any shared buffer would
//! silently corrupt a stored snapshot. [`Snapshot`] makes the deep copy
//! explicit.

/// Deep copy of a simulation state into or out of a checkpoint slot.
///
/// # Example
///
/// ```rust
/// use revolve_core::checkpoint::Snapshot;
///
/// let live = vec![1.0_f32, 2.0, 3.0];
/// let stored = live.snapshot();
/// assert_eq!(stored, live);
/// assert_ne!(stored.as_ptr(), live.as_ptr());
/// assert_eq!(stored.memory_size(), 3 * 4 + std::mem::size_of::<Vec<f32>>());
/// ```
pub trait Snapshot: Sized {
    /// Returns an independent copy sharing no storage with `self`.
    fn snapshot(&self) -> Self;

    /// Overwrites `self` with an independent copy of `source`.
    ///
    /// Implementations may reuse the existing allocation. Afterwards `self`
    /// must not alias `source`: types holding shared handles such as `Rc`
    /// or `Arc` have to copy the pointee, not the handle.
    fn restore_from(&mut self, source: &Self) {
        *self = source.snapshot();
    }

    /// Approximate heap plus inline size in bytes, for budget accounting.
    fn memory_size(&self) -> usize {
        std::mem::size_of::<Self>()
    }
}

impl<T: Copy> Snapshot for Vec<T> {
    fn snapshot(&self) -> Self {
        self.clone()
    }

    fn restore_from(&mut self, source: &Self) {
        self.clear();
        self.extend_from_slice(source);
    }

    fn memory_size(&self) -> usize {
        std::mem::size_of::<Self>() + self.len() * std::mem::size_of::<T>()
    }
}

impl Snapshot for f64 {
    fn snapshot(&self) -> Self {
        *self
    }
}

impl Snapshot for f32 {
    fn snapshot(&self) -> Self {
        *self
    }
}

impl<A: Snapshot, B: Snapshot> Snapshot for (A, B) {
    fn snapshot(&self) -> Self {
        (self.0.snapshot(), self.1.snapshot())
    }

    fn restore_from(&mut self, source: &Self) {
        self.0.restore_from(&source.0);
        self.1.restore_from(&source.1);
    }

    fn memory_size(&self) -> usize {
        self.0.memory_size() + self.1.memory_size()
    }
}

impl<A: Snapshot, B: Snapshot, C: Snapshot> Snapshot for (A, B, C) {
    fn snapshot(&self) -> Self {
        (self.0.snapshot(), self.1.snapshot(), self.2.snapshot())
    }

    fn restore_from(&mut self, source: &Self) {
        self.0.restore_from(&source.0);
        self.1.restore_from(&source.1);
        self.2.restore_from(&source.2);
    }

    fn memory_size(&self) -> usize {
        self.0.memory_size() + self.1.memory_size() + self.2.memory_size()
    }
}

/// A stored snapshot together with the step it belongs to.
#[derive(Clone, Debug, PartialEq)]
pub struct Checkpoint<S> {
    /// State index of the snapshot
    pub step: usize,

    /// Owned copy of the state
    pub state: S,
}

impl<S: Snapshot> Checkpoint<S> {
    /// Captures `state` at `step` as an independent copy.
    pub fn capture(step: usize, state: &S) -> Self {
        Self {
            step,
            state: state.snapshot(),
        }
    }

    /// Returns the memory size of this checkpoint in bytes (approximate).
    pub fn memory_size(&self) -> usize {
        std::mem::size_of::<usize>() + self.state.memory_size()
    }
}
