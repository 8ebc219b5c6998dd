//! Self-sizing snapshot buffers
//!
//! Snapshot providers can only report "too small" on a first probe, so
//! acquisition is a two-step protocol: probe with zero capacity to learn
//! the element count, grow with 20% headroom, then probe again to fill.
//! The headroom absorbs the snapshot growing between the sizing probe and
//! the fill call, and a buffer that is already large enough is reused
//! unchanged so repeated audits in one session do not thrash the
//! allocator.

use crate::providers::ProbeOutcome;
use thiserror::Error;

/// Errors raised by the acquire protocol
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BufferError {
    /// The zero-capacity probe did not report a required count
    #[error("provider did not report a required capacity on the sizing probe")]
    Sizing,

    /// Backing storage could not be allocated
    #[error("failed to allocate storage for {elements} elements")]
    Allocation { elements: usize },

    /// The provider did not fill a buffer of sufficient capacity
    #[error("provider did not fill a buffer of sufficient capacity")]
    Fill,
}

/// Elements per allocation unit for a buffer whose storage should grow
/// in whole pages, matching the provider's allocation granularity.
pub fn page_elements<T>() -> usize {
    (0x1000 / std::mem::size_of::<T>().max(1)).max(1)
}

/// Growable element buffer following the probe/fill convention
#[derive(Debug, Default)]
pub struct SnapshotBuffer<T> {
    storage: Vec<T>,
    valid: usize,
    granularity: usize,
}

impl<T: Default + Clone> SnapshotBuffer<T> {
    /// Empty buffer growing one element at a time
    pub fn new() -> Self {
        Self::with_granularity(1)
    }

    /// Empty buffer whose capacity grows in multiples of `granularity`
    /// elements
    pub fn with_granularity(granularity: usize) -> Self {
        Self {
            storage: Vec::new(),
            valid: 0,
            granularity: granularity.max(1),
        }
    }

    /// Number of elements the buffer can hold without growing
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Elements marked valid by the last successful acquire
    pub fn entries(&self) -> &[T] {
        &self.storage[..self.valid]
    }

    pub(crate) fn entries_mut(&mut self) -> &mut [T] {
        &mut self.storage[..self.valid]
    }

    /// Whether the last acquire left captured elements in place
    pub fn is_populated(&self) -> bool {
        self.valid > 0
    }

    /// Drops the captured elements but keeps the allocation
    pub fn clear(&mut self) {
        self.valid = 0;
    }

    /// Releases the backing storage entirely
    pub fn free(&mut self) {
        self.storage = Vec::new();
        self.valid = 0;
    }

    /// Runs the sizing/fill protocol against `probe`.
    ///
    /// The first call is made with zero capacity and must answer
    /// `NeedsCapacity`; the buffer is then grown to 120% of the reported
    /// requirement, rounded up to the allocation granularity, unless the
    /// current capacity already suffices. The second call must fill the
    /// buffer and answer `Ready`.
    pub fn acquire<F>(&mut self, mut probe: F) -> Result<&[T], BufferError>
    where
        F: FnMut(&mut [T]) -> ProbeOutcome,
    {
        let required = match probe(&mut []) {
            ProbeOutcome::NeedsCapacity(count) => count,
            _ => return Err(BufferError::Sizing),
        };

        let granularity = self.granularity.max(1);
        let padded = required + required.div_ceil(5);
        let target = padded.div_ceil(granularity) * granularity;
        if self.storage.len() < target {
            self.valid = 0;
            let additional = target - self.storage.len();
            self.storage
                .try_reserve_exact(additional)
                .map_err(|_| BufferError::Allocation { elements: target })?;
            self.storage.resize(target, T::default());
        }

        match probe(&mut self.storage) {
            ProbeOutcome::Ready(count) if count <= self.storage.len() => {
                self.valid = count;
                Ok(self.entries())
            }
            _ => {
                self.valid = 0;
                Err(BufferError::Fill)
            }
        }
    }
}
