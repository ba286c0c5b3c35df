//! Slot generations
//!
//! Every arena slot carries a generation that is bumped when the slot is
//! freed. A `NodeId` remembers the generation it was issued with, so a
//! handle to a freed node never resolves to whatever reuses the slot.

/// Generation counter for an arena slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Generation(u32);

impl Generation {
    /// Generation of a slot that was never freed
    pub const INITIAL: Self = Generation(0);

    #[inline]
    pub const fn new(value: u32) -> Self {
        Generation(value)
    }

    /// Get the raw value
    #[inline]
    pub const fn value(self) -> u32 {
        self.0
    }

    /// Get the next generation
    #[inline]
    pub const fn next(self) -> Self {
        Generation(self.0.wrapping_add(1))
    }
}

impl Default for Generation {
    fn default() -> Self {
        Self::INITIAL
    }
}
