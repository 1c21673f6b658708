//! Fixed-capacity record of recent transition times.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

/// The history rings requested at construction could not be allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryAllocError;

impl fmt::Display for HistoryAllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("out of memory allocating transition history")
    }
}

/// A circular buffer of timestamps, read back most-recent-first.
///
/// `head` points at the newest entry. Slots never written read as `0`.
pub(crate) struct History {
    slots: Box<[u32]>,
    head: usize,
}

impl History {
    /// An empty ring that never allocates.
    pub(crate) fn disabled() -> Self {
        Self {
            slots: Box::new([]),
            head: 0,
        }
    }

    pub(crate) fn with_capacity(capacity: usize) -> Result<Self, HistoryAllocError> {
        if capacity == 0 {
            return Ok(Self::disabled());
        }

        let mut slots = Vec::new();
        slots
            .try_reserve_exact(capacity)
            .map_err(|_| HistoryAllocError)?;
        slots.resize(capacity, 0);

        Ok(Self {
            slots: slots.into_boxed_slice(),
            head: 0,
        })
    }

    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Records `timestamp` as the newest entry, evicting the oldest once full.
    pub(crate) fn push(&mut self, timestamp: u32) {
        let len = self.slots.len();
        if len == 0 {
            return;
        }
        self.head = (self.head + 1) % len;
        self.slots[self.head] = timestamp;
    }

    /// The `index`-th most recent entry, or `0` if there is none.
    pub(crate) fn get(&self, index: usize) -> u32 {
        let len = self.slots.len();
        if index >= len {
            return 0;
        }
        self.slots[(self.head + len - index) % len]
    }

    pub(crate) fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = 0;
        }
        self.head = 0;
    }
}
