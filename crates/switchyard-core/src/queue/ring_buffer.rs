//! # Ring Buffer
//!
//! Fixed-capacity FIFO with no synchronization. The engine's local lane uses
//! it directly and [`MpscQueue`](super::MpscQueue) wraps it in a mutex.
//!
//! Head and tail are monotonic counters masked on access, so a buffer of
//! capacity `C` holds exactly `C` items. Storage is pre-filled with
//! `T::default()`; popping swaps the default back in.

use std::fmt;
use std::mem;

/// A bounded single-thread FIFO.
pub struct RingBuffer<T> {
    slots: Box<[T]>,
    head: usize,
    tail: usize,
    mask: usize,
}

impl<T: Default> RingBuffer<T> {
    /// Creates a ring buffer.
    ///
    /// The capacity is rounded up to the next power of 2.
    ///
    /// # Panics
    ///
    /// Panics if capacity is 0.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "capacity must be > 0");
        let capacity = capacity.next_power_of_two();
        let slots: Vec<T> = (0..capacity).map(|_| T::default()).collect();

        Self {
            slots: slots.into_boxed_slice(),
            head: 0,
            tail: 0,
            mask: capacity - 1,
        }
    }

    /// Removes the oldest item.
    #[inline]
    pub fn try_pop(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        let item = mem::take(&mut self.slots[self.head & self.mask]);
        self.head = self.head.wrapping_add(1);
        Some(item)
    }
}

impl<T> RingBuffer<T> {
    /// Appends an item.
    ///
    /// # Errors
    ///
    /// Returns the item back if the buffer is full.
    #[inline]
    pub fn push(&mut self, item: T) -> Result<(), T> {
        if self.is_full() {
            return Err(item);
        }
        self.slots[self.tail & self.mask] = item;
        self.tail = self.tail.wrapping_add(1);
        Ok(())
    }

    /// Returns the next free slot for in-place construction.
    ///
    /// The slot is not visible to [`try_pop`](Self::try_pop) until
    /// [`commit_push`](Self::commit_push) is called.
    #[inline]
    pub fn alloc_slot(&mut self) -> Option<&mut T> {
        if self.is_full() {
            return None;
        }
        Some(&mut self.slots[self.tail & self.mask])
    }

    /// Publishes the slot returned by the last [`alloc_slot`](Self::alloc_slot).
    #[inline]
    pub fn commit_push(&mut self) {
        debug_assert!(!self.is_full(), "commit_push without a free slot");
        self.tail = self.tail.wrapping_add(1);
    }

    /// Number of queued items.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.tail.wrapping_sub(self.head)
    }

    /// Returns true if nothing is queued.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    /// Returns true if no slot is free.
    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.len() > self.mask
    }

    /// Number of slots.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.mask + 1
    }
}

impl<T> fmt::Debug for RingBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingBuffer")
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .finish()
    }
}
