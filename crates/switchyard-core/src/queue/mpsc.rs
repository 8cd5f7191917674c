//! # MPSC Queue
//!
//! Bounded multi-producer queue built from a [`RingBuffer`] under a mutex.
//! Backs own-thread inboxes that more than one context can push into.
//!
//! ## Design
//!
//! - Push and pop take the mutex; any number of producers is safe
//! - `has_data` lets [`MpscQueue::try_pop`] and the spin loop skip the lock
//!   while the queue is empty
//! - The stop flag is written under the mutex, so a consumer waiting on the
//!   condvar cannot miss it

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::{Backoff, RingBuffer, SPIN_PAUSE_ITERATIONS};

/// A bounded multi-producer single-consumer queue.
pub struct MpscQueue<T> {
    ring: Mutex<RingBuffer<T>>,
    ready: Condvar,
    has_data: AtomicBool,
    stopped: AtomicBool,
    capacity: usize,
}

impl<T: Default> MpscQueue<T> {
    /// Creates a queue; capacity is rounded up to the next power of 2.
    ///
    /// # Panics
    ///
    /// Panics if capacity is 0.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let ring = RingBuffer::new(capacity);
        let capacity = ring.capacity();
        Self {
            ring: Mutex::new(ring),
            ready: Condvar::new(),
            has_data: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            capacity,
        }
    }

    /// Appends an item. Call [`notify`](Self::notify) afterwards to wake a
    /// consumer blocked in [`pop_wait_for`](Self::pop_wait_for).
    ///
    /// # Errors
    ///
    /// Returns the item back if the queue is full.
    pub fn push(&self, item: T) -> Result<(), T> {
        let mut ring = self.lock();
        ring.push(item)?;
        self.has_data.store(true, Ordering::Release);
        Ok(())
    }

    /// Removes the oldest item without blocking.
    pub fn try_pop(&self) -> Option<T> {
        if !self.has_data.load(Ordering::Acquire) {
            return None;
        }
        let mut ring = self.lock();
        self.pop_locked(&mut ring)
    }

    /// Pops an item, spinning without the lock while the queue is empty.
    ///
    /// Returns `None` once the queue is empty and stopped.
    pub fn pop_spin(&self) -> Option<T> {
        let mut backoff = Backoff::new(SPIN_PAUSE_ITERATIONS);
        loop {
            if self.has_data.load(Ordering::Acquire) {
                let mut ring = self.lock();
                if let Some(item) = self.pop_locked(&mut ring) {
                    return Some(item);
                }
            }
            if self.stopped.load(Ordering::Acquire) {
                return None;
            }
            backoff.snooze();
        }
    }

    /// Pops an item, blocking on the condvar for at most `timeout`.
    ///
    /// Returns `None` on timeout, or at once if the queue is empty and stopped.
    pub fn pop_wait_for(&self, timeout: Duration) -> Option<T> {
        let ring = self.lock();
        let (mut ring, _) = self
            .ready
            .wait_timeout_while(ring, timeout, |ring| {
                ring.is_empty() && !self.stopped.load(Ordering::Acquire)
            })
            .unwrap_or_else(PoisonError::into_inner);
        self.pop_locked(&mut ring)
    }

    fn pop_locked(&self, ring: &mut RingBuffer<T>) -> Option<T> {
        let item = ring.try_pop();
        if ring.is_empty() {
            self.has_data.store(false, Ordering::Release);
        }
        item
    }
}

impl<T> MpscQueue<T> {
    fn lock(&self) -> MutexGuard<'_, RingBuffer<T>> {
        self.ring.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Wakes one consumer blocked in [`pop_wait_for`](Self::pop_wait_for).
    pub fn notify(&self) {
        self.ready.notify_one();
    }

    /// Releases every blocked consumer; later pops return only what is queued.
    pub fn stop(&self) {
        {
            let _ring = self.lock();
            self.stopped.store(true, Ordering::Release);
        }
        self.ready.notify_all();
    }

    /// Returns true once [`stop`](Self::stop) has been called.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Clears the stop flag.
    pub fn reset(&self) {
        let _ring = self.lock();
        self.stopped.store(false, Ordering::Release);
    }

    /// Number of queued items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.has_data.load(Ordering::Acquire)
    }

    /// Number of slots.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T> fmt::Debug for MpscQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MpscQueue")
            .field("capacity", &self.capacity)
            .field("has_data", &self.has_data.load(Ordering::Relaxed))
            .field("stopped", &self.is_stopped())
            .finish_non_exhaustive()
    }
}
