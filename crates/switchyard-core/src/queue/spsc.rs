//! # SPSC Queue
//!
//! Lock-free single-producer single-consumer bounded queue. Backs the inbox
//! of an own-thread receiver whose only producer is the engine thread.
//!
//! ## Design
//!
//! - Cache-line padded head/tail indices prevent false sharing
//! - Monotonic indices masked on access: capacity `C` holds exactly `C` items
//! - Producer: acquire head, relaxed own tail, release new tail
//! - Consumer: relaxed own head, acquire tail, release new head
//! - A separate stop flag releases a consumer parked in [`SpscQueue::pop_spin`]
//!
//! ## Performance
//!
//! Target: < 50ns per push/pop operation.

use std::cell::UnsafeCell;
use std::fmt;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use super::Backoff;

/// A wrapper that pads a value to a cache line boundary to prevent false sharing.
///
/// # Example
///
/// ```rust
/// use switchyard_core::queue::CachePadded;
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// let head = CachePadded::new(AtomicUsize::new(0));
/// let tail = CachePadded::new(AtomicUsize::new(0));
/// head.store(1, Ordering::Relaxed);
/// assert_eq!(tail.load(Ordering::Relaxed), 0);
/// ```
#[repr(C, align(64))]
pub struct CachePadded<T> {
    value: T,
}

impl<T> CachePadded<T> {
    /// Creates a new cache-padded value.
    #[must_use]
    pub const fn new(value: T) -> Self {
        Self { value }
    }

    /// Consumes the wrapper and returns the inner value.
    #[must_use]
    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T> std::ops::Deref for CachePadded<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}

impl<T> std::ops::DerefMut for CachePadded<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.value
    }
}

impl<T: Default> Default for CachePadded<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for CachePadded<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachePadded")
            .field("value", &self.value)
            .finish()
    }
}

/// A lock-free single-producer single-consumer bounded queue.
///
/// Producer-side and consumer-side operations are `unsafe`: the queue is
/// only sound while at most one thread pushes and at most one thread pops
/// at any time.
///
/// # Example
///
/// ```rust
/// use switchyard_core::queue::SpscQueue;
///
/// let queue: SpscQueue<i32> = SpscQueue::new(4);
///
/// // SAFETY: this thread is the only producer and the only consumer.
/// unsafe {
///     assert!(queue.push(42).is_ok());
///     assert_eq!(queue.pop(), Some(42));
/// }
/// ```
pub struct SpscQueue<T> {
    /// Ring buffer storage
    buffer: Box<[UnsafeCell<MaybeUninit<T>>]>,
    /// Next slot to read (consumer-owned)
    head: CachePadded<AtomicUsize>,
    /// Next slot to write (producer-owned)
    tail: CachePadded<AtomicUsize>,
    /// Raised by `stop` to release a spinning consumer
    stopped: CachePadded<AtomicBool>,
    /// Capacity mask for fast modulo (capacity - 1)
    capacity_mask: usize,
}

// SAFETY: SpscQueue can be sent between threads as long as T is Send
#[allow(unsafe_code)]
unsafe impl<T: Send> Send for SpscQueue<T> {}

// SAFETY: Shared access only reaches the slots through `push`/`pop`, whose
// callers guarantee one producer and one consumer. Slot hand-off is ordered
// by the release/acquire pairs on head and tail.
#[allow(unsafe_code)]
unsafe impl<T: Send> Sync for SpscQueue<T> {}

impl<T> SpscQueue<T> {
    /// Creates a new SPSC queue with the given capacity.
    ///
    /// The capacity will be rounded up to the next power of 2.
    ///
    /// # Panics
    ///
    /// Panics if capacity is 0 or would overflow when rounded to power of 2.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "capacity must be > 0");
        let capacity = capacity.next_power_of_two();

        let buffer: Vec<UnsafeCell<MaybeUninit<T>>> =
            (0..capacity).map(|_| UnsafeCell::new(MaybeUninit::uninit())).collect();

        Self {
            buffer: buffer.into_boxed_slice(),
            head: CachePadded::new(AtomicUsize::new(0)),
            tail: CachePadded::new(AtomicUsize::new(0)),
            stopped: CachePadded::new(AtomicBool::new(false)),
            capacity_mask: capacity - 1,
        }
    }

    /// Returns the capacity of the queue.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity_mask + 1
    }

    /// Returns the current number of items in the queue.
    ///
    /// Note: This is a snapshot and may change immediately after returning.
    #[must_use]
    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        tail.wrapping_sub(head)
    }

    /// Returns true if the queue is empty.
    ///
    /// Note: This is a snapshot and may change immediately after returning.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Push an item to the queue.
    ///
    /// # Errors
    ///
    /// Returns the item back if the queue is full.
    ///
    /// # Safety
    ///
    /// No other thread may call `push` concurrently.
    #[allow(unsafe_code)]
    pub unsafe fn push(&self, item: T) -> Result<(), T> {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Relaxed);

        if tail.wrapping_sub(head) > self.capacity_mask {
            return Err(item);
        }

        // SAFETY: The slot at `tail` is outside the consumer's readable range
        // (head..tail) and only this producer writes to it.
        unsafe {
            (*self.buffer[tail & self.capacity_mask].get()).write(item);
        }

        self.tail.store(tail.wrapping_add(1), Ordering::Release);
        Ok(())
    }

    /// Pop an item from the queue.
    ///
    /// # Safety
    ///
    /// No other thread may call `pop` or `pop_spin` concurrently.
    #[allow(unsafe_code)]
    pub unsafe fn pop(&self) -> Option<T> {
        let head = self.head.load(Ordering::Relaxed);

        if head == self.tail.load(Ordering::Acquire) {
            return None;
        }

        // SAFETY: head < tail, so the producer initialized this slot and
        // published it with the release store we just acquired. The slot is
        // not rewritten until head moves past it.
        let item = unsafe { (*self.buffer[head & self.capacity_mask].get()).assume_init_read() };

        self.head.store(head.wrapping_add(1), Ordering::Release);
        Some(item)
    }

    /// Pops an item, busy-waiting while the queue is empty.
    ///
    /// Returns `None` once the queue is empty and [`stop`](Self::stop) has
    /// been called.
    ///
    /// # Safety
    ///
    /// Same contract as [`pop`](Self::pop).
    #[allow(unsafe_code)]
    pub unsafe fn pop_spin(&self) -> Option<T> {
        let mut backoff = Backoff::new(1);
        loop {
            // SAFETY: forwarded from the caller.
            if let Some(item) = unsafe { self.pop() } {
                return Some(item);
            }
            if self.stopped.load(Ordering::Acquire) {
                return None;
            }
            backoff.snooze();
        }
    }

    /// Wakes a waiting consumer. The consumer spins, so there is nothing to do.
    #[inline]
    pub fn notify(&self) {}

    /// Releases a consumer blocked in [`pop_spin`](Self::pop_spin).
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    /// Returns true once [`stop`](Self::stop) has been called.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Clears the stop flag so the queue can serve a new consumer.
    pub fn reset(&self) {
        self.stopped.store(false, Ordering::Release);
    }
}

impl<T> Drop for SpscQueue<T> {
    #[allow(unsafe_code)]
    fn drop(&mut self) {
        // SAFETY: `&mut self` rules out any concurrent producer or consumer.
        while unsafe { self.pop() }.is_some() {}
    }
}

impl<T> fmt::Debug for SpscQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpscQueue")
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}
