//! # Dual Queue
//!
//! The engine's same-thread queue. Events emitted on the engine thread go
//! straight into an unsynchronized [`RingBuffer`]; events from workers and
//! external handles land on a locked [`RemoteQueue`] and are moved into the
//! ring in batches when the engine thread runs dry.
//!
//! ```text
//!  engine thread ── push_local ──► [ local ring ] ──► try_pop / wait_pop_any
//!                                        ▲
//!                               drain (one lock)
//!                                        │
//!  other threads ── push_remote ─► [ remote deque ] ── condvar ──► waiter
//! ```
//!
//! The remote side tracks whether a consumer is parked on the condvar, so
//! producers only pay for a wake-up when someone is waiting.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::RingBuffer;

struct RemoteState<T> {
    items: VecDeque<T>,
    stopped: bool,
}

/// Locked cross-thread side of a [`DualQueue`].
pub struct RemoteQueue<T> {
    state: Mutex<RemoteState<T>>,
    ready: Condvar,
    has_remote: AtomicBool,
    waiting: AtomicBool,
    capacity: usize,
}

impl<T> RemoteQueue<T> {
    /// Creates a remote queue holding at most `capacity` items.
    ///
    /// # Panics
    ///
    /// Panics if capacity is 0.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "capacity must be > 0");
        Self {
            state: Mutex::new(RemoteState {
                items: VecDeque::new(),
                stopped: false,
            }),
            ready: Condvar::new(),
            has_remote: AtomicBool::new(false),
            waiting: AtomicBool::new(false),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, RemoteState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends an item from any thread and wakes a parked consumer.
    ///
    /// # Errors
    ///
    /// Returns the item back if the queue is at capacity.
    pub fn push(&self, item: T) -> Result<(), T> {
        {
            let mut state = self.lock();
            if state.items.len() >= self.capacity {
                return Err(item);
            }
            state.items.push_back(item);
            self.has_remote.store(true, Ordering::Release);
        }
        if self.waiting.load(Ordering::Acquire) {
            self.ready.notify_one();
        }
        Ok(())
    }

    /// Returns true if items may be waiting (lock-free hint).
    #[inline]
    #[must_use]
    pub fn has_items(&self) -> bool {
        self.has_remote.load(Ordering::Acquire)
    }

    /// Number of queued items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    /// Returns true if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.has_items()
    }

    /// Maximum number of queued items.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Raises the stop flag and wakes every waiter.
    pub fn stop(&self) {
        self.lock().stopped = true;
        self.ready.notify_all();
    }

    /// Returns true once [`stop`](Self::stop) has been called.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.lock().stopped
    }

    /// Clears the stop flag.
    pub fn reset(&self) {
        self.lock().stopped = false;
    }

    fn drain_locked(&self, state: &mut RemoteState<T>, local: &mut RingBuffer<T>) {
        while let Some(slot) = local.alloc_slot() {
            let Some(item) = state.items.pop_front() else {
                break;
            };
            *slot = item;
            local.commit_push();
        }
        self.has_remote
            .store(!state.items.is_empty(), Ordering::Release);
    }
}

impl<T> fmt::Debug for RemoteQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteQueue")
            .field("capacity", &self.capacity)
            .field("has_remote", &self.has_items())
            .field("waiting", &self.waiting.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

/// Local ring for the owning thread plus a shared [`RemoteQueue`].
pub struct DualQueue<T> {
    local: RingBuffer<T>,
    remote: Arc<RemoteQueue<T>>,
}

impl<T: Default> DualQueue<T> {
    /// Creates a dual queue.
    ///
    /// # Panics
    ///
    /// Panics if either capacity is 0.
    #[must_use]
    pub fn new(local_capacity: usize, remote_capacity: usize) -> Self {
        Self {
            local: RingBuffer::new(local_capacity),
            remote: Arc::new(RemoteQueue::new(remote_capacity)),
        }
    }

    /// Pops from the local ring only.
    #[inline]
    pub fn try_pop_local(&mut self) -> Option<T> {
        self.local.try_pop()
    }

    /// Pops from the local ring, refilling it from the remote side when empty.
    #[inline]
    pub fn try_pop(&mut self) -> Option<T> {
        if let Some(item) = self.local.try_pop() {
            return Some(item);
        }
        if self.remote.has_items() {
            let mut state = self.remote.lock();
            self.remote.drain_locked(&mut state, &mut self.local);
        }
        self.local.try_pop()
    }

    /// Pops an item, blocking until the remote side has data or the queue is
    /// stopped. Returns `None` only when stopped with nothing buffered.
    pub fn wait_pop_any(&mut self) -> Option<T> {
        self.wait_pop(None)
    }

    /// Like [`wait_pop_any`](Self::wait_pop_any), giving up after `timeout`.
    pub fn wait_pop_for(&mut self, timeout: Duration) -> Option<T> {
        self.wait_pop(Some(timeout))
    }

    fn wait_pop(&mut self, timeout: Option<Duration>) -> Option<T> {
        if let Some(item) = self.try_pop() {
            return Some(item);
        }

        let remote = &*self.remote;
        let state = remote.lock();
        remote.waiting.store(true, Ordering::Release);
        let idle = |state: &mut RemoteState<T>| state.items.is_empty() && !state.stopped;
        let mut state = match timeout {
            None => remote
                .ready
                .wait_while(state, idle)
                .unwrap_or_else(PoisonError::into_inner),
            Some(timeout) => {
                remote
                    .ready
                    .wait_timeout_while(state, timeout, idle)
                    .unwrap_or_else(PoisonError::into_inner)
                    .0
            }
        };
        remote.waiting.store(false, Ordering::Release);
        remote.drain_locked(&mut state, &mut self.local);
        drop(state);

        self.local.try_pop()
    }
}

impl<T> DualQueue<T> {
    /// Appends to the local ring.
    ///
    /// # Errors
    ///
    /// Returns the item back if the ring is full.
    #[inline]
    pub fn push_local(&mut self, item: T) -> Result<(), T> {
        self.local.push(item)
    }

    /// Reserves a local slot for in-place construction.
    #[inline]
    pub fn alloc_local(&mut self) -> Option<&mut T> {
        self.local.alloc_slot()
    }

    /// Publishes the slot returned by [`alloc_local`](Self::alloc_local).
    #[inline]
    pub fn commit_local(&mut self) {
        self.local.commit_push();
    }

    /// Appends to the remote side.
    ///
    /// # Errors
    ///
    /// Returns the item back if the remote side is at capacity.
    pub fn push_remote(&self, item: T) -> Result<(), T> {
        self.remote.push(item)
    }

    /// Handle to the remote side, for producers on other threads.
    #[must_use]
    pub fn remote(&self) -> &Arc<RemoteQueue<T>> {
        &self.remote
    }

    /// Returns true if neither side holds an item.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.local.is_empty() && !self.remote.has_items()
    }

    /// Number of items in the local ring.
    #[must_use]
    pub fn local_len(&self) -> usize {
        self.local.len()
    }

    /// Stops blocking pops; they return buffered items and then `None`.
    pub fn stop(&self) {
        self.remote.stop();
    }

    /// Re-arms blocking pops after [`stop`](Self::stop).
    pub fn reset(&self) {
        self.remote.reset();
    }
}

impl<T> fmt::Debug for DualQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DualQueue")
            .field("local", &self.local)
            .field("remote", &self.remote)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{tracked_slot, Census};
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_local_before_remote() {
        let mut queue: DualQueue<u32> = DualQueue::new(8, 8);
        queue.push_remote(10).unwrap();
        queue.push_local(1).unwrap();
        queue.push_local(2).unwrap();

        assert_eq!(queue.try_pop(), Some(1));
        assert_eq!(queue.try_pop(), Some(2));
        assert_eq!(queue.try_pop(), Some(10));
        assert_eq!(queue.try_pop(), None);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_try_pop_local_ignores_remote() {
        let mut queue: DualQueue<u32> = DualQueue::new(4, 4);
        queue.push_remote(5).unwrap();
        assert_eq!(queue.try_pop_local(), None);
        assert!(!queue.is_empty());
        assert_eq!(queue.try_pop(), Some(5));
    }

    #[test]
    fn test_alloc_commit_local() {
        let mut queue: DualQueue<u32> = DualQueue::new(2, 2);
        *queue.alloc_local().unwrap() = 7;
        queue.commit_local();
        assert_eq!(queue.local_len(), 1);
        assert_eq!(queue.try_pop(), Some(7));
    }

    #[test]
    fn test_remote_capacity() {
        let queue: DualQueue<u32> = DualQueue::new(4, 3);
        for i in 0..3 {
            assert!(queue.push_remote(i).is_ok());
        }
        assert_eq!(queue.push_remote(3), Err(3));
        assert_eq!(queue.remote().len(), 3);
    }

    #[test]
    fn test_drain_stops_at_full_local_ring() {
        let mut queue: DualQueue<u32> = DualQueue::new(2, 16);
        for i in 0..5 {
            queue.push_remote(i).unwrap();
        }

        let drained: Vec<u32> = std::iter::from_fn(|| queue.try_pop()).collect();
        assert_eq!(drained, vec![0, 1, 2, 3, 4]);
        assert!(!queue.remote().has_items());
    }

    #[test]
    fn test_wait_pop_any_wakes_on_remote_push() {
        let mut queue: DualQueue<u64> = DualQueue::new(8, 8);
        let remote = Arc::clone(queue.remote());

        let producer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            remote.push(42).unwrap();
        });

        assert_eq!(queue.wait_pop_any(), Some(42));
        producer.join().unwrap();
    }

    #[test]
    fn test_stop_unblocks_and_keeps_buffered_items() {
        let mut queue: DualQueue<u64> = DualQueue::new(8, 8);
        let remote = Arc::clone(queue.remote());

        let stopper = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            remote.push(1).unwrap();
            remote.stop();
        });

        let mut seen = Vec::new();
        while let Some(item) = queue.wait_pop_any() {
            seen.push(item);
        }
        stopper.join().unwrap();
        assert_eq!(seen, vec![1]);

        queue.push_local(2).unwrap();
        assert_eq!(queue.wait_pop_any(), Some(2));
        assert_eq!(queue.wait_pop_any(), None);

        queue.reset();
        assert!(!queue.remote().is_stopped());
    }

    #[test]
    fn test_wait_pop_for_times_out() {
        let mut queue: DualQueue<u8> = DualQueue::new(2, 2);
        let started = Instant::now();
        assert_eq!(queue.wait_pop_for(Duration::from_millis(20)), None);
        assert!(started.elapsed() >= Duration::from_millis(15));
    }

    #[test]
    fn test_no_leaks_under_churn() {
        let census = Census::new();
        {
            let mut queue = DualQueue::new(64, 64);
            for i in 0..100 {
                if i % 2 == 0 {
                    queue.push_local(tracked_slot(i, &census)).unwrap();
                } else {
                    queue.push_remote(tracked_slot(i, &census)).unwrap();
                }
                if i % 4 == 3 {
                    drop(queue.try_pop());
                    drop(queue.try_pop());
                    drop(queue.try_pop());
                }
            }
            assert!(census.live() > 0);
        }
        assert_eq!(census.constructed(), census.dropped());
    }
}
