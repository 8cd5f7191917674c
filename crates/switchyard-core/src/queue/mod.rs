//! # Queues
//!
//! Bounded FIFOs that carry events between producers and the thread that
//! dispatches them.
//!
//! ```text
//!   engine thread ──────────────► RingBuffer ─┐
//!                                              ├─ DualQueue ──► same-thread receivers
//!   workers / external handles ─► RemoteQueue ┘
//!
//!   one producer context ───────► SpscQueue ─┐
//!                                            ├─ Inbox ──► own-thread worker
//!   several producer contexts ──► MpscQueue ─┘
//! ```
//!
//! ## Components
//!
//! - [`RingBuffer`] - unsynchronized, engine-thread only
//! - [`SpscQueue`] - lock-free, one producer and one consumer
//! - [`MpscQueue`] - mutex + condvar, any number of producers
//! - [`DualQueue`] - local ring plus locked remote side, drained lazily
//!
//! Every queue is bounded. A full queue hands the rejected item back to the
//! caller instead of blocking or growing.

mod dual;
mod inbox;
mod mpsc;
mod ring_buffer;
mod spsc;

pub use dual::{DualQueue, RemoteQueue};
pub(crate) use inbox::Inbox;
pub use inbox::InboxMode;
pub use mpsc::MpscQueue;
pub use ring_buffer::RingBuffer;
pub use spsc::{CachePadded, SpscQueue};

use std::hint;
use std::thread;

/// CPU pause hints issued between empty checks of [`MpscQueue::pop_spin`].
pub const SPIN_PAUSE_ITERATIONS: u32 = 32;

/// Empty rounds after which a spinning consumer starts yielding its slice.
const YIELD_AFTER_ROUNDS: u32 = 1024;

/// Busy-wait helper for consumers polling an empty queue.
pub(crate) struct Backoff {
    pauses: u32,
    rounds: u32,
}

impl Backoff {
    pub(crate) const fn new(pauses: u32) -> Self {
        Self { pauses, rounds: 0 }
    }

    /// Waits a little before the next check.
    #[inline]
    pub(crate) fn snooze(&mut self) {
        if self.rounds < YIELD_AFTER_ROUNDS {
            for _ in 0..self.pauses {
                hint::spin_loop();
            }
            self.rounds += 1;
        } else {
            thread::yield_now();
        }
    }
}
