//! Inbound queue of an own-thread receiver.

use super::{MpscQueue, SpscQueue};

/// Queue flavor backing an own-thread receiver's inbox.
///
/// The engine thread always counts as one producer, since
/// [`Engine::emit`](crate::Engine::emit) may target any receiver. A receiver
/// fed by a single own-thread worker or external emitter therefore has two
/// producers and gets [`InboxMode::Mpsc`]; `Spsc` is only chosen when the
/// engine thread is the sole producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboxMode {
    /// Lock-free queue; exactly one producer context.
    Spsc,
    /// Locked queue; several producer contexts.
    Mpsc,
}

impl InboxMode {
    /// Picks the queue flavor for a receiver with `producers` producer contexts.
    #[must_use]
    pub const fn for_producers(producers: usize) -> Self {
        if producers <= 1 {
            Self::Spsc
        } else {
            Self::Mpsc
        }
    }
}

/// Inbox chosen from the receiver's producer count at assembly time.
///
/// Only the engine routes into an inbox, and it only selects
/// [`InboxMode::Spsc`] when the engine thread is the sole producer context.
/// The owning worker thread is the only consumer.
pub(crate) enum Inbox<T> {
    Spsc(SpscQueue<T>),
    Mpsc(MpscQueue<T>),
}

impl<T: Default> Inbox<T> {
    pub(crate) fn new(mode: InboxMode, capacity: usize) -> Self {
        match mode {
            InboxMode::Spsc => Self::Spsc(SpscQueue::new(capacity)),
            InboxMode::Mpsc => Self::Mpsc(MpscQueue::new(capacity)),
        }
    }

    /// Pushes without waking anyone; the worker spins in
    /// [`pop_spin`](Self::pop_spin). Hands the item back when full.
    #[allow(unsafe_code)]
    #[inline]
    pub(crate) fn push(&self, item: T) -> Result<(), T> {
        match self {
            // SAFETY: an SPSC inbox has a single producer context, the
            // engine thread, which reaches this call only through
            // `&mut Engine`, so pushes never overlap.
            Self::Spsc(queue) => unsafe { queue.push(item) },
            Self::Mpsc(queue) => queue.push(item),
        }
    }

    /// Pops for the worker loop; `None` once stopped and empty.
    #[allow(unsafe_code)]
    #[inline]
    pub(crate) fn pop_spin(&self) -> Option<T> {
        match self {
            // SAFETY: only the worker thread that owns this inbox pops, and a
            // new worker is spawned only after the previous one was joined.
            Self::Spsc(queue) => unsafe { queue.pop_spin() },
            Self::Mpsc(queue) => queue.pop_spin(),
        }
    }
}

impl<T> Inbox<T> {
    pub(crate) fn mode(&self) -> InboxMode {
        match self {
            Self::Spsc(_) => InboxMode::Spsc,
            Self::Mpsc(_) => InboxMode::Mpsc,
        }
    }

    pub(crate) fn stop(&self) {
        match self {
            Self::Spsc(queue) => queue.stop(),
            Self::Mpsc(queue) => queue.stop(),
        }
    }

    pub(crate) fn reset(&self) {
        match self {
            Self::Spsc(queue) => queue.reset(),
            Self::Mpsc(queue) => queue.reset(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        match self {
            Self::Spsc(queue) => queue.len(),
            Self::Mpsc(queue) => queue.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_mode_from_producer_count() {
        assert_eq!(InboxMode::for_producers(0), InboxMode::Spsc);
        assert_eq!(InboxMode::for_producers(1), InboxMode::Spsc);
        assert_eq!(InboxMode::for_producers(2), InboxMode::Mpsc);
        assert_eq!(InboxMode::for_producers(9), InboxMode::Mpsc);
    }

    #[test]
    fn test_inbox_round_trip_both_modes() {
        for mode in [InboxMode::Spsc, InboxMode::Mpsc] {
            let inbox: Inbox<u32> = Inbox::new(mode, 2);
            assert_eq!(inbox.mode(), mode);

            inbox.push(1).unwrap();
            inbox.push(2).unwrap();
            assert_eq!(inbox.push(3), Err(3));
            assert_eq!(inbox.len(), 2);

            assert_eq!(inbox.pop_spin(), Some(1));
            assert_eq!(inbox.pop_spin(), Some(2));

            inbox.stop();
            assert_eq!(inbox.pop_spin(), None);
            inbox.reset();
            inbox.push(4).unwrap();
            assert_eq!(inbox.pop_spin(), Some(4));
        }
    }

    #[test]
    fn test_mpsc_inbox_feeds_spinning_worker() {
        const PRODUCERS: u32 = 3;
        const PER_PRODUCER: u32 = 500;

        let inbox: Arc<Inbox<u32>> = Arc::new(Inbox::new(InboxMode::Mpsc, 64));
        let worker = {
            let inbox = Arc::clone(&inbox);
            thread::spawn(move || {
                let mut received = Vec::new();
                while let Some(item) = inbox.pop_spin() {
                    received.push(item);
                }
                received
            })
        };

        let producers: Vec<_> = (0..PRODUCERS)
            .map(|producer| {
                let inbox = Arc::clone(&inbox);
                thread::spawn(move || {
                    for i in 0..PER_PRODUCER {
                        let mut item = producer * PER_PRODUCER + i;
                        while let Err(back) = inbox.push(item) {
                            item = back;
                            thread::yield_now();
                        }
                    }
                })
            })
            .collect();
        for producer in producers {
            producer.join().unwrap();
        }
        // Stopping still hands out what is queued.
        inbox.stop();

        let mut received = worker.join().unwrap();
        assert_eq!(received.len(), (PRODUCERS * PER_PRODUCER) as usize);
        received.sort_unstable();
        assert!(received.iter().copied().eq(0..PRODUCERS * PER_PRODUCER));
    }
}
