//! State reachable from every producer context.
//!
//! The engine, its workers and external handles all route through this:
//! the interest graph, the remote side of the engine queue and every
//! own-thread inbox. External handles hold it weakly, which is how they
//! notice the engine is gone.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::event::{Event, TaggedEvent};
use crate::queue::{Inbox, RemoteQueue};

use super::topology::Topology;

pub(crate) struct Shared<E: Event> {
    topology: Topology,
    remote: Arc<RemoteQueue<TaggedEvent<E>>>,
    inboxes: Vec<Arc<Inbox<TaggedEvent<E>>>>,
    running: AtomicBool,
    dropped: AtomicU64,
}

impl<E: Event> Shared<E> {
    pub(crate) fn new(
        topology: Topology,
        remote: Arc<RemoteQueue<TaggedEvent<E>>>,
        inboxes: Vec<Arc<Inbox<TaggedEvent<E>>>>,
    ) -> Self {
        Self {
            topology,
            remote,
            inboxes,
            running: AtomicBool::new(false),
            dropped: AtomicU64::new(0),
        }
    }

    #[inline]
    pub(crate) fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Queues an event for same-thread dispatch from a non-engine thread.
    pub(crate) fn push_remote(&self, event: E) {
        if let Err(rejected) = self.remote.push(TaggedEvent::from(event)) {
            self.record_drop(rejected.index());
        }
    }

    /// Delivers an event to every own-thread receiver of its kind: clones for
    /// all but the last target, which gets the original.
    pub(crate) fn push_own_thread(&self, kind: usize, event: E) {
        let targets = self.topology.own_thread_for(kind);
        let Some((&last, rest)) = targets.split_last() else {
            return;
        };
        for &inbox in rest {
            self.deliver(inbox, event.clone());
        }
        self.deliver(last, event);
    }

    #[inline]
    fn deliver(&self, inbox: usize, event: E) {
        if let Err(rejected) = self.inboxes[inbox].push(TaggedEvent::from(event)) {
            self.record_drop(rejected.index());
        }
    }

    /// Counts an event lost to a full queue.
    #[cold]
    pub(crate) fn record_drop(&self, kind: usize) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
        tracing::trace!("Queue full, dropped {} event", E::kind_name(kind));
    }

    pub(crate) fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub(crate) fn set_running(&self, running: bool) -> bool {
        self.running.swap(running, Ordering::AcqRel)
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Wakes a poller blocked on the engine queue; it returns what is buffered.
    pub(crate) fn stop_remote(&self) {
        self.remote.stop();
    }
}
