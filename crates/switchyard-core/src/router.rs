//! # Routing
//!
//! [`Router`] is the handle a receiver emits through. It is bound to the
//! declaration `D` it was handed to, so [`Router::emit`] only accepts kinds
//! `D` has declared (`D: Emits<E, K>`), and to a lane that says which
//! context the handler runs in:
//!
//! | Lane | Used by | Same-thread receivers | Own-thread receivers |
//! |------|---------|-----------------------|----------------------|
//! | Local | engine thread | local ring, no lock | inbox push |
//! | Remote | workers, external handles | remote queue, locked | inbox push |
//!
//! An own-thread worker never touches the engine's local ring, which is
//! what keeps that ring single-threaded.
//!
//! Emitting never calls another handler directly. Every emission is queued
//! and dispatched later, so arbitrarily long emit chains use constant stack.

use std::marker::PhantomData;

use crate::engine::Shared;
use crate::event::{Event, Kind, TaggedEvent};
use crate::queue::DualQueue;
use crate::receiver::Emits;

/// Context an emission is routed from.
pub(crate) enum Lane<'a, E: Event> {
    /// The engine thread, which owns the local ring.
    Local {
        queue: &'a mut DualQueue<TaggedEvent<E>>,
        shared: &'a Shared<E>,
    },
    /// Any other thread.
    Remote { shared: &'a Shared<E> },
}

impl<E: Event> Lane<'_, E> {
    fn shared(&self) -> &Shared<E> {
        match self {
            Self::Local { shared, .. } | Self::Remote { shared } => *shared,
        }
    }

    /// Routes one event to every interested receiver.
    ///
    /// Same-thread receivers get one copy on the engine queue (dispatch fans
    /// it out). Own-thread receivers get one inbox entry each. The event is
    /// cloned only when both sides want it; the last consumer gets the move.
    pub(crate) fn route(&mut self, event: E) {
        self.route_as(event.kind(), event);
    }

    /// Routes `event` by the kind its emitter declared.
    ///
    /// Own-thread inboxes are chosen from `kind`, which is what their
    /// producer count was computed from.
    pub(crate) fn route_as(&mut self, kind: usize, event: E) {
        let (to_same, to_own) = {
            let topology = self.shared().topology();
            (topology.has_same_thread(kind), topology.has_own_thread(kind))
        };

        match (to_same, to_own) {
            (true, true) => {
                self.push_same_thread(event.clone());
                self.shared().push_own_thread(kind, event);
            }
            (true, false) => self.push_same_thread(event),
            (false, true) => self.shared().push_own_thread(kind, event),
            (false, false) => {
                tracing::trace!("No receiver for {}", E::kind_name(kind));
            }
        }
    }

    fn push_same_thread(&mut self, event: E) {
        match self {
            Self::Local { queue, shared } => {
                if let Some(slot) = queue.alloc_local() {
                    slot.store_event(event);
                    queue.commit_local();
                } else {
                    shared.record_drop(event.kind());
                }
            }
            Self::Remote { shared } => shared.push_remote(event),
        }
    }

    fn is_local(&self) -> bool {
        matches!(self, Self::Local { .. })
    }
}

/// Emission handle passed to [`Receiver::on_event`](crate::Receiver::on_event).
///
/// `D` is the declaration the router was created for; it decides which
/// kinds [`emit`](Self::emit) accepts.
pub struct Router<'a, D: ?Sized, E: Event> {
    lane: Lane<'a, E>,
    _declaration: PhantomData<fn(&D)>,
}

impl<'a, D: ?Sized, E: Event> Router<'a, D, E> {
    pub(crate) fn new(lane: Lane<'a, E>) -> Self {
        Self {
            lane,
            _declaration: PhantomData,
        }
    }

    /// Emits `payload` to every receiver that receives kind `K`.
    ///
    /// Never blocks. If a target queue is full the event is dropped for
    /// that target and counted in [`EngineStats::dropped`](crate::EngineStats).
    #[inline]
    pub fn emit<K>(&mut self, payload: K)
    where
        K: Kind<E>,
        D: Emits<E, K>,
    {
        let event = payload.into_event();
        debug_assert_eq!(
            event.kind(),
            K::INDEX,
            "{} converts into another kind",
            std::any::type_name::<K>()
        );
        self.lane.route_as(K::INDEX, event);
    }

    /// Returns true when the handler runs on the engine thread.
    #[must_use]
    pub fn is_engine_thread(&self) -> bool {
        self.lane.is_local()
    }
}

impl<D: ?Sized, E: Event> std::fmt::Debug for Router<'_, D, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("declaration", &std::any::type_name::<D>())
            .field("engine_thread", &self.is_engine_thread())
            .finish()
    }
}
