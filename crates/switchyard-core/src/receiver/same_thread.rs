//! Same-thread wrapper: runs the handler inline on the engine thread.

use std::any::Any;

use crate::event::Event;
use crate::router::{Lane, Router};

use super::Receiver;

/// Type-erased same-thread receiver as the engine stores it.
pub(crate) trait SameThreadSlot<E: Event>: Send {
    /// Invokes the handler with a router on the engine's local lane.
    fn dispatch(&mut self, event: E, lane: Lane<'_, E>);

    fn as_any(&self) -> &dyn Any;
}

/// Holds one same-thread receiver. No thread, nothing to start or stop.
pub(crate) struct SameThreadWrapper<R> {
    receiver: R,
}

impl<R> SameThreadWrapper<R> {
    pub(crate) fn new(receiver: R) -> Self {
        Self { receiver }
    }

    pub(crate) fn receiver(&self) -> &R {
        &self.receiver
    }
}

impl<E: Event, R: Receiver<E>> SameThreadSlot<E> for SameThreadWrapper<R> {
    #[inline]
    fn dispatch(&mut self, event: E, lane: Lane<'_, E>) {
        let mut router = Router::<R, E>::new(lane);
        self.receiver.on_event(event, &mut router);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
