//! # Tagged Event
//!
//! Queue element holding at most one event of the set. Empty slots carry the
//! [`UNINITIALIZED`](TaggedEvent::UNINITIALIZED) tag, which is what the ring
//! buffers pre-fill their storage with.

use super::{Event, Kind};

/// A slot that holds zero or one event of the set `E`.
///
/// The payload lives inline; storing replaces (and drops) whatever was there,
/// and `take` moves the payload out leaving the slot empty, so a payload is
/// never owned by two slots at once.
#[derive(Debug, Clone)]
pub struct TaggedEvent<E> {
    slot: Option<E>,
}

impl<E: Event> TaggedEvent<E> {
    /// Tag reported by an empty slot.
    pub const UNINITIALIZED: usize = usize::MAX;

    /// Creates an empty slot.
    #[must_use]
    pub const fn new() -> Self {
        Self { slot: None }
    }

    /// Replaces the active payload with `payload`.
    #[inline]
    pub fn store<K: Kind<E>>(&mut self, payload: K) {
        self.slot = Some(payload.into_event());
    }

    /// Replaces the active payload with an already-wrapped event.
    #[inline]
    pub fn store_event(&mut self, event: E) {
        self.slot = Some(event);
    }

    /// Returns the active kind index, or [`UNINITIALIZED`](Self::UNINITIALIZED).
    #[inline]
    #[must_use]
    pub fn index(&self) -> usize {
        self.slot.as_ref().map_or(Self::UNINITIALIZED, Event::kind)
    }

    /// Borrows the payload if kind `K` is active.
    #[inline]
    #[must_use]
    pub fn get<K: Kind<E>>(&self) -> Option<&K> {
        self.slot.as_ref().and_then(K::from_ref)
    }

    /// Mutably borrows the payload if kind `K` is active.
    #[inline]
    pub fn get_mut<K: Kind<E>>(&mut self) -> Option<&mut K> {
        self.slot.as_mut().and_then(K::from_mut)
    }

    /// Borrows the wrapped event.
    #[must_use]
    pub fn as_event(&self) -> Option<&E> {
        self.slot.as_ref()
    }

    /// Moves the event out, leaving the slot empty.
    #[inline]
    pub fn take(&mut self) -> Option<E> {
        self.slot.take()
    }

    /// Consumes the slot, returning its event.
    #[must_use]
    pub fn into_event(self) -> Option<E> {
        self.slot
    }

    /// Returns true if no payload is active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slot.is_none()
    }

    /// Variant name of the active kind, for logs.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        self.slot
            .as_ref()
            .map_or("<empty>", |event| E::kind_name(event.kind()))
    }
}

impl<E: Event> Default for TaggedEvent<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Event> From<E> for TaggedEvent<E> {
    fn from(event: E) -> Self {
        Self { slot: Some(event) }
    }
}
