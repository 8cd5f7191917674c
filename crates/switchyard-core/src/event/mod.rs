//! # Events
//!
//! The closed set of event kinds an engine routes, and the tagged container
//! that carries one of them through the queues.
//!
//! ## Design
//!
//! An event set is an ordinary enum with one tuple variant per payload type.
//! The enum is the tagged union: the discriminant selects the live payload,
//! and copy/drop go through the compiler's per-variant glue. Payload types
//! implement [`Kind`] for the set they belong to, which gives each of them a
//! stable index used by the routing tables.
//!
//! [`event_set!`](crate::event_set) writes the enum and every trait impl:
//!
//! ```rust
//! use switchyard_core::{event_set, Event, Kind};
//!
//! #[derive(Debug, Clone)]
//! pub struct Ping {
//!     pub value: i32,
//! }
//!
//! #[derive(Debug, Clone)]
//! pub struct Pong {
//!     pub value: i32,
//! }
//!
//! event_set! {
//!     #[derive(Debug, Clone)]
//!     pub enum PingPong {
//!         Ping(Ping),
//!         Pong(Pong),
//!     }
//! }
//!
//! assert_eq!(PingPong::KIND_COUNT, 2);
//! assert_eq!(<Pong as Kind<PingPong>>::INDEX, 1);
//!
//! let event: PingPong = Ping { value: 3 }.into();
//! assert_eq!(event.kind(), 0);
//! assert_eq!(PingPong::kind_name(event.kind()), "Ping");
//! ```

mod kind_set;
mod tagged;

pub use kind_set::KindSet;
pub use tagged::TaggedEvent;

use std::fmt;

/// A closed set of event kinds.
///
/// Implemented by [`event_set!`](crate::event_set).
///
/// # Safety
///
/// `kind()` must stay in `0..KIND_COUNT` and must equal [`Kind::INDEX`] of
/// the payload the value holds. The engine picks lock-free single-producer
/// inboxes from the declared kinds, so an event reporting another kind can
/// reach a queue from a thread that was never counted as its producer.
///
/// A plain `impl` is rejected:
///
/// ```compile_fail
/// use switchyard_core::Event;
///
/// #[derive(Debug, Clone)]
/// struct Lone;
///
/// impl Event for Lone {
///     const KIND_COUNT: usize = 1;
///     fn kind(&self) -> usize {
///         0
///     }
///     fn kind_name(_: usize) -> &'static str {
///         "Lone"
///     }
/// }
/// ```
#[allow(unsafe_code)]
pub unsafe trait Event: Clone + fmt::Debug + Send + 'static {
    /// Number of kinds in the set.
    const KIND_COUNT: usize;

    /// Index of the active kind.
    fn kind(&self) -> usize;

    /// Variant name for a kind index, for logs.
    fn kind_name(kind: usize) -> &'static str;
}

/// A payload type that is one member of the event set `E`.
///
/// # Safety
///
/// `into_event(self).kind()` must equal `INDEX`, and `INDEX` must be unique
/// within `E`.
#[allow(unsafe_code)]
pub unsafe trait Kind<E: Event>: Clone + Send + Sized + 'static {
    /// Position of this kind in `E`.
    const INDEX: usize;

    /// Wraps the payload into the event set.
    fn into_event(self) -> E;

    /// Unwraps the payload if `event` holds this kind.
    ///
    /// # Errors
    ///
    /// Hands the event back unchanged when another kind is active.
    fn try_from_event(event: E) -> Result<Self, E>;

    /// Borrows the payload if `event` holds this kind.
    fn from_ref(event: &E) -> Option<&Self>;

    /// Mutably borrows the payload if `event` holds this kind.
    fn from_mut(event: &mut E) -> Option<&mut Self>;
}
