//! # Receivers
//!
//! Components that consume events, and the wrappers the engine keeps them in.
//!
//! A receiver declares three things as associated items:
//!
//! | Item | Meaning |
//! |------|---------|
//! | [`Receiver::RECEIVES`] | kinds routed to this receiver |
//! | [`Emitter::EMITS`] | kinds its handler may emit (via [`emits!`](crate::emits)) |
//! | [`Receiver::THREAD_MODE`] | engine thread or a dedicated worker |
//!
//! A type that only implements [`Emitter`] is an external emitter
//! declaration: it authorizes an
//! [`ExternalEmitter`](crate::ExternalEmitter) handle and never receives.
//!
//! ## Example
//!
//! ```rust
//! use switchyard_core::{emits, event_set, kinds, KindSet, Receiver, Router};
//!
//! #[derive(Debug, Clone)]
//! pub struct Ping(pub u32);
//! #[derive(Debug, Clone)]
//! pub struct Pong(pub u32);
//!
//! event_set! {
//!     #[derive(Debug, Clone)]
//!     pub enum Rally {
//!         Ping(Ping),
//!         Pong(Pong),
//!     }
//! }
//!
//! #[derive(Default)]
//! struct Returner {
//!     returned: u32,
//! }
//!
//! emits!(Returner: Rally => Pong);
//!
//! impl Receiver<Rally> for Returner {
//!     const RECEIVES: KindSet = kinds!(Rally => Ping);
//!
//!     fn on_event(&mut self, event: Rally, router: &mut Router<'_, Self, Rally>) {
//!         if let Rally::Ping(Ping(n)) = event {
//!             self.returned += 1;
//!             router.emit(Pong(n + 1));
//!         }
//!     }
//! }
//! ```

mod own_thread;
mod same_thread;

pub(crate) use own_thread::{OwnThreadWrapper, ReceiverCell, WorkerCell};
pub(crate) use same_thread::{SameThreadSlot, SameThreadWrapper};

use std::any::{self, TypeId};

use crate::event::{Event, Kind, KindSet};
use crate::router::Router;

/// Where a receiver's handler runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThreadMode {
    /// On whichever thread drives the engine, fed from the engine's queue.
    #[default]
    SameThread,
    /// On a dedicated worker thread, fed from a private inbox.
    OwnThread,
}

/// Declares which kinds a component may emit.
///
/// Usually written with [`emits!`](crate::emits). The default emits nothing.
pub trait Emitter<E: Event>: 'static {
    /// Kinds this component may emit.
    const EMITS: KindSet = KindSet::EMPTY;
}

/// Static capability to emit kind `K`.
///
/// [`Router::emit`] and [`ExternalEmitter::emit`](crate::ExternalEmitter::emit)
/// only accept kinds the declaration has this capability for.
///
/// # Safety
///
/// `K::INDEX` must be a member of `Self::EMITS`. The engine picks lock-free
/// inboxes from the declared emit sets; emitting an undeclared kind could put
/// two producers on a single-producer queue. [`emits!`](crate::emits)
/// upholds this.
#[allow(unsafe_code)]
pub unsafe trait Emits<E: Event, K: Kind<E>>: Emitter<E> {}

/// A component that consumes events.
pub trait Receiver<E: Event>: Emitter<E> + Send + Sized {
    /// Kinds routed to this receiver.
    const RECEIVES: KindSet;

    /// Thread the handler runs on.
    const THREAD_MODE: ThreadMode = ThreadMode::SameThread;

    /// Handles one event. Emissions go through `router` and are queued,
    /// never delivered by a nested call.
    fn on_event(&mut self, event: E, router: &mut Router<'_, Self, E>);
}

/// Capability record of one declaration, fixed at assembly time.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Declaration {
    pub(crate) name: &'static str,
    pub(crate) type_id: TypeId,
    pub(crate) receives: KindSet,
    pub(crate) emits: KindSet,
    pub(crate) role: Role,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Role {
    SameThread,
    OwnThread,
    External,
}

impl Declaration {
    pub(crate) fn receiver<E: Event, R: Receiver<E>>() -> Self {
        Self {
            name: short_name(any::type_name::<R>()),
            type_id: TypeId::of::<R>(),
            receives: R::RECEIVES,
            emits: R::EMITS,
            role: match R::THREAD_MODE {
                ThreadMode::SameThread => Role::SameThread,
                ThreadMode::OwnThread => Role::OwnThread,
            },
        }
    }

    pub(crate) fn external<E: Event, X: Emitter<E>>() -> Self {
        Self {
            name: short_name(any::type_name::<X>()),
            type_id: TypeId::of::<X>(),
            receives: KindSet::EMPTY,
            emits: X::EMITS,
            role: Role::External,
        }
    }

    /// Declarations that push from a thread other than the engine's.
    pub(crate) fn is_off_thread_producer(&self) -> bool {
        matches!(self.role, Role::OwnThread | Role::External)
    }
}

/// Strips the module path, keeping generic arguments intact.
fn short_name(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    match base.rfind("::") {
        Some(pos) => &full[pos + 2..],
        None => full,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_name() {
        assert_eq!(short_name("crate::app::Logger"), "Logger");
        assert_eq!(short_name("Logger"), "Logger");
        assert_eq!(short_name("app::Wrap<app::Inner>"), "Wrap<app::Inner>");
    }

    #[test]
    fn test_thread_mode_default() {
        assert_eq!(ThreadMode::default(), ThreadMode::SameThread);
    }
}
