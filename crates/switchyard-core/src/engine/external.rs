//! Handles that reach the engine from other threads without keeping it alive.

use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, Weak};

use crate::event::{Event, Kind};
use crate::receiver::{Emits, Emitter};
use crate::router::Lane;

use super::Shared;

/// Injects events from any thread on behalf of the external declaration `X`.
///
/// Obtained from [`Engine::external_emitter`](crate::Engine::external_emitter).
/// Holds the engine weakly: once the engine is dropped the handle reports
/// [`is_valid`](Self::is_valid) `false` and [`emit`](Self::emit) fails.
///
/// ```rust
/// use switchyard_core::{emits, event_set, kinds, Engine, KindSet, Receiver, Router, Spin};
///
/// #[derive(Debug, Clone)]
/// pub struct Tick(pub u64);
///
/// event_set! {
///     #[derive(Debug, Clone)]
///     pub enum Clock {
///         Tick(Tick),
///     }
/// }
///
/// #[derive(Default)]
/// struct Counter(u64);
/// emits!(Counter: Clock =>);
///
/// impl Receiver<Clock> for Counter {
///     const RECEIVES: KindSet = kinds!(Clock => Tick);
///     fn on_event(&mut self, _: Clock, _: &mut Router<'_, Self, Clock>) {
///         self.0 += 1;
///     }
/// }
///
/// struct Timer;
/// emits!(Timer: Clock => Tick);
///
/// let mut engine = Engine::<Clock>::builder()
///     .add(Counter::default())
///     .add_external::<Timer>()
///     .build()?;
/// let timer = engine.external_emitter::<Timer>()?;
///
/// std::thread::spawn(move || assert!(timer.emit(Tick(1)))).join().unwrap();
/// Spin::new(&mut engine).drain();
/// assert_eq!(engine.get::<Counter>().map(|c| c.0), Some(1));
/// # Ok::<(), switchyard_core::EngineError>(())
/// ```
pub struct ExternalEmitter<X, E: Event> {
    shared: Weak<Shared<E>>,
    _declaration: PhantomData<fn() -> X>,
}

impl<X: Emitter<E>, E: Event> ExternalEmitter<X, E> {
    pub(crate) fn new(shared: &Arc<Shared<E>>) -> Self {
        Self {
            shared: Arc::downgrade(shared),
            _declaration: PhantomData,
        }
    }

    /// Emits `payload` to every receiver of kind `K`.
    ///
    /// Returns `false` without side effects if the engine is gone. A `true`
    /// return means the event was routed; a full target queue still drops
    /// it, as for every other emission.
    pub fn emit<K>(&self, payload: K) -> bool
    where
        K: Kind<E>,
        X: Emits<E, K>,
    {
        let Some(shared) = self.shared.upgrade() else {
            return false;
        };
        let event = payload.into_event();
        debug_assert_eq!(
            event.kind(),
            K::INDEX,
            "{} converts into another kind",
            std::any::type_name::<K>()
        );
        Lane::Remote { shared: &shared }.route_as(K::INDEX, event);
        true
    }

    /// Returns true while the engine is alive.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.shared.strong_count() > 0
    }
}

impl<X, E: Event> Clone for ExternalEmitter<X, E> {
    fn clone(&self) -> Self {
        Self {
            shared: Weak::clone(&self.shared),
            _declaration: PhantomData,
        }
    }
}

impl<X, E: Event> fmt::Debug for ExternalEmitter<X, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExternalEmitter")
            .field("declaration", &std::any::type_name::<X>())
            .field("valid", &(self.shared.strong_count() > 0))
            .finish()
    }
}

/// Stops a running engine from any thread.
///
/// Clears the running flag and wakes a poller blocked in a wait, so
/// [`Engine::run`](crate::Engine::run) and the polling strategies return.
/// Workers keep running until the engine thread calls
/// [`Engine::stop`](crate::Engine::stop) or drops the engine.
pub struct ShutdownHandle<E: Event> {
    shared: Weak<Shared<E>>,
}

impl<E: Event> ShutdownHandle<E> {
    pub(crate) fn new(shared: &Arc<Shared<E>>) -> Self {
        Self {
            shared: Arc::downgrade(shared),
        }
    }

    /// Requests shutdown. Returns `false` if the engine is gone.
    pub fn shutdown(&self) -> bool {
        let Some(shared) = self.shared.upgrade() else {
            return false;
        };
        shared.set_running(false);
        shared.stop_remote();
        true
    }

    /// Returns true while the engine is alive.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.shared.strong_count() > 0
    }
}

impl<E: Event> Clone for ShutdownHandle<E> {
    fn clone(&self) -> Self {
        Self {
            shared: Weak::clone(&self.shared),
        }
    }
}

impl<E: Event> fmt::Debug for ShutdownHandle<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShutdownHandle")
            .field("valid", &self.is_valid())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::{Left, Right, Skewed};
    use crate::{emits, kinds, Engine, KindSet, Receiver, Router};

    #[derive(Default)]
    struct RightSink {
        seen: u32,
    }
    emits!(RightSink: Skewed =>);

    impl Receiver<Skewed> for RightSink {
        const RECEIVES: KindSet = kinds!(Skewed => Right);

        fn on_event(&mut self, _: Skewed, _: &mut Router<'_, Self, Skewed>) {
            self.seen += 1;
        }
    }

    struct LeftFeed;
    emits!(LeftFeed: Skewed => Left);

    struct RightFeed;
    emits!(RightFeed: Skewed => Right);

    #[test]
    fn test_emit_after_engine_dropped() {
        let engine = Engine::<Skewed>::builder()
            .add(RightSink::default())
            .add_external::<RightFeed>()
            .build()
            .unwrap();
        let feed = engine.external_emitter::<RightFeed>().unwrap();
        assert!(feed.is_valid());
        assert!(feed.emit(Right(1)));

        drop(engine);
        assert!(!feed.is_valid());
        assert!(!feed.emit(Right(2)));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "converts into another kind")]
    fn test_emit_checks_payload_kind() {
        let engine = Engine::<Skewed>::builder()
            .add(RightSink::default())
            .add_external::<LeftFeed>()
            .build()
            .unwrap();
        let feed = engine.external_emitter::<LeftFeed>().unwrap();
        feed.emit(Left(3));
    }
}
