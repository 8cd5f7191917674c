//! # Engine
//!
//! Owns every receiver and routes each event to all receivers of its kind.
//!
//! ## Architecture
//!
//! ```text
//!                    ┌──────────────────────────────────────────┐
//!   Engine::emit ───►│ DualQueue ──► dispatch_event ──► ST₀ ST₁ │
//!                    │   ▲ local        (fan-out in        │    │
//!                    │   │              declaration order) │    │
//!                    │   └─────── emit (local lane) ◄──────┘    │
//!                    │   ▲ remote                               │
//!                    └───┼──────────────────────────────────────┘
//!                        │            inbox         inbox
//!   ExternalEmitter ─────┼─────────► [OT₀ worker]  [OT₁ worker]
//!                        └──── emit (remote lane) ◄────┘
//! ```
//!
//! Same-thread receivers (ST) run inline on whichever thread polls the
//! engine. Own-thread receivers (OT) each run on a worker fed by a private
//! inbox. Routing is decided per kind from the declarations, once, when the
//! engine is built.
//!
//! ## Fan-out
//!
//! An event with N same-thread receivers is cloned N−1 times; the last
//! receiver in declaration order gets the original. Own-thread inboxes
//! follow the same rule.
//!
//! ## Backpressure
//!
//! Every queue is bounded. An emission into a full queue is dropped for that
//! target and counted in [`EngineStats::dropped`]; emitting never blocks.

mod builder;
mod config;
mod external;
mod shared;
mod topology;

pub use builder::EngineBuilder;
pub use config::{
    EngineConfig, EngineConfigBuilder, PollMode, ReceiverOptions, DEFAULT_HYBRID_SPIN_COUNT,
    DEFAULT_INBOX_CAPACITY, DEFAULT_LOCAL_CAPACITY, DEFAULT_REMOTE_CAPACITY,
    DEFAULT_THREAD_NAME_PREFIX,
};
pub use external::{ExternalEmitter, ShutdownHandle};
pub(crate) use shared::Shared;

use std::any::{self, TypeId};
use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, MutexGuard};
use std::time::Duration;

use fxhash::FxHashMap;

use crate::event::{Event, TaggedEvent};
use crate::queue::{DualQueue, InboxMode};
use crate::receiver::{
    Emitter, OwnThreadWrapper, Receiver, ReceiverCell, SameThreadSlot, SameThreadWrapper,
};
use crate::router::Lane;
use crate::strategy::{Hybrid, PollStrategy, Spin, Wait, Yield};

/// Errors from assembling or running an engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The same declaration was added to the builder twice
    #[error("Declaration '{name}' was added more than once")]
    DuplicateDeclaration {
        /// Declaration type name
        name: String,
    },

    /// The engine was not built with this declaration
    #[error("Declaration '{name}' is not registered with this engine")]
    NotRegistered {
        /// Declaration type name
        name: String,
    },

    /// The declaration is a receiver, not an external emitter
    #[error("Declaration '{name}' is a receiver, not an external emitter")]
    NotExternal {
        /// Declaration type name
        name: String,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Failed to spawn a worker thread
    #[error("Failed to spawn worker for '{name}': {message}")]
    SpawnFailed {
        /// Receiver name
        name: String,
        /// Error message
        message: String,
    },

    /// Failed to pin a worker thread
    #[error("Failed to set CPU affinity for '{name}': {message}")]
    AffinityFailed {
        /// Receiver name
        name: String,
        /// Error message
        message: String,
    },
}

/// Where a declaration lives inside the engine.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Slot {
    SameThread(usize),
    OwnThread(usize),
    External,
}

/// Counters describing engine activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Events dispatched to same-thread receivers.
    pub dispatched: u64,
    /// Events handled by own-thread workers.
    pub processed: u64,
    /// Events lost to full queues.
    pub dropped: u64,
}

/// Borrow of a receiver returned by [`Engine::get`].
pub enum ReceiverRef<'a, R> {
    /// A same-thread receiver, borrowed directly.
    Inline(&'a R),
    /// An own-thread receiver, borrowed through its worker's lock.
    Locked(MutexGuard<'a, R>),
}

impl<R> Deref for ReceiverRef<'_, R> {
    type Target = R;

    fn deref(&self) -> &R {
        match self {
            Self::Inline(receiver) => receiver,
            Self::Locked(guard) => guard,
        }
    }
}

impl<R: fmt::Debug> fmt::Debug for ReceiverRef<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

/// The dispatch engine for the event set `E`.
pub struct Engine<E: Event> {
    config: EngineConfig,
    shared: Arc<Shared<E>>,
    queue: DualQueue<TaggedEvent<E>>,
    same_thread: Vec<Box<dyn SameThreadSlot<E>>>,
    own_thread: Vec<OwnThreadWrapper<E>>,
    directory: FxHashMap<TypeId, Slot>,
    dispatched: u64,
}

impl<E: Event> Engine<E> {
    /// Starts assembling an engine.
    #[must_use]
    pub fn builder() -> EngineBuilder<E> {
        EngineBuilder::new()
    }

    pub(crate) fn new(
        config: EngineConfig,
        shared: Arc<Shared<E>>,
        queue: DualQueue<TaggedEvent<E>>,
        same_thread: Vec<Box<dyn SameThreadSlot<E>>>,
        own_thread: Vec<OwnThreadWrapper<E>>,
        directory: FxHashMap<TypeId, Slot>,
    ) -> Self {
        Self {
            config,
            shared,
            queue,
            same_thread,
            own_thread,
            directory,
            dispatched: 0,
        }
    }

    /// Sets the running flag and starts every own-thread worker.
    ///
    /// Idempotent. Restarts workers after [`stop`](Self::stop).
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SpawnFailed`] if a worker cannot be spawned;
    /// the engine is stopped again in that case.
    pub fn start(&mut self) -> Result<(), EngineError> {
        let was_running = self.shared.set_running(true);
        self.queue.reset();

        let prefix = &self.config.thread_name_prefix;
        let shared = &self.shared;
        let started = self
            .own_thread
            .iter_mut()
            .try_for_each(|worker| worker.start(shared, format!("{prefix}-{}", worker.name())));

        if let Err(e) = started {
            self.stop();
            return Err(e);
        }

        if !was_running {
            tracing::info!("Engine started with {} workers", self.own_thread.len());
        }
        Ok(())
    }

    /// Clears the running flag, wakes blocked pollers and joins every worker.
    ///
    /// Safe to call any number of times.
    pub fn stop(&mut self) {
        let was_running = self.shared.set_running(false);
        self.queue.stop();
        for worker in &mut self.own_thread {
            worker.stop();
        }

        if was_running {
            let stats = self.stats();
            tracing::info!(
                "Engine stopped: {} dispatched, {} processed, {} dropped",
                stats.dispatched,
                stats.processed,
                stats.dropped
            );
        }
    }

    /// Returns true between [`start`](Self::start) and a stop request.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }

    /// Emits an event from the engine thread to every receiver of its kind.
    ///
    /// Same-thread receivers see it on a later poll; own-thread receivers
    /// get it in their inbox right away.
    pub fn emit(&mut self, event: impl Into<E>) {
        Lane::Local {
            queue: &mut self.queue,
            shared: &self.shared,
        }
        .route(event.into());
    }

    /// Pops the next same-thread event without blocking.
    ///
    /// Only looks at the remote side when a worker or external handle can
    /// emit to same-thread receivers.
    pub fn try_get_event(&mut self) -> Option<TaggedEvent<E>> {
        if self.shared.topology().needs_remote() {
            self.queue.try_pop()
        } else {
            self.queue.try_pop_local()
        }
    }

    /// Pops the next same-thread event, blocking while the engine queue is
    /// empty. Returns `None` once stopped with nothing buffered.
    pub fn wait_get_event(&mut self) -> Option<TaggedEvent<E>> {
        self.queue.wait_pop_any()
    }

    /// Like [`wait_get_event`](Self::wait_get_event), giving up after
    /// `timeout`.
    pub fn wait_get_event_for(&mut self, timeout: Duration) -> Option<TaggedEvent<E>> {
        self.queue.wait_pop_for(timeout)
    }

    /// Delivers one event to every same-thread receiver of its kind, in
    /// declaration order: clones for all but the last, which gets the
    /// original. Handlers' emissions are queued, never dispatched inline.
    pub fn dispatch_event(&mut self, event: TaggedEvent<E>) {
        let Some(event) = event.into_event() else {
            return;
        };

        let Self {
            shared,
            queue,
            same_thread,
            dispatched,
            ..
        } = self;
        let shared: &Shared<E> = shared;

        let Some((&last, rest)) = shared.topology().same_thread_for(event.kind()).split_last()
        else {
            return;
        };
        for &position in rest {
            let lane = Lane::Local {
                queue: &mut *queue,
                shared,
            };
            same_thread[position].dispatch(event.clone(), lane);
        }
        same_thread[last].dispatch(event, Lane::Local { queue, shared });
        *dispatched += 1;
    }

    /// Borrows the receiver registered as `R`.
    ///
    /// Own-thread receivers are borrowed through the lock their worker takes
    /// per event, so holding the borrow stalls that worker.
    #[must_use]
    pub fn get<R: Receiver<E>>(&self) -> Option<ReceiverRef<'_, R>> {
        match *self.directory.get(&TypeId::of::<R>())? {
            Slot::SameThread(position) => self.same_thread[position]
                .as_any()
                .downcast_ref::<SameThreadWrapper<R>>()
                .map(|wrapper| ReceiverRef::Inline(wrapper.receiver())),
            Slot::OwnThread(position) => self.own_thread[position]
                .cell()
                .as_any()
                .downcast_ref::<ReceiverCell<R>>()
                .map(|cell| ReceiverRef::Locked(cell.lock())),
            Slot::External => None,
        }
    }

    /// Returns a handle that emits on behalf of the external declaration `X`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotRegistered`] if `X` was never added, or
    /// [`EngineError::NotExternal`] if it was added as a receiver.
    pub fn external_emitter<X: Emitter<E>>(&self) -> Result<ExternalEmitter<X, E>, EngineError> {
        match self.directory.get(&TypeId::of::<X>()) {
            Some(Slot::External) => Ok(ExternalEmitter::new(&self.shared)),
            Some(_) => Err(EngineError::NotExternal {
                name: any::type_name::<X>().to_string(),
            }),
            None => Err(EngineError::NotRegistered {
                name: any::type_name::<X>().to_string(),
            }),
        }
    }

    /// Returns a handle that can stop [`run`](Self::run) from any thread.
    #[must_use]
    pub fn shutdown_handle(&self) -> ShutdownHandle<E> {
        ShutdownHandle::new(&self.shared)
    }

    /// Number of contexts that may push into own-thread receiver `R`'s inbox;
    /// `None` unless `R` is an own-thread receiver of this engine.
    #[must_use]
    pub fn producer_count<R: Receiver<E>>(&self) -> Option<usize> {
        self.worker::<R>().map(OwnThreadWrapper::producers)
    }

    /// Queue flavor backing own-thread receiver `R`'s inbox.
    #[must_use]
    pub fn inbox_mode<R: Receiver<E>>(&self) -> Option<InboxMode> {
        self.worker::<R>().map(OwnThreadWrapper::inbox_mode)
    }

    fn worker<R: Receiver<E>>(&self) -> Option<&OwnThreadWrapper<E>> {
        match self.directory.get(&TypeId::of::<R>())? {
            Slot::OwnThread(position) => self.own_thread.get(*position),
            _ => None,
        }
    }

    /// Snapshot of the engine counters.
    #[must_use]
    pub fn stats(&self) -> EngineStats {
        EngineStats {
            dispatched: self.dispatched,
            processed: self.own_thread.iter().map(OwnThreadWrapper::processed).sum(),
            dropped: self.shared.dropped(),
        }
    }

    /// The configuration the engine was built with.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Starts the engine and drives it with the configured [`PollMode`]
    /// until a [`ShutdownHandle`] stops it.
    ///
    /// # Errors
    ///
    /// Returns an error if the workers cannot be started.
    pub fn run(&mut self) -> Result<(), EngineError> {
        self.start()?;
        match self.config.poll_mode {
            PollMode::Spin => Spin::new(self).run(),
            PollMode::Yield => Yield::new(self).run(),
            PollMode::Wait => Wait::new(self).run(),
            PollMode::Hybrid => {
                let spin_count = self.config.hybrid_spin_count;
                Hybrid::with_spin_count(self, spin_count).run();
            }
        }
        Ok(())
    }
}

impl<E: Event> Drop for Engine<E> {
    fn drop(&mut self) {
        self.stop();
    }
}

impl<E: Event> fmt::Debug for Engine<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("is_running", &self.is_running())
            .field("same_thread", &self.same_thread.len())
            .field("own_thread", &self.own_thread)
            .field("queue", &self.queue)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}
