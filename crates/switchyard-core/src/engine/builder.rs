//! Assembles an [`Engine`] from an ordered list of declarations.

use std::fmt;
use std::sync::Arc;

use fxhash::FxHashMap;

use crate::event::{Event, TaggedEvent};
use crate::queue::{DualQueue, Inbox, InboxMode};
use crate::receiver::{
    Declaration, Emitter, OwnThreadWrapper, Receiver, ReceiverCell, Role, SameThreadSlot,
    SameThreadWrapper, WorkerCell,
};

use super::config::{EngineConfig, ReceiverOptions};
use super::topology::Topology;
use super::{Engine, EngineError, Shared, Slot};

enum Entry<E: Event> {
    SameThread(Box<dyn SameThreadSlot<E>>),
    OwnThread {
        cell: Arc<dyn WorkerCell<E>>,
        options: ReceiverOptions,
    },
    External,
}

/// Collects receivers and external emitter declarations, then builds the
/// engine.
///
/// Declaration order is the fan-out order. Adding the same declaration type
/// twice is rejected by [`build`](Self::build).
///
/// ```rust
/// use switchyard_core::{emits, event_set, kinds, Engine, KindSet, Receiver, Router};
///
/// #[derive(Debug, Clone)]
/// pub struct Hello;
///
/// event_set! {
///     #[derive(Debug, Clone)]
///     pub enum Greeting {
///         Hello(Hello),
///     }
/// }
///
/// struct Listener;
/// emits!(Listener: Greeting =>);
///
/// impl Receiver<Greeting> for Listener {
///     const RECEIVES: KindSet = kinds!(Greeting => Hello);
///     fn on_event(&mut self, _: Greeting, _: &mut Router<'_, Self, Greeting>) {}
/// }
///
/// let twice = Engine::<Greeting>::builder().add(Listener).add(Listener).build();
/// assert!(twice.is_err());
/// ```
pub struct EngineBuilder<E: Event> {
    config: EngineConfig,
    declarations: Vec<Declaration>,
    entries: Vec<Entry<E>>,
    duplicate: Option<&'static str>,
}

impl<E: Event> EngineBuilder<E> {
    /// Creates an empty builder with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            declarations: Vec::new(),
            entries: Vec::new(),
            duplicate: None,
        }
    }

    /// Replaces the engine configuration.
    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Adds a receiver with default options.
    #[must_use]
    pub fn add<R: Receiver<E>>(self, receiver: R) -> Self {
        self.add_with(receiver, ReceiverOptions::default())
    }

    /// Adds a receiver. `options` only apply to own-thread receivers.
    #[must_use]
    pub fn add_with<R: Receiver<E>>(mut self, receiver: R, options: ReceiverOptions) -> Self {
        let declaration = Declaration::receiver::<E, R>();
        let entry = match declaration.role {
            Role::OwnThread => Entry::OwnThread {
                cell: Arc::new(ReceiverCell::new(receiver)),
                options,
            },
            _ => Entry::SameThread(Box::new(SameThreadWrapper::new(receiver))),
        };
        self.record(declaration, entry);
        self
    }

    /// Declares an external emitter. Handles for it come from
    /// [`Engine::external_emitter`].
    #[must_use]
    pub fn add_external<X: Emitter<E>>(mut self) -> Self {
        self.record(Declaration::external::<E, X>(), Entry::External);
        self
    }

    fn record(&mut self, declaration: Declaration, entry: Entry<E>) {
        if self
            .declarations
            .iter()
            .any(|existing| existing.type_id == declaration.type_id)
        {
            self.duplicate.get_or_insert(declaration.name);
            return;
        }
        self.declarations.push(declaration);
        self.entries.push(entry);
    }

    /// Builds the engine. Workers are not started until
    /// [`Engine::start`].
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DuplicateDeclaration`] if a declaration was
    /// added twice, or [`EngineError::InvalidConfig`] for a zero capacity.
    pub fn build(self) -> Result<Engine<E>, EngineError> {
        if let Some(name) = self.duplicate {
            return Err(EngineError::DuplicateDeclaration {
                name: name.to_string(),
            });
        }
        self.config.validate()?;

        let topology = Topology::build(E::KIND_COUNT, &self.declarations);
        let queue: DualQueue<TaggedEvent<E>> =
            DualQueue::new(self.config.local_capacity, self.config.remote_capacity);

        let mut same_thread = Vec::new();
        let mut own_thread = Vec::new();
        let mut inboxes = Vec::new();
        let mut directory = FxHashMap::default();

        for (declaration, entry) in self.declarations.iter().zip(self.entries) {
            let slot = match entry {
                Entry::SameThread(wrapper) => {
                    same_thread.push(wrapper);
                    Slot::SameThread(same_thread.len() - 1)
                }
                Entry::OwnThread { cell, options } => {
                    let capacity = options.inbox_capacity.unwrap_or(self.config.inbox_capacity);
                    if capacity == 0 {
                        return Err(EngineError::InvalidConfig(format!(
                            "inbox_capacity of '{}' must be > 0",
                            declaration.name
                        )));
                    }

                    let position = inboxes.len();
                    let producers = topology.producers(position);
                    let mode = InboxMode::for_producers(producers);
                    tracing::debug!(
                        "Receiver '{}' inbox: {:?} ({} producers, capacity {})",
                        declaration.name,
                        mode,
                        producers,
                        capacity
                    );

                    let inbox = Arc::new(Inbox::new(mode, capacity));
                    inboxes.push(Arc::clone(&inbox));
                    own_thread.push(OwnThreadWrapper::new(
                        declaration.name,
                        cell,
                        inbox,
                        producers,
                        options.cpu_affinity,
                    ));
                    Slot::OwnThread(position)
                }
                Entry::External => Slot::External,
            };
            directory.insert(declaration.type_id, slot);
        }

        tracing::info!(
            "Engine assembled: {} same-thread, {} own-thread, {} external",
            same_thread.len(),
            own_thread.len(),
            directory.len() - same_thread.len() - own_thread.len()
        );

        let shared = Arc::new(Shared::new(topology, Arc::clone(queue.remote()), inboxes));
        Ok(Engine::new(
            self.config,
            shared,
            queue,
            same_thread,
            own_thread,
            directory,
        ))
    }
}

impl<E: Event> Default for EngineBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Event> fmt::Debug for EngineBuilder<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineBuilder")
            .field("config", &self.config)
            .field("declarations", &self.declarations)
            .field("duplicate", &self.duplicate)
            .finish_non_exhaustive()
    }
}
