//! # Switchyard Core
//!
//! Typed in-process event dispatch. A fixed set of receivers declares which
//! event kinds it consumes and emits; the engine routes every emitted event
//! to each interested receiver, either inline on the engine thread or on the
//! receiver's own worker thread.
//!
//! This crate provides:
//! - **Events**: a closed enum of payload kinds ([`event_set!`]) and the
//!   [`TaggedEvent`] slot the queues carry
//! - **Queues**: ring buffer, lock-free SPSC, locked MPSC and the dual
//!   local/remote queue
//! - **Receivers**: same-thread and own-thread wrappers
//! - **Engine**: routing, fan-out, lifecycle and external injection
//! - **Strategies**: spin, yield, wait and hybrid polling
//!
//! ## Design Principles
//!
//! 1. **No recursion** - emissions are queued, never dispatched inline
//! 2. **Static routing** - interest graph and inbox types fixed at build time
//! 3. **Lock-free where possible** - SPSC inboxes when one producer is proven
//! 4. **Bounded queues** - full queues drop and count, never block or grow
//!
//! ## Example
//!
//! ```rust
//! use switchyard_core::{emits, event_set, kinds, Engine, KindSet, Receiver, Router, Spin};
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
//! struct Server(u32);
//! emits!(Server: Rally => Pong);
//!
//! impl Receiver<Rally> for Server {
//!     const RECEIVES: KindSet = kinds!(Rally => Ping);
//!     fn on_event(&mut self, event: Rally, router: &mut Router<'_, Self, Rally>) {
//!         if let Rally::Ping(Ping(n)) = event {
//!             self.0 += 1;
//!             router.emit(Pong(n + 1));
//!         }
//!     }
//! }
//!
//! #[derive(Default)]
//! struct Client(u32);
//! emits!(Client: Rally => Ping);
//!
//! impl Receiver<Rally> for Client {
//!     const RECEIVES: KindSet = kinds!(Rally => Pong);
//!     fn on_event(&mut self, event: Rally, router: &mut Router<'_, Self, Rally>) {
//!         if let Rally::Pong(Pong(n)) = event {
//!             self.0 += 1;
//!             if n < 10 {
//!                 router.emit(Ping(n + 1));
//!             }
//!         }
//!     }
//! }
//!
//! let mut engine = Engine::<Rally>::builder()
//!     .add(Server::default())
//!     .add(Client::default())
//!     .build()?;
//!
//! engine.emit(Ping(0));
//! Spin::new(&mut engine).drain();
//!
//! assert_eq!(engine.get::<Server>().map(|s| s.0), Some(6));
//! assert_eq!(engine.get::<Client>().map(|c| c.0), Some(6));
//! # Ok::<(), switchyard_core::EngineError>(())
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod engine;
pub mod event;
pub mod queue;
pub mod receiver;
pub mod router;
pub mod strategy;

mod macros;
#[cfg(test)]
mod testing;

// Re-export key types
pub use engine::{
    Engine, EngineBuilder, EngineConfig, EngineError, EngineStats, ExternalEmitter, PollMode,
    ReceiverOptions, ReceiverRef, ShutdownHandle,
};
pub use event::{Event, Kind, KindSet, TaggedEvent};
pub use queue::InboxMode;
pub use receiver::{Emits, Emitter, Receiver, ThreadMode};
pub use router::Router;
pub use strategy::{Hybrid, PollStrategy, Spin, Wait, Yield};

/// Result type for switchyard-core operations
pub type Result<T> = std::result::Result<T, EngineError>;
