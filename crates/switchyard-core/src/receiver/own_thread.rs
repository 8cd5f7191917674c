//! # Own-Thread Wrapper
//!
//! Runs one receiver on a dedicated worker thread fed from a private inbox.
//!
//! ## Worker loop
//!
//! Each wrapper spawns a thread that:
//! 1. Optionally pins itself to a CPU
//! 2. Pops from its inbox, spinning while empty
//! 3. Locks the receiver and invokes its handler with a remote-lane router
//! 4. Repeats until the running flag is cleared
//!
//! The inbox is SPSC or MPSC depending on how many contexts can push into
//! it; see [`InboxMode`](crate::queue::InboxMode).
//!
//! The receiver sits behind a mutex that only the worker takes while the
//! engine is running, so it stays readable through
//! [`Engine::get`](crate::Engine::get) once the engine is stopped.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use crate::engine::{EngineError, Shared};
use crate::event::{Event, TaggedEvent};
use crate::queue::{Inbox, InboxMode};
use crate::router::{Lane, Router};

use super::Receiver;

/// Type-erased own-thread receiver shared with its worker.
pub(crate) trait WorkerCell<E: Event>: Send + Sync {
    /// Invokes the handler with a router on the remote lane.
    fn handle(&self, event: E, shared: &Shared<E>);

    fn as_any(&self) -> &dyn Any;
}

/// An own-thread receiver behind the lock its worker takes per event.
pub(crate) struct ReceiverCell<R> {
    receiver: Mutex<R>,
}

impl<R> ReceiverCell<R> {
    pub(crate) fn new(receiver: R) -> Self {
        Self {
            receiver: Mutex::new(receiver),
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, R> {
        self.receiver.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<E: Event, R: Receiver<E>> WorkerCell<E> for ReceiverCell<R> {
    fn handle(&self, event: E, shared: &Shared<E>) {
        let mut receiver = self.lock();
        let mut router = Router::<R, E>::new(Lane::Remote { shared });
        receiver.on_event(event, &mut router);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Owns an own-thread receiver, its inbox and its worker thread.
pub(crate) struct OwnThreadWrapper<E: Event> {
    name: &'static str,
    cell: Arc<dyn WorkerCell<E>>,
    inbox: Arc<Inbox<TaggedEvent<E>>>,
    producers: usize,
    cpu_affinity: Option<usize>,
    running: Arc<AtomicBool>,
    processed: Arc<AtomicU64>,
    thread: Option<JoinHandle<()>>,
}

impl<E: Event> OwnThreadWrapper<E> {
    pub(crate) fn new(
        name: &'static str,
        cell: Arc<dyn WorkerCell<E>>,
        inbox: Arc<Inbox<TaggedEvent<E>>>,
        producers: usize,
        cpu_affinity: Option<usize>,
    ) -> Self {
        Self {
            name,
            cell,
            inbox,
            producers,
            cpu_affinity,
            running: Arc::new(AtomicBool::new(false)),
            processed: Arc::new(AtomicU64::new(0)),
            thread: None,
        }
    }

    pub(crate) fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn cell(&self) -> &Arc<dyn WorkerCell<E>> {
        &self.cell
    }

    pub(crate) fn producers(&self) -> usize {
        self.producers
    }

    pub(crate) fn inbox_mode(&self) -> InboxMode {
        self.inbox.mode()
    }

    pub(crate) fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Spawns the worker. No-op while a worker is already running.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SpawnFailed`] if the OS refuses the thread.
    pub(crate) fn start(
        &mut self,
        shared: &Arc<Shared<E>>,
        thread_name: String,
    ) -> Result<(), EngineError> {
        if self.thread.is_some() {
            return Ok(());
        }

        self.inbox.reset();
        self.running.store(true, Ordering::Release);

        let context = WorkerContext {
            name: self.name,
            cpu_affinity: self.cpu_affinity,
            cell: Arc::clone(&self.cell),
            inbox: Arc::clone(&self.inbox),
            shared: Arc::clone(shared),
            running: Arc::clone(&self.running),
            processed: Arc::clone(&self.processed),
        };

        let thread = thread::Builder::new()
            .name(thread_name)
            .spawn(move || worker_main(&context))
            .map_err(|e| {
                self.running.store(false, Ordering::Release);
                EngineError::SpawnFailed {
                    name: self.name.to_string(),
                    message: e.to_string(),
                }
            })?;

        self.thread = Some(thread);
        Ok(())
    }

    /// Clears the running flag, unblocks the inbox and joins the worker.
    /// No-op when no worker is running.
    pub(crate) fn stop(&mut self) {
        let Some(handle) = self.thread.take() else {
            return;
        };

        self.running.store(false, Ordering::Release);
        self.inbox.stop();

        if handle.join().is_err() {
            tracing::error!("Worker '{}' panicked", self.name);
        }
    }
}

impl<E: Event> Drop for OwnThreadWrapper<E> {
    fn drop(&mut self) {
        self.stop();
    }
}

impl<E: Event> fmt::Debug for OwnThreadWrapper<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnThreadWrapper")
            .field("name", &self.name)
            .field("inbox_mode", &self.inbox_mode())
            .field("producers", &self.producers)
            .field("inbox_len", &self.inbox.len())
            .field("is_running", &self.is_running())
            .field("processed", &self.processed())
            .finish_non_exhaustive()
    }
}

/// Context passed to the worker thread.
struct WorkerContext<E: Event> {
    name: &'static str,
    cpu_affinity: Option<usize>,
    cell: Arc<dyn WorkerCell<E>>,
    inbox: Arc<Inbox<TaggedEvent<E>>>,
    shared: Arc<Shared<E>>,
    running: Arc<AtomicBool>,
    processed: Arc<AtomicU64>,
}

fn worker_main<E: Event>(ctx: &WorkerContext<E>) {
    if let Some(cpu_id) = ctx.cpu_affinity {
        if let Err(e) = set_cpu_affinity(ctx.name, cpu_id) {
            tracing::warn!("{e}");
        }
    }

    tracing::debug!("Worker '{}' started", ctx.name);

    while ctx.running.load(Ordering::Acquire) {
        let Some(mut slot) = ctx.inbox.pop_spin() else {
            break;
        };
        if let Some(event) = slot.take() {
            ctx.cell.handle(event, &ctx.shared);
            ctx.processed.fetch_add(1, Ordering::Relaxed);
        }
    }

    tracing::debug!(
        "Worker '{}' stopped after {} events",
        ctx.name,
        ctx.processed.load(Ordering::Relaxed)
    );
}

/// Pins the calling thread to `cpu_id`. A no-op outside Linux.
#[allow(unsafe_code)]
fn set_cpu_affinity(name: &str, cpu_id: usize) -> Result<(), EngineError> {
    #[cfg(target_os = "linux")]
    {
        use libc::{cpu_set_t, sched_setaffinity, CPU_SET, CPU_ZERO};
        use std::mem;

        // SAFETY: the set is zero-initialized and filled through the libc
        // helpers; pid 0 targets the calling thread.
        unsafe {
            let mut set: cpu_set_t = mem::zeroed();
            CPU_ZERO(&mut set);
            CPU_SET(cpu_id, &mut set);

            let result = sched_setaffinity(0, mem::size_of::<cpu_set_t>(), &set);
            if result != 0 {
                return Err(EngineError::AffinityFailed {
                    name: name.to_string(),
                    message: format!(
                        "sched_setaffinity failed: {}",
                        std::io::Error::last_os_error()
                    ),
                });
            }
        }
    }

    #[cfg(not(target_os = "linux"))]
    {
        let _ = (name, cpu_id);
    }

    Ok(())
}

