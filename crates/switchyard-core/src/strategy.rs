//! # Polling Strategies
//!
//! Drivers that pull same-thread events out of an [`Engine`] and dispatch
//! them. They differ only in what they do when the engine queue is empty.
//!
//! | Strategy | Empty queue | Blocks |
//! |----------|-------------|--------|
//! | [`Spin`] | returns immediately | never |
//! | [`Yield`] | yields the time slice | never |
//! | [`Wait`] | waits on the engine queue | always |
//! | [`Hybrid`] | spins, then waits once | after `spin_count` empty polls |
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut engine = Engine::<Rally>::builder().add(Returner::default()).build()?;
//! engine.emit(Ping(0));
//! let dispatched = Spin::new(&mut engine).drain();
//! ```

use std::hint;
use std::thread;

use crate::engine::{Engine, DEFAULT_HYBRID_SPIN_COUNT};
use crate::event::Event;

/// Common shape of the polling strategies.
pub trait PollStrategy {
    /// Dispatches at most one event. Returns true if one was dispatched.
    fn poll(&mut self) -> bool;

    /// Whether the driven engine is running.
    fn is_running(&self) -> bool;

    /// Polls until the engine stops.
    fn run(&mut self) {
        while self.is_running() {
            self.poll();
        }
    }

    /// Polls while the engine runs and `predicate` returns true.
    ///
    /// `predicate` is not consulted once the engine has stopped.
    fn run_while<F>(&mut self, mut predicate: F)
    where
        F: FnMut() -> bool,
        Self: Sized,
    {
        while self.is_running() && predicate() {
            self.poll();
        }
    }
}

#[inline]
fn try_dispatch<E: Event>(engine: &mut Engine<E>) -> bool {
    match engine.try_get_event() {
        Some(event) => {
            engine.dispatch_event(event);
            true
        }
        None => false,
    }
}

#[inline]
fn wait_dispatch<E: Event>(engine: &mut Engine<E>) -> bool {
    match engine.wait_get_event() {
        Some(event) => {
            engine.dispatch_event(event);
            true
        }
        None => false,
    }
}

/// Busy-polls; lowest latency, one core at 100%.
#[derive(Debug)]
pub struct Spin<'a, E: Event> {
    engine: &'a mut Engine<E>,
}

impl<'a, E: Event> Spin<'a, E> {
    /// Wraps `engine`.
    pub fn new(engine: &'a mut Engine<E>) -> Self {
        Self { engine }
    }

    /// Polls until the engine queue is empty. Returns the number of events
    /// dispatched.
    pub fn drain(&mut self) -> usize {
        let mut dispatched = 0;
        while self.poll() {
            dispatched += 1;
        }
        dispatched
    }
}

impl<E: Event> PollStrategy for Spin<'_, E> {
    #[inline]
    fn poll(&mut self) -> bool {
        try_dispatch(self.engine)
    }

    fn is_running(&self) -> bool {
        self.engine.is_running()
    }
}

/// Yields the time slice whenever the queue is empty.
#[derive(Debug)]
pub struct Yield<'a, E: Event> {
    engine: &'a mut Engine<E>,
}

impl<'a, E: Event> Yield<'a, E> {
    /// Wraps `engine`.
    pub fn new(engine: &'a mut Engine<E>) -> Self {
        Self { engine }
    }
}

impl<E: Event> PollStrategy for Yield<'_, E> {
    fn poll(&mut self) -> bool {
        if try_dispatch(self.engine) {
            return true;
        }
        thread::yield_now();
        false
    }

    fn is_running(&self) -> bool {
        self.engine.is_running()
    }
}

/// Blocks on the engine queue; no CPU while idle.
///
/// [`poll`](PollStrategy::poll) returns false only once the engine has been
/// stopped and nothing is buffered.
#[derive(Debug)]
pub struct Wait<'a, E: Event> {
    engine: &'a mut Engine<E>,
}

impl<'a, E: Event> Wait<'a, E> {
    /// Wraps `engine`.
    pub fn new(engine: &'a mut Engine<E>) -> Self {
        Self { engine }
    }
}

impl<E: Event> PollStrategy for Wait<'_, E> {
    fn poll(&mut self) -> bool {
        wait_dispatch(self.engine)
    }

    fn is_running(&self) -> bool {
        self.engine.is_running()
    }
}

/// Spins for `spin_count` consecutive empty polls, then blocks once.
#[derive(Debug)]
pub struct Hybrid<'a, E: Event> {
    engine: &'a mut Engine<E>,
    spin_count: u32,
    empty_polls: u32,
}

impl<'a, E: Event> Hybrid<'a, E> {
    /// Wraps `engine` with the default spin count.
    pub fn new(engine: &'a mut Engine<E>) -> Self {
        Self::with_spin_count(engine, DEFAULT_HYBRID_SPIN_COUNT)
    }

    /// Wraps `engine`, blocking after `spin_count` empty polls.
    pub fn with_spin_count(engine: &'a mut Engine<E>, spin_count: u32) -> Self {
        Self {
            engine,
            spin_count,
            empty_polls: 0,
        }
    }

    /// Configured number of empty polls before blocking.
    #[must_use]
    pub fn spin_count(&self) -> u32 {
        self.spin_count
    }
}

impl<E: Event> PollStrategy for Hybrid<'_, E> {
    fn poll(&mut self) -> bool {
        if try_dispatch(self.engine) {
            self.empty_polls = 0;
            return true;
        }

        self.empty_polls += 1;
        if self.empty_polls < self.spin_count {
            hint::spin_loop();
            return false;
        }

        self.empty_polls = 0;
        wait_dispatch(self.engine)
    }

    fn is_running(&self) -> bool {
        self.engine.is_running()
    }
}
