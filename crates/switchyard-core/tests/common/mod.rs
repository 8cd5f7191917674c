#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use switchyard_core::{event_set, Engine, Event, PollStrategy, Spin};

#[derive(Debug, Clone)]
pub struct Ping {
    pub value: u32,
}

#[derive(Debug, Clone)]
pub struct Pong {
    pub value: u32,
}

#[derive(Debug, Clone)]
pub struct Chain {
    pub depth: u32,
}

#[derive(Debug, Clone)]
pub struct Tick {
    pub value: u64,
}

#[derive(Debug, Clone)]
pub struct Start;

#[derive(Debug, Clone)]
pub struct Work {
    pub id: u32,
}

#[derive(Debug, Clone)]
pub struct Done {
    pub id: u32,
}

/// Counts constructions, clones and drops of [`Tracked`] payloads.
#[derive(Debug, Default)]
pub struct Census {
    constructed: AtomicUsize,
    cloned: AtomicUsize,
    dropped: AtomicUsize,
}

impl Census {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn constructed(&self) -> usize {
        self.constructed.load(Ordering::SeqCst)
    }

    pub fn cloned(&self) -> usize {
        self.cloned.load(Ordering::SeqCst)
    }

    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::SeqCst)
    }

    pub fn live(&self) -> usize {
        self.constructed() - self.dropped()
    }
}

#[derive(Debug)]
pub struct Tracked {
    pub value: u64,
    census: Arc<Census>,
}

impl Tracked {
    pub fn new(value: u64, census: &Arc<Census>) -> Self {
        census.constructed.fetch_add(1, Ordering::SeqCst);
        Self {
            value,
            census: Arc::clone(census),
        }
    }
}

impl Clone for Tracked {
    fn clone(&self) -> Self {
        self.census.cloned.fetch_add(1, Ordering::SeqCst);
        Self::new(self.value, &self.census)
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.census.dropped.fetch_add(1, Ordering::SeqCst);
    }
}

event_set! {
    #[derive(Debug, Clone)]
    pub enum Sim {
        Ping(Ping),
        Pong(Pong),
        Chain(Chain),
        Tick(Tick),
        Start(Start),
        Work(Work),
        Done(Done),
        Tracked(Tracked),
    }
}

/// Polls `condition` until it holds or `timeout` passes.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    condition()
}

/// Spins the engine until `condition` holds or `timeout` passes.
pub fn drive_until<E: Event>(
    engine: &mut Engine<E>,
    timeout: Duration,
    mut condition: impl FnMut(&Engine<E>) -> bool,
) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition(engine) {
            return true;
        }
        if !Spin::new(engine).poll() {
            thread::yield_now();
        }
    }
    condition(engine)
}
