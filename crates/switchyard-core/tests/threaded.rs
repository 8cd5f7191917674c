mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use common::{drive_until, Done, Sim, Start, Work};
use switchyard_core::{
    emits, kinds, Engine, EngineConfig, KindSet, Receiver, ReceiverOptions, Router, ThreadMode,
};

const TIMEOUT: Duration = Duration::from_secs(10);

/// Same-thread: hands out work for each start.
#[derive(Default)]
struct Controller {
    issued: u32,
}

emits!(Controller: Sim => Work);

impl Receiver<Sim> for Controller {
    const RECEIVES: KindSet = kinds!(Sim => Start);

    fn on_event(&mut self, _: Sim, router: &mut Router<'_, Self, Sim>) {
        router.emit(Work { id: self.issued });
        self.issued += 1;
    }
}

/// Own-thread: finishes work off the engine thread.
#[derive(Default)]
struct Processor {
    handled: u32,
    off_engine_thread: bool,
    dropped: Option<Arc<AtomicBool>>,
}

emits!(Processor: Sim => Done);

impl Receiver<Sim> for Processor {
    const RECEIVES: KindSet = kinds!(Sim => Work);
    const THREAD_MODE: ThreadMode = ThreadMode::OwnThread;

    fn on_event(&mut self, event: Sim, router: &mut Router<'_, Self, Sim>) {
        if let Sim::Work(work) = event {
            self.handled += 1;
            self.off_engine_thread = !router.is_engine_thread();
            thread::sleep(Duration::from_micros(50));
            router.emit(Done { id: work.id });
        }
    }
}

impl Drop for Processor {
    fn drop(&mut self) {
        if let Some(flag) = &self.dropped {
            flag.store(true, Ordering::SeqCst);
        }
    }
}

/// Same-thread: collects finished ids.
#[derive(Default)]
struct Collector {
    ids: Vec<u32>,
}

emits!(Collector: Sim =>);

impl Receiver<Sim> for Collector {
    const RECEIVES: KindSet = kinds!(Sim => Done);

    fn on_event(&mut self, event: Sim, _: &mut Router<'_, Self, Sim>) {
        if let Sim::Done(done) = event {
            self.ids.push(done.id);
        }
    }
}

fn pipeline() -> Engine<Sim> {
    Engine::<Sim>::builder()
        .add(Controller::default())
        .add(Processor::default())
        .add(Collector::default())
        .build()
        .unwrap()
}

fn collected(engine: &Engine<Sim>) -> usize {
    engine.get::<Collector>().map_or(0, |c| c.ids.len())
}

#[test]
fn test_work_round_trips_through_worker() {
    let mut engine = pipeline();
    engine.start().unwrap();

    for _ in 0..20 {
        engine.emit(Start);
    }
    assert!(drive_until(&mut engine, TIMEOUT, |e| collected(e) == 20));
    engine.stop();

    // One worker drains its inbox in order.
    let ids = engine.get::<Collector>().unwrap().ids.clone();
    assert_eq!(ids, (0..20).collect::<Vec<_>>());

    let processor = engine.get::<Processor>().unwrap();
    assert_eq!(processor.handled, 20);
    assert!(processor.off_engine_thread);
    drop(processor);

    let stats = engine.stats();
    assert_eq!(stats.processed, 20);
    assert_eq!(stats.dispatched, 40);
    assert_eq!(stats.dropped, 0);
}

#[test]
fn test_restart_resumes_workers() {
    let mut engine = pipeline();

    engine.start().unwrap();
    engine.emit(Start);
    assert!(drive_until(&mut engine, TIMEOUT, |e| collected(e) == 1));
    engine.stop();
    assert!(!engine.is_running());

    engine.start().unwrap();
    engine.emit(Start);
    engine.emit(Start);
    assert!(drive_until(&mut engine, TIMEOUT, |e| collected(e) == 3));
    engine.stop();

    assert_eq!(engine.stats().processed, 3);
}

#[test]
fn test_drop_joins_workers() {
    let dropped = Arc::new(AtomicBool::new(false));
    let config = EngineConfig::builder()
        .thread_name_prefix("pipeline")
        .build()
        .unwrap();
    let mut engine = Engine::<Sim>::builder()
        .with_config(config)
        .add(Controller::default())
        .add_with(
            Processor {
                handled: 0,
                off_engine_thread: false,
                dropped: Some(Arc::clone(&dropped)),
            },
            ReceiverOptions::default().inbox_capacity(16),
        )
        .add(Collector::default())
        .build()
        .unwrap();
    engine.start().unwrap();
    engine.emit(Start);
    assert!(drive_until(&mut engine, TIMEOUT, |e| collected(e) == 1));

    drop(engine);
    assert!(dropped.load(Ordering::SeqCst));
}

#[test]
fn test_worker_inbox_is_bounded() {
    let mut engine = Engine::<Sim>::builder()
        .add_with(
            Processor::default(),
            ReceiverOptions::default().inbox_capacity(4),
        )
        .build()
        .unwrap();

    // Not started: nothing drains the inbox.
    for id in 0..10 {
        engine.emit(Work { id });
    }
    assert_eq!(engine.stats().dropped, 6);
    engine.stop();
}
