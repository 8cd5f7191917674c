mod common;

use std::sync::{Arc, OnceLock};

use common::{Ping, Pong, Sim};
use switchyard_core::{
    emits, kinds, Engine, EngineConfig, Hybrid, KindSet, PollMode, PollStrategy, Receiver,
    Router, ShutdownHandle, Spin, Wait, Yield,
};

/// Receives pongs and serves the next ping until the rally passes 10.
#[derive(Default)]
struct Server {
    count: u32,
    last: u32,
    finish: Option<Arc<OnceLock<ShutdownHandle<Sim>>>>,
}

emits!(Server: Sim => Ping);

impl Receiver<Sim> for Server {
    const RECEIVES: KindSet = kinds!(Sim => Pong);

    fn on_event(&mut self, event: Sim, router: &mut Router<'_, Self, Sim>) {
        if let Sim::Pong(pong) = event {
            self.count += 1;
            self.last = pong.value;
            if pong.value < 10 {
                router.emit(Ping {
                    value: pong.value + 1,
                });
            } else if let Some(handle) = self.finish.as_ref().and_then(|cell| cell.get()) {
                handle.shutdown();
            }
        }
    }
}

#[derive(Default)]
struct Returner {
    count: u32,
}

emits!(Returner: Sim => Pong);

impl Receiver<Sim> for Returner {
    const RECEIVES: KindSet = kinds!(Sim => Ping);

    fn on_event(&mut self, event: Sim, router: &mut Router<'_, Self, Sim>) {
        if let Sim::Ping(ping) = event {
            self.count += 1;
            router.emit(Pong {
                value: ping.value + 1,
            });
        }
    }
}

fn rally(config: EngineConfig, finish: Option<Arc<OnceLock<ShutdownHandle<Sim>>>>) -> Engine<Sim> {
    let engine = Engine::<Sim>::builder()
        .with_config(config)
        .add(Server {
            finish: finish.clone(),
            ..Server::default()
        })
        .add(Returner::default())
        .build()
        .unwrap();
    if let Some(cell) = finish {
        assert!(cell.set(engine.shutdown_handle()).is_ok());
    }
    engine
}

fn assert_rally_complete(engine: &Engine<Sim>) {
    let server = engine.get::<Server>().unwrap();
    assert_eq!(server.count, 6);
    assert_eq!(server.last, 11);
    drop(server);
    assert_eq!(engine.get::<Returner>().map(|r| r.count), Some(6));
    assert_eq!(engine.stats().dispatched, 12);
}

#[test]
fn test_spin_until_idle() {
    let mut engine = rally(EngineConfig::default(), None);
    engine.emit(Ping { value: 0 });
    assert_eq!(Spin::new(&mut engine).drain(), 12);
    assert_rally_complete(&engine);
}

#[test]
fn test_yield_until_idle() {
    let mut engine = rally(EngineConfig::default(), None);
    engine.emit(Ping { value: 0 });
    let mut strategy = Yield::new(&mut engine);
    while strategy.poll() {}
    assert_rally_complete(&engine);
}

#[test]
fn test_hybrid_polls() {
    let mut engine = rally(EngineConfig::default(), None);
    engine.emit(Ping { value: 0 });
    let mut strategy = Hybrid::with_spin_count(&mut engine, 1_000);
    for _ in 0..12 {
        assert!(strategy.poll());
    }
    assert_rally_complete(&engine);
}

#[test]
fn test_wait_run_ends_on_shutdown() {
    let finish = Arc::new(OnceLock::new());
    let mut engine = rally(EngineConfig::default(), Some(Arc::clone(&finish)));
    engine.start().unwrap();
    engine.emit(Ping { value: 0 });

    Wait::new(&mut engine).run();

    assert!(!engine.is_running());
    assert_rally_complete(&engine);
}

#[test]
fn test_engine_run_each_poll_mode() {
    for mode in [PollMode::Spin, PollMode::Yield, PollMode::Wait, PollMode::Hybrid] {
        let finish = Arc::new(OnceLock::new());
        let config = EngineConfig::builder()
            .poll_mode(mode)
            .hybrid_spin_count(16)
            .build()
            .unwrap();
        let mut engine = rally(config, Some(Arc::clone(&finish)));
        engine.emit(Ping { value: 0 });

        engine.run().unwrap();

        assert!(!engine.is_running(), "{mode:?}");
        assert_rally_complete(&engine);
    }
}
