//! Switchyard walkthrough binary

use std::sync::{Arc, OnceLock};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use switchyard_core::{
    emits, event_set, kinds, Engine, EngineConfig, KindSet, PollMode, Receiver, Router,
    ShutdownHandle, Spin, ThreadMode,
};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Switchyard - typed in-process event dispatch demo
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Number of start events in the normal flow
    #[arg(long, default_value_t = 10)]
    starts: u32,

    /// Depth of the chain flow
    #[arg(long, default_value_t = 10_000)]
    chain_depth: u32,

    /// How the engine thread polls
    #[arg(long, value_enum, default_value_t = PollArg::Hybrid)]
    poll_mode: PollArg,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PollArg {
    Spin,
    Yield,
    Wait,
    Hybrid,
}

impl From<PollArg> for PollMode {
    fn from(arg: PollArg) -> Self {
        match arg {
            PollArg::Spin => PollMode::Spin,
            PollArg::Yield => PollMode::Yield,
            PollArg::Wait => PollMode::Wait,
            PollArg::Hybrid => PollMode::Hybrid,
        }
    }
}

#[derive(Debug, Clone)]
struct Start;

#[derive(Debug, Clone)]
struct Data {
    id: u32,
    value: u64,
}

#[derive(Debug, Clone)]
struct Processed {
    id: u32,
    result: u64,
}

#[derive(Debug, Clone)]
struct Chain {
    depth: u32,
}

#[derive(Debug, Clone)]
struct LogLine(String);

event_set! {
    #[derive(Debug, Clone)]
    enum Demo {
        Start(Start),
        Data(Data),
        Processed(Processed),
        Chain(Chain),
        Log(LogLine),
    }
}

/// Prints log lines and ends the normal flow once every item is processed.
struct Logger {
    lines: u64,
    processed: u32,
    expected: u32,
    finish: Arc<OnceLock<ShutdownHandle<Demo>>>,
}

emits!(Logger: Demo =>);

impl Receiver<Demo> for Logger {
    const RECEIVES: KindSet = kinds!(Demo => LogLine, Processed);

    fn on_event(&mut self, event: Demo, _: &mut Router<'_, Self, Demo>) {
        match event {
            Demo::Log(LogLine(line)) => {
                self.lines += 1;
                debug!("{line}");
            }
            Demo::Processed(processed) => {
                self.processed += 1;
                info!("Item {} processed: {}", processed.id, processed.result);
                if self.processed == self.expected {
                    if let Some(handle) = self.finish.get() {
                        handle.shutdown();
                    }
                }
            }
            _ => {}
        }
    }
}

/// Turns each start into a data item.
#[derive(Default)]
struct Controller {
    next: u32,
}

emits!(Controller: Demo => Data, LogLine);

impl Receiver<Demo> for Controller {
    const RECEIVES: KindSet = kinds!(Demo => Start);

    fn on_event(&mut self, _: Demo, router: &mut Router<'_, Self, Demo>) {
        let id = self.next;
        self.next += 1;
        router.emit(LogLine(format!("Controller issued item {id}")));
        router.emit(Data {
            id,
            value: u64::from(id) * 10,
        });
    }
}

/// Processes data off the engine thread.
#[derive(Default)]
struct Processor {
    handled: u64,
}

emits!(Processor: Demo => Processed, LogLine);

impl Receiver<Demo> for Processor {
    const RECEIVES: KindSet = kinds!(Demo => Data);
    const THREAD_MODE: ThreadMode = ThreadMode::OwnThread;

    fn on_event(&mut self, event: Demo, router: &mut Router<'_, Self, Demo>) {
        if let Demo::Data(data) = event {
            self.handled += 1;
            router.emit(LogLine(format!("Processor handling item {}", data.id)));
            router.emit(Processed {
                id: data.id,
                result: data.value * 2 + 1,
            });
        }
    }
}

/// Re-emits chain links until the configured depth.
struct ChainHandler {
    max_depth: u32,
    deepest: u32,
}

emits!(ChainHandler: Demo => Chain, LogLine);

impl Receiver<Demo> for ChainHandler {
    const RECEIVES: KindSet = kinds!(Demo => Chain);

    fn on_event(&mut self, event: Demo, router: &mut Router<'_, Self, Demo>) {
        if let Demo::Chain(link) = event {
            self.deepest = link.depth;
            if link.depth < self.max_depth {
                router.emit(Chain {
                    depth: link.depth + 1,
                });
            } else {
                router.emit(LogLine(format!("Chain reached depth {}", link.depth)));
            }
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "switchyard_core={level},switchyard_demo={level}",
                    level = args.log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting switchyard demo");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = EngineConfig::builder()
        .poll_mode(args.poll_mode.into())
        .thread_name_prefix("demo")
        .build()?;

    let finish = Arc::new(OnceLock::new());
    let mut engine = Engine::<Demo>::builder()
        .with_config(config)
        .add(Logger {
            lines: 0,
            processed: 0,
            expected: args.starts,
            finish: Arc::clone(&finish),
        })
        .add(Controller::default())
        .add(Processor::default())
        .add(ChainHandler {
            max_depth: args.chain_depth,
            deepest: 0,
        })
        .build()
        .context("failed to assemble engine")?;
    if finish.set(engine.shutdown_handle()).is_err() {
        anyhow::bail!("shutdown handle already installed");
    }

    info!("Normal flow: {} starts, {:?} polling", args.starts, args.poll_mode);
    if args.starts > 0 {
        for _ in 0..args.starts {
            engine.emit(Start);
        }
        engine.run().context("engine run failed")?;
    }
    engine.stop();

    info!("Chain flow: depth {}", args.chain_depth);
    if args.chain_depth > 0 {
        engine.emit(Chain { depth: 1 });
        let dispatched = Spin::new(&mut engine).drain();
        info!("Chain flow dispatched {dispatched} events");
    }

    let handled = engine.get::<Processor>().map_or(0, |p| p.handled);
    let deepest = engine.get::<ChainHandler>().map_or(0, |c| c.deepest);
    let lines = engine.get::<Logger>().map_or(0, |l| l.lines);
    let stats = engine.stats();
    info!(
        "Processor handled {handled} items; chain depth {deepest}; {lines} log lines; \
         {} dispatched, {} processed, {} dropped",
        stats.dispatched, stats.processed, stats.dropped
    );

    Ok(())
}
