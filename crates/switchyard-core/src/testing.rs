//! Fixtures shared by the unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Counts constructions, clones and drops of [`Tracked`] payloads.
#[derive(Debug, Default)]
pub(crate) struct Census {
    constructed: AtomicUsize,
    cloned: AtomicUsize,
    dropped: AtomicUsize,
}

impl Census {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn constructed(&self) -> usize {
        self.constructed.load(Ordering::SeqCst)
    }

    pub(crate) fn cloned(&self) -> usize {
        self.cloned.load(Ordering::SeqCst)
    }

    pub(crate) fn dropped(&self) -> usize {
        self.dropped.load(Ordering::SeqCst)
    }

    pub(crate) fn live(&self) -> usize {
        self.constructed() - self.dropped()
    }
}

/// Payload that reports its lifecycle to a [`Census`].
#[derive(Debug)]
pub(crate) struct Tracked {
    pub(crate) value: u64,
    census: Arc<Census>,
}

impl Tracked {
    pub(crate) fn new(value: u64, census: &Arc<Census>) -> Self {
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

#[derive(Debug, Clone)]
pub(crate) struct Ping {
    pub(crate) value: i32,
}

#[derive(Debug, Clone)]
pub(crate) struct Pong {
    pub(crate) value: i32,
}

#[derive(Debug, Clone)]
pub(crate) struct Note(pub(crate) String);

crate::event_set! {
    #[derive(Debug, Clone)]
    pub(crate) enum TestEvent {
        Ping(Ping),
        Pong(Pong),
        Note(Note),
        Tracked(Tracked),
    }
}

/// Tagged slot holding a tracked payload, the usual queue element in tests.
pub(crate) fn tracked_slot(value: u64, census: &Arc<Census>) -> crate::TaggedEvent<TestEvent> {
    let mut slot = crate::TaggedEvent::new();
    slot.store(Tracked::new(value, census));
    slot
}

#[derive(Debug, Clone)]
pub(crate) struct Start;

#[derive(Debug, Clone)]
pub(crate) struct Left(pub(crate) u32);

#[derive(Debug, Clone)]
pub(crate) struct Right(pub(crate) u32);

/// Hand-written event set whose `Left` payload converts into the `Right`
/// variant. Emitting `Left` must trip the emit-side kind check before
/// anything is queued.
#[derive(Debug, Clone)]
pub(crate) enum Skewed {
    Start(Start),
    Left(Left),
    Right(Right),
}

// SAFETY: `kind()` agrees with the `INDEX` of every payload a variant holds.
#[allow(unsafe_code)]
unsafe impl crate::Event for Skewed {
    const KIND_COUNT: usize = 3;

    fn kind(&self) -> usize {
        match self {
            Self::Start(_) => 0,
            Self::Left(_) => 1,
            Self::Right(_) => 2,
        }
    }

    fn kind_name(kind: usize) -> &'static str {
        ["Start", "Left", "Right"].get(kind).copied().unwrap_or("<unknown>")
    }
}

macro_rules! skewed_kind {
    ($payload:ident, $index:expr, $into:expr) => {
        // SAFETY: holds for `Start` and `Right`. `Left` breaks it on purpose and
        // is only emitted where the debug kind check panics first.
        #[allow(unsafe_code)]
        unsafe impl crate::Kind<Skewed> for $payload {
            const INDEX: usize = $index;

            fn into_event(self) -> Skewed {
                $into(self)
            }

            fn try_from_event(event: Skewed) -> Result<Self, Skewed> {
                match event {
                    Skewed::$payload(payload) => Ok(payload),
                    other => Err(other),
                }
            }

            fn from_ref(event: &Skewed) -> Option<&Self> {
                match event {
                    Skewed::$payload(payload) => Some(payload),
                    _ => None,
                }
            }

            fn from_mut(event: &mut Skewed) -> Option<&mut Self> {
                match event {
                    Skewed::$payload(payload) => Some(payload),
                    _ => None,
                }
            }
        }

        impl From<$payload> for Skewed {
            fn from(payload: $payload) -> Self {
                Skewed::$payload(payload)
            }
        }
    };
}

skewed_kind!(Start, 0, Skewed::Start);
skewed_kind!(Left, 1, |left: Left| Skewed::Right(Right(left.0)));
skewed_kind!(Right, 2, Skewed::Right);
