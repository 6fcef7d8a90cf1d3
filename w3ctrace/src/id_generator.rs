//! Id Generator
#[cfg(any(test, feature = "testing"))]
pub use increment::IncrementIdGenerator;

use crate::{SpanId, TraceId};
use rand::Rng;
use std::cell::Cell;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

const RANDOM_BITS: u32 = 80;
const RANDOM_MASK: u128 = (1 << RANDOM_BITS) - 1;
const TIMESTAMP_MASK: u64 = (1 << 48) - 1;

/// Interface for generating IDs
pub trait IdGenerator: Send + Sync + fmt::Debug {
    /// Generate a new `TraceId`
    fn new_trace_id(&self) -> TraceId;

    /// Generate a new `SpanId`
    fn new_span_id(&self) -> SpanId;
}

/// Default [`IdGenerator`] implementation.
///
/// Trace ids follow the [ULID] layout: a 48-bit millisecond Unix timestamp
/// followed by 80 random bits. Ids minted on the same thread within the same
/// millisecond increment the random part, so they stay strictly ordered. Span
/// ids are 64 random bits.
///
/// Randomness comes from the thread-local CSPRNG, which is seeded from the
/// operating system. If the operating system cannot provide entropy the
/// generator panics: there is no weaker fallback and it never hands out a zero
/// id.
///
/// [ULID]: https://github.com/ulid/spec
#[derive(Clone, Debug, Default)]
pub struct UlidIdGenerator {
    _private: (),
}

impl IdGenerator for UlidIdGenerator {
    fn new_trace_id(&self) -> TraceId {
        TraceId::from(next_ulid(unix_millis()))
    }

    fn new_span_id(&self) -> SpanId {
        let mut rng = rand::rng();
        loop {
            let id = rng.random::<u64>();
            if id != 0 {
                return SpanId::from(id);
            }
        }
    }
}

thread_local! {
    /// Last ULID minted on this thread
    static LAST_ULID: Cell<u128> = const { Cell::new(0) };
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}

fn next_ulid(millis: u64) -> u128 {
    let timestamp = u128::from(millis & TIMESTAMP_MASK) << RANDOM_BITS;
    LAST_ULID.with(|last| {
        let previous = last.get();
        let random = if previous & !RANDOM_MASK == timestamp && previous & RANDOM_MASK < RANDOM_MASK
        {
            (previous & RANDOM_MASK) + 1
        } else {
            (rand::rng().random::<u128>() & RANDOM_MASK).max(1)
        };
        let id = timestamp | random;
        last.set(id);
        id
    })
}

/// Generate a new time-ordered [`TraceId`] with the default generator.
pub fn new_trace_id() -> TraceId {
    UlidIdGenerator::default().new_trace_id()
}

/// Generate a new random, non-zero [`SpanId`] with the default generator.
pub fn new_span_id() -> SpanId {
    UlidIdGenerator::default().new_span_id()
}

#[cfg(any(test, feature = "testing"))]
mod increment {
    use super::IdGenerator;
    use crate::{SpanId, TraceId};
    use std::sync::atomic::AtomicU64;
    use std::sync::Arc;

    /// [`IdGenerator`] implementation that increments a counter for each new ID. This helps produce
    /// predictable IDs for testing.
    #[derive(Clone, Debug)]
    pub struct IncrementIdGenerator(Arc<AtomicU64>);

    impl IncrementIdGenerator {
        /// Create a new [`IncrementIdGenerator`]
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl Default for IncrementIdGenerator {
        fn default() -> Self {
            Self(Arc::new(AtomicU64::new(1)))
        }
    }

    impl IdGenerator for IncrementIdGenerator {
        fn new_trace_id(&self) -> TraceId {
            TraceId::from(self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst) as u128)
        }

        fn new_span_id(&self) -> SpanId {
            SpanId::from(self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst))
        }
    }
}
