//! Free-running millisecond and microsecond counters.
//!
//! Both counters are plain `u32` values that wrap around. All interval
//! arithmetic goes through [`elapsed`], which uses wrapping subtraction so a
//! counter rollover never produces a bogus interval.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Source of monotonic time for the engine.
pub trait Monotonic {
    fn now_ms(&self) -> u32;
    fn now_us(&self) -> u32;
}

/// Wrap-safe `now - since`.
pub fn elapsed(now: u32, since: u32) -> u32 {
    now.wrapping_sub(since)
}

/// Host clock backed by [`Instant`], truncated to 32 bits like a hardware timer.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Monotonic for SystemClock {
    fn now_ms(&self) -> u32 {
        self.origin.elapsed().as_millis() as u32
    }

    fn now_us(&self) -> u32 {
        self.origin.elapsed().as_micros() as u32
    }
}

/// Manually advanced clock. Clones share the same counter, so a test can keep
/// one handle while the engine owns another.
///
/// The millisecond counter carries the sub-millisecond remainder between
/// advances, so it stays consistent with the microsecond counter.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    micros: Arc<AtomicU32>,
    millis: Arc<AtomicU32>,
    sub_ms: Arc<AtomicU32>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts the clock at the given millisecond value.
    pub fn starting_at_ms(ms: u32) -> Self {
        let clock = Self::new();
        clock.millis.store(ms, Ordering::SeqCst);
        clock.micros.store(ms.wrapping_mul(1000), Ordering::SeqCst);
        clock
    }

    pub fn advance_us(&self, us: u32) {
        self.micros.fetch_add(us, Ordering::SeqCst);
        let total = self.sub_ms.load(Ordering::SeqCst) as u64 + us as u64;
        self.millis
            .fetch_add((total / 1000) as u32, Ordering::SeqCst);
        self.sub_ms.store((total % 1000) as u32, Ordering::SeqCst);
    }

    pub fn advance_ms(&self, ms: u32) {
        self.advance_us(ms.wrapping_mul(1000));
    }
}

impl Monotonic for ManualClock {
    fn now_ms(&self) -> u32 {
        self.millis.load(Ordering::SeqCst)
    }

    fn now_us(&self) -> u32 {
        self.micros.load(Ordering::SeqCst)
    }
}
