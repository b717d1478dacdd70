//! Pulse capture: the only state shared between edge-interrupt context and
//! the main loop.
//!
//! The interrupt side does nothing but stamp the time of the edge. The word
//! carries a pending flag above the 32-bit timestamp so that a timestamp of
//! zero is still a valid capture, and the loop consumes it with a single
//! atomic swap.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

const PENDING: u64 = 1 << 32;

#[derive(Debug, Clone, Default)]
pub struct PulseCapture {
    word: Arc<AtomicU64>,
}

impl PulseCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called from edge context. Overwrites any capture the loop has not
    /// consumed yet; only the latest edge matters.
    pub fn record(&self, now_ms: u32) {
        self.word.store(PENDING | now_ms as u64, Ordering::Release);
    }

    /// Read-and-clear from the loop.
    pub fn take(&self) -> Option<u32> {
        let word = self.word.swap(0, Ordering::AcqRel);
        if word & PENDING != 0 {
            Some(word as u32)
        } else {
            None
        }
    }
}
