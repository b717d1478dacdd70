//! Read-only view of the clock for display and settings consumers.
//!
//! The board is fed as a [`ClockObserver`] from the loop and read from any
//! thread. All fields are independent atomics; readers may see a snapshot
//! that is one event stale, which is fine for display.

use crate::clock::{ClockObserver, ClockSource, StopReason, Tick};
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct Status {
    bpm: AtomicU16,
    is_playing: AtomicBool,
    active_source: AtomicU8,
    pulse_count: AtomicU32,
    tick_count: AtomicU64,
    beat: AtomicU8,
    bpm_updates: AtomicU32,
}

#[derive(Clone, Default)]
pub struct StatusBoard {
    status: Arc<Status>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_bpm(&self) -> u16 {
        self.status.bpm.load(Ordering::SeqCst)
    }

    pub fn is_playing(&self) -> bool {
        self.status.is_playing.load(Ordering::SeqCst)
    }

    pub fn get_active_source(&self) -> ClockSource {
        ClockSource::from_u8(self.status.active_source.load(Ordering::SeqCst))
    }

    pub fn get_pulse_count(&self) -> u32 {
        self.status.pulse_count.load(Ordering::SeqCst)
    }

    /// Accepted ticks since the last start.
    pub fn get_tick_count(&self) -> u64 {
        self.status.tick_count.load(Ordering::SeqCst)
    }

    /// Beat within the measure, 1-based; 0 when no beat has landed yet.
    pub fn get_beat(&self) -> u8 {
        self.status.beat.load(Ordering::SeqCst)
    }

    /// How many BPM changes have been reported since power-up.
    pub fn get_bpm_updates(&self) -> u32 {
        self.status.bpm_updates.load(Ordering::SeqCst)
    }

    fn set_running(&self, source: ClockSource) {
        self.status
            .active_source
            .store(source.as_u8(), Ordering::SeqCst);
        self.status.is_playing.store(true, Ordering::SeqCst);
    }
}

impl ClockObserver for StatusBoard {
    fn on_start(&mut self, source: ClockSource) {
        self.set_running(source);
        self.status.tick_count.store(0, Ordering::SeqCst);
        self.status.pulse_count.store(0, Ordering::SeqCst);
        self.status.beat.store(0, Ordering::SeqCst);
    }

    fn on_continue(&mut self, source: ClockSource) {
        self.set_running(source);
    }

    fn on_stop(&mut self, _source: ClockSource, _reason: StopReason) {
        self.status
            .active_source
            .store(ClockSource::None.as_u8(), Ordering::SeqCst);
        self.status.is_playing.store(false, Ordering::SeqCst);
        self.status.beat.store(0, Ordering::SeqCst);
    }

    fn on_tick(&mut self, tick: &Tick) {
        self.status.tick_count.fetch_add(1, Ordering::SeqCst);
        self.status
            .pulse_count
            .store(tick.pulse_count, Ordering::SeqCst);
        if let Some(beat) = tick.beat {
            self.status.beat.store(beat + 1, Ordering::SeqCst);
        }
    }

    fn on_bpm_change(&mut self, bpm: u16) {
        self.status.bpm.store(bpm, Ordering::SeqCst);
        self.status.bpm_updates.fetch_add(1, Ordering::SeqCst);
    }
}
