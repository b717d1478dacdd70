//! BPM estimation from beat ticks.

use crate::time::elapsed;
use log::debug;

pub const MIN_BPM: u16 = 20;
pub const MAX_BPM: u16 = 400;
pub const BEATS_PER_MEASURE: u8 = 4;
pub const DEFAULT_BPM_THRESHOLD: u16 = 2;

/// Measures one 4-beat measure at a time and derives BPM from its duration.
///
/// The first beat after a reset only anchors timing; a value is produced on
/// the beat that closes the measure.
#[derive(Debug, Default)]
pub struct TempoEstimator {
    beat_position: u8,
    last_beat_time: Option<u32>,
    current_bpm: u16,
    last_reported_bpm: u16,
}

impl TempoEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one beat. Returns the BPM when this beat closed a measure.
    pub fn on_beat_tick(&mut self, now_ms: u32) -> Option<u16> {
        let mut computed = None;

        if self.beat_position == 0 {
            if let Some(last) = self.last_beat_time {
                let interval = elapsed(now_ms, last);
                if interval > 0 {
                    let bpm = bpm_from_measure(interval);
                    debug!("Measure took {} ms = {} BPM", interval, bpm);
                    self.current_bpm = bpm;
                    computed = Some(bpm);
                }
            }
            self.last_beat_time = Some(now_ms);
        }

        self.beat_position = (self.beat_position + 1) % BEATS_PER_MEASURE;
        computed
    }

    pub fn bpm(&self) -> u16 {
        self.current_bpm
    }

    pub fn beat_position(&self) -> u8 {
        self.beat_position
    }

    pub fn last_beat_time(&self) -> Option<u32> {
        self.last_beat_time
    }

    /// True (and remembers the value) when the BPM moved by more than
    /// `threshold` since the last reported value.
    pub fn has_changed_by(&mut self, threshold: u16) -> bool {
        if self.current_bpm.abs_diff(self.last_reported_bpm) > threshold {
            self.last_reported_bpm = self.current_bpm;
            true
        } else {
            false
        }
    }

    /// Forgets measure timing. The last BPM is kept.
    pub fn reset(&mut self) {
        self.beat_position = 0;
        self.last_beat_time = None;
    }

    /// Forces the next computed BPM to be reported, even if unchanged.
    pub fn rearm(&mut self) {
        self.last_reported_bpm = 0;
    }

    /// Drops the BPM as well, for deployments that show zero when stopped.
    pub fn clear(&mut self) {
        self.reset();
        self.current_bpm = 0;
        self.last_reported_bpm = 0;
    }
}

/// `round(240000 / interval_ms)` clamped to the displayable range.
fn bpm_from_measure(interval_ms: u32) -> u16 {
    let bpm = (240_000 + interval_ms / 2) / interval_ms;
    bpm.clamp(MIN_BPM as u32, MAX_BPM as u32) as u16
}
