//! Clock source arbitration.
//!
//! Three asynchronous sources (sync-in pulses, USB realtime, DIN realtime)
//! compete for the clock. At most one is active at a time:
//!
//! - Start/Continue is accepted from a source whose priority is at least the
//!   active one's, so a higher source preempts on its Start.
//! - Clock is accepted from the active source only, or from anyone while idle
//!   (implicit start). Stray clocks from other sources are ignored.
//! - Stop is accepted from the active source only.
//! - With a forced [`ClockPreference`] every other source is ignored.
//! - [`ClockArbiter::update`] drops a source that has gone quiet for three
//!   smoothed tick intervals.

use super::tempo::{TempoEstimator, DEFAULT_BPM_THRESHOLD};
use super::{BpmOnStop, ClockObserver, ClockPreference, ClockSource, StopReason, Tick, PPQN};
use crate::hal::JackDetect;
use crate::pulse::PulseGenerator;
use crate::time::{elapsed, Monotonic};
use log::{debug, info, trace};

/// Dropout threshold in multiples of the smoothed tick interval.
const TIMEOUT_FACTOR: u32 = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceTiming {
    pub last_tick_time: u32,
    pub prev_tick_time: Option<u32>,
    pub avg_interval: u32,
    pub is_playing: bool,
}

impl SourceTiming {
    fn restart(&mut self, now_ms: u32) {
        self.last_tick_time = now_ms;
        self.prev_tick_time = None;
        self.avg_interval = 0;
        self.is_playing = true;
    }

    fn halt(&mut self) {
        self.prev_tick_time = None;
        self.avg_interval = 0;
        self.is_playing = false;
    }

    fn record_tick(&mut self, now_ms: u32) {
        if let Some(prev) = self.prev_tick_time {
            let interval = elapsed(now_ms, prev);
            self.avg_interval = if self.avg_interval == 0 {
                interval
            } else {
                ((u64::from(self.avg_interval) * 3 + u64::from(interval)) / 4) as u32
            };
        }
        self.prev_tick_time = Some(now_ms);
        self.last_tick_time = now_ms;
    }
}

fn slot(source: ClockSource) -> Option<usize> {
    match source {
        ClockSource::AnalogIn => Some(0),
        ClockSource::USB => Some(1),
        ClockSource::SerialDIN => Some(2),
        ClockSource::None => None,
    }
}

pub struct ClockArbiter<C: Monotonic> {
    clock: C,
    active: ClockSource,
    timing: [SourceTiming; 3],
    ppqn_counter: u8,
    tempo: TempoEstimator,
    pulses: PulseGenerator,
    sync_in_jack: Option<Box<dyn JackDetect>>,
    observers: Vec<Box<dyn ClockObserver>>,
    bpm_threshold: u16,
    bpm_on_stop: BpmOnStop,
    preference: ClockPreference,
}

impl<C: Monotonic> ClockArbiter<C> {
    pub fn new(clock: C, pulses: PulseGenerator) -> Self {
        Self {
            clock,
            active: ClockSource::None,
            timing: [SourceTiming::default(); 3],
            ppqn_counter: 0,
            tempo: TempoEstimator::new(),
            pulses,
            sync_in_jack: None,
            observers: Vec::new(),
            bpm_threshold: DEFAULT_BPM_THRESHOLD,
            bpm_on_stop: BpmOnStop::default(),
            preference: ClockPreference::default(),
        }
    }

    pub fn with_bpm_threshold(mut self, threshold: u16) -> Self {
        self.bpm_threshold = threshold;
        self
    }

    pub fn with_bpm_on_stop(mut self, policy: BpmOnStop) -> Self {
        self.bpm_on_stop = policy;
        self
    }

    pub fn with_clock_preference(mut self, preference: ClockPreference) -> Self {
        self.preference = preference;
        self
    }

    /// Jack-detect line of the sync-in socket. Without one the socket is
    /// assumed to be always connected.
    pub fn with_sync_in_jack(mut self, jack: Box<dyn JackDetect>) -> Self {
        self.sync_in_jack = Some(jack);
        self
    }

    pub fn with_observer(mut self, observer: Box<dyn ClockObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn add_observer(&mut self, observer: Box<dyn ClockObserver>) {
        self.observers.push(observer);
    }

    pub fn handle_clock(&mut self, source: ClockSource) {
        let now = self.clock.now_ms();
        self.handle_clock_at(source, now);
    }

    pub fn handle_start(&mut self, source: ClockSource) {
        let now = self.clock.now_ms();
        self.handle_start_at(source, now);
    }

    pub fn handle_continue(&mut self, source: ClockSource) {
        if !self.may_take_over(source) {
            return;
        }
        if self.active == source {
            trace!("Continue from {} while already running", source);
            return;
        }
        let now = self.clock.now_ms();
        self.hand_over(source, now);
        // The measure in progress spans the pause, so timing starts over.
        self.tempo.reset();
        info!("Clock continued from {}", source);
        for observer in self.observers.iter_mut() {
            observer.on_continue(source);
        }
    }

    pub fn handle_stop(&mut self, source: ClockSource) {
        if source == ClockSource::None || source != self.active {
            debug!("Stop from {} ignored (active: {})", source, self.active);
            return;
        }
        self.stop_active(StopReason::Stop);
    }

    /// System Reset behaves as Stop when it comes from the active source.
    pub fn handle_reset(&mut self, source: ClockSource) {
        if source == ClockSource::None || source != self.active {
            debug!("Reset from {} ignored (active: {})", source, self.active);
            return;
        }
        self.stop_active(StopReason::Reset);
    }

    /// A captured sync-in edge. The first edge while the sync input is not
    /// running acts as its Start.
    pub fn handle_pulse(&mut self, at_ms: u32) {
        if !self.preference.admits(ClockSource::AnalogIn) {
            return;
        }
        if !self.sync_in_connected() {
            trace!("Sync-in edge with no cable detected, discarded");
            return;
        }
        if !self.timing_of(ClockSource::AnalogIn).is_playing {
            self.handle_start_at(ClockSource::AnalogIn, at_ms);
        }
        self.handle_clock_at(ClockSource::AnalogIn, at_ms);
    }

    /// Once per loop iteration: dropout detection and pulse lowering.
    pub fn update(&mut self) {
        let now = self.clock.now_ms();

        if self.timing_of(ClockSource::AnalogIn).is_playing && !self.sync_in_connected() {
            info!("Sync-in cable removed");
            self.drop_source(ClockSource::AnalogIn, StopReason::JackRemoved);
        }

        for source in ClockSource::TRACKED {
            let timing = self.timing_of(source);
            let limit = timing.avg_interval.saturating_mul(TIMEOUT_FACTOR);
            if timing.avg_interval > 0 && elapsed(now, timing.last_tick_time) > limit {
                info!(
                    "{} clock dropped out ({} ms silent, average interval {} ms)",
                    source,
                    elapsed(now, timing.last_tick_time),
                    timing.avg_interval
                );
                self.drop_source(source, StopReason::Dropout);
            }
        }

        let now_us = self.clock.now_us();
        self.pulses.update(now_us);
    }

    pub fn is_playing(&self) -> bool {
        self.active != ClockSource::None
    }

    pub fn active_source(&self) -> ClockSource {
        self.active
    }

    pub fn clock_preference(&self) -> ClockPreference {
        self.preference
    }

    pub fn bpm(&self) -> u16 {
        self.tempo.bpm()
    }

    pub fn pulse_count(&self) -> u32 {
        self.pulses.pulse_count()
    }

    pub fn ppqn_counter(&self) -> u8 {
        self.ppqn_counter
    }

    pub fn tempo(&self) -> &TempoEstimator {
        &self.tempo
    }

    pub fn pulses(&self) -> &PulseGenerator {
        &self.pulses
    }

    /// Zeroes the displayed BPM on request of a consumer.
    pub fn clear_bpm(&mut self) {
        self.tempo.clear();
        for observer in self.observers.iter_mut() {
            observer.on_bpm_change(0);
        }
    }

    pub fn timing_of(&self, source: ClockSource) -> SourceTiming {
        slot(source)
            .map(|index| self.timing[index])
            .unwrap_or_default()
    }

    fn handle_clock_at(&mut self, source: ClockSource, now_ms: u32) {
        if !self.preference.admits(source) {
            trace!("Clock from {} ignored (preference: {})", source, self.preference);
            return;
        }
        if self.active == ClockSource::None {
            debug!("Clock from {} while idle, starting implicitly", source);
            self.accept_start(source, now_ms);
        } else if source != self.active {
            trace!("Clock from {} ignored (active: {})", source, self.active);
            return;
        }
        self.process_tick(source, now_ms);
    }

    fn handle_start_at(&mut self, source: ClockSource, now_ms: u32) {
        if self.may_take_over(source) {
            self.accept_start(source, now_ms);
        }
    }

    fn may_take_over(&self, source: ClockSource) -> bool {
        if !self.preference.admits(source) {
            debug!("{} ignored (preference: {})", source, self.preference);
            return false;
        }
        if source.priority() < self.active.priority() {
            debug!(
                "{} ignored, lower priority than active {}",
                source, self.active
            );
            return false;
        }
        true
    }

    fn accept_start(&mut self, source: ClockSource, now_ms: u32) {
        self.hand_over(source, now_ms);
        self.ppqn_counter = 0;
        self.tempo.reset();
        self.tempo.rearm();
        self.pulses.restart();
        info!("Clock started from {}", source);
        for observer in self.observers.iter_mut() {
            observer.on_start(source);
        }
    }

    /// Makes `source` the active one with fresh interval smoothing.
    fn hand_over(&mut self, source: ClockSource, now_ms: u32) {
        if self.active != source && self.active != ClockSource::None {
            debug!("{} preempts {}", source, self.active);
            if let Some(index) = slot(self.active) {
                self.timing[index].halt();
            }
        }
        if let Some(index) = slot(source) {
            self.timing[index].restart(now_ms);
        }
        self.active = source;
    }

    fn process_tick(&mut self, source: ClockSource, now_ms: u32) {
        if let Some(index) = slot(source) {
            self.timing[index].record_tick(now_ms);
        }

        let now_us = self.clock.now_us();
        let ppqn_position = self.ppqn_counter;
        self.pulses.on_clock(now_us);

        let mut beat = None;
        if ppqn_position == 0 {
            beat = Some(self.tempo.beat_position());
            self.pulses.fire_led(now_us);
            if self.tempo.on_beat_tick(now_ms).is_some()
                && self.tempo.has_changed_by(self.bpm_threshold)
            {
                let bpm = self.tempo.bpm();
                debug!("Tempo now {} BPM", bpm);
                for observer in self.observers.iter_mut() {
                    observer.on_bpm_change(bpm);
                }
            }
        }
        self.ppqn_counter = (self.ppqn_counter + 1) % PPQN;

        trace!("Tick from {} at {} ms, position {}", source, now_ms, ppqn_position);
        let tick = Tick {
            source,
            ppqn_position,
            beat,
            pulse_count: self.pulses.pulse_count(),
        };
        for observer in self.observers.iter_mut() {
            observer.on_tick(&tick);
        }
    }

    fn drop_source(&mut self, source: ClockSource, reason: StopReason) {
        if source == self.active {
            self.stop_active(reason);
        } else if let Some(index) = slot(source) {
            debug!("{} dropped while inactive", source);
            self.timing[index].halt();
        }
    }

    fn stop_active(&mut self, reason: StopReason) {
        let source = self.active;
        self.pulses.force_low();
        self.active = ClockSource::None;
        if let Some(index) = slot(source) {
            self.timing[index].halt();
        }
        self.ppqn_counter = 0;
        self.tempo.reset();
        info!("Clock from {} stopped ({:?})", source, reason);

        for observer in self.observers.iter_mut() {
            observer.on_stop(source, reason);
        }
        if self.bpm_on_stop == BpmOnStop::Zero {
            self.clear_bpm();
        }
    }

    fn sync_in_connected(&self) -> bool {
        self.sync_in_jack
            .as_ref()
            .map_or(true, |jack| jack.is_connected())
    }
}
