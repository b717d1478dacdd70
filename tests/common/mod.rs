#![allow(dead_code)]

use bytepulse::clock::{ClockArbiter, ClockObserver, ClockSource, StopReason, Tick};
use bytepulse::hal::{JackSwitch, OutputPin, SharedPin};
use bytepulse::pulse::PulseGenerator;
use bytepulse::time::ManualClock;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Start(ClockSource),
    Continue(ClockSource),
    Stop(ClockSource, StopReason),
    Tick(Tick),
    Bpm(u16),
}

/// Observer that records everything it hears.
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<Event>>>);

impl EventLog {
    pub fn events(&self) -> Vec<Event> {
        self.0.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }

    pub fn ticks(&self) -> Vec<Tick> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Tick(tick) => Some(tick),
                _ => None,
            })
            .collect()
    }

    pub fn beat_ticks(&self) -> usize {
        self.ticks().iter().filter(|t| t.beat.is_some()).count()
    }

    pub fn bpm_reports(&self) -> Vec<u16> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Bpm(bpm) => Some(bpm),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: Event) {
        self.0.lock().unwrap().push(event);
    }
}

impl ClockObserver for EventLog {
    fn on_start(&mut self, source: ClockSource) {
        self.push(Event::Start(source));
    }

    fn on_continue(&mut self, source: ClockSource) {
        self.push(Event::Continue(source));
    }

    fn on_stop(&mut self, source: ClockSource, reason: StopReason) {
        self.push(Event::Stop(source, reason));
    }

    fn on_tick(&mut self, tick: &Tick) {
        self.push(Event::Tick(*tick));
    }

    fn on_bpm_change(&mut self, bpm: u16) {
        self.push(Event::Bpm(bpm));
    }
}

/// Everything an arbiter needs, with handles kept for inspection.
pub struct Rig {
    pub clock: ManualClock,
    pub sync_out: SharedPin,
    pub led: SharedPin,
    pub sync_out_jack: JackSwitch,
    pub sync_in_jack: JackSwitch,
    pub log: EventLog,
}

impl Rig {
    pub fn new() -> Self {
        Self {
            clock: ManualClock::new(),
            sync_out: SharedPin::new("sync-out"),
            led: SharedPin::new("beat-led"),
            sync_out_jack: JackSwitch::new(true),
            sync_in_jack: JackSwitch::new(true),
            log: EventLog::default(),
        }
    }

    pub fn pulses(&self) -> PulseGenerator {
        PulseGenerator::new(
            Box::new(self.sync_out.clone()),
            Box::new(self.led.clone()),
            Box::new(self.sync_out_jack.clone()),
        )
    }

    pub fn arbiter(&self) -> ClockArbiter<ManualClock> {
        ClockArbiter::new(self.clock.clone(), self.pulses())
            .with_sync_in_jack(Box::new(self.sync_in_jack.clone()))
            .with_observer(Box::new(self.log.clone()))
    }

    pub fn outputs_low(&self) -> bool {
        !self.sync_out.is_high() && !self.led.is_high()
    }
}

/// 120 BPM at 24 PPQN, in microseconds.
pub const TICK_120_BPM_US: u32 = 20_833;
