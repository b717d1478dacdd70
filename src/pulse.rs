//! Sync-out pulse and beat LED generation.
//!
//! Pulses are raised by `fire_*` and lowered only by [`PulseGenerator::update`]
//! (or [`PulseGenerator::force_low`]), which must run every loop iteration.
//! Nothing here waits.

use crate::clock::PPQN;
use crate::hal::{JackDetect, OutputPin};
use crate::time::elapsed;
use log::{debug, trace};

pub const PULSE_WIDTH_US: u32 = 5_000;

/// Output rates the sync-out jack supports: pulses per quarter note that
/// divide the MIDI clock evenly.
pub const OUTPUT_PPQN_CHOICES: [u8; 8] = [1, 2, 3, 4, 6, 8, 12, 24];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PulseOutputState {
    pub clock_pin_high: bool,
    pub clock_pulse_start: u32,
    pub led_high: bool,
    pub led_pulse_start: u32,
}

pub struct PulseGenerator {
    clock_pin: Box<dyn OutputPin>,
    led_pin: Box<dyn OutputPin>,
    jack: Box<dyn JackDetect>,
    state: PulseOutputState,
    divider: u8,
    divider_count: u8,
    pulse_count: u32,
}

impl PulseGenerator {
    pub fn new(
        clock_pin: Box<dyn OutputPin>,
        led_pin: Box<dyn OutputPin>,
        jack: Box<dyn JackDetect>,
    ) -> Self {
        let mut generator = Self {
            clock_pin,
            led_pin,
            jack,
            state: PulseOutputState::default(),
            divider: 1,
            divider_count: 0,
            pulse_count: 0,
        };
        generator.force_low();
        generator
    }

    /// Sets the sync-out rate. Values that do not divide 24 fall back to one
    /// pulse per MIDI clock.
    pub fn with_output_ppqn(mut self, output_ppqn: u8) -> Self {
        self.divider = if OUTPUT_PPQN_CHOICES.contains(&output_ppqn) {
            PPQN / output_ppqn
        } else {
            debug!("Unsupported output PPQN {}, using {}", output_ppqn, PPQN);
            1
        };
        self
    }

    pub fn divider(&self) -> u8 {
        self.divider
    }

    /// Raises the sync-out line, unless no cable is plugged in.
    pub fn fire_pulse(&mut self, now_us: u32) {
        if !self.jack.is_connected() {
            trace!("Sync-out jack empty, pulse suppressed");
            return;
        }
        self.clock_pin.set_high();
        self.state.clock_pin_high = true;
        self.state.clock_pulse_start = now_us;
    }

    pub fn fire_led(&mut self, now_us: u32) {
        self.led_pin.set_high();
        self.state.led_high = true;
        self.state.led_pulse_start = now_us;
    }

    /// Feeds one accepted MIDI clock through the output divider. Returns true
    /// when the tick produced an output pulse (fired or suppressed).
    pub fn on_clock(&mut self, now_us: u32) -> bool {
        let hit = self.divider_count == 0;
        if hit {
            self.pulse_count = self.pulse_count.wrapping_add(1);
            self.fire_pulse(now_us);
        }
        self.divider_count = (self.divider_count + 1) % self.divider;
        hit
    }

    /// Restarts divider counting on a fresh Start.
    pub fn restart(&mut self) {
        self.divider_count = 0;
        self.pulse_count = 0;
    }

    /// Lowers any output whose pulse width has elapsed.
    pub fn update(&mut self, now_us: u32) {
        if self.state.clock_pin_high
            && elapsed(now_us, self.state.clock_pulse_start) >= PULSE_WIDTH_US
        {
            self.clock_pin.set_low();
            self.state.clock_pin_high = false;
        }
        if self.state.led_high && elapsed(now_us, self.state.led_pulse_start) >= PULSE_WIDTH_US {
            self.led_pin.set_low();
            self.state.led_high = false;
        }
    }

    pub fn force_low(&mut self) {
        self.clock_pin.set_low();
        self.led_pin.set_low();
        self.state.clock_pin_high = false;
        self.state.led_high = false;
    }

    pub fn state(&self) -> PulseOutputState {
        self.state
    }

    pub fn is_pulse_high(&self) -> bool {
        self.state.clock_pin_high
    }

    pub fn is_led_high(&self) -> bool {
        self.state.led_high
    }

    pub fn pulse_count(&self) -> u32 {
        self.pulse_count
    }
}
