//! Clock sources, arbitration and tempo tracking.
//!
//! - [`ClockArbiter`] decides which source drives the outputs
//! - [`TempoEstimator`] turns beat ticks into a BPM value
//! - [`ClockObserver`] is how display/settings/re-publishing hear about it

pub mod arbiter;
pub mod tempo;

pub use arbiter::ClockArbiter;
pub use tempo::TempoEstimator;

use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// MIDI clock resolution: ticks per quarter note.
pub const PPQN: u8 = 24;

/// Where a clock/transport event came from.
///
/// Arbitration priority is `AnalogIn > USB > SerialDIN`; `None` means idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClockSource {
    #[default]
    None,
    AnalogIn,
    SerialDIN,
    USB,
}

impl ClockSource {
    /// Sources that carry their own timing statistics.
    pub const TRACKED: [ClockSource; 3] =
        [ClockSource::AnalogIn, ClockSource::USB, ClockSource::SerialDIN];

    pub fn priority(self) -> u8 {
        match self {
            ClockSource::None => 0,
            ClockSource::SerialDIN => 1,
            ClockSource::USB => 2,
            ClockSource::AnalogIn => 3,
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            ClockSource::None => 0,
            ClockSource::AnalogIn => 1,
            ClockSource::SerialDIN => 2,
            ClockSource::USB => 3,
        }
    }

    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => ClockSource::AnalogIn,
            2 => ClockSource::SerialDIN,
            3 => ClockSource::USB,
            _ => ClockSource::None,
        }
    }
}

impl fmt::Display for ClockSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ClockSource::None => "none",
            ClockSource::AnalogIn => "sync-in",
            ClockSource::SerialDIN => "DIN",
            ClockSource::USB => "USB",
        };
        f.write_str(name)
    }
}

/// Why the active source stopped driving the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Explicit Stop message.
    Stop,
    /// System Reset from the active source.
    Reset,
    /// No tick within three smoothed intervals.
    Dropout,
    /// Sync-in cable pulled while it was the active source.
    JackRemoved,
}

/// User preference over which sources may drive the clock.
///
/// `Auto` arbitrates by priority. A forced preference admits one source only;
/// events from every other source are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockPreference {
    #[default]
    Auto,
    Analog,
    Usb,
    Din,
}

impl ClockPreference {
    pub fn admits(self, source: ClockSource) -> bool {
        match self {
            ClockPreference::Auto => source != ClockSource::None,
            ClockPreference::Analog => source == ClockSource::AnalogIn,
            ClockPreference::Usb => source == ClockSource::USB,
            ClockPreference::Din => source == ClockSource::SerialDIN,
        }
    }
}

impl FromStr for ClockPreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(ClockPreference::Auto),
            "analog" | "sync-in" => Ok(ClockPreference::Analog),
            "usb" => Ok(ClockPreference::Usb),
            "din" => Ok(ClockPreference::Din),
            other => Err(format!(
                "unknown clock source '{}' (expected auto, analog, usb or din)",
                other
            )),
        }
    }
}

impl fmt::Display for ClockPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ClockPreference::Auto => "auto",
            ClockPreference::Analog => "analog",
            ClockPreference::Usb => "usb",
            ClockPreference::Din => "din",
        };
        f.write_str(name)
    }
}

/// What happens to the displayed BPM when the clock stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BpmOnStop {
    #[default]
    Retain,
    Zero,
}

/// One accepted clock tick, as seen by observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub source: ClockSource,
    /// Position inside the quarter note before this tick advanced it.
    pub ppqn_position: u8,
    /// Set on the first tick of a quarter note: beat index within the measure.
    pub beat: Option<u8>,
    /// Sync-out pulses emitted since Start (after the output divider).
    pub pulse_count: u32,
}

/// Receives arbiter transitions. Every method defaults to a no-op so
/// consumers implement only what they display or forward.
pub trait ClockObserver: Send {
    fn on_start(&mut self, _source: ClockSource) {}
    fn on_continue(&mut self, _source: ClockSource) {}
    fn on_stop(&mut self, _source: ClockSource, _reason: StopReason) {}
    fn on_tick(&mut self, _tick: &Tick) {}
    fn on_bpm_change(&mut self, _bpm: u16) {}
}
