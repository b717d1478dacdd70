//! Re-publishes arbiter transitions as normalized MIDI transport.
//!
//! Routing depends on where the clock came from:
//!
//! | source    | USB out | DIN out |
//! |-----------|---------|---------|
//! | sync-in   | yes     | yes     |
//! | USB       | no      | yes     |
//! | DIN       | no      | no      |
//!
//! DIN realtime is already forwarded byte-for-byte to USB by the event loop,
//! so nothing is repeated for it here. DIN output only exists when enabled.

use crate::clock::{ClockObserver, ClockSource, StopReason, Tick};
use crate::midi::{MidiOutputs, RealtimeMessage};
use log::debug;

pub struct TransportRepublisher {
    outputs: MidiOutputs,
}

impl TransportRepublisher {
    pub fn new(outputs: MidiOutputs) -> Self {
        Self { outputs }
    }

    fn publish(&self, source: ClockSource, message: RealtimeMessage) {
        let (to_usb, to_din) = match source {
            ClockSource::AnalogIn => (true, true),
            ClockSource::USB => (false, true),
            ClockSource::SerialDIN | ClockSource::None => (false, false),
        };
        if to_usb {
            self.outputs.send_usb_realtime(message);
        }
        if to_din {
            self.outputs.send_din_realtime(message);
        }
    }
}

impl ClockObserver for TransportRepublisher {
    fn on_start(&mut self, source: ClockSource) {
        self.publish(source, RealtimeMessage::Start);
    }

    fn on_continue(&mut self, source: ClockSource) {
        self.publish(source, RealtimeMessage::Continue);
    }

    fn on_stop(&mut self, source: ClockSource, reason: StopReason) {
        debug!("Re-publishing stop from {} ({:?})", source, reason);
        self.publish(source, RealtimeMessage::Stop);
    }

    fn on_tick(&mut self, tick: &Tick) {
        self.publish(tick.source, RealtimeMessage::Clock);
    }
}
