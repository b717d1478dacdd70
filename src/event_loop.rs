//! The cooperative main loop.
//!
//! One [`EventLoop::poll`] is one iteration: MIDI from both transports is
//! ingested first, then the captured sync-in edge, then timeouts and pulse
//! lowering. Each stage is bounded so an iteration stays short.

use crate::capture::PulseCapture;
use crate::clock::{ClockArbiter, ClockSource};
use crate::midi::{DemuxEvent, MidiOutputs, RealtimeMessage, StreamDemux, UsbMidiPacket};
use crate::time::Monotonic;
use crossbeam::channel::Receiver;
use log::{debug, info, trace};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

/// Default bound on messages handled per transport per iteration.
pub const DEFAULT_MAX_MESSAGES_PER_POLL: usize = 32;

/// Longest channel message on the wire: status plus two data bytes.
const MAX_MESSAGE_LEN: usize = 3;

pub struct EventLoop<C: Monotonic> {
    arbiter: ClockArbiter<C>,
    demux: StreamDemux,
    outputs: MidiOutputs,
    din_rx: Receiver<u8>,
    usb_rx: Receiver<UsbMidiPacket>,
    capture: PulseCapture,
    max_messages_per_poll: usize,
}

impl<C: Monotonic> EventLoop<C> {
    pub fn new(
        arbiter: ClockArbiter<C>,
        outputs: MidiOutputs,
        din_rx: Receiver<u8>,
        usb_rx: Receiver<UsbMidiPacket>,
        capture: PulseCapture,
    ) -> Self {
        Self {
            arbiter,
            demux: StreamDemux::new(),
            outputs,
            din_rx,
            usb_rx,
            capture,
            max_messages_per_poll: DEFAULT_MAX_MESSAGES_PER_POLL,
        }
    }

    pub fn with_max_messages_per_poll(mut self, max: usize) -> Self {
        self.max_messages_per_poll = max.max(1);
        self
    }

    /// Runs one loop iteration.
    pub fn poll(&mut self) {
        self.drain_din();
        self.drain_usb();
        if let Some(at_ms) = self.capture.take() {
            self.arbiter.handle_pulse(at_ms);
        }
        self.arbiter.update();
    }

    /// Polls until `running` is cleared, sleeping `idle` between iterations.
    pub fn run(&mut self, running: &AtomicBool, idle: Duration) {
        info!("Event loop running");
        while running.load(Ordering::SeqCst) {
            self.poll();
            if !idle.is_zero() {
                thread::sleep(idle);
            }
        }
        info!("Event loop stopped");
    }

    pub fn arbiter(&self) -> &ClockArbiter<C> {
        &self.arbiter
    }

    pub fn arbiter_mut(&mut self) -> &mut ClockArbiter<C> {
        &mut self.arbiter
    }

    pub fn demux(&self) -> &StreamDemux {
        &self.demux
    }

    /// Feeds queued DIN bytes to the demultiplexer until either the message
    /// budget or the byte budget is spent. Bytes left over wait for the next
    /// iteration.
    ///
    /// The byte budget covers traffic that never completes a message (SysEx,
    /// orphan data bytes): it allows every budgeted message at its longest
    /// encoding.
    fn drain_din(&mut self) {
        let max_bytes = self.max_messages_per_poll * MAX_MESSAGE_LEN;
        let mut handled = 0;
        let mut consumed = 0;
        while handled < self.max_messages_per_poll && consumed < max_bytes {
            let byte = match self.din_rx.try_recv() {
                Ok(byte) => byte,
                Err(_) => break,
            };
            consumed += 1;
            match self.demux.feed(byte) {
                Some(DemuxEvent::Channel(message)) => {
                    trace!("DIN channel message {:02X?}", message.as_bytes());
                    self.outputs.send_usb_channel(&message);
                    handled += 1;
                }
                Some(DemuxEvent::Realtime(message)) => {
                    self.outputs.send_usb_realtime(message);
                    self.route_realtime(ClockSource::SerialDIN, message);
                    handled += 1;
                }
                None => {}
            }
        }
        if !self.din_rx.is_empty() {
            debug!(
                "DIN budget spent ({} messages, {} bytes), {} byte(s) deferred",
                handled,
                consumed,
                self.din_rx.len()
            );
        }
    }

    fn drain_usb(&mut self) {
        for _ in 0..self.max_messages_per_poll {
            let packet = match self.usb_rx.try_recv() {
                Ok(packet) => packet,
                Err(_) => break,
            };
            if let Some(message) = packet.realtime() {
                self.route_realtime(ClockSource::USB, message);
            } else if let Some(message) = packet.channel_message() {
                self.outputs.send_din(message.as_bytes());
            } else {
                trace!("USB packet {:02X?} ignored", packet.to_array());
            }
        }
    }

    fn route_realtime(&mut self, source: ClockSource, message: RealtimeMessage) {
        match message {
            RealtimeMessage::Clock => self.arbiter.handle_clock(source),
            RealtimeMessage::Start => self.arbiter.handle_start(source),
            RealtimeMessage::Continue => self.arbiter.handle_continue(source),
            RealtimeMessage::Stop => self.arbiter.handle_stop(source),
            RealtimeMessage::SystemReset => self.arbiter.handle_reset(source),
            RealtimeMessage::ActiveSensing | RealtimeMessage::Undefined(_) => {}
        }
    }
}
