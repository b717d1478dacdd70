//! Reassembles MIDI messages from the raw DIN byte stream.
//!
//! Rules:
//! - a status byte always abandons whatever message was in progress,
//! - realtime bytes (0xF8..=0xFF) may arrive between any two bytes; they are
//!   returned at once and leave the message in progress untouched,
//! - a completed channel message clears the status (no running status),
//! - data bytes with no status in effect are dropped.

use super::message::{channel_data_len, is_realtime, is_status, ChannelMessage, RealtimeMessage};
use log::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemuxEvent {
    Channel(ChannelMessage),
    Realtime(RealtimeMessage),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MidiParseState {
    pub status_byte: u8,
    pub data_bytes_seen: u8,
    pub expected_data_bytes: u8,
    data: [u8; 2],
}

impl MidiParseState {
    fn clear(&mut self) {
        *self = Self::default();
    }

    fn has_status(&self) -> bool {
        self.status_byte != 0
    }
}

#[derive(Debug, Default)]
pub struct StreamDemux {
    state: MidiParseState,
    dropped: u32,
}

impl StreamDemux {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, byte: u8) -> Option<DemuxEvent> {
        if is_realtime(byte) {
            return RealtimeMessage::from_status(byte).map(DemuxEvent::Realtime);
        }

        if is_status(byte) {
            if self.state.has_status() && self.state.data_bytes_seen > 0 {
                debug!(
                    "Status {:#04X} interrupted {:#04X} after {} data byte(s)",
                    byte, self.state.status_byte, self.state.data_bytes_seen
                );
            }
            self.state.clear();
            // System common and SysEx are not forwarded; their data bytes
            // fall through as orphans.
            if let Some(expected) = channel_data_len(byte) {
                self.state.status_byte = byte;
                self.state.expected_data_bytes = expected;
            }
            return None;
        }

        if !self.state.has_status() {
            self.dropped = self.dropped.wrapping_add(1);
            trace!("Orphan data byte {:#04X} dropped", byte);
            return None;
        }

        let index = self.state.data_bytes_seen as usize;
        self.state.data[index] = byte;
        self.state.data_bytes_seen += 1;
        if self.state.data_bytes_seen < self.state.expected_data_bytes {
            return None;
        }

        let data_len = self.state.expected_data_bytes as usize;
        let message = ChannelMessage::new(self.state.status_byte, &self.state.data[..data_len]);
        self.state.clear();
        message.map(DemuxEvent::Channel)
    }

    pub fn state(&self) -> MidiParseState {
        self.state
    }

    /// Data bytes discarded because no status was in effect.
    pub fn dropped_bytes(&self) -> u32 {
        self.dropped
    }
}
