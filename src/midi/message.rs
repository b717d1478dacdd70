//! MIDI wire vocabulary shared by both transports.

/// Status byte constants.
pub mod status {
    pub const NOTE_OFF: u8 = 0x80;
    pub const NOTE_ON: u8 = 0x90;
    pub const POLY_PRESSURE: u8 = 0xA0;
    pub const CONTROL_CHANGE: u8 = 0xB0;
    pub const PROGRAM_CHANGE: u8 = 0xC0;
    pub const CHANNEL_PRESSURE: u8 = 0xD0;
    pub const PITCH_BEND: u8 = 0xE0;
    pub const SYSTEM: u8 = 0xF0;

    pub const CLOCK: u8 = 0xF8;
    pub const START: u8 = 0xFA;
    pub const CONTINUE: u8 = 0xFB;
    pub const STOP: u8 = 0xFC;
    pub const ACTIVE_SENSING: u8 = 0xFE;
    pub const SYSTEM_RESET: u8 = 0xFF;

    /// First system-realtime status.
    pub const REALTIME_FIRST: u8 = 0xF8;
}

pub fn is_status(byte: u8) -> bool {
    byte & 0x80 != 0
}

pub fn is_realtime(byte: u8) -> bool {
    byte >= status::REALTIME_FIRST
}

/// Number of data bytes a channel voice status expects, `None` for anything
/// that is not a channel voice status.
pub fn channel_data_len(status_byte: u8) -> Option<u8> {
    match status_byte & 0xF0 {
        status::PROGRAM_CHANGE | status::CHANNEL_PRESSURE => Some(1),
        status::NOTE_OFF
        | status::NOTE_ON
        | status::POLY_PRESSURE
        | status::CONTROL_CHANGE
        | status::PITCH_BEND => Some(2),
        _ => None,
    }
}

/// Single-byte system realtime messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RealtimeMessage {
    Clock,
    Start,
    Continue,
    Stop,
    ActiveSensing,
    SystemReset,
    /// 0xF9 and 0xFD: reserved but still realtime.
    Undefined(u8),
}

impl RealtimeMessage {
    pub fn from_status(byte: u8) -> Option<Self> {
        let message = match byte {
            status::CLOCK => RealtimeMessage::Clock,
            status::START => RealtimeMessage::Start,
            status::CONTINUE => RealtimeMessage::Continue,
            status::STOP => RealtimeMessage::Stop,
            status::ACTIVE_SENSING => RealtimeMessage::ActiveSensing,
            status::SYSTEM_RESET => RealtimeMessage::SystemReset,
            other if is_realtime(other) => RealtimeMessage::Undefined(other),
            _ => return None,
        };
        Some(message)
    }

    pub fn status(self) -> u8 {
        match self {
            RealtimeMessage::Clock => status::CLOCK,
            RealtimeMessage::Start => status::START,
            RealtimeMessage::Continue => status::CONTINUE,
            RealtimeMessage::Stop => status::STOP,
            RealtimeMessage::ActiveSensing => status::ACTIVE_SENSING,
            RealtimeMessage::SystemReset => status::SYSTEM_RESET,
            RealtimeMessage::Undefined(byte) => byte,
        }
    }
}

/// A complete channel voice message, kept as raw bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelMessage {
    bytes: [u8; 3],
    len: u8,
}

impl ChannelMessage {
    /// Builds a message from a status and its data bytes. Returns `None` when
    /// the status is not a channel voice status or the data count is wrong.
    pub fn new(status_byte: u8, data: &[u8]) -> Option<Self> {
        let expected = channel_data_len(status_byte)?;
        if data.len() != expected as usize || data.iter().any(|b| is_status(*b)) {
            return None;
        }
        let mut bytes = [status_byte, 0, 0];
        bytes[1..=data.len()].copy_from_slice(data);
        Some(Self {
            bytes,
            len: expected + 1,
        })
    }

    pub fn status(&self) -> u8 {
        self.bytes[0]
    }

    pub fn channel(&self) -> u8 {
        self.bytes[0] & 0x0F
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }
}

/// USB-MIDI event packet: header (cable number, code index number) plus three
/// MIDI bytes, zero padded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsbMidiPacket([u8; 4]);

/// Code index number for single-byte messages (realtime).
const CIN_SINGLE_BYTE: u8 = 0x0F;

impl UsbMidiPacket {
    pub fn from_array(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    pub fn from_realtime(cable: u8, message: RealtimeMessage) -> Self {
        Self([header(cable, CIN_SINGLE_BYTE), message.status(), 0, 0])
    }

    pub fn from_channel(cable: u8, message: &ChannelMessage) -> Self {
        let cin = message.status() >> 4;
        let mut bytes = [header(cable, cin), 0, 0, 0];
        let raw = message.as_bytes();
        bytes[1..=raw.len()].copy_from_slice(raw);
        Self(bytes)
    }

    /// Packs a complete message as delivered by a host MIDI API.
    pub fn from_message(cable: u8, data: &[u8]) -> Option<Self> {
        let (&first, rest) = data.split_first()?;
        if is_realtime(first) && rest.is_empty() {
            return RealtimeMessage::from_status(first).map(|m| Self::from_realtime(cable, m));
        }
        ChannelMessage::new(first, rest).map(|m| Self::from_channel(cable, &m))
    }

    pub fn header(&self) -> u8 {
        self.0[0]
    }

    pub fn cable(&self) -> u8 {
        self.0[0] >> 4
    }

    pub fn code_index(&self) -> u8 {
        self.0[0] & 0x0F
    }

    pub fn to_array(self) -> [u8; 4] {
        self.0
    }

    /// The MIDI bytes carried by the packet, without padding.
    pub fn midi_bytes(&self) -> &[u8] {
        let len = match self.code_index() {
            CIN_SINGLE_BYTE => 1,
            0x0C | 0x0D => 2,
            0x08..=0x0E => 3,
            _ => 0,
        };
        &self.0[1..1 + len]
    }

    pub fn realtime(&self) -> Option<RealtimeMessage> {
        if self.code_index() == CIN_SINGLE_BYTE {
            RealtimeMessage::from_status(self.0[1])
        } else {
            None
        }
    }

    pub fn channel_message(&self) -> Option<ChannelMessage> {
        let bytes = self.midi_bytes();
        let (&first, rest) = bytes.split_first()?;
        ChannelMessage::new(first, rest)
    }
}

fn header(cable: u8, cin: u8) -> u8 {
    (cable & 0x0F) << 4 | (cin & 0x0F)
}
