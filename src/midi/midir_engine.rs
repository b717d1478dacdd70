//! Host MIDI ports via midir.
//!
//! Each inbound port gets a callback running on midir's own thread. The
//! callbacks do no engine work: they only push bytes/packets onto a channel,
//! or stamp the pulse capture, and the main loop picks them up.

use super::message::{status, UsbMidiPacket};
use super::output::{MidiWrite, USB_CABLE};
use crate::capture::PulseCapture;
use crate::error::{BridgeError, Result};
use crate::time::{Monotonic, SystemClock};
use crossbeam::channel::Sender;
use log::{debug, info, trace};
use midir::{
    Ignore, MidiInput, MidiInputConnection, MidiInputPort, MidiOutput, MidiOutputConnection,
    MidiOutputPort,
};

const CLIENT_NAME: &str = "bytepulse";

pub fn list_input_ports() -> Vec<String> {
    match MidiInput::new("bytepulse-list-in") {
        Ok(midi_in) => midi_in
            .ports()
            .iter()
            .filter_map(|p| midi_in.port_name(p).ok())
            .collect(),
        Err(_) => Vec::new(),
    }
}

pub fn list_output_ports() -> Vec<String> {
    match MidiOutput::new("bytepulse-list-out") {
        Ok(midi_out) => midi_out
            .ports()
            .iter()
            .filter_map(|p| midi_out.port_name(p).ok())
            .collect(),
        Err(_) => Vec::new(),
    }
}

fn find_input_port(midi_in: &MidiInput, name: &str) -> Result<MidiInputPort> {
    midi_in
        .ports()
        .into_iter()
        .find(|p| midi_in.port_name(p).unwrap_or_default().contains(name))
        .ok_or_else(|| BridgeError::DeviceNotFound(name.to_string()))
}

fn find_output_port(midi_out: &MidiOutput, name: &str) -> Result<MidiOutputPort> {
    midi_out
        .ports()
        .into_iter()
        .find(|p| midi_out.port_name(p).unwrap_or_default().contains(name))
        .ok_or_else(|| BridgeError::DeviceNotFound(name.to_string()))
}

fn open_input() -> Result<MidiInput> {
    let mut midi_in = MidiInput::new(CLIENT_NAME)?;
    // Realtime bytes are the whole point, so nothing is filtered.
    midi_in.ignore(Ignore::None);
    Ok(midi_in)
}

/// USB side: complete messages arrive from the host API and are packed into
/// event packets.
pub fn connect_usb_input(
    name: &str,
    tx: Sender<UsbMidiPacket>,
) -> Result<MidiInputConnection<()>> {
    let midi_in = open_input()?;
    let port = find_input_port(&midi_in, name)?;
    let connection = midi_in.connect(
        &port,
        "bytepulse-usb-in",
        move |_stamp, message, _| match UsbMidiPacket::from_message(USB_CABLE, message) {
            Some(packet) => {
                let _ = tx.send(packet);
            }
            None => trace!("USB message {:02X?} not packable, skipped", message),
        },
        (),
    )?;
    info!("USB input connected: {}", name);
    Ok(connection)
}

/// DIN side: messages are flattened back into the byte stream a UART would
/// deliver, and reassembled by the demultiplexer.
pub fn connect_din_input(name: &str, tx: Sender<u8>) -> Result<MidiInputConnection<()>> {
    let midi_in = open_input()?;
    let port = find_input_port(&midi_in, name)?;
    let connection = midi_in.connect(
        &port,
        "bytepulse-din-in",
        move |_stamp, message, _| {
            for byte in message {
                let _ = tx.send(*byte);
            }
        },
        (),
    )?;
    info!("DIN input connected: {}", name);
    Ok(connection)
}

/// True for messages a trigger-to-MIDI interface sends per sync edge.
pub fn is_sync_edge(message: &[u8]) -> bool {
    match message {
        [status::CLOCK] => true,
        [s, _, velocity] => s & 0xF0 == status::NOTE_ON && *velocity > 0,
        _ => false,
    }
}

/// Sync-in stand-in: each edge message only stamps the capture word, the
/// way the edge interrupt does on hardware.
pub fn connect_sync_input(
    name: &str,
    capture: PulseCapture,
    clock: SystemClock,
) -> Result<MidiInputConnection<()>> {
    let midi_in = open_input()?;
    let port = find_input_port(&midi_in, name)?;
    let connection = midi_in.connect(
        &port,
        "bytepulse-sync-in",
        move |_stamp, message, _| {
            if is_sync_edge(message) {
                capture.record(clock.now_ms());
            }
        },
        (),
    )?;
    info!("Sync input connected: {}", name);
    Ok(connection)
}

pub fn connect_output(name: &str, label: &str) -> Result<MidiOutputConnection> {
    let midi_out = MidiOutput::new(CLIENT_NAME)?;
    let port = find_output_port(&midi_out, name)?;
    let port_name = midi_out
        .port_name(&port)
        .unwrap_or_else(|_| name.to_string());
    debug!("Connecting {} output to {}", label, port_name);
    let connection = midi_out.connect(&port, label)?;
    info!("{} output connected: {}", label, port_name);
    Ok(connection)
}

impl MidiWrite for MidiOutputConnection {
    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.send(bytes)?;
        Ok(())
    }
}
