//! Outbound MIDI queues.
//!
//! The loop never writes to a port directly: it pushes onto unbounded
//! channels and a writer thread per port does the (possibly slow) I/O.

use super::message::{ChannelMessage, RealtimeMessage, UsbMidiPacket};
use crate::error::Result;
use crossbeam::channel::{unbounded, Receiver, Sender};
use log::{error, info, trace};
use std::thread::{self, JoinHandle};

/// USB cable number used for everything the converter emits.
pub const USB_CABLE: u8 = 0;

/// Something bytes can be written to (a connected port, or a test recorder).
pub trait MidiWrite: Send {
    fn write(&mut self, bytes: &[u8]) -> Result<()>;
}

/// Anything that has a wire encoding for a MIDI port.
pub trait WireBytes {
    fn wire_bytes(&self) -> &[u8];
}

impl WireBytes for UsbMidiPacket {
    fn wire_bytes(&self) -> &[u8] {
        self.midi_bytes()
    }
}

impl WireBytes for Vec<u8> {
    fn wire_bytes(&self) -> &[u8] {
        self
    }
}

/// Cloneable handle to the outbound queues. DIN output is optional.
#[derive(Debug, Clone)]
pub struct MidiOutputs {
    usb: Sender<UsbMidiPacket>,
    din: Option<Sender<Vec<u8>>>,
}

/// Receiving ends matching a [`MidiOutputs`].
#[derive(Debug)]
pub struct OutputQueues {
    pub usb: Receiver<UsbMidiPacket>,
    pub din: Option<Receiver<Vec<u8>>>,
}

impl MidiOutputs {
    pub fn new(usb: Sender<UsbMidiPacket>, din: Option<Sender<Vec<u8>>>) -> Self {
        Self { usb, din }
    }

    /// Creates the queues; `with_din` controls whether DIN output exists.
    pub fn channels(with_din: bool) -> (Self, OutputQueues) {
        let (usb_tx, usb_rx) = unbounded();
        let (din_tx, din_rx) = if with_din {
            let (tx, rx) = unbounded();
            (Some(tx), Some(rx))
        } else {
            (None, None)
        };
        (
            Self::new(usb_tx, din_tx),
            OutputQueues {
                usb: usb_rx,
                din: din_rx,
            },
        )
    }

    /// A handle to the same USB queue with DIN output left out.
    pub fn without_din(&self) -> Self {
        Self::new(self.usb.clone(), None)
    }

    pub fn has_din(&self) -> bool {
        self.din.is_some()
    }

    pub fn send_usb(&self, packet: UsbMidiPacket) {
        if self.usb.send(packet).is_err() {
            trace!("USB writer gone, packet {:02X?} dropped", packet.to_array());
        }
    }

    pub fn send_usb_realtime(&self, message: RealtimeMessage) {
        self.send_usb(UsbMidiPacket::from_realtime(USB_CABLE, message));
    }

    pub fn send_usb_channel(&self, message: &ChannelMessage) {
        self.send_usb(UsbMidiPacket::from_channel(USB_CABLE, message));
    }

    pub fn send_din(&self, bytes: &[u8]) {
        if let Some(din) = &self.din {
            if din.send(bytes.to_vec()).is_err() {
                trace!("DIN writer gone, {:02X?} dropped", bytes);
            }
        }
    }

    pub fn send_din_realtime(&self, message: RealtimeMessage) {
        self.send_din(&[message.status()]);
    }
}

/// Drains `rx` into `writer` until every sender is dropped.
pub fn run_writer_thread<T, W>(
    name: &'static str,
    rx: Receiver<T>,
    mut writer: W,
) -> JoinHandle<()>
where
    T: WireBytes + Send + 'static,
    W: MidiWrite + 'static,
{
    thread::spawn(move || {
        info!("{} writer started", name);
        while let Ok(message) = rx.recv() {
            if let Err(e) = writer.write(message.wire_bytes()) {
                error!("{} write failed: {}", name, e);
            }
        }
        info!("{} writer stopping", name);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<Vec<u8>>>>);

    impl MidiWrite for Recorder {
        fn write(&mut self, bytes: &[u8]) -> Result<()> {
            self.0.lock().unwrap().push(bytes.to_vec());
            Ok(())
        }
    }

    #[test]
    fn writer_sends_unpadded_midi_bytes() {
        let (outputs, queues) = MidiOutputs::channels(false);
        let recorder = Recorder::default();
        let handle = run_writer_thread("USB", queues.usb, recorder.clone());

        outputs.send_usb_realtime(RealtimeMessage::Start);
        let cc = ChannelMessage::new(0xB0, &[0x07, 0x64]).unwrap();
        outputs.send_usb_channel(&cc);
        drop(outputs);
        handle.join().unwrap();

        let written = recorder.0.lock().unwrap();
        assert_eq!(*written, vec![vec![0xFA], vec![0xB0, 0x07, 0x64]]);
    }

    #[test]
    fn din_sends_are_skipped_without_din_output() {
        let (outputs, queues) = MidiOutputs::channels(false);
        assert!(!outputs.has_din());
        outputs.send_din_realtime(RealtimeMessage::Clock);
        assert!(queues.din.is_none());
        assert!(queues.usb.try_recv().is_err());
    }

    #[test]
    fn without_din_keeps_usb() {
        let (outputs, queues) = MidiOutputs::channels(true);
        let usb_only = outputs.without_din();
        usb_only.send_din_realtime(RealtimeMessage::Stop);
        usb_only.send_usb_realtime(RealtimeMessage::Stop);

        let din = queues.din.unwrap();
        assert!(din.try_recv().is_err());
        assert_eq!(
            queues.usb.try_recv().unwrap().realtime(),
            Some(RealtimeMessage::Stop)
        );
    }
}
