//! MIDI plumbing for both transports
//!
//! - [`message`]: status constants, realtime/channel messages, USB event packets
//! - [`demux`]: rebuilds messages from the raw DIN byte stream
//! - [`output`]: non-blocking outbound queues and their writer threads
//! - [`midir_engine`]: host port discovery and connections

pub mod demux;
pub mod message;
pub mod midir_engine;
pub mod output;

pub use demux::{DemuxEvent, StreamDemux};
pub use message::{ChannelMessage, RealtimeMessage, UsbMidiPacket};
pub use midir_engine::{list_input_ports, list_output_ports};
pub use output::{MidiOutputs, MidiWrite, OutputQueues};
