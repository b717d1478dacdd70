pub mod capture;
pub mod cli;
pub mod clock;
pub mod config;
pub mod error;
pub mod event_loop;
pub mod hal;
pub mod logging;
pub mod midi;
pub mod pulse;
pub mod republish;
pub mod state;
pub mod time;
pub mod ui;

pub use capture::PulseCapture;
pub use cli::{pick_port, validate_port, Args};
pub use clock::{
    BpmOnStop, ClockArbiter, ClockObserver, ClockPreference, ClockSource, StopReason,
    TempoEstimator,
};
pub use config::Settings;
pub use error::{BridgeError, Result};
pub use event_loop::EventLoop;
pub use hal::{JackDetect, JackSwitch, OutputPin, SharedPin};
pub use pulse::PulseGenerator;
pub use republish::TransportRepublisher;
pub use state::StatusBoard;
pub use time::{ManualClock, Monotonic, SystemClock};

/// Names of every MIDI port the host can see, inputs first.
pub fn handle_device_list() -> Vec<String> {
    let mut ports = midi::list_input_ports();
    for port in midi::list_output_ports() {
        if !ports.contains(&port) {
            ports.push(port);
        }
    }
    ports
}
