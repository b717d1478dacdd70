use std::error::Error;
use std::fmt;

/// Failures of the host-side plumbing around the engine. The engine itself
/// has no error paths.
#[derive(Debug)]
pub enum BridgeError {
    /// Settings could not be loaded or are out of range
    Config(String),
    /// The log file could not be set up
    Logging(String),
    /// No MIDI port matches the requested name
    DeviceNotFound(String),
    /// A MIDI port could not be opened, connected or written
    Connection(String),
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BridgeError::Config(msg) => write!(f, "Configuration error: {}", msg),
            BridgeError::Logging(msg) => write!(f, "Logging error: {}", msg),
            BridgeError::DeviceNotFound(name) => write!(f, "MIDI port not found: {}", name),
            BridgeError::Connection(msg) => write!(f, "MIDI connection error: {}", msg),
        }
    }
}

impl Error for BridgeError {}

impl From<config::ConfigError> for BridgeError {
    fn from(err: config::ConfigError) -> Self {
        BridgeError::Config(err.to_string())
    }
}

impl From<std::io::Error> for BridgeError {
    fn from(err: std::io::Error) -> Self {
        BridgeError::Logging(err.to_string())
    }
}

impl From<midir::InitError> for BridgeError {
    fn from(err: midir::InitError) -> Self {
        BridgeError::Connection(err.to_string())
    }
}

impl<T> From<midir::ConnectError<T>> for BridgeError {
    fn from(err: midir::ConnectError<T>) -> Self {
        BridgeError::Connection(err.to_string())
    }
}

impl From<midir::SendError> for BridgeError {
    fn from(err: midir::SendError) -> Self {
        BridgeError::Connection(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
