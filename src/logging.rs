use crate::error::{BridgeError, Result};
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Once;

static INIT: Once = Once::new();

/// `$HOME/.local/share/bytepulse/logs`
pub fn log_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME")
        .map_err(|_| BridgeError::Logging("HOME environment variable not set".to_string()))?;

    Ok(PathBuf::from(home)
        .join(".local")
        .join("share")
        .join("bytepulse")
        .join("logs"))
}

/// Sets up the file logger. Later calls are no-ops.
pub fn init_logger(level: LevelFilter) -> Result<()> {
    let mut outcome = Ok(());
    INIT.call_once(|| {
        outcome = open_logger(level);
    });
    outcome
}

fn open_logger(level: LevelFilter) -> Result<()> {
    let log_dir = log_dir()?;
    fs::create_dir_all(&log_dir)?;

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("bytepulse.log"))?;

    let config = ConfigBuilder::new()
        .set_thread_level(LevelFilter::Debug)
        .build();

    WriteLogger::init(level, config, log_file)
        .map_err(|e| BridgeError::Logging(format!("Logger initialization failed: {}", e)))
}
