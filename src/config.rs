//! Runtime settings.
//!
//! Layered as built-in defaults, then an optional TOML file, then
//! `BYTEPULSE_*` environment variables, then command line flags.

use crate::cli::Args;
use crate::clock::{BpmOnStop, ClockPreference};
use crate::error::{BridgeError, Result};
use crate::event_loop::DEFAULT_MAX_MESSAGES_PER_POLL;
use crate::pulse::OUTPUT_PPQN_CHOICES;
use config::{Config, Environment, File};
use log::{debug, LevelFilter};
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;

pub const ENV_PREFIX: &str = "BYTEPULSE";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub output_ppqn: u8,
    pub bpm_threshold: u16,
    pub bpm_on_stop: BpmOnStop,
    pub clock_source: ClockPreference,
    pub max_messages_per_poll: usize,
    pub forward_to_din: bool,
    pub sync_in_connected: bool,
    pub sync_out_connected: bool,
    pub usb_port: Option<String>,
    pub din_in_port: Option<String>,
    pub din_out_port: Option<String>,
    pub sync_in_port: Option<String>,
    pub idle_sleep_us: u64,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_ppqn: 24,
            bpm_threshold: 2,
            bpm_on_stop: BpmOnStop::Retain,
            clock_source: ClockPreference::Auto,
            max_messages_per_poll: DEFAULT_MAX_MESSAGES_PER_POLL,
            forward_to_din: true,
            sync_in_connected: true,
            sync_out_connected: true,
            usb_port: None,
            din_in_port: None,
            din_out_port: None,
            sync_in_port: None,
            idle_sleep_us: 100,
            log_level: "info".to_string(),
        }
    }
}

impl Settings {
    /// Reads defaults, the optional file and the environment. The result is
    /// not validated yet; flags still have to be applied.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = file {
            debug!("Loading settings from {}", path.display());
            builder = builder.add_source(File::from(path).required(true));
        }
        let settings: Settings = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    pub fn apply_args(&mut self, args: &Args) {
        if let Some(ppqn) = args.output_ppqn {
            self.output_ppqn = ppqn;
        }
        if let Some(threshold) = args.bpm_threshold {
            self.bpm_threshold = threshold;
        }
        if let Some(preference) = args.clock_source {
            self.clock_source = preference;
        }
        if args.zero_bpm_on_stop {
            self.bpm_on_stop = BpmOnStop::Zero;
        }
        if args.no_din_forward {
            self.forward_to_din = false;
        }
        if let Some(level) = &args.log_level {
            self.log_level = level.clone();
        }
        override_port(&mut self.usb_port, &args.usb);
        override_port(&mut self.din_in_port, &args.din_in);
        override_port(&mut self.din_out_port, &args.din_out);
        override_port(&mut self.sync_in_port, &args.sync_in);
    }

    pub fn validate(&self) -> Result<()> {
        if !OUTPUT_PPQN_CHOICES.contains(&self.output_ppqn) {
            return Err(BridgeError::Config(format!(
                "output_ppqn {} is not one of {:?}",
                self.output_ppqn, OUTPUT_PPQN_CHOICES
            )));
        }
        if self.max_messages_per_poll == 0 {
            return Err(BridgeError::Config(
                "max_messages_per_poll must be at least 1".to_string(),
            ));
        }
        self.level_filter()?;
        Ok(())
    }

    pub fn level_filter(&self) -> Result<LevelFilter> {
        LevelFilter::from_str(&self.log_level)
            .map_err(|_| BridgeError::Config(format!("unknown log level '{}'", self.log_level)))
    }
}

fn override_port(target: &mut Option<String>, flag: &Option<String>) {
    if flag.is_some() {
        target.clone_from(flag);
    }
}
