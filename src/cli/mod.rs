use crate::clock::ClockPreference;
use clap::Parser;
use dialoguer::{theme::ColorfulTheme, Select};
use std::path::PathBuf;

#[derive(Parser, Debug, Default)]
#[command(author, version, about = "MIDI clock and transport sync bridge", long_about = None)]
pub struct Args {
    /// List available MIDI ports and exit
    #[arg(long)]
    pub list_devices: bool,

    /// Settings file (TOML)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// USB MIDI port (input and output)
    #[arg(long, value_name = "PORT")]
    pub usb: Option<String>,

    /// Port standing in for the DIN input
    #[arg(long, value_name = "PORT")]
    pub din_in: Option<String>,

    /// Port standing in for the DIN output
    #[arg(long, value_name = "PORT")]
    pub din_out: Option<String>,

    /// Port whose notes or clocks stand in for sync-in edges
    #[arg(long, value_name = "PORT")]
    pub sync_in: Option<String>,

    /// Sync-out pulses per quarter note (1, 2, 3, 4, 6, 8, 12 or 24)
    #[arg(long, value_name = "N")]
    pub output_ppqn: Option<u8>,

    /// Which source may drive the clock (auto, analog, usb or din)
    #[arg(long, value_name = "SOURCE")]
    pub clock_source: Option<ClockPreference>,

    /// Minimum BPM change reported to observers
    #[arg(long, value_name = "N")]
    pub bpm_threshold: Option<u16>,

    /// Zero the displayed BPM when the clock stops
    #[arg(long)]
    pub zero_bpm_on_stop: bool,

    /// Do not re-publish transport on the DIN output
    #[arg(long)]
    pub no_din_forward: bool,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Choose unset ports interactively
    #[arg(long)]
    pub pick: bool,
}

pub fn validate_port(port_name: &str, ports: &[String]) -> Result<(), String> {
    if !ports.iter().any(|p| p.contains(port_name)) {
        let mut error_msg = format!(
            "Error: Port '{}' not found in available ports:\n",
            port_name
        );
        for port in ports {
            error_msg.push_str(&format!("  - {}\n", port));
        }
        return Err(error_msg);
    }
    Ok(())
}

/// Interactive selection of one port. The first entry means "not used".
pub fn pick_port(label: &str, ports: &[String]) -> Option<String> {
    if ports.is_empty() {
        return None;
    }
    let mut items = vec!["(none)".to_string()];
    items.extend(ports.iter().cloned());

    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(format!("{} port", label))
        .items(&items)
        .default(0)
        .interact_opt()
        .ok()
        .flatten()?;

    match selection {
        0 => None,
        index => Some(items[index].clone()),
    }
}
