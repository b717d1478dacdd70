use bytepulse::{
    cli::{pick_port, validate_port, Args},
    handle_device_list, logging,
    midi::{midir_engine, output::run_writer_thread, MidiOutputs, OutputQueues},
    ui::StatusDisplay,
    BridgeError, ClockArbiter, EventLoop, JackSwitch, PulseCapture, PulseGenerator, Result,
    Settings, SharedPin, StatusBoard, SystemClock, TransportRepublisher,
};
use clap::Parser;
use crossbeam::channel::unbounded;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn main() {
    let args = Args::parse();

    let mut settings = match load_settings(&args) {
        Ok(settings) => settings,
        Err(e) => exit_with(&e),
    };

    if let Err(e) = settings
        .level_filter()
        .and_then(logging::init_logger)
    {
        exit_with(&e);
    }
    log::info!("Application starting");

    let ports = handle_device_list();
    if args.list_devices {
        list_available_ports(&ports);
        return;
    }

    if args.pick {
        pick_unset_ports(&mut settings, &ports);
    }

    for port in requested_ports(&settings) {
        if let Err(error_msg) = validate_port(port, &ports) {
            log::error!("{}", error_msg);
            eprintln!("{}", error_msg);
            std::process::exit(1);
        }
    }

    if let Err(e) = run(settings) {
        exit_with(&e);
    }
}

fn exit_with(error: &BridgeError) -> ! {
    log::error!("{}", error);
    eprintln!("{}", error);
    std::process::exit(1);
}

fn load_settings(args: &Args) -> Result<Settings> {
    let mut settings = Settings::load(args.config.as_deref())?;
    settings.apply_args(args);
    settings.validate()?;
    Ok(settings)
}

fn list_available_ports(ports: &[String]) {
    println!("Available MIDI ports:");
    for port in ports {
        println!("  - {}", port);
    }
}

fn pick_unset_ports(settings: &mut Settings, ports: &[String]) {
    for (label, slot) in [
        ("USB", &mut settings.usb_port),
        ("DIN in", &mut settings.din_in_port),
        ("DIN out", &mut settings.din_out_port),
        ("Sync in", &mut settings.sync_in_port),
    ] {
        if slot.is_none() {
            *slot = pick_port(label, ports);
        }
    }
}

fn requested_ports(settings: &Settings) -> impl Iterator<Item = &str> {
    [
        &settings.usb_port,
        &settings.din_in_port,
        &settings.din_out_port,
        &settings.sync_in_port,
    ]
    .into_iter()
    .filter_map(|port| port.as_deref())
}

fn run(settings: Settings) -> Result<()> {
    let clock = SystemClock::new();
    let led = SharedPin::new("beat-led");
    let pulses = PulseGenerator::new(
        Box::new(SharedPin::new("sync-out")),
        Box::new(led.clone()),
        Box::new(JackSwitch::new(settings.sync_out_connected)),
    )
    .with_output_ppqn(settings.output_ppqn);

    let (outputs, queues) = MidiOutputs::channels(settings.din_out_port.is_some());
    let OutputQueues { usb, din } = queues;
    let mut writers = Vec::new();
    match &settings.usb_port {
        Some(port) => {
            let connection = midir_engine::connect_output(port, "bytepulse-usb-out")?;
            writers.push(run_writer_thread("USB", usb, connection));
        }
        // Nobody drains the queue, so senders must see it closed.
        None => drop(usb),
    }
    if let (Some(port), Some(din)) = (&settings.din_out_port, din) {
        let connection = midir_engine::connect_output(port, "bytepulse-din-out")?;
        writers.push(run_writer_thread("DIN", din, connection));
    }

    let (usb_tx, usb_rx) = unbounded();
    let (din_tx, din_rx) = unbounded();
    let capture = PulseCapture::new();
    let mut inputs = Vec::new();
    if let Some(port) = &settings.usb_port {
        inputs.push(midir_engine::connect_usb_input(port, usb_tx)?);
    }
    if let Some(port) = &settings.din_in_port {
        inputs.push(midir_engine::connect_din_input(port, din_tx)?);
    }
    if let Some(port) = &settings.sync_in_port {
        inputs.push(midir_engine::connect_sync_input(
            port,
            capture.clone(),
            clock,
        )?);
    }

    let republish_outputs = if settings.forward_to_din {
        outputs.clone()
    } else {
        outputs.without_din()
    };
    let board = StatusBoard::new();
    let arbiter = ClockArbiter::new(clock, pulses)
        .with_bpm_threshold(settings.bpm_threshold)
        .with_bpm_on_stop(settings.bpm_on_stop)
        .with_clock_preference(settings.clock_source)
        .with_sync_in_jack(Box::new(JackSwitch::new(settings.sync_in_connected)))
        .with_observer(Box::new(TransportRepublisher::new(republish_outputs)))
        .with_observer(Box::new(board.clone()));

    let mut event_loop = EventLoop::new(arbiter, outputs, din_rx, usb_rx, capture)
        .with_max_messages_per_poll(settings.max_messages_per_poll);

    let running = Arc::new(AtomicBool::new(true));
    let display_running = running.clone();
    let display = StatusDisplay::new(board, led);
    thread::spawn(move || display.run(&display_running));

    log::info!("Application running. Press Ctrl+C to exit...");
    println!("\nPress Ctrl+C to exit...");
    event_loop.run(&running, Duration::from_micros(settings.idle_sleep_us));

    drop(event_loop);
    drop(inputs);
    for writer in writers {
        let _ = writer.join();
    }
    Ok(())
}
