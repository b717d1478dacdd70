mod common;

use bytepulse::clock::{BpmOnStop, ClockArbiter, ClockPreference, ClockSource, StopReason};
use bytepulse::hal::OutputPin;
use bytepulse::time::Monotonic;
use common::{Event, Rig, TICK_120_BPM_US};

#[test]
fn implicit_start_on_clock_while_idle() {
    let rig = Rig::new();
    let mut arbiter = rig.arbiter();

    arbiter.handle_clock(ClockSource::USB);

    assert!(arbiter.is_playing());
    assert_eq!(arbiter.active_source(), ClockSource::USB);
    let events = rig.log.events();
    assert_eq!(events[0], Event::Start(ClockSource::USB));
    assert!(matches!(events[1], Event::Tick(t) if t.ppqn_position == 0));
}

#[test]
fn analog_start_preempts_din_immediately() {
    let rig = Rig::new();
    let mut arbiter = rig.arbiter();

    arbiter.handle_start(ClockSource::SerialDIN);
    for _ in 0..3 {
        rig.clock.advance_ms(20);
        arbiter.handle_clock(ClockSource::SerialDIN);
    }
    assert_eq!(arbiter.ppqn_counter(), 3);

    rig.clock.advance_ms(5);
    arbiter.handle_pulse(rig.clock.now_ms());

    assert_eq!(arbiter.active_source(), ClockSource::AnalogIn);
    assert!(!arbiter.timing_of(ClockSource::SerialDIN).is_playing);
    assert_eq!(
        arbiter.ppqn_counter(),
        1,
        "the pulse that preempted is the first tick of the new source"
    );

    rig.log.clear();
    arbiter.handle_clock(ClockSource::SerialDIN);
    assert!(rig.log.events().is_empty(), "DIN ticks must be ignored");
    assert_eq!(arbiter.ppqn_counter(), 1);
}

#[test]
fn stray_higher_priority_clock_does_not_preempt() {
    let rig = Rig::new();
    let mut arbiter = rig.arbiter();

    arbiter.handle_start(ClockSource::SerialDIN);
    arbiter.handle_clock(ClockSource::SerialDIN);
    assert_eq!(arbiter.ppqn_counter(), 1);

    rig.clock.advance_ms(5);
    arbiter.handle_clock(ClockSource::USB);
    assert_eq!(arbiter.active_source(), ClockSource::SerialDIN);
    assert_eq!(
        arbiter.ppqn_counter(),
        1,
        "a USB clock without Start must not count"
    );

    arbiter.handle_start(ClockSource::USB);
    assert_eq!(arbiter.active_source(), ClockSource::USB);
    assert_eq!(arbiter.ppqn_counter(), 0);
    assert!(!arbiter.timing_of(ClockSource::SerialDIN).is_playing);
    assert_eq!(
        rig.log.events().last(),
        Some(&Event::Start(ClockSource::USB))
    );
}

#[test]
fn lower_priority_start_is_ignored() {
    let rig = Rig::new();
    let mut arbiter = rig.arbiter();

    arbiter.handle_start(ClockSource::USB);
    arbiter.handle_start(ClockSource::SerialDIN);
    arbiter.handle_continue(ClockSource::SerialDIN);

    assert_eq!(arbiter.active_source(), ClockSource::USB);
    assert_eq!(rig.log.events(), vec![Event::Start(ClockSource::USB)]);
}

#[test]
fn same_source_start_restarts_the_count() {
    let rig = Rig::new();
    let mut arbiter = rig.arbiter();

    arbiter.handle_start(ClockSource::USB);
    for _ in 0..10 {
        arbiter.handle_clock(ClockSource::USB);
    }
    assert_eq!(arbiter.ppqn_counter(), 10);

    arbiter.handle_start(ClockSource::USB);
    assert_eq!(arbiter.ppqn_counter(), 0);
    assert_eq!(arbiter.pulse_count(), 0);
}

#[test]
fn stop_only_from_active_source() {
    let rig = Rig::new();
    let mut arbiter = rig.arbiter();

    arbiter.handle_start(ClockSource::USB);
    arbiter.handle_stop(ClockSource::SerialDIN);
    arbiter.handle_stop(ClockSource::AnalogIn);
    assert!(arbiter.is_playing());

    arbiter.handle_stop(ClockSource::USB);
    assert!(!arbiter.is_playing());
    assert_eq!(arbiter.active_source(), ClockSource::None);
    assert_eq!(
        rig.log.events().last(),
        Some(&Event::Stop(ClockSource::USB, StopReason::Stop))
    );
}

#[test]
fn stop_forces_outputs_low_at_once() {
    let rig = Rig::new();
    let mut arbiter = rig.arbiter();

    arbiter.handle_clock(ClockSource::USB);
    assert!(rig.sync_out.is_high());
    assert!(rig.led.is_high());

    arbiter.handle_stop(ClockSource::USB);
    assert!(rig.outputs_low());
    assert!(!arbiter.pulses().is_pulse_high());
    assert!(!arbiter.pulses().is_led_high());
}

#[test]
fn system_reset_acts_as_stop_for_active_source() {
    let rig = Rig::new();
    let mut arbiter = rig.arbiter();

    arbiter.handle_start(ClockSource::SerialDIN);
    arbiter.handle_reset(ClockSource::USB);
    assert!(arbiter.is_playing());

    arbiter.handle_reset(ClockSource::SerialDIN);
    assert!(!arbiter.is_playing());
    assert_eq!(
        rig.log.events().last(),
        Some(&Event::Stop(ClockSource::SerialDIN, StopReason::Reset))
    );
}

#[test]
fn dropout_after_three_average_intervals() {
    let rig = Rig::new();
    let mut arbiter = rig.arbiter();

    arbiter.handle_start(ClockSource::USB);
    arbiter.handle_clock(ClockSource::USB);
    for _ in 0..5 {
        rig.clock.advance_ms(100);
        arbiter.handle_clock(ClockSource::USB);
    }
    assert_eq!(arbiter.timing_of(ClockSource::USB).avg_interval, 100);

    rig.clock.advance_ms(300);
    arbiter.update();
    assert!(arbiter.is_playing(), "exactly 3x the interval is not a dropout");

    rig.clock.advance_ms(1);
    arbiter.update();
    assert!(!arbiter.is_playing());
    assert!(rig.outputs_low());
    assert_eq!(
        rig.log.events().last(),
        Some(&Event::Stop(ClockSource::USB, StopReason::Dropout))
    );
}

#[test]
fn failover_after_dropout() {
    let rig = Rig::new();
    let mut arbiter = rig.arbiter();

    arbiter.handle_clock(ClockSource::USB);
    rig.clock.advance_ms(20);
    arbiter.handle_clock(ClockSource::USB);

    // DIN keeps ticking but is ignored while USB is active.
    arbiter.handle_clock(ClockSource::SerialDIN);
    assert_eq!(arbiter.active_source(), ClockSource::USB);

    rig.clock.advance_ms(61);
    arbiter.update();
    assert!(!arbiter.is_playing());

    arbiter.handle_clock(ClockSource::SerialDIN);
    assert_eq!(arbiter.active_source(), ClockSource::SerialDIN);
}

#[test]
fn first_tick_alone_never_times_out() {
    let rig = Rig::new();
    let mut arbiter = rig.arbiter();

    arbiter.handle_clock(ClockSource::SerialDIN);
    rig.clock.advance_ms(10_000);
    arbiter.update();
    assert!(arbiter.is_playing(), "no interval is known after one tick");
}

#[test]
fn update_is_idempotent_without_events() {
    let rig = Rig::new();
    let mut arbiter = rig.arbiter();

    for _ in 0..30 {
        arbiter.handle_clock(ClockSource::USB);
        rig.clock.advance_us(TICK_120_BPM_US);
    }
    arbiter.update();
    let source = arbiter.active_source();
    let bpm = arbiter.bpm();
    let state = arbiter.pulses().state();

    for _ in 0..100 {
        arbiter.update();
    }

    assert_eq!(arbiter.active_source(), source);
    assert_eq!(arbiter.bpm(), bpm);
    assert_eq!(arbiter.pulses().state(), state);
}

#[test]
fn continue_resumes_without_start() {
    let rig = Rig::new();
    let mut arbiter = rig.arbiter();

    arbiter.handle_start(ClockSource::USB);
    arbiter.handle_stop(ClockSource::USB);
    rig.log.clear();

    arbiter.handle_continue(ClockSource::USB);
    assert!(arbiter.is_playing());
    arbiter.handle_continue(ClockSource::USB);
    assert_eq!(rig.log.events(), vec![Event::Continue(ClockSource::USB)]);
}

#[test]
fn pulse_while_analog_stopped_starts_it() {
    let rig = Rig::new();
    let mut arbiter = rig.arbiter();

    arbiter.handle_pulse(0);
    arbiter.handle_pulse(20);

    let events = rig.log.events();
    assert_eq!(events[0], Event::Start(ClockSource::AnalogIn));
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, Event::Start(_)))
            .count(),
        1
    );
    assert_eq!(rig.log.ticks().len(), 2);
    assert_eq!(arbiter.timing_of(ClockSource::AnalogIn).avg_interval, 20);
}

#[test]
fn sync_in_cable_removal_drops_analog() {
    let rig = Rig::new();
    let mut arbiter = rig.arbiter();

    arbiter.handle_pulse(0);
    assert_eq!(arbiter.active_source(), ClockSource::AnalogIn);

    rig.sync_in_jack.set_connected(false);
    arbiter.update();
    assert!(!arbiter.is_playing());
    assert_eq!(
        rig.log.events().last(),
        Some(&Event::Stop(ClockSource::AnalogIn, StopReason::JackRemoved))
    );

    rig.log.clear();
    arbiter.handle_pulse(40);
    assert!(rig.log.events().is_empty(), "edges without a cable are noise");
}

#[test]
fn bpm_retained_or_zeroed_on_stop() {
    for (policy, expected) in [(BpmOnStop::Retain, 120), (BpmOnStop::Zero, 0)] {
        let rig = Rig::new();
        let mut arbiter = rig.arbiter().with_bpm_on_stop(policy);

        arbiter.handle_start(ClockSource::USB);
        for _ in 0..=96 {
            arbiter.handle_clock(ClockSource::USB);
            rig.clock.advance_us(TICK_120_BPM_US);
        }
        assert_eq!(arbiter.bpm(), 120);

        arbiter.handle_stop(ClockSource::USB);
        assert_eq!(arbiter.bpm(), expected, "policy {:?}", policy);
        assert_eq!(rig.log.bpm_reports().last(), Some(&expected));
    }
}

#[test]
fn output_divider_counts_pulses() {
    let rig = Rig::new();
    let pulses = rig.pulses().with_output_ppqn(4);
    let mut arbiter = ClockArbiter::new(rig.clock.clone(), pulses);

    for _ in 0..96 {
        arbiter.handle_clock(ClockSource::USB);
        rig.clock.advance_us(TICK_120_BPM_US);
        arbiter.update();
    }
    assert_eq!(arbiter.pulse_count(), 16);
}

#[test]
fn pulses_count_with_sync_out_unplugged() {
    let rig = Rig::new();
    rig.sync_out_jack.set_connected(false);
    let mut arbiter = rig.arbiter();

    arbiter.handle_clock(ClockSource::USB);
    assert!(!rig.sync_out.is_high());
    assert!(rig.led.is_high(), "the LED has no jack");
    assert_eq!(arbiter.pulse_count(), 1);
}

#[test]
fn forced_usb_ignores_every_other_source() {
    let rig = Rig::new();
    let mut arbiter = rig.arbiter().with_clock_preference(ClockPreference::Usb);

    arbiter.handle_clock(ClockSource::SerialDIN);
    arbiter.handle_start(ClockSource::SerialDIN);
    arbiter.handle_pulse(0);
    assert!(!arbiter.is_playing());
    assert!(rig.log.events().is_empty());

    arbiter.handle_clock(ClockSource::USB);
    assert_eq!(arbiter.active_source(), ClockSource::USB);

    // Not even the highest priority source may take over.
    arbiter.handle_pulse(10);
    arbiter.handle_start(ClockSource::AnalogIn);
    assert_eq!(arbiter.active_source(), ClockSource::USB);
}

#[test]
fn forced_din_beats_priority() {
    let rig = Rig::new();
    let mut arbiter = rig.arbiter().with_clock_preference(ClockPreference::Din);

    arbiter.handle_start(ClockSource::SerialDIN);
    arbiter.handle_start(ClockSource::USB);
    arbiter.handle_continue(ClockSource::USB);
    arbiter.handle_clock(ClockSource::SerialDIN);

    assert_eq!(arbiter.active_source(), ClockSource::SerialDIN);
    assert_eq!(arbiter.ppqn_counter(), 1);
    assert_eq!(
        rig.log.events()[0],
        Event::Start(ClockSource::SerialDIN)
    );
    assert_eq!(rig.log.events().len(), 2);
}

#[test]
fn forced_analog_follows_sync_in_only() {
    let rig = Rig::new();
    let mut arbiter = rig
        .arbiter()
        .with_clock_preference(ClockPreference::Analog);
    assert_eq!(arbiter.clock_preference(), ClockPreference::Analog);

    arbiter.handle_clock(ClockSource::USB);
    assert!(!arbiter.is_playing());

    arbiter.handle_pulse(0);
    assert_eq!(arbiter.active_source(), ClockSource::AnalogIn);
}

#[test]
fn very_long_intervals_do_not_overflow_smoothing() {
    let rig = Rig::new();
    let mut arbiter = rig.arbiter();

    arbiter.handle_pulse(0);
    arbiter.handle_pulse(2_000_000_000);
    arbiter.handle_pulse(4_000_000_000);

    assert_eq!(
        arbiter.timing_of(ClockSource::AnalogIn).avg_interval,
        2_000_000_000
    );
    assert!(arbiter.is_playing());
}
