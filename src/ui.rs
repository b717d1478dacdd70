//! Terminal status display. Reads the [`StatusBoard`] and the beat LED,
//! never touches the engine.

use crate::clock::tempo::BEATS_PER_MEASURE;
use crate::hal::{OutputPin, SharedPin};
use crate::state::StatusBoard;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

const REFRESH: Duration = Duration::from_millis(50);

fn create_beat_progress(multi_progress: &MultiProgress) -> ProgressBar {
    let pb = multi_progress.add(ProgressBar::new(u64::from(BEATS_PER_MEASURE)));
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{prefix:.bold} [{bar:20.cyan}] {pos}/{len}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▊ "),
    );
    pb.set_prefix("Beat");
    pb
}

fn create_transport_spinner(multi_progress: &MultiProgress) -> ProgressBar {
    let pb = multi_progress.add(ProgressBar::new_spinner());
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{prefix:.bold.dim} {spinner} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_prefix("Clock");
    pb
}

/// One line summary of the board.
pub fn status_line(board: &StatusBoard, led_on: bool) -> String {
    let bpm = match board.get_bpm() {
        0 => "---".to_string(),
        bpm => bpm.to_string(),
    };
    let transport = if board.is_playing() {
        "playing"
    } else {
        "stopped"
    };
    format!(
        "{} {} BPM {} | source: {} | pulses: {}",
        if led_on { "●" } else { "○" },
        bpm,
        transport,
        board.get_active_source(),
        board.get_pulse_count()
    )
}

pub struct StatusDisplay {
    board: StatusBoard,
    led: SharedPin,
    _multi_progress: MultiProgress,
    beat_pb: ProgressBar,
    clock_pb: ProgressBar,
}

impl StatusDisplay {
    pub fn new(board: StatusBoard, led: SharedPin) -> Self {
        let multi_progress = MultiProgress::with_draw_target(ProgressDrawTarget::stderr());
        let beat_pb = create_beat_progress(&multi_progress);
        let clock_pb = create_transport_spinner(&multi_progress);
        Self {
            board,
            led,
            _multi_progress: multi_progress,
            beat_pb,
            clock_pb,
        }
    }

    pub fn run(&self, running: &AtomicBool) {
        while running.load(Ordering::SeqCst) {
            thread::sleep(REFRESH);
            self.beat_pb.set_position(u64::from(self.board.get_beat()));
            self.clock_pb
                .set_message(status_line(&self.board, self.led.is_high()));
            if self.board.is_playing() {
                self.clock_pb.tick();
            }
        }
        self.clock_pb.finish_and_clear();
        self.beat_pb.finish_and_clear();
    }
}
