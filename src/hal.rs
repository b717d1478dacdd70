//! Pin-level seams between the engine and the board.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A digital output line (sync-out jack, beat LED).
pub trait OutputPin: Send {
    fn set_high(&mut self);
    fn set_low(&mut self);
    fn is_high(&self) -> bool;
}

/// A jack-detect switch: true when a cable is physically inserted.
pub trait JackDetect: Send {
    fn is_connected(&self) -> bool;
}

/// Output pin whose level lives in a shared atomic flag.
///
/// On the host there is no GPIO, so the level is exposed to whoever holds a
/// clone (status display, tests).
#[derive(Debug, Clone, Default)]
pub struct SharedPin {
    name: &'static str,
    level: Arc<AtomicBool>,
}

impl SharedPin {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            level: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl OutputPin for SharedPin {
    fn set_high(&mut self) {
        log::trace!("{} -> high", self.name);
        self.level.store(true, Ordering::SeqCst);
    }

    fn set_low(&mut self) {
        log::trace!("{} -> low", self.name);
        self.level.store(false, Ordering::SeqCst);
    }

    fn is_high(&self) -> bool {
        self.level.load(Ordering::SeqCst)
    }
}

/// Jack-detect line backed by a shared flag.
#[derive(Debug, Clone)]
pub struct JackSwitch {
    connected: Arc<AtomicBool>,
}

impl JackSwitch {
    pub fn new(connected: bool) -> Self {
        Self {
            connected: Arc::new(AtomicBool::new(connected)),
        }
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }
}

impl JackDetect for JackSwitch {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}
