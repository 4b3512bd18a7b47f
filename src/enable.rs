use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;

use crate::io::{IoPort, Pin};

/// Enable (INH) output shared by every device on one driver chip.
///
/// Clones refer to the same line. Initializing a device pulls the line low,
/// which silences all of its siblings until one of them is set again.
#[derive(Debug, Clone)]
pub struct EnableLine {
    pin: Pin,
    enabled: Arc<AtomicBool>,
}

impl EnableLine {
    pub fn new(pin: Pin) -> Self {
        Self {
            pin,
            enabled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn pin(&self) -> Pin {
        self.pin
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn shares_line(&self, other: &EnableLine) -> bool {
        Arc::ptr_eq(&self.enabled, &other.enabled)
    }

    /// Pulls the line low. Returns whether it was driven high before.
    pub fn disable<P: IoPort + ?Sized>(&self, io: &mut P) -> Result<bool> {
        io.configure_output(self.pin)?;
        io.write_digital(self.pin, false)?;
        Ok(self.enabled.swap(false, Ordering::Relaxed))
    }

    pub fn enable<P: IoPort + ?Sized>(&self, io: &mut P) -> Result<()> {
        io.write_digital(self.pin, true)?;
        self.enabled.store(true, Ordering::Relaxed);
        Ok(())
    }
}
