use anyhow::Result;

use crate::io::{IoPort, Pin};
use crate::pins::PinTable;

/// Input port usable as a switch (digital) or a sensor (analog).
#[derive(Debug, Clone, Copy)]
pub struct Input {
    index: usize,
    pin: Pin,
}

impl Input {
    pub fn new(table: &PinTable, index: usize) -> Result<Self> {
        let pin = table.input(index)?;
        Ok(Self { index, pin })
    }

    /// Reads the port with the pull-up enabled. A closed switch pulls the
    /// pin to ground, so low reads as `true`.
    pub fn read_digital_value<P: IoPort + ?Sized>(&self, io: &mut P) -> Result<bool> {
        io.configure_input(self.pin, true)?;
        Ok(!io.read_digital(self.pin)?)
    }

    /// Raw ADC reading with the pull-up disabled.
    pub fn read_analog_value<P: IoPort + ?Sized>(&self, io: &mut P) -> Result<u16> {
        io.configure_input(self.pin, false)?;
        io.read_analog(self.pin)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn pin(&self) -> Pin {
        self.pin
    }
}
