//! Hardware primitives the devices are built on.
//!
//! Pins are plain GPIO numbers and PWM channels plain LEDC channel numbers,
//! so the same device code runs against the ESP-IDF backend on the board and
//! against [`crate::sim::SimulatedIo`] on the host.

use anyhow::Result;

use crate::config::CONFIG;

pub type Pin = i32;
pub type Channel = u8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PwmConfig {
    pub frequency_hz: u32,
    pub resolution_bits: u8,
}

impl Default for PwmConfig {
    fn default() -> Self {
        Self {
            frequency_hz: CONFIG.pwm_frequency_hz,
            resolution_bits: CONFIG.pwm_resolution_bits,
        }
    }
}

pub trait IoPort {
    fn configure_output(&mut self, pin: Pin) -> Result<()>;

    fn configure_input(&mut self, pin: Pin, pull_up: bool) -> Result<()>;

    fn write_digital(&mut self, pin: Pin, high: bool) -> Result<()>;

    /// Electrical level of the pin, `true` when high.
    fn read_digital(&mut self, pin: Pin) -> Result<bool>;

    fn read_analog(&mut self, pin: Pin) -> Result<u16>;

    fn bind_pwm(&mut self, pin: Pin, channel: Channel) -> Result<()>;

    fn configure_pwm(&mut self, channel: Channel, config: PwmConfig) -> Result<()>;

    fn write_pwm(&mut self, channel: Channel, duty: u8) -> Result<()>;
}

/// Attaches `pin` to `channel`, configures the channel and drives `duty`.
pub fn setup_pwm<P: IoPort + ?Sized>(io: &mut P, pin: Pin, channel: Channel, duty: u8) -> Result<()> {
    io.bind_pwm(pin, channel)?;
    io.configure_pwm(channel, PwmConfig::default())?;
    io.write_pwm(channel, duty)
}
