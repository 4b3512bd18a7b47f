//! In-memory backend used on the host and in tests.
//!
//! Tracks pin modes, levels and PWM channels and keeps a log of every write
//! so ordering on shared lines can be checked.

use std::collections::HashMap;

use anyhow::{bail, Result};

use crate::io::{Channel, IoPort, Pin, PwmConfig};

pub const ADC_MAX: u16 = 4095;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    Output,
    Input { pull_up: bool },
    Pwm(Channel),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoEvent {
    ConfigureOutput(Pin),
    ConfigureInput { pin: Pin, pull_up: bool },
    WriteDigital { pin: Pin, high: bool },
    BindPwm { pin: Pin, channel: Channel },
    ConfigurePwm { channel: Channel, config: PwmConfig },
    WritePwm { channel: Channel, duty: u8 },
}

#[derive(Debug, Default, Clone, Copy)]
struct PwmState {
    pin: Option<Pin>,
    config: Option<PwmConfig>,
    duty: u8,
}

#[derive(Debug, Default)]
pub struct SimulatedIo {
    modes: HashMap<Pin, PinMode>,
    levels: HashMap<Pin, bool>,
    analog: HashMap<Pin, u16>,
    pwm: HashMap<Channel, PwmState>,
    events: Vec<IoEvent>,
}

impl SimulatedIo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drives an input pin from the outside world.
    pub fn set_input(&mut self, pin: Pin, high: bool) {
        self.levels.insert(pin, high);
    }

    pub fn set_analog(&mut self, pin: Pin, raw: u16) {
        self.analog.insert(pin, raw.min(ADC_MAX));
    }

    pub fn mode(&self, pin: Pin) -> Option<PinMode> {
        self.modes.get(&pin).copied()
    }

    pub fn level(&self, pin: Pin) -> Option<bool> {
        self.levels.get(&pin).copied()
    }

    /// Last duty written to a configured channel.
    pub fn duty(&self, channel: Channel) -> Option<u8> {
        self.pwm
            .get(&channel)
            .filter(|state| state.config.is_some())
            .map(|state| state.duty)
    }

    pub fn pwm_pin(&self, channel: Channel) -> Option<Pin> {
        self.pwm.get(&channel).and_then(|state| state.pin)
    }

    pub fn pwm_config(&self, channel: Channel) -> Option<PwmConfig> {
        self.pwm.get(&channel).and_then(|state| state.config)
    }

    pub fn events(&self) -> &[IoEvent] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<IoEvent> {
        std::mem::take(&mut self.events)
    }
}

impl IoPort for SimulatedIo {
    fn configure_output(&mut self, pin: Pin) -> Result<()> {
        self.modes.insert(pin, PinMode::Output);
        self.events.push(IoEvent::ConfigureOutput(pin));
        Ok(())
    }

    fn configure_input(&mut self, pin: Pin, pull_up: bool) -> Result<()> {
        self.modes.insert(pin, PinMode::Input { pull_up });
        self.events.push(IoEvent::ConfigureInput { pin, pull_up });
        Ok(())
    }

    fn write_digital(&mut self, pin: Pin, high: bool) -> Result<()> {
        if self.mode(pin) != Some(PinMode::Output) {
            bail!("GPIO{pin} is not configured as output");
        }
        self.levels.insert(pin, high);
        self.events.push(IoEvent::WriteDigital { pin, high });
        Ok(())
    }

    fn read_digital(&mut self, pin: Pin) -> Result<bool> {
        match self.mode(pin) {
            // a floating pull-up input reads high
            Some(PinMode::Input { pull_up }) => Ok(self.level(pin).unwrap_or(pull_up)),
            Some(PinMode::Output) => Ok(self.level(pin).unwrap_or(false)),
            _ => bail!("GPIO{pin} is not readable"),
        }
    }

    fn read_analog(&mut self, pin: Pin) -> Result<u16> {
        match self.mode(pin) {
            Some(PinMode::Input { .. }) => Ok(self.analog.get(&pin).copied().unwrap_or(0)),
            _ => bail!("GPIO{pin} is not configured as input"),
        }
    }

    fn bind_pwm(&mut self, pin: Pin, channel: Channel) -> Result<()> {
        self.modes.insert(pin, PinMode::Pwm(channel));
        self.pwm.entry(channel).or_default().pin = Some(pin);
        self.events.push(IoEvent::BindPwm { pin, channel });
        Ok(())
    }

    fn configure_pwm(&mut self, channel: Channel, config: PwmConfig) -> Result<()> {
        self.pwm.entry(channel).or_default().config = Some(config);
        self.events.push(IoEvent::ConfigurePwm { channel, config });
        Ok(())
    }

    fn write_pwm(&mut self, channel: Channel, duty: u8) -> Result<()> {
        match self.pwm.get_mut(&channel) {
            Some(state) if state.config.is_some() => state.duty = duty,
            _ => bail!("PWM channel {channel} is not configured"),
        }
        self.events.push(IoEvent::WritePwm { channel, duty });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_writes_fail() {
        let mut io = SimulatedIo::new();
        assert!(io.write_digital(2, true).is_err());
        assert!(io.write_pwm(0, 10).is_err());
        assert!(io.read_analog(36).is_err());
    }

    #[test]
    fn pull_up_input_floats_high() {
        let mut io = SimulatedIo::new();
        io.configure_input(32, true).unwrap();
        assert!(io.read_digital(32).unwrap());
        io.set_input(32, false);
        assert!(!io.read_digital(32).unwrap());
    }

    #[test]
    fn analog_is_clamped_to_adc_range() {
        let mut io = SimulatedIo::new();
        io.set_analog(34, u16::MAX);
        io.configure_input(34, false).unwrap();
        assert_eq!(io.read_analog(34).unwrap(), ADC_MAX);
    }
}
