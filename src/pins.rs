//! GPIO assignments of the fischertechnik ESP32 interface board.
//!
//! Two A4990 dual motor drivers give four driver ports. Each port has a PWM
//! pin and a direction pin; a port drives either one motor or two lamps.

use anyhow::{bail, Result};

use crate::io::Pin;

pub const DRIVER_PORTS: usize = 4;
pub const MOTORS: usize = DRIVER_PORTS;
pub const LAMPS: usize = DRIVER_PORTS * 2;
pub const INPUTS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinTable {
    pub motor_pwm: [Pin; DRIVER_PORTS],
    pub motor_dir: [Pin; DRIVER_PORTS],
    pub lamp_pwm: [Pin; DRIVER_PORTS],
    pub inputs: [Pin; INPUTS],
    /// Enable (INH) line of the drivers when used for motors.
    pub motor_enable: Pin,
    /// Enable (INH) line of the drivers when used for lamps.
    pub lamp_enable: Pin,
}

impl PinTable {
    pub const FT_ESP32: PinTable = PinTable {
        motor_pwm: [19, 5, 4, 13],
        motor_dir: [18, 17, 16, 14],
        lamp_pwm: [19, 5, 4, 13],
        inputs: [36, 39, 34, 35, 32, 33, 37, 38],
        motor_enable: 27,
        lamp_enable: 27,
    };

    /// PWM and direction pins of a motor.
    pub fn motor(&self, index: usize) -> Result<(Pin, Pin)> {
        if index >= MOTORS {
            bail!("Motor index out of range: {index}");
        }
        Ok((self.motor_pwm[index], self.motor_dir[index]))
    }

    /// Even lamps sit on the PWM row, odd lamps on the direction row.
    pub fn lamp(&self, index: usize) -> Result<Pin> {
        if index >= LAMPS {
            bail!("Lamp index out of range: {index}");
        }
        let port = index / 2;
        if index % 2 == 0 {
            Ok(self.lamp_pwm[port])
        } else {
            Ok(self.motor_dir[port])
        }
    }

    pub fn input(&self, index: usize) -> Result<Pin> {
        match self.inputs.get(index) {
            Some(pin) => Ok(*pin),
            None => bail!("Input index out of range: {index}"),
        }
    }
}

impl Default for PinTable {
    fn default() -> Self {
        Self::FT_ESP32
    }
}
