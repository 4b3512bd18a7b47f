//! All devices of the interface board behind one backend.
//!
//! Devices on a driver chip share its enable line and every device pulls
//! that line low while it initializes. [`Board::new`] therefore brings up
//! every device before any of them can be commanded.

use anyhow::{anyhow, Result};
use serde::Serialize;

use crate::enable::EnableLine;
use crate::input::Input;
use crate::io::IoPort;
use crate::lamp::Lamp;
use crate::motor::{Direction, Motor};
use crate::pins::{PinTable, DRIVER_PORTS, INPUTS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PortUse {
    #[default]
    Unused,
    Motor,
    /// Two lamps, one per bridge output.
    Lamps,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardLayout {
    pub ports: [PortUse; DRIVER_PORTS],
}

impl Default for BoardLayout {
    fn default() -> Self {
        Self {
            ports: [PortUse::Motor, PortUse::Motor, PortUse::Lamps, PortUse::Lamps],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InputReading {
    pub digital: bool,
    pub analog: u16,
}

pub struct Board<P: IoPort> {
    io: P,
    motors: Vec<Motor>,
    lamps: Vec<Lamp>,
    inputs: Vec<Input>,
}

impl<P: IoPort> Board<P> {
    pub fn new(mut io: P, table: &PinTable, layout: BoardLayout) -> Result<Self> {
        let motor_enable = EnableLine::new(table.motor_enable);
        let lamp_enable = if table.lamp_enable == table.motor_enable {
            motor_enable.clone()
        } else {
            EnableLine::new(table.lamp_enable)
        };

        let mut motors = Vec::new();
        let mut lamps = Vec::new();
        for (port, usage) in layout.ports.iter().enumerate() {
            match usage {
                PortUse::Unused => {}
                PortUse::Motor => {
                    motors.push(Motor::new(&mut io, table, port, motor_enable.clone())?);
                }
                PortUse::Lamps => {
                    for index in [port * 2, port * 2 + 1] {
                        lamps.push(Lamp::new(&mut io, table, index, lamp_enable.clone())?);
                    }
                }
            }
        }
        let inputs = (0..INPUTS)
            .map(|index| Input::new(table, index))
            .collect::<Result<Vec<_>>>()?;

        log::info!(
            "Board ready with {} motors, {} lamps and {} inputs",
            motors.len(),
            lamps.len(),
            inputs.len()
        );
        Ok(Self {
            io,
            motors,
            lamps,
            inputs,
        })
    }

    pub fn motor(&self, index: usize) -> Option<&Motor> {
        self.motors.iter().find(|motor| motor.index() == index)
    }

    pub fn lamp(&self, index: usize) -> Option<&Lamp> {
        self.lamps.iter().find(|lamp| lamp.index() == index)
    }

    pub fn set_motor(&mut self, index: usize, direction: Direction, speed: i32) -> Result<()> {
        let motor = self
            .motors
            .iter_mut()
            .find(|motor| motor.index() == index)
            .ok_or_else(|| anyhow!("No motor configured at index {index}"))?;
        motor.set_values(&mut self.io, direction, speed)
    }

    pub fn set_lamp(&mut self, index: usize, brightness: i32) -> Result<()> {
        let lamp = self
            .lamps
            .iter_mut()
            .find(|lamp| lamp.index() == index)
            .ok_or_else(|| anyhow!("No lamp configured at index {index}"))?;
        lamp.set_values(&mut self.io, brightness)
    }

    pub fn read_input(&mut self, index: usize) -> Result<InputReading> {
        let input = self
            .inputs
            .get(index)
            .ok_or_else(|| anyhow!("No input at index {index}"))?;
        let digital = input.read_digital_value(&mut self.io)?;
        let analog = input.read_analog_value(&mut self.io)?;
        Ok(InputReading { digital, analog })
    }

    /// Re-applies the last value of every motor and lamp. Returns how many
    /// devices were driven again.
    pub fn refresh(&mut self) -> Result<usize> {
        let mut count = 0;
        for motor in self.motors.iter_mut() {
            count += motor.reapply_last_value(&mut self.io)? as usize;
        }
        for lamp in self.lamps.iter_mut() {
            count += lamp.reapply_last_value(&mut self.io)? as usize;
        }
        log::debug!("Refreshed {count} devices");
        Ok(count)
    }

    pub fn io(&self) -> &P {
        &self.io
    }

    pub fn io_mut(&mut self) -> &mut P {
        &mut self.io
    }
}
