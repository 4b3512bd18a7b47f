use anyhow::{Context, Result};

use crate::duty::{duty_cycle, MAX_DUTY};
use crate::enable::EnableLine;
use crate::io::{setup_pwm, Channel, IoPort, Pin};
use crate::pins::PinTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Forward,
    Reverse,
}

impl Direction {
    pub fn is_forward(self) -> bool {
        self == Self::Forward
    }

    /// Full-scale value driven on the direction channel.
    fn duty(self) -> u8 {
        match self {
            Self::Forward => MAX_DUTY,
            Self::Reverse => 0,
        }
    }
}

impl From<bool> for Direction {
    fn from(forward: bool) -> Self {
        if forward {
            Self::Forward
        } else {
            Self::Reverse
        }
    }
}

/// DC motor on one A4990 bridge.
///
/// Speed and direction are two independent PWM channels: `2n` carries the
/// speed, `2n + 1` the direction. The driver inverts the speed PWM while the
/// direction input is low, so reverse speeds are written as complements.
#[derive(Debug)]
pub struct Motor {
    index: usize,
    pwm_pin: Pin,
    dir_pin: Pin,
    direction: Direction,
    speed: i32,
    enable: EnableLine,
}

impl Motor {
    pub fn new<P: IoPort + ?Sized>(
        io: &mut P,
        table: &PinTable,
        index: usize,
        enable: EnableLine,
    ) -> Result<Self> {
        let (pwm_pin, dir_pin) = table.motor(index)?;

        // keep the driver off while its pins are still undefined
        if enable.disable(io)? {
            log::warn!(
                "Motor {index} initialized on an active enable line (GPIO{}), siblings are off until refreshed",
                enable.pin()
            );
        }

        let motor = Self {
            index,
            pwm_pin,
            dir_pin,
            direction: Direction::Forward,
            speed: 0,
            enable,
        };

        setup_pwm(io, pwm_pin, motor.speed_channel(), 0)
            .with_context(|| format!("Failed to set up speed PWM of motor {index}"))?;
        setup_pwm(io, dir_pin, motor.direction_channel(), Direction::Forward.duty())
            .with_context(|| format!("Failed to set up direction PWM of motor {index}"))?;

        log::debug!("Motor {index}: speed GPIO{pwm_pin}, direction GPIO{dir_pin}");
        Ok(motor)
    }

    pub fn set_values<P: IoPort + ?Sized>(
        &mut self,
        io: &mut P,
        direction: Direction,
        speed: i32,
    ) -> Result<()> {
        self.direction = direction;
        self.speed = speed;
        log::info!("Motor {} turning {direction:?} at speed {speed}", self.index);

        let duty = self.duty();
        io.write_pwm(self.direction_channel(), direction.duty())?;
        io.write_pwm(self.speed_channel(), duty)?;
        self.enable.enable(io)?;

        log::debug!(
            "Dir: GPIO{} PWM: GPIO{} Val: {duty}",
            self.dir_pin,
            self.pwm_pin
        );
        Ok(())
    }

    /// Writes the last speed and direction again, e.g. after a sibling on the
    /// same driver pulled the enable line low. A stopped motor is left alone.
    pub fn reapply_last_value<P: IoPort + ?Sized>(&mut self, io: &mut P) -> Result<bool> {
        if self.speed > 0 {
            self.set_values(io, self.direction, self.speed)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Duty cycle of the speed channel for the current settings.
    pub fn duty(&self) -> u8 {
        duty_cycle(self.speed, !self.direction.is_forward())
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn speed(&self) -> i32 {
        self.speed
    }

    pub fn speed_channel(&self) -> Channel {
        (self.index * 2) as Channel
    }

    pub fn direction_channel(&self) -> Channel {
        (self.index * 2 + 1) as Channel
    }

    pub fn enable_line(&self) -> &EnableLine {
        &self.enable
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::io::PwmConfig;
    use crate::sim::{IoEvent, SimulatedIo};

    fn motor(io: &mut SimulatedIo, index: usize) -> Motor {
        let table = PinTable::FT_ESP32;
        Motor::new(io, &table, index, EnableLine::new(table.motor_enable)).unwrap()
    }

    #[test]
    fn init_defines_outputs_with_driver_off() {
        let mut io = SimulatedIo::new();
        let motor = motor(&mut io, 1);

        assert_eq!(motor.speed_channel(), 2);
        assert_eq!(motor.direction_channel(), 3);
        assert_eq!(io.pwm_pin(2), Some(5));
        assert_eq!(io.pwm_pin(3), Some(17));
        assert_eq!(io.duty(2), Some(0));
        assert_eq!(io.duty(3), Some(255));
        assert_eq!(io.pwm_config(2), Some(PwmConfig::default()));
        assert_eq!(io.level(27), Some(false));
        assert_eq!(
            &io.events()[..2],
            &[IoEvent::ConfigureOutput(27), IoEvent::WriteDigital { pin: 27, high: false }]
        );
    }

    #[test]
    fn forward_and_reverse() {
        let mut io = SimulatedIo::new();
        let mut motor = motor(&mut io, 0);

        motor.set_values(&mut io, Direction::Forward, 4).unwrap();
        assert_eq!(io.duty(0), Some(128));
        assert_eq!(io.duty(1), Some(255));
        assert_eq!(io.level(27), Some(true));

        motor.set_values(&mut io, Direction::Reverse, 4).unwrap();
        assert_eq!(io.duty(0), Some(127));
        assert_eq!(io.duty(1), Some(0));

        assert_eq!(motor.direction(), Direction::Reverse);
        assert_eq!(motor.speed(), 4);

        motor.set_values(&mut io, Direction::Reverse, 0).unwrap();
        assert_eq!(io.duty(0), Some(255));
        motor.set_values(&mut io, false.into(), 9).unwrap();
        assert_eq!(io.duty(0), Some(0));
    }

    #[test]
    fn reapply_restores_identical_duty() {
        let mut io = SimulatedIo::new();
        let mut first = motor(&mut io, 0);
        first.set_values(&mut io, Direction::Reverse, 7).unwrap();
        assert_eq!(io.duty(0), Some(31));

        // a second motor on the same chip pulls the shared enable low
        let _second = Motor::new(&mut io, &PinTable::FT_ESP32, 1, first.enable_line().clone()).unwrap();
        assert_eq!(io.level(27), Some(false));
        assert!(!first.enable_line().is_enabled());

        io.take_events();
        assert!(first.reapply_last_value(&mut io).unwrap());
        assert_eq!(io.duty(0), Some(31));
        assert_eq!(io.duty(1), Some(0));
        assert_eq!(io.level(27), Some(true));
        assert!(first.enable_line().is_enabled());
        assert_eq!(
            io.take_events(),
            vec![
                IoEvent::WritePwm { channel: 1, duty: 0 },
                IoEvent::WritePwm { channel: 0, duty: 31 },
                IoEvent::WriteDigital { pin: 27, high: true },
            ]
        );
    }

    #[test]
    fn stopped_motor_is_not_reapplied() {
        let mut io = SimulatedIo::new();
        let mut motor = motor(&mut io, 2);
        io.take_events();
        assert!(!motor.reapply_last_value(&mut io).unwrap());
        assert!(io.events().is_empty());
    }

    #[test]
    fn index_out_of_range() {
        let mut io = SimulatedIo::new();
        let table = PinTable::FT_ESP32;
        assert!(Motor::new(&mut io, &table, 4, EnableLine::new(table.motor_enable)).is_err());
    }
}
