use anyhow::{Context, Result};

use crate::duty::{duty_cycle, Polarity};
use crate::enable::EnableLine;
use crate::io::{setup_pwm, Channel, IoPort, Pin};
use crate::pins::PinTable;

/// Lamp on one half of an A4990 bridge; every driver port carries two.
///
/// Lamp `n` uses PWM channel `n`. The odd channels sit on the bridge's
/// direction input, whose PWM is inverted by the driver.
#[derive(Debug)]
pub struct Lamp {
    index: usize,
    pin: Pin,
    brightness: i32,
    enable: EnableLine,
}

impl Lamp {
    pub fn new<P: IoPort + ?Sized>(
        io: &mut P,
        table: &PinTable,
        index: usize,
        enable: EnableLine,
    ) -> Result<Self> {
        let pin = table.lamp(index)?;

        if enable.disable(io)? {
            log::warn!(
                "Lamp {index} initialized on an active enable line (GPIO{}), siblings are off until refreshed",
                enable.pin()
            );
        }

        let lamp = Self {
            index,
            pin,
            brightness: 0,
            enable,
        };
        setup_pwm(io, pin, lamp.channel(), 0)
            .with_context(|| format!("Failed to set up PWM of lamp {index}"))?;

        log::debug!("Lamp {index}: GPIO{pin}");
        Ok(lamp)
    }

    pub fn set_values<P: IoPort + ?Sized>(&mut self, io: &mut P, brightness: i32) -> Result<()> {
        self.brightness = brightness;
        log::info!("Lamp {} shining at brightness {brightness}", self.index);

        let duty = self.duty();
        io.write_pwm(self.channel(), duty)?;
        self.enable.enable(io)?;

        log::debug!("PWM: GPIO{} Val: {duty}", self.pin);
        Ok(())
    }

    /// Writes the last brightness again. A dark lamp is left alone.
    pub fn reapply_last_value<P: IoPort + ?Sized>(&mut self, io: &mut P) -> Result<bool> {
        if self.brightness > 0 {
            self.set_values(io, self.brightness)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    pub fn duty(&self) -> u8 {
        duty_cycle(self.brightness, Polarity::for_channel(self.channel()))
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn brightness(&self) -> i32 {
        self.brightness
    }

    pub fn channel(&self) -> Channel {
        self.index as Channel
    }

    pub fn enable_line(&self) -> &EnableLine {
        &self.enable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimulatedIo;

    fn lamps(io: &mut SimulatedIo, port: usize) -> (Lamp, Lamp) {
        let table = PinTable::FT_ESP32;
        let enable = EnableLine::new(table.lamp_enable);
        let even = Lamp::new(io, &table, port * 2, enable.clone()).unwrap();
        let odd = Lamp::new(io, &table, port * 2 + 1, enable).unwrap();
        (even, odd)
    }

    #[test]
    fn init_binds_channel_to_lamp_pin() {
        let mut io = SimulatedIo::new();
        let (even, odd) = lamps(&mut io, 1);
        assert_eq!(even.channel(), 2);
        assert_eq!(odd.channel(), 3);
        assert_eq!(io.pwm_pin(2), Some(5));
        assert_eq!(io.pwm_pin(3), Some(17));
        assert_eq!(io.duty(2), Some(0));
        assert_eq!(io.duty(3), Some(0));
        assert_eq!(io.level(27), Some(false));
    }

    #[test]
    fn odd_channels_are_inverted() {
        let mut io = SimulatedIo::new();
        let (mut even, mut odd) = lamps(&mut io, 0);

        for brightness in 0..=8 {
            even.set_values(&mut io, brightness).unwrap();
            odd.set_values(&mut io, brightness).unwrap();
            let (a, b) = (io.duty(0).unwrap(), io.duty(1).unwrap());
            assert_eq!(a as u16 + b as u16, 255, "brightness {brightness}");
        }

        odd.set_values(&mut io, 4).unwrap();
        assert_eq!(io.duty(1), Some(127));
        even.set_values(&mut io, 7).unwrap();
        assert_eq!(io.duty(0), Some(224));
        assert_eq!(io.level(27), Some(true));
    }

    #[test]
    fn reapply_after_sibling_init() {
        let mut io = SimulatedIo::new();
        let table = PinTable::FT_ESP32;
        let enable = EnableLine::new(table.lamp_enable);
        let mut lamp = Lamp::new(&mut io, &table, 5, enable.clone()).unwrap();
        lamp.set_values(&mut io, 3).unwrap();
        let duty = io.duty(5);

        let _late = Lamp::new(&mut io, &table, 6, enable).unwrap();
        assert_eq!(io.level(27), Some(false));

        assert!(lamp.reapply_last_value(&mut io).unwrap());
        assert_eq!(io.duty(5), duty);
        assert_eq!(io.duty(5), Some(255 - 96));
        assert_eq!(io.level(27), Some(true));
    }

    #[test]
    fn dark_lamp_is_not_reapplied() {
        let mut io = SimulatedIo::new();
        let (mut even, _) = lamps(&mut io, 3);
        even.set_values(&mut io, -2).unwrap();
        assert_eq!(io.duty(6), Some(0));
        assert!(!even.reapply_last_value(&mut io).unwrap());
    }
}
