//! ESP-IDF backend on the esp-idf-hal drivers.
//!
//! The typed pins of [`PinTable::FT_ESP32`](crate::pins::PinTable) are claimed
//! once and looked up by GPIO number, so the devices keep addressing pins and
//! channels by number.

use std::collections::HashMap;

use anyhow::{anyhow, bail, Context, Result};
use esp_idf_hal::adc::attenuation::DB_11;
use esp_idf_hal::adc::oneshot::config::AdcChannelConfig;
use esp_idf_hal::adc::oneshot::{AdcChannelDriver, AdcDriver};
use esp_idf_hal::adc::ADC1;
use esp_idf_hal::gpio::{
    ADCPin, AnyIOPin, IOPin, InputPin, Output, Pin as GpioPin, PinDriver, Pins, Pull,
};
use esp_idf_hal::ledc::config::TimerConfig;
use esp_idf_hal::ledc::{
    LedcDriver, LedcTimerDriver, Resolution, CHANNEL0, CHANNEL1, CHANNEL2, CHANNEL3, CHANNEL4,
    CHANNEL5, CHANNEL6, CHANNEL7, LEDC,
};
use esp_idf_hal::units::Hertz;

use crate::io::{Channel, IoPort, Pin, PwmConfig};

/// An input port that can be sampled digitally and by ADC1.
pub trait InputPort: Send {
    fn pin(&self) -> Pin;

    fn read_digital(&mut self, pull_up: bool) -> Result<bool>;

    fn read_analog(&mut self, adc: &AdcDriver<'static, ADC1>) -> Result<u16>;
}

fn sample<G: ADCPin<Adc = ADC1>>(adc: &AdcDriver<'static, ADC1>, pin: &mut G) -> Result<u16> {
    let config = AdcChannelConfig {
        attenuation: DB_11,
        ..Default::default()
    };
    let mut channel = AdcChannelDriver::new(adc, pin, &config)?;
    Ok(adc.read(&mut channel)?)
}

/// GPIO34..=39: input only, no internal pull resistors. The board pulls
/// these up externally.
struct InputOnly<G>(G);

impl<G> InputPort for InputOnly<G>
where
    G: ADCPin<Adc = ADC1> + InputPin + Send,
{
    fn pin(&self) -> Pin {
        self.0.pin()
    }

    fn read_digital(&mut self, _pull_up: bool) -> Result<bool> {
        let driver = PinDriver::input(&mut self.0)?;
        Ok(driver.is_high())
    }

    fn read_analog(&mut self, adc: &AdcDriver<'static, ADC1>) -> Result<u16> {
        sample(adc, &mut self.0)
    }
}

struct WithPull<G>(G);

impl<G> InputPort for WithPull<G>
where
    G: ADCPin<Adc = ADC1> + IOPin + Send,
{
    fn pin(&self) -> Pin {
        self.0.pin()
    }

    fn read_digital(&mut self, pull_up: bool) -> Result<bool> {
        let mut driver = PinDriver::input(&mut self.0)?;
        driver.set_pull(if pull_up { Pull::Up } else { Pull::Floating })?;
        Ok(driver.is_high())
    }

    fn read_analog(&mut self, adc: &AdcDriver<'static, ADC1>) -> Result<u16> {
        sample(adc, &mut self.0)
    }
}

enum LedcChannel {
    C0(CHANNEL0),
    C1(CHANNEL1),
    C2(CHANNEL2),
    C3(CHANNEL3),
    C4(CHANNEL4),
    C5(CHANNEL5),
    C6(CHANNEL6),
    C7(CHANNEL7),
}

type Attach = Box<dyn FnMut(Channel, AnyIOPin) -> Result<LedcDriver<'static>> + Send>;

fn resolution(bits: u8) -> Result<Resolution> {
    Ok(match bits {
        8 => Resolution::Bits8,
        9 => Resolution::Bits9,
        10 => Resolution::Bits10,
        11 => Resolution::Bits11,
        12 => Resolution::Bits12,
        13 => Resolution::Bits13,
        14 => Resolution::Bits14,
        _ => bail!("Unsupported PWM resolution: {bits} bits"),
    })
}

pub struct EspIo {
    pwm_config: PwmConfig,
    attach: Attach,
    pwm: HashMap<Channel, LedcDriver<'static>>,
    spare: HashMap<Pin, AnyIOPin>,
    outputs: HashMap<Pin, PinDriver<'static, AnyIOPin, Output>>,
    inputs: HashMap<Pin, Box<dyn InputPort>>,
    pull_ups: HashMap<Pin, bool>,
    adc: AdcDriver<'static, ADC1>,
}

impl EspIo {
    /// Claims the LEDC, ADC1 and the pins wired on the fischertechnik board.
    pub fn ft_esp32(ledc: LEDC, adc1: ADC1, pins: Pins, pwm_config: PwmConfig) -> Result<Self> {
        let outputs = [
            pins.gpio19.downgrade(),
            pins.gpio5.downgrade(),
            pins.gpio4.downgrade(),
            pins.gpio13.downgrade(),
            pins.gpio18.downgrade(),
            pins.gpio17.downgrade(),
            pins.gpio16.downgrade(),
            pins.gpio14.downgrade(),
            pins.gpio27.downgrade(),
        ];
        let inputs: Vec<Box<dyn InputPort>> = vec![
            Box::new(InputOnly(pins.gpio36)),
            Box::new(InputOnly(pins.gpio39)),
            Box::new(InputOnly(pins.gpio34)),
            Box::new(InputOnly(pins.gpio35)),
            Box::new(WithPull(pins.gpio32)),
            Box::new(WithPull(pins.gpio33)),
            Box::new(InputOnly(pins.gpio37)),
            Box::new(InputOnly(pins.gpio38)),
        ];
        Self::new(ledc, adc1, pwm_config, outputs, inputs)
    }

    pub fn new(
        ledc: LEDC,
        adc1: ADC1,
        pwm_config: PwmConfig,
        outputs: impl IntoIterator<Item = AnyIOPin>,
        inputs: Vec<Box<dyn InputPort>>,
    ) -> Result<Self> {
        let timer_config = TimerConfig::default()
            .frequency(Hertz::from(pwm_config.frequency_hz))
            .resolution(resolution(pwm_config.resolution_bits)?);
        // all channels run from this timer for the lifetime of the firmware
        let timer = &*Box::leak(Box::new(LedcTimerDriver::new(ledc.timer0, &timer_config)?));

        let mut channels = [
            Some(LedcChannel::C0(ledc.channel0)),
            Some(LedcChannel::C1(ledc.channel1)),
            Some(LedcChannel::C2(ledc.channel2)),
            Some(LedcChannel::C3(ledc.channel3)),
            Some(LedcChannel::C4(ledc.channel4)),
            Some(LedcChannel::C5(ledc.channel5)),
            Some(LedcChannel::C6(ledc.channel6)),
            Some(LedcChannel::C7(ledc.channel7)),
        ];
        let attach: Attach = Box::new(move |channel, pin| {
            let peripheral = channels
                .get_mut(channel as usize)
                .and_then(Option::take)
                .ok_or_else(|| anyhow!("PWM channel {channel} is not available"))?;
            let driver = match peripheral {
                LedcChannel::C0(c) => LedcDriver::new(c, timer, pin),
                LedcChannel::C1(c) => LedcDriver::new(c, timer, pin),
                LedcChannel::C2(c) => LedcDriver::new(c, timer, pin),
                LedcChannel::C3(c) => LedcDriver::new(c, timer, pin),
                LedcChannel::C4(c) => LedcDriver::new(c, timer, pin),
                LedcChannel::C5(c) => LedcDriver::new(c, timer, pin),
                LedcChannel::C6(c) => LedcDriver::new(c, timer, pin),
                LedcChannel::C7(c) => LedcDriver::new(c, timer, pin),
            };
            Ok(driver?)
        });

        Ok(Self {
            pwm_config,
            attach,
            pwm: HashMap::new(),
            spare: outputs.into_iter().map(|pin| (pin.pin(), pin)).collect(),
            outputs: HashMap::new(),
            inputs: inputs.into_iter().map(|input| (input.pin(), input)).collect(),
            pull_ups: HashMap::new(),
            adc: AdcDriver::new(adc1)?,
        })
    }

    fn take_spare(&mut self, pin: Pin) -> Result<AnyIOPin> {
        self.spare
            .remove(&pin)
            .ok_or_else(|| anyhow!("GPIO{pin} is not available"))
    }

    fn input(&mut self, pin: Pin) -> Result<&mut Box<dyn InputPort>> {
        self.inputs
            .get_mut(&pin)
            .ok_or_else(|| anyhow!("GPIO{pin} is not an input"))
    }
}

impl IoPort for EspIo {
    fn configure_output(&mut self, pin: Pin) -> Result<()> {
        if !self.outputs.contains_key(&pin) {
            let driver = PinDriver::output(self.take_spare(pin)?)
                .with_context(|| format!("Failed to configure GPIO{pin} as output"))?;
            self.outputs.insert(pin, driver);
        }
        Ok(())
    }

    fn configure_input(&mut self, pin: Pin, pull_up: bool) -> Result<()> {
        self.input(pin)?;
        self.pull_ups.insert(pin, pull_up);
        Ok(())
    }

    fn write_digital(&mut self, pin: Pin, high: bool) -> Result<()> {
        let driver = self
            .outputs
            .get_mut(&pin)
            .ok_or_else(|| anyhow!("GPIO{pin} is not configured as output"))?;
        if high {
            driver.set_high()?;
        } else {
            driver.set_low()?;
        }
        Ok(())
    }

    fn read_digital(&mut self, pin: Pin) -> Result<bool> {
        if let Some(driver) = self.outputs.get(&pin) {
            return Ok(driver.is_set_high());
        }
        let pull_up = self.pull_ups.get(&pin).copied().unwrap_or(false);
        self.input(pin)?.read_digital(pull_up)
    }

    fn read_analog(&mut self, pin: Pin) -> Result<u16> {
        let input = self
            .inputs
            .get_mut(&pin)
            .ok_or_else(|| anyhow!("GPIO{pin} is not an input"))?;
        input
            .read_analog(&self.adc)
            .with_context(|| format!("Failed to sample GPIO{pin}"))
    }

    fn bind_pwm(&mut self, pin: Pin, channel: Channel) -> Result<()> {
        if self.pwm.contains_key(&channel) {
            bail!("PWM channel {channel} is already bound");
        }
        let gpio = self.take_spare(pin)?;
        let driver = (self.attach)(channel, gpio)
            .with_context(|| format!("Failed to attach GPIO{pin} to PWM channel {channel}"))?;
        self.pwm.insert(channel, driver);
        Ok(())
    }

    fn configure_pwm(&mut self, channel: Channel, config: PwmConfig) -> Result<()> {
        if !self.pwm.contains_key(&channel) {
            bail!("PWM channel {channel} is not bound");
        }
        if config != self.pwm_config {
            bail!(
                "PWM channel {channel} runs at {} Hz / {} bit, {config:?} requested",
                self.pwm_config.frequency_hz,
                self.pwm_config.resolution_bits
            );
        }
        Ok(())
    }

    fn write_pwm(&mut self, channel: Channel, duty: u8) -> Result<()> {
        let driver = self
            .pwm
            .get_mut(&channel)
            .ok_or_else(|| anyhow!("PWM channel {channel} is not configured"))?;
        driver.set_duty(duty as u32)?;
        Ok(())
    }
}
