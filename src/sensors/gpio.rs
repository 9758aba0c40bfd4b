//! Raspberry Pi board access for the exhibit sensors.
//!
//! With the `gpio` feature this drives the ultrasonic ranger, buzzer and button
//! through rppal and reads the MLX90614 thermometer and TCS34725 color sensor
//! over I2C. Without it, opening the board always fails and the engine runs in
//! simulation mode.

use crate::error::Result;
use crate::sensors::config::SensorConfig;
use crate::sensors::hardware::SensorHardware;

#[cfg(feature = "gpio")]
mod raspberry_pi {
    use super::*;
    use crate::error::SurfaceError;
    use crate::sensors::data::{ColorReading, ComponentStatus, EnvironmentReading, PinLevel};
    use rppal::gpio::{Gpio, InputPin, Level, OutputPin};
    use rppal::i2c::I2c;
    use std::collections::HashMap;
    use tracing::{info, warn};

    const MLX90614_ADDR: u16 = 0x5A;
    const MLX90614_TA: u8 = 0x06;
    const MLX90614_TOBJ1: u8 = 0x07;

    const TCS34725_ADDR: u16 = 0x29;
    const TCS34725_COMMAND: u8 = 0x80;
    const TCS34725_AUTO_INCREMENT: u8 = 0x20;
    const TCS34725_ENABLE: u8 = 0x00;
    const TCS34725_ENABLE_PON: u8 = 0x01;
    const TCS34725_ENABLE_AEN: u8 = 0x02;
    const TCS34725_ID: u8 = 0x12;
    const TCS34725_CDATAL: u8 = 0x14;

    /// Exhibit board backed by rppal.
    pub struct RaspberryPiHardware {
        outputs: HashMap<u8, OutputPin>,
        inputs: HashMap<u8, InputPin>,
        i2c: Option<I2c>,
        thermometer_ok: bool,
        color_ok: bool,
    }

    impl RaspberryPiHardware {
        /// Claim the configured pins and detect the I2C sensors.
        pub fn new(config: &SensorConfig) -> Result<Self> {
            let gpio = Gpio::new().map_err(|e| {
                SurfaceError::gpio_error(format!("Failed to initialize GPIO: {}", e))
            })?;

            let claim = |pin: u8| {
                gpio.get(pin).map_err(|e| {
                    SurfaceError::gpio_error(format!("Failed to claim pin {}: {}", pin, e))
                })
            };

            let pins = config.pins;
            let mut outputs = HashMap::new();
            outputs.insert(pins.trigger, claim(pins.trigger)?.into_output_low());
            outputs.insert(pins.buzzer, claim(pins.buzzer)?.into_output_low());

            let mut inputs = HashMap::new();
            inputs.insert(pins.echo, claim(pins.echo)?.into_input());
            inputs.insert(pins.button, claim(pins.button)?.into_input_pulldown());

            let mut hardware = Self {
                outputs,
                inputs,
                i2c: None,
                thermometer_ok: false,
                color_ok: false,
            };
            hardware.detect_i2c();

            Ok(hardware)
        }

        fn detect_i2c(&mut self) {
            let mut i2c = match I2c::new() {
                Ok(i2c) => i2c,
                Err(e) => {
                    warn!("I2C bus unavailable, temperature and color will simulate: {}", e);
                    return;
                }
            };

            self.thermometer_ok = i2c
                .set_slave_address(MLX90614_ADDR)
                .and_then(|_| i2c.smbus_read_word(MLX90614_TA))
                .is_ok();
            if !self.thermometer_ok {
                warn!("MLX90614 not found at {:#04x}", MLX90614_ADDR);
            }

            self.color_ok = Self::init_color_sensor(&mut i2c).is_ok();
            if !self.color_ok {
                warn!("TCS34725 not found at {:#04x}", TCS34725_ADDR);
            }

            info!(
                "I2C sensors: thermometer={}, color={}",
                self.thermometer_ok, self.color_ok
            );
            self.i2c = Some(i2c);
        }

        fn init_color_sensor(i2c: &mut I2c) -> rppal::i2c::Result<()> {
            i2c.set_slave_address(TCS34725_ADDR)?;
            let id = i2c.smbus_read_byte(TCS34725_COMMAND | TCS34725_ID)?;
            if id != 0x44 && id != 0x4D {
                return Err(rppal::i2c::Error::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("unexpected TCS34725 id {:#04x}", id),
                )));
            }
            i2c.smbus_write_byte(TCS34725_COMMAND | TCS34725_ENABLE, TCS34725_ENABLE_PON)?;
            std::thread::sleep(std::time::Duration::from_millis(3));
            i2c.smbus_write_byte(
                TCS34725_COMMAND | TCS34725_ENABLE,
                TCS34725_ENABLE_PON | TCS34725_ENABLE_AEN,
            )
        }

        fn bus(&mut self, address: u16) -> Result<&mut I2c> {
            let i2c = self
                .i2c
                .as_mut()
                .ok_or_else(|| SurfaceError::sensor_error("I2C bus not available"))?;
            i2c.set_slave_address(address).map_err(|e| {
                SurfaceError::sensor_error(format!("Failed to address {:#04x}: {}", address, e))
            })?;
            Ok(i2c)
        }

        fn read_mlx_celsius(i2c: &I2c, register: u8) -> Result<f64> {
            let raw = i2c.smbus_read_word(register).map_err(|e| {
                SurfaceError::sensor_error(format!("MLX90614 read failed: {}", e))
            })?;
            Ok(raw as f64 * 0.02 - 273.15)
        }
    }

    impl SensorHardware for RaspberryPiHardware {
        fn write_pin(&mut self, pin: u8, level: PinLevel) -> Result<()> {
            let output = self.outputs.get_mut(&pin).ok_or_else(|| {
                SurfaceError::gpio_error(format!("Pin {} is not claimed as output", pin))
            })?;
            match level {
                PinLevel::High => output.set_high(),
                PinLevel::Low => output.set_low(),
            }
            Ok(())
        }

        fn read_pin(&mut self, pin: u8) -> Result<PinLevel> {
            let input = self.inputs.get(&pin).ok_or_else(|| {
                SurfaceError::gpio_error(format!("Pin {} is not claimed as input", pin))
            })?;
            Ok(match input.read() {
                Level::High => PinLevel::High,
                Level::Low => PinLevel::Low,
            })
        }

        fn read_temperature(&mut self) -> Result<EnvironmentReading> {
            if !self.thermometer_ok {
                return Err(SurfaceError::sensor_error("MLX90614 not detected"));
            }
            let i2c = self.bus(MLX90614_ADDR)?;
            let ambient = Self::read_mlx_celsius(i2c, MLX90614_TA)?;
            let object = Self::read_mlx_celsius(i2c, MLX90614_TOBJ1)?;
            Ok(EnvironmentReading::new(ambient, object))
        }

        fn read_color(&mut self) -> Result<ColorReading> {
            if !self.color_ok {
                return Err(SurfaceError::sensor_error("TCS34725 not detected"));
            }
            let i2c = self.bus(TCS34725_ADDR)?;
            let mut raw = [0u8; 8];
            i2c.block_read(
                TCS34725_COMMAND | TCS34725_AUTO_INCREMENT | TCS34725_CDATAL,
                &mut raw,
            )
            .map_err(|e| SurfaceError::sensor_error(format!("TCS34725 read failed: {}", e)))?;

            let channel = |i: usize| u16::from_le_bytes([raw[i], raw[i + 1]]) as u32;
            let (clear, r, g, b) = (channel(0), channel(2), channel(4), channel(6));
            if clear == 0 {
                return Ok(ColorReading { r: 0, g: 0, b: 0 });
            }
            let scale = |c: u32| ((c * 255) / clear).min(255) as u8;

            Ok(ColorReading {
                r: scale(r),
                g: scale(g),
                b: scale(b),
            })
        }

        fn components(&self) -> ComponentStatus {
            ComponentStatus {
                ultrasonic: true,
                color: self.color_ok,
                temperature: self.thermometer_ok,
                button: true,
                display: true,
                buzzer: true,
            }
        }
    }
}

#[cfg(feature = "gpio")]
pub use raspberry_pi::RaspberryPiHardware;

/// Open the physical board.
#[cfg(feature = "gpio")]
pub fn open_hardware(config: &SensorConfig) -> Result<Box<dyn SensorHardware>> {
    Ok(Box::new(RaspberryPiHardware::new(config)?))
}

/// Open the physical board.
#[cfg(not(feature = "gpio"))]
pub fn open_hardware(config: &SensorConfig) -> Result<Box<dyn SensorHardware>> {
    Err(crate::error::SurfaceError::gpio_error(format!(
        "GPIO support not compiled in (trigger pin {}, echo pin {})",
        config.pins.trigger, config.pins.echo
    )))
}
