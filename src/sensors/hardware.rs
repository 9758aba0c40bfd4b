//! Hardware capability interface and the simulated implementation.
//!
//! Everything the sampler needs from the board goes through [`SensorHardware`]:
//! pin I/O, the I2C sensors, and the clock and delays used while timing an
//! echo. Keeping time behind the trait lets tests drive a ping cycle without
//! real sleeps.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::thread;
use std::time::{Duration, Instant};

use super::data::{round2, ColorReading, ComponentStatus, EnvironmentReading, PinLevel};
use crate::error::Result;

/// Lower bound of simulated distances in centimeters.
pub const SIM_DISTANCE_MIN_CM: f64 = 5.0;
/// Upper bound of simulated distances in centimeters.
pub const SIM_DISTANCE_MAX_CM: f64 = 50.0;

/// Capabilities of the exhibit board.
pub trait SensorHardware: Send {
    /// Drive an output line.
    fn write_pin(&mut self, pin: u8, level: PinLevel) -> Result<()>;

    /// Sample an input line.
    fn read_pin(&mut self, pin: u8) -> Result<PinLevel>;

    /// Read ambient and object temperature.
    fn read_temperature(&mut self) -> Result<EnvironmentReading>;

    /// Read the surface color.
    fn read_color(&mut self) -> Result<ColorReading>;

    /// Whether this is a stand-in without physical sensors.
    fn is_simulated(&self) -> bool {
        false
    }

    /// Which components responded at initialization.
    fn components(&self) -> ComponentStatus {
        ComponentStatus {
            ultrasonic: true,
            color: true,
            temperature: true,
            button: true,
            display: true,
            buzzer: true,
        }
    }

    /// Monotonic clock used for echo timing.
    fn now(&self) -> Instant {
        Instant::now()
    }

    /// Blocking delay.
    fn delay(&mut self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Source of plausible pseudo-random sensor values.
#[derive(Debug)]
pub struct Simulator {
    rng: StdRng,
}

impl Simulator {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic simulator for reproducible runs.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Uniform distance between 5 and 50 cm, two decimals.
    pub fn distance_cm(&mut self) -> f64 {
        round2(
            self.rng
                .gen_range(SIM_DISTANCE_MIN_CM..=SIM_DISTANCE_MAX_CM),
        )
    }

    /// Room-temperature ambient (20-30 °C) and a slightly warmer object (20-35 °C).
    pub fn environment(&mut self) -> EnvironmentReading {
        EnvironmentReading::new(
            self.rng.gen_range(20.0..=30.0),
            self.rng.gen_range(20.0..=35.0),
        )
    }

    pub fn color(&mut self) -> ColorReading {
        ColorReading {
            r: self.rng.gen(),
            g: self.rng.gen(),
            b: self.rng.gen(),
        }
    }
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new()
    }
}

/// Board stand-in used when no GPIO is available.
///
/// Output levels are remembered so reads of a written pin echo them back;
/// never-written pins read low.
#[derive(Debug, Default)]
pub struct SimulatedHardware {
    simulator: Simulator,
    levels: HashMap<u8, PinLevel>,
}

impl SimulatedHardware {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            simulator: Simulator::seeded(seed),
            levels: HashMap::new(),
        }
    }
}

impl SensorHardware for SimulatedHardware {
    fn write_pin(&mut self, pin: u8, level: PinLevel) -> Result<()> {
        tracing::trace!("[SIM] GPIO {} -> {:?}", pin, level);
        self.levels.insert(pin, level);
        Ok(())
    }

    fn read_pin(&mut self, pin: u8) -> Result<PinLevel> {
        Ok(self.levels.get(&pin).copied().unwrap_or(PinLevel::Low))
    }

    fn read_temperature(&mut self) -> Result<EnvironmentReading> {
        Ok(self.simulator.environment())
    }

    fn read_color(&mut self) -> Result<ColorReading> {
        Ok(self.simulator.color())
    }

    fn is_simulated(&self) -> bool {
        true
    }
}
