//! Sensor wiring and timing configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::classify::ClassificationThresholds;
use crate::error::{Result, SurfaceError};

/// Largest number of pings a single request may ask for.
pub const MAX_SAMPLES: usize = 50;

/// Largest number of buzzer beeps per request.
pub const MAX_BEEPS: u32 = 10;

/// BCM pin numbers of the exhibit wiring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinConfig {
    pub trigger: u8,
    pub echo: u8,
    pub buzzer: u8,
    pub button: u8,
}

impl Default for PinConfig {
    fn default() -> Self {
        Self {
            trigger: 23,
            echo: 24,
            buzzer: 18,
            button: 17,
        }
    }
}

/// Configuration for the sensor subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorConfig {
    pub pins: PinConfig,
    /// Force simulation mode even if GPIO is available
    pub simulate: bool,
    /// Trigger low hold before each ping, microseconds
    pub settle_us: u64,
    /// Trigger high pulse width, microseconds
    pub pulse_width_us: u64,
    /// Wait budget for each echo edge, milliseconds
    pub echo_timeout_ms: u64,
    /// Ping attempts before a sample is reported missing
    pub retry_attempts: u32,
    /// Pause between failed ping attempts, milliseconds
    pub retry_backoff_ms: u64,
    /// Pause between consecutive samples of a batch, milliseconds
    pub sample_interval_ms: u64,
    /// Samples for a plain distance measurement
    pub distance_samples: usize,
    /// Samples for shape and material classification
    pub classification_samples: usize,
    /// Buzzer on time per beep, milliseconds
    pub beep_on_ms: u64,
    /// Buzzer off time between beeps, milliseconds
    pub beep_gap_ms: u64,
    pub thresholds: ClassificationThresholds,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            pins: PinConfig::default(),
            simulate: false,
            settle_us: 200,
            pulse_width_us: 10,
            echo_timeout_ms: 20,
            retry_attempts: 3,
            retry_backoff_ms: 100,
            sample_interval_ms: 20,
            distance_samples: 5,
            classification_samples: 15,
            beep_on_ms: 200,
            beep_gap_ms: 100,
            thresholds: ClassificationThresholds::default(),
        }
    }
}

impl SensorConfig {
    /// Configuration that never touches GPIO.
    pub fn simulated() -> Self {
        Self {
            simulate: true,
            ..Default::default()
        }
    }

    /// Set the ultrasonic trigger and echo pins.
    pub fn with_ultrasonic_pins(mut self, trigger: u8, echo: u8) -> Self {
        self.pins.trigger = trigger;
        self.pins.echo = echo;
        self
    }

    /// Set the buzzer pin.
    pub fn with_buzzer_pin(mut self, pin: u8) -> Self {
        self.pins.buzzer = pin;
        self
    }

    /// Set the push button pin.
    pub fn with_button_pin(mut self, pin: u8) -> Self {
        self.pins.button = pin;
        self
    }

    /// Enable or disable simulation mode.
    pub fn with_simulation(mut self, simulate: bool) -> Self {
        self.simulate = simulate;
        self
    }

    /// Set the default sample counts for distance and classification requests.
    pub fn with_sample_counts(mut self, distance: usize, classification: usize) -> Self {
        self.distance_samples = distance;
        self.classification_samples = classification;
        self
    }

    /// Set the retry policy for failed pings.
    pub fn with_retries(mut self, attempts: u32, backoff_ms: u64) -> Self {
        self.retry_attempts = attempts;
        self.retry_backoff_ms = backoff_ms;
        self
    }

    pub fn with_thresholds(mut self, thresholds: ClassificationThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn settle(&self) -> Duration {
        Duration::from_micros(self.settle_us)
    }

    pub fn pulse_width(&self) -> Duration {
        Duration::from_micros(self.pulse_width_us)
    }

    pub fn echo_timeout(&self) -> Duration {
        Duration::from_millis(self.echo_timeout_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }

    pub fn beep_on(&self) -> Duration {
        Duration::from_millis(self.beep_on_ms)
    }

    pub fn beep_gap(&self) -> Duration {
        Duration::from_millis(self.beep_gap_ms)
    }

    /// Reject wiring and timing values the sampler cannot work with.
    pub fn validate(&self) -> Result<()> {
        let p = &self.pins;
        let pins = [p.trigger, p.echo, p.buzzer, p.button];
        for (i, pin) in pins.iter().enumerate() {
            if *pin > 27 {
                return Err(SurfaceError::config_error(format!(
                    "GPIO {} is not a header pin (0-27)",
                    pin
                )));
            }
            if pins[i + 1..].contains(pin) {
                return Err(SurfaceError::config_error(format!(
                    "GPIO {} is assigned twice",
                    pin
                )));
            }
        }

        if self.retry_attempts == 0 {
            return Err(SurfaceError::config_error(
                "retry_attempts must be at least 1",
            ));
        }
        if self.echo_timeout_ms == 0 {
            return Err(SurfaceError::config_error(
                "echo_timeout_ms must be greater than zero",
            ));
        }
        for count in [self.distance_samples, self.classification_samples] {
            if count == 0 || count > MAX_SAMPLES {
                return Err(SurfaceError::config_error(format!(
                    "sample count {} outside 1..={}",
                    count, MAX_SAMPLES
                )));
            }
        }
        if !self.thresholds.is_ordered() {
            return Err(SurfaceError::config_error(
                "classification thresholds must be non-negative and ascending",
            ));
        }

        Ok(())
    }
}

/// Clamp a requested sample count into the supported range.
pub fn clamp_samples(requested: usize) -> usize {
    requested.clamp(1, MAX_SAMPLES)
}

/// Clamp a requested beep count into the supported range.
pub fn clamp_beeps(requested: u32) -> u32 {
    requested.clamp(1, MAX_BEEPS)
}
