//! Trigger/echo timing for one ultrasonic ping.

use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::config::SensorConfig;
use super::data::PinLevel;
use super::hardware::SensorHardware;
use crate::error::{Result, SurfaceError};

#[derive(Debug, Clone, Copy)]
enum EchoEdge {
    Rising,
    Falling,
}

/// Times echo pulses of an HC-SR04 style ranger.
#[derive(Debug, Clone)]
pub struct PulseTimer {
    trigger: u8,
    echo: u8,
    settle: Duration,
    pulse_width: Duration,
    echo_timeout: Duration,
    max_attempts: u32,
    retry_backoff: Duration,
}

impl PulseTimer {
    pub fn from_config(config: &SensorConfig) -> Self {
        Self {
            trigger: config.pins.trigger,
            echo: config.pins.echo,
            settle: config.settle(),
            pulse_width: config.pulse_width(),
            echo_timeout: config.echo_timeout(),
            max_attempts: config.retry_attempts.max(1),
            retry_backoff: config.retry_backoff(),
        }
    }

    /// Run a single trigger-and-listen cycle.
    ///
    /// Returns the time the echo line stayed high.
    pub fn measure_echo<H: SensorHardware + ?Sized>(&self, hw: &mut H) -> Result<Duration> {
        // Low first so the trigger sees a clean rising edge
        hw.write_pin(self.trigger, PinLevel::Low)?;
        hw.delay(self.settle);
        hw.write_pin(self.trigger, PinLevel::High)?;
        hw.delay(self.pulse_width);
        hw.write_pin(self.trigger, PinLevel::Low)?;

        let armed = hw.now();
        let pulse_start = self.wait_for_edge(hw, EchoEdge::Rising, armed)?;
        let pulse_end = self.wait_for_edge(hw, EchoEdge::Falling, pulse_start)?;

        Ok(pulse_end.duration_since(pulse_start))
    }

    /// Busy-poll the echo line until the edge shows up or the budget runs out.
    fn wait_for_edge<H: SensorHardware + ?Sized>(
        &self,
        hw: &mut H,
        edge: EchoEdge,
        since: Instant,
    ) -> Result<Instant> {
        let target = match edge {
            EchoEdge::Rising => PinLevel::High,
            EchoEdge::Falling => PinLevel::Low,
        };
        loop {
            if hw.read_pin(self.echo)? == target {
                return Ok(hw.now());
            }
            let waited = hw.now().duration_since(since);
            if waited > self.echo_timeout {
                let waited_us = waited.as_micros();
                return Err(match edge {
                    EchoEdge::Rising => SurfaceError::EchoStartTimeout { waited_us },
                    EchoEdge::Falling => SurfaceError::EchoEndTimeout { waited_us },
                });
            }
        }
    }

    /// Ping with retries.
    ///
    /// `None` means every attempt failed; a real reading is always `Some`, even
    /// when it is zero.
    pub fn ping<H: SensorHardware + ?Sized>(&self, hw: &mut H) -> Option<Duration> {
        for attempt in 1..=self.max_attempts {
            match self.measure_echo(hw) {
                Ok(echo) => return Some(echo),
                Err(e) if attempt < self.max_attempts => {
                    debug!("Ping attempt {}/{} failed: {}", attempt, self.max_attempts, e);
                    hw.delay(self.retry_backoff);
                }
                Err(e) => {
                    warn!("Ping failed after {} attempts: {}", self.max_attempts, e);
                }
            }
        }
        None
    }
}
