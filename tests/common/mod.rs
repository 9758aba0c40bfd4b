//! Board doubles shared by the integration tests.

#![allow(dead_code)]

use smart_surface::sensors::conversion::speed_of_sound;
use smart_surface::sensors::data::{ColorReading, EnvironmentReading, PinLevel};
use smart_surface::{Result, SensorHardware, SurfaceError};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

pub const TRIGGER: u8 = 23;
pub const ECHO: u8 = 24;

/// What the board was asked to do.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    Temperature,
    Write(u8, PinLevel),
    Read(u8),
    Color,
}

#[derive(Debug, Clone, Copy)]
pub struct BoardEvent {
    pub thread: ThreadId,
    pub action: Action,
}

pub type EventLog = Arc<Mutex<Vec<BoardEvent>>>;

#[derive(Debug, Clone, Copy)]
enum EchoState {
    Idle,
    Armed(Option<Duration>),
    High(Duration),
}

/// Ranger whose echo widths come from a script, on a virtual clock.
///
/// Each trigger pulse consumes one script entry; `None` (or an exhausted
/// script without fallback) keeps the echo line low until the timeout.
pub struct ScriptedBoard {
    base: Instant,
    elapsed: Duration,
    script: VecDeque<Option<Duration>>,
    fallback: Option<Duration>,
    state: EchoState,
    trigger_high: bool,
    environment: EnvironmentReading,
    temperature_fails: bool,
    buzzer_fails: bool,
    log: Option<EventLog>,
}

impl ScriptedBoard {
    pub fn new(script: impl IntoIterator<Item = Option<Duration>>) -> Self {
        Self {
            base: Instant::now(),
            elapsed: Duration::ZERO,
            script: script.into_iter().collect(),
            fallback: None,
            state: EchoState::Idle,
            trigger_high: false,
            environment: EnvironmentReading::new(20.0, 20.0),
            temperature_fails: false,
            buzzer_fails: false,
            log: None,
        }
    }

    /// Board whose echo line never rises.
    pub fn silent() -> Self {
        Self::new(VecDeque::<Option<Duration>>::new())
    }

    /// Script of distances in centimeters at the board's ambient temperature.
    pub fn from_distances(distances: &[Option<f64>], ambient_c: f64) -> Self {
        let script = distances
            .iter()
            .map(|d| d.map(|cm| echo_for_cm(cm, ambient_c)));
        Self::new(script).with_environment(ambient_c, ambient_c)
    }

    pub fn with_environment(mut self, ambient_c: f64, object_c: f64) -> Self {
        self.environment = EnvironmentReading::new(ambient_c, object_c);
        self
    }

    pub fn with_fallback(mut self, echo: Duration) -> Self {
        self.fallback = Some(echo);
        self
    }

    pub fn with_failing_thermometer(mut self) -> Self {
        self.temperature_fails = true;
        self
    }

    pub fn with_failing_buzzer(mut self) -> Self {
        self.buzzer_fails = true;
        self
    }

    pub fn with_log(mut self, log: EventLog) -> Self {
        self.log = Some(log);
        self
    }

    fn note(&self, action: Action) {
        if let Some(log) = &self.log {
            log.lock().unwrap().push(BoardEvent {
                thread: thread::current().id(),
                action,
            });
        }
    }
}

impl SensorHardware for ScriptedBoard {
    fn write_pin(&mut self, pin: u8, level: PinLevel) -> Result<()> {
        self.note(Action::Write(pin, level));
        if pin == TRIGGER {
            match level {
                PinLevel::High => self.trigger_high = true,
                PinLevel::Low if self.trigger_high => {
                    self.trigger_high = false;
                    let next = self.script.pop_front().unwrap_or(self.fallback);
                    self.state = EchoState::Armed(next);
                }
                PinLevel::Low => {}
            }
        } else if self.buzzer_fails && level == PinLevel::High {
            return Err(SurfaceError::gpio_error("buzzer line stuck"));
        }
        Ok(())
    }

    fn read_pin(&mut self, pin: u8) -> Result<PinLevel> {
        self.note(Action::Read(pin));
        if pin != ECHO {
            return Ok(PinLevel::Low);
        }
        let level = match self.state {
            EchoState::Armed(Some(width)) => {
                self.state = EchoState::High(width);
                PinLevel::High
            }
            EchoState::Armed(None) => {
                self.elapsed += Duration::from_millis(1);
                PinLevel::Low
            }
            EchoState::High(width) => {
                self.elapsed += width;
                self.state = EchoState::Idle;
                PinLevel::Low
            }
            EchoState::Idle => PinLevel::Low,
        };
        Ok(level)
    }

    fn read_temperature(&mut self) -> Result<EnvironmentReading> {
        self.note(Action::Temperature);
        if self.temperature_fails {
            return Err(SurfaceError::sensor_error("MLX90614 not responding"));
        }
        Ok(self.environment)
    }

    fn read_color(&mut self) -> Result<ColorReading> {
        self.note(Action::Color);
        Ok(ColorReading { r: 200, g: 40, b: 10 })
    }

    fn now(&self) -> Instant {
        self.base + self.elapsed
    }

    fn delay(&mut self, duration: Duration) {
        self.elapsed += duration;
        thread::yield_now();
    }
}

/// Round-trip echo time for a target `cm` away.
pub fn echo_for_cm(cm: f64, ambient_c: f64) -> Duration {
    Duration::from_secs_f64(cm * 2.0 / (speed_of_sound(ambient_c) * 100.0))
}

pub fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}
