//! Sampling and classification engine.
//!
//! [`SurfaceEngine`] owns the board behind a single mutex. Every measurement,
//! status read and buzzer run holds that lock for its whole cycle, so pulses
//! from concurrent requests never interleave on the sensor.

use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::classify::accuracy_score;
use super::config::{clamp_beeps, clamp_samples, SensorConfig};
use super::conversion::{distance_cm, is_plausible_ambient, speed_of_sound};
use super::data::*;
use super::gpio;
use super::hardware::{SensorHardware, SimulatedHardware, Simulator};
use super::pulse::PulseTimer;
use super::stats;
use crate::display::{self, DisplaySink, LogDisplay};
use crate::error::Result;

/// Buffered live updates per subscriber before it starts lagging.
const UPDATE_CHANNEL_CAPACITY: usize = 16;

/// Hardware handle plus the simulator used for fallbacks, guarded together.
struct HardwareContext {
    device: Box<dyn SensorHardware>,
    simulator: Simulator,
}

impl HardwareContext {
    fn environment(&mut self) -> EnvironmentReading {
        match self.device.read_temperature() {
            Ok(reading) => reading,
            Err(e) => {
                warn!("Temperature read failed, using simulated values: {}", e);
                self.simulator.environment()
            }
        }
    }

    fn color(&mut self) -> ColorReading {
        match self.device.read_color() {
            Ok(color) => color,
            Err(e) => {
                warn!("Color read failed, using simulated values: {}", e);
                self.simulator.color()
            }
        }
    }

    fn simulated_batch(&mut self, count: usize, source: DataSource) -> MeasurementBatch {
        let samples: Vec<Sample> = (0..count.max(1))
            .map(|_| Sample::Simulated(self.simulator.distance_cm()))
            .collect();
        let values: Vec<f64> = samples.iter().filter_map(Sample::value).collect();

        MeasurementBatch {
            mean_cm: stats::mean(&values).unwrap_or_default(),
            stddev_cm: stats::population_std_dev(&values),
            valid_count: values.len(),
            samples,
            source,
        }
    }
}

/// One lock-held sampling cycle.
struct Cycle {
    batch: MeasurementBatch,
    environment: EnvironmentReading,
    speed_m_s: f64,
}

/// Serializes all sensor access and turns pings into labeled measurements.
pub struct SurfaceEngine {
    config: SensorConfig,
    pulse: PulseTimer,
    simulated: bool,
    hardware: Mutex<HardwareContext>,
    last: Mutex<Option<LastMeasurement>>,
    display: Mutex<Box<dyn DisplaySink>>,
    updates: broadcast::Sender<LastMeasurement>,
}

impl SurfaceEngine {
    /// Open the board, or fall back to simulation if it is unavailable.
    ///
    /// A missing board is reported here once; later requests just run simulated.
    pub fn new(config: SensorConfig) -> Result<Self> {
        config.validate()?;

        let device: Box<dyn SensorHardware> = if config.simulate {
            info!("Simulation mode requested, GPIO will not be touched");
            Box::new(SimulatedHardware::new())
        } else {
            match gpio::open_hardware(&config) {
                Ok(device) => {
                    info!(
                        "Ultrasonic sensor on trigger GPIO {} / echo GPIO {}",
                        config.pins.trigger, config.pins.echo
                    );
                    device
                }
                Err(e) => {
                    warn!("Hardware unavailable, running in simulation mode: {}", e);
                    Box::new(SimulatedHardware::new())
                }
            }
        };

        Ok(Self::with_hardware(config, device))
    }

    /// Build an engine around an already opened board.
    pub fn with_hardware(config: SensorConfig, device: Box<dyn SensorHardware>) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            pulse: PulseTimer::from_config(&config),
            simulated: device.is_simulated(),
            hardware: Mutex::new(HardwareContext {
                device,
                simulator: Simulator::new(),
            }),
            last: Mutex::new(None),
            display: Mutex::new(Box::new(LogDisplay)),
            updates,
            config,
        }
    }

    /// Replace the display sink.
    pub fn with_display(self, sink: Box<dyn DisplaySink>) -> Self {
        Self {
            display: Mutex::new(sink),
            ..self
        }
    }

    /// Use a seeded simulator for fallback values.
    pub fn with_simulator_seed(self, seed: u64) -> Self {
        lock(&self.hardware).simulator = Simulator::seeded(seed);
        self
    }

    pub fn config(&self) -> &SensorConfig {
        &self.config
    }

    pub fn is_simulated(&self) -> bool {
        self.simulated
    }

    /// Average distance over `samples` pings.
    pub fn measure_distance(&self, samples: usize) -> DistanceReport {
        let (cycle, ()) = self.run_cycle(samples, |_| ());
        let Cycle {
            batch,
            environment,
            speed_m_s,
        } = cycle;

        let report = DistanceReport {
            timestamp: now_millis(),
            mean_cm: batch.mean_cm,
            stddev_cm: batch.stddev_cm,
            valid_samples: batch.valid_count,
            speed_m_s,
            ambient_temp_c: environment.ambient_c,
            object_temp_c: environment.object_c,
            absorption: self.config.thresholds.material(batch.stddev_cm),
            accuracy: accuracy_score(environment.delta(), batch.stddev_cm),
            source: batch.source,
            samples: batch.samples,
        };

        self.record(LastMeasurement::Distance(report.clone()));
        report
    }

    /// Classify surface shape from the dispersion of `samples` pings.
    pub fn measure_shape(&self, samples: usize) -> ShapeReport {
        let (Cycle {
            batch, environment, ..
        }, ()) = self.run_cycle(samples, |_| ());

        let report = ShapeReport {
            timestamp: now_millis(),
            label: self.config.thresholds.shape(batch.stddev_cm),
            mean_cm: batch.mean_cm,
            stddev_cm: batch.stddev_cm,
            valid_samples: batch.valid_count,
            accuracy: accuracy_score(environment.delta(), batch.stddev_cm),
            source: batch.source,
            samples: batch.samples,
        };

        self.record(LastMeasurement::Shape(report.clone()));
        report
    }

    /// Classify echo absorption from the dispersion of `samples` pings, plus
    /// the surface color.
    pub fn measure_material(&self, samples: usize) -> MaterialReport {
        let (Cycle {
            batch, environment, ..
        }, rgb) = self.run_cycle(samples, HardwareContext::color);
        let thresholds = &self.config.thresholds;

        let report = MaterialReport {
            timestamp: now_millis(),
            label: thresholds.material(batch.stddev_cm),
            absorption: thresholds.absorption(batch.stddev_cm),
            mean_cm: batch.mean_cm,
            stddev_cm: batch.stddev_cm,
            valid_samples: batch.valid_count,
            rgb,
            ambient_temp_c: environment.ambient_c,
            object_temp_c: environment.object_c,
            accuracy: accuracy_score(environment.delta(), batch.stddev_cm),
            source: batch.source,
            samples: batch.samples,
        };

        self.record(LastMeasurement::Material(report.clone()));
        report
    }

    /// Sample under the hardware lock; `then` runs on the board before the
    /// lock is released.
    fn run_cycle<T>(
        &self,
        requested: usize,
        then: impl FnOnce(&mut HardwareContext) -> T,
    ) -> (Cycle, T) {
        let count = clamp_samples(requested);
        let mut ctx = lock(&self.hardware);

        let environment = ctx.environment();
        if !is_plausible_ambient(environment.ambient_c) {
            warn!(
                "Ambient temperature {:.2}°C outside the calibrated range",
                environment.ambient_c
            );
        }
        let speed_m_s = speed_of_sound(environment.ambient_c);

        let batch = if ctx.device.is_simulated() {
            ctx.simulated_batch(count, DataSource::Simulated)
        } else {
            self.sample_hardware(&mut ctx, count, environment.ambient_c)
        };
        debug!(
            "Batch of {}: {} valid, mean {:.2} cm, σ {:.2} cm ({})",
            count, batch.valid_count, batch.mean_cm, batch.stddev_cm, batch.source
        );

        let extra = then(&mut *ctx);

        (
            Cycle {
                batch,
                environment,
                speed_m_s,
            },
            extra,
        )
    }

    fn sample_hardware(
        &self,
        ctx: &mut HardwareContext,
        count: usize,
        ambient_c: f64,
    ) -> MeasurementBatch {
        let mut samples = Vec::with_capacity(count);

        for i in 0..count {
            let sample = match self.pulse.ping(ctx.device.as_mut()) {
                Some(echo) => Sample::Measured(round2(distance_cm(echo, ambient_c))),
                None => Sample::Missing,
            };
            debug!("Sample {}/{}: {:?}", i + 1, count, sample);
            samples.push(sample);

            if i + 1 < count {
                ctx.device.delay(self.config.sample_interval());
            }
        }

        MeasurementBatch::from_samples(samples, DataSource::Measured).unwrap_or_else(|| {
            warn!(
                "No echo in {} pings, substituting simulated readings",
                count
            );
            ctx.simulated_batch(count, DataSource::Degraded)
        })
    }

    /// Sound the buzzer `beeps` times. Returns how many beeps were emitted.
    pub fn trigger_feedback(&self, beeps: u32) -> u32 {
        let beeps = clamp_beeps(beeps);
        let pin = self.config.pins.buzzer;
        let mut ctx = lock(&self.hardware);

        if ctx.device.is_simulated() {
            info!("[SIM] Buzzer beep x{} ({} ms)", beeps, self.config.beep_on_ms);
        }

        for i in 0..beeps {
            let pulse = ctx.device.write_pin(pin, PinLevel::High).and_then(|_| {
                ctx.device.delay(self.config.beep_on());
                ctx.device.write_pin(pin, PinLevel::Low)
            });

            if let Err(e) = pulse {
                warn!("Buzzer failed on beep {}/{}: {}", i + 1, beeps, e);
                if let Err(e) = ctx.device.write_pin(pin, PinLevel::Low) {
                    warn!("Could not silence buzzer: {}", e);
                }
                return i;
            }
            if i + 1 < beeps {
                ctx.device.delay(self.config.beep_gap());
            }
        }

        beeps
    }

    /// Component availability, a fresh temperature reading and the button state.
    pub fn status(&self) -> StatusReport {
        let (environment, button_pressed, components) = {
            let mut ctx = lock(&self.hardware);
            let environment = ctx.environment();
            let button_pressed = ctx
                .device
                .read_pin(self.config.pins.button)
                .map(PinLevel::is_high)
                .unwrap_or_else(|e| {
                    debug!("Button read failed: {}", e);
                    false
                });
            (environment, button_pressed, ctx.device.components())
        };

        StatusReport {
            timestamp: now_millis(),
            simulation: self.simulated,
            components,
            ambient_temp: environment.ambient_c,
            object_temp: environment.object_c,
            button_pressed,
            last_measurement: self.last_measurement(),
        }
    }

    /// The most recent measurement, if any has been taken.
    pub fn last_measurement(&self) -> Option<LastMeasurement> {
        lock(&self.last).clone()
    }

    /// Receive every measurement recorded from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<LastMeasurement> {
        self.updates.subscribe()
    }

    fn record(&self, measurement: LastMeasurement) {
        let lines = display::render(&measurement);
        if let Err(e) = lock(&self.display).show(&lines) {
            warn!("Display update failed: {}", e);
        }

        *lock(&self.last) = Some(measurement.clone());

        match self.updates.send(measurement) {
            Ok(receivers) => debug!("Measurement sent to {} live subscribers", receivers),
            Err(_) => debug!("No live subscribers"),
        }
    }
}

/// Lock a mutex, recovering the data if a previous holder panicked.
fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SurfaceError;
    use crate::sensors::classify::{MaterialLabel, ShapeLabel};

    /// Board whose echo line never answers.
    struct DeadEcho;

    impl SensorHardware for DeadEcho {
        fn write_pin(&mut self, _pin: u8, _level: PinLevel) -> Result<()> {
            Err(SurfaceError::gpio_error("pin busy"))
        }

        fn read_pin(&mut self, _pin: u8) -> Result<PinLevel> {
            Err(SurfaceError::gpio_error("pin busy"))
        }

        fn read_temperature(&mut self) -> Result<EnvironmentReading> {
            Err(SurfaceError::sensor_error("no thermometer"))
        }

        fn read_color(&mut self) -> Result<ColorReading> {
            Err(SurfaceError::sensor_error("no color sensor"))
        }

        fn delay(&mut self, _duration: std::time::Duration) {}
    }

    fn fast_config() -> SensorConfig {
        SensorConfig::default().with_retries(3, 0)
    }

    #[test]
    fn test_simulated_distance() {
        let engine = SurfaceEngine::with_hardware(
            SensorConfig::simulated(),
            Box::new(SimulatedHardware::seeded(3)),
        )
        .with_simulator_seed(3);
        assert!(engine.is_simulated());

        let report = engine.measure_distance(5);
        assert_eq!(report.samples.len(), 5);
        assert_eq!(report.valid_samples, 5);
        assert_eq!(report.source, DataSource::Simulated);
        assert!((5.0..=50.0).contains(&report.mean_cm));
        assert!(report.accuracy >= 80.0);
        assert!((report.speed_m_s - speed_of_sound(report.ambient_temp_c)).abs() < 1e-9);
    }

    #[test]
    fn test_dead_hardware_degrades() {
        let engine = SurfaceEngine::with_hardware(fast_config(), Box::new(DeadEcho));
        assert!(!engine.is_simulated());

        let report = engine.measure_shape(15);
        assert_eq!(report.source, DataSource::Degraded);
        assert_eq!(report.samples.len(), 15);
        assert!(report.samples.iter().all(|s| matches!(s, Sample::Simulated(_))));
        assert_eq!(report.label, engine.config().thresholds.shape(report.stddev_cm));
    }

    #[test]
    fn test_dead_hardware_material_and_status() {
        let engine = SurfaceEngine::with_hardware(fast_config(), Box::new(DeadEcho));

        let report = engine.measure_material(4);
        assert_eq!(report.source, DataSource::Degraded);
        assert_eq!(
            report.label,
            match report.stddev_cm {
                s if s < 1.5 => MaterialLabel::Reflective,
                s if s < 3.0 => MaterialLabel::MediumAbsorption,
                _ => MaterialLabel::HighAbsorption,
            }
        );

        let status = engine.status();
        assert!(!status.button_pressed);
        assert!(!status.simulation);
        assert!(matches!(
            status.last_measurement,
            Some(LastMeasurement::Material(_))
        ));
    }

    #[test]
    fn test_buzzer_failure_is_contained() {
        let engine = SurfaceEngine::with_hardware(fast_config(), Box::new(DeadEcho));
        assert_eq!(engine.trigger_feedback(3), 0);
    }

    #[test]
    fn test_sample_count_is_clamped() {
        let engine = SurfaceEngine::with_hardware(
            SensorConfig::simulated(),
            Box::new(SimulatedHardware::seeded(9)),
        );
        assert_eq!(engine.measure_shape(0).samples.len(), 1);
        assert_eq!(engine.measure_shape(1_000).samples.len(), 50);
        assert_eq!(engine.measure_shape(1).label, ShapeLabel::Flat);
    }

    #[test]
    fn test_measurements_are_broadcast() {
        let engine = SurfaceEngine::with_hardware(
            SensorConfig::simulated(),
            Box::new(SimulatedHardware::seeded(5)),
        );
        let mut rx = engine.subscribe();
        let report = engine.measure_distance(3);

        match rx.try_recv().unwrap() {
            LastMeasurement::Distance(sent) => assert_eq!(sent.mean_cm, report.mean_cm),
            other => panic!("unexpected measurement: {:?}", other),
        }
    }
}
