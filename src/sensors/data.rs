//! Data structures for sensor readings and measurement reports.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::classify::{AbsorptionLabel, MaterialLabel, ShapeLabel};
use super::stats;

/// Logic level of a GPIO line.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PinLevel {
    /// Line is low
    Low,
    /// Line is high
    High,
}

impl PinLevel {
    pub fn is_high(self) -> bool {
        self == PinLevel::High
    }
}

/// One ultrasonic distance sample.
///
/// Serialized as a plain number, or `null` when the ping produced no reading.
/// Whether numbers are real or synthetic is carried by the batch's [`DataSource`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "Option<f64>", into = "Option<f64>")]
pub enum Sample {
    /// Distance in centimeters measured by the sensor
    Measured(f64),
    /// The ping timed out or failed on every attempt
    Missing,
    /// Pseudo-random distance in centimeters produced in simulation
    Simulated(f64),
}

impl Sample {
    /// The distance carried by this sample, if any.
    pub fn value(&self) -> Option<f64> {
        match *self {
            Sample::Measured(cm) | Sample::Simulated(cm) => Some(cm),
            Sample::Missing => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Sample::Missing)
    }
}

impl From<Option<f64>> for Sample {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Sample::Missing, Sample::Measured)
    }
}

impl From<Sample> for Option<f64> {
    fn from(sample: Sample) -> Self {
        sample.value()
    }
}

/// Where the numbers of a batch came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    /// Real sensor readings
    Measured,
    /// Simulation mode, no hardware attached
    Simulated,
    /// Real hardware produced no valid sample; simulated values were substituted
    Degraded,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataSource::Measured => "measured",
            DataSource::Simulated => "simulated",
            DataSource::Degraded => "degraded",
        };
        f.write_str(name)
    }
}

/// Ordered samples of one measurement cycle plus their statistics.
///
/// Mean and standard deviation only ever cover the valid samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementBatch {
    pub samples: Vec<Sample>,
    pub mean_cm: f64,
    pub stddev_cm: f64,
    pub valid_count: usize,
    pub source: DataSource,
}

impl MeasurementBatch {
    /// Build a batch from raw samples. Returns `None` when no sample is valid.
    pub fn from_samples(samples: Vec<Sample>, source: DataSource) -> Option<Self> {
        let valid: Vec<f64> = samples.iter().filter_map(Sample::value).collect();
        let mean_cm = stats::mean(&valid)?;
        let stddev_cm = stats::population_std_dev(&valid);

        Some(Self {
            valid_count: valid.len(),
            samples,
            mean_cm,
            stddev_cm,
            source,
        })
    }
}

/// Ambient and object temperature from the infrared thermometer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentReading {
    /// Ambient (sensor die) temperature in Celsius
    pub ambient_c: f64,
    /// Object surface temperature in Celsius
    pub object_c: f64,
}

impl EnvironmentReading {
    pub fn new(ambient_c: f64, object_c: f64) -> Self {
        Self {
            ambient_c: round2(ambient_c),
            object_c: round2(object_c),
        }
    }

    /// Absolute difference between object and ambient temperature.
    pub fn delta(&self) -> f64 {
        (self.object_c - self.ambient_c).abs()
    }
}

impl Default for EnvironmentReading {
    fn default() -> Self {
        Self::new(20.0, 20.0)
    }
}

/// RGB color of the surface, scaled to bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorReading {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Result of a plain distance measurement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistanceReport {
    /// Unix timestamp in milliseconds
    pub timestamp: i64,
    pub mean_cm: f64,
    pub stddev_cm: f64,
    pub samples: Vec<Sample>,
    pub valid_samples: usize,
    /// Speed of sound used for the conversion
    pub speed_m_s: f64,
    pub ambient_temp_c: f64,
    pub object_temp_c: f64,
    pub absorption: MaterialLabel,
    pub accuracy: f64,
    pub source: DataSource,
}

/// Result of a shape classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShapeReport {
    pub timestamp: i64,
    pub label: ShapeLabel,
    pub mean_cm: f64,
    pub stddev_cm: f64,
    pub samples: Vec<Sample>,
    pub valid_samples: usize,
    pub accuracy: f64,
    pub source: DataSource,
}

/// Result of a material / absorption classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialReport {
    pub timestamp: i64,
    pub label: MaterialLabel,
    /// Coarse two-bucket variant of `label`
    pub absorption: AbsorptionLabel,
    pub mean_cm: f64,
    pub stddev_cm: f64,
    pub samples: Vec<Sample>,
    pub valid_samples: usize,
    pub rgb: ColorReading,
    pub ambient_temp_c: f64,
    pub object_temp_c: f64,
    pub accuracy: f64,
    pub source: DataSource,
}

/// The most recent measurement of any kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LastMeasurement {
    Distance(DistanceReport),
    Shape(ShapeReport),
    Material(MaterialReport),
}

impl LastMeasurement {
    pub fn samples(&self) -> &[Sample] {
        match self {
            LastMeasurement::Distance(r) => &r.samples,
            LastMeasurement::Shape(r) => &r.samples,
            LastMeasurement::Material(r) => &r.samples,
        }
    }

    pub fn source(&self) -> DataSource {
        match self {
            LastMeasurement::Distance(r) => r.source,
            LastMeasurement::Shape(r) => r.source,
            LastMeasurement::Material(r) => r.source,
        }
    }
}

/// Availability of each exhibit component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentStatus {
    pub ultrasonic: bool,
    pub color: bool,
    pub temperature: bool,
    pub button: bool,
    #[serde(rename = "oled")]
    pub display: bool,
    pub buzzer: bool,
}

/// Overview returned by the status endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReport {
    pub timestamp: i64,
    pub simulation: bool,
    #[serde(flatten)]
    pub components: ComponentStatus,
    pub ambient_temp: f64,
    pub object_temp: f64,
    pub button_pressed: bool,
    pub last_measurement: Option<LastMeasurement>,
}

/// Current time as a Unix timestamp in milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
