//! Sensor access, ultrasonic ranging and surface classification.
//!
//! The board is reached through the [`hardware::SensorHardware`] trait, either
//! the rppal-backed implementation (feature `gpio`) or the simulator. The
//! [`engine::SurfaceEngine`] runs ping cycles under one lock, aggregates them
//! and labels the result.

pub mod classify;
pub mod config;
pub mod conversion;
pub mod data;
pub mod engine;
pub mod gpio;
pub mod hardware;
pub mod pulse;
pub mod stats;

// Re-export commonly used items
pub use classify::{AbsorptionLabel, ClassificationThresholds, MaterialLabel, ShapeLabel};
pub use config::{PinConfig, SensorConfig};
pub use data::{
    DataSource, DistanceReport, LastMeasurement, MaterialReport, MeasurementBatch, Sample,
    ShapeReport, StatusReport,
};
pub use engine::SurfaceEngine;
pub use hardware::{SensorHardware, SimulatedHardware};
