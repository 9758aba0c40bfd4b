//! # Smart Surface - Ultrasonic Surface Classification for Raspberry Pi
//!
//! Drives an HC-SR04 style ultrasonic ranger, an MLX90614 infrared thermometer
//! and a TCS34725 color sensor, aggregates repeated pings into mean and
//! standard deviation, and labels the surface from that dispersion. Results
//! are served as JSON over HTTP with a live WebSocket feed.
//!
//! ## Features
//!
//! - **Ranging**: trigger/echo timing with per-edge timeouts and retries
//! - **Temperature correction**: speed of sound from the ambient reading
//! - **Classification**: Flat/Curved/Irregular and absorption labels
//! - **Always responsive**: falls back to simulated data when hardware fails
//! - **GPIO support**: real hardware behind the `gpio` feature (rppal)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use smart_surface::{start_web_server, SensorConfig, SurfaceEngine, WebConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = Arc::new(SurfaceEngine::new(SensorConfig::default())?);
//!
//!     let report = engine.measure_shape(15);
//!     println!("{} (σ {:.2} cm)", report.label, report.stddev_cm);
//!
//!     start_web_server(WebConfig::default(), engine).await?;
//!     Ok(())
//! }
//! ```

pub mod display;
pub mod error;
pub mod sensors;
pub mod web;

// Re-export public API
pub use display::{DisplaySink, LogDisplay};
pub use error::{Result, SurfaceError};
pub use sensors::{
    classify::{AbsorptionLabel, ClassificationThresholds, MaterialLabel, ShapeLabel},
    config::{PinConfig, SensorConfig},
    data::{
        ColorReading, DataSource, DistanceReport, EnvironmentReading, LastMeasurement,
        MaterialReport, MeasurementBatch, Sample, ShapeReport, StatusReport,
    },
    engine::SurfaceEngine,
    hardware::{SensorHardware, SimulatedHardware},
};

#[cfg(feature = "gpio")]
pub use sensors::gpio::RaspberryPiHardware;

pub use web::{start_web_server, WebConfig};

/// The default web server port
pub const DEFAULT_WEB_PORT: u16 = 5000;
