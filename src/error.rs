//! Error handling for the smart surface crate.

/// A specialized `Result` type for smart surface operations.
pub type Result<T> = std::result::Result<T, SurfaceError>;

/// The main error type for sensor and web operations.
#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    /// GPIO line could not be driven or read (pin busy, unclaimed, bus fault)
    #[error("GPIO error: {0}")]
    Gpio(String),

    /// The echo line never went high within the wait budget
    #[error("Echo start timeout after {waited_us} µs")]
    EchoStartTimeout { waited_us: u128 },

    /// The echo line never went low again within the wait budget
    #[error("Echo end timeout after {waited_us} µs")]
    EchoEndTimeout { waited_us: u128 },

    /// An I2C sensor (temperature, color) failed
    #[error("Sensor error: {0}")]
    Sensor(String),

    /// Web server error
    #[error("Web server error: {0}")]
    WebServer(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl SurfaceError {
    /// Create a new GPIO error
    pub fn gpio_error(msg: impl Into<String>) -> Self {
        Self::Gpio(msg.into())
    }

    /// Create a new sensor error
    pub fn sensor_error(msg: impl Into<String>) -> Self {
        Self::Sensor(msg.into())
    }

    /// Create a new web server error
    pub fn web_server_error(msg: impl Into<String>) -> Self {
        Self::WebServer(msg.into())
    }

    /// Create a new configuration error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether this error came from an echo wait running out of time.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::EchoStartTimeout { .. } | Self::EchoEndTimeout { .. }
        )
    }
}
