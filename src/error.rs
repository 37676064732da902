//! Error types for Urja-Guard

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Urja-Guard error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I2C bus error
    #[error("I2C bus error: {0}")]
    I2c(#[from] rppal::i2c::Error),

    /// GPIO error
    #[error("GPIO error: {0}")]
    Gpio(#[from] rppal::gpio::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed register contents
    #[error("Register decode error: {0}")]
    Decode(String),

    /// Configuration file parse error
    #[error("Configuration error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration file serialize error
    #[error("Configuration error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// State or status file unreadable/unwritable
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Status record serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Chip recovery command failed
    #[error("Recovery failed: {0}")]
    Recovery(String),

    /// Register transport fault injected by a mock (tests only)
    #[error("Transport fault: {0}")]
    TransportFault(&'static str),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// True for faults originating at the register transport boundary.
    ///
    /// These are downgraded to an error-flagged status record by the
    /// acquisition cycle rather than propagated as process failures.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::I2c(_) | Error::Decode(_) | Error::TransportFault(_)
        )
    }
}
