//! Error handling for the ECG monitor
//!
//! Library crates return [`EcgResult`]; the binary wraps these in `anyhow`
//! at its edges. The analysis stages themselves never fail and do not
//! appear here.

use thiserror::Error;

/// Result type alias for ECG monitor operations
pub type EcgResult<T> = Result<T, EcgError>;

/// Error type for all fallible ECG monitor operations
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum EcgError {
    /// Invalid configuration value
    #[error("Invalid configuration: {message}")]
    ConfigurationError {
        /// Description of the configuration error
        message: String,
    },

    /// Sampling rate outside the supported range
    #[error("Invalid sampling rate: {rate}Hz, valid range: {valid_range}")]
    InvalidSamplingRate {
        /// Provided sampling rate
        rate: u32,
        /// Valid range description
        valid_range: String,
    },

    /// Input line that does not hold a finite decimal value
    #[error("Malformed sample line: {line:?}")]
    MalformedSample {
        /// Offending line, trimmed
        line: String,
    },

    /// Input device could not be opened, configured or read
    #[error("Device error on {device}: {reason}")]
    DeviceError {
        /// Device path or name
        device: String,
        /// Device-related error description
        reason: String,
    },

    /// No input device could be discovered
    #[error("No serial device found: {hint}")]
    NoDeviceFound {
        /// What the user can do about it
        hint: String,
    },

    /// Signal simulation failure
    #[error("Simulation error: {message}")]
    SimulationError {
        /// Description of the simulation failure
        message: String,
    },
}

impl EcgError {
    /// Shorthand for configuration errors
    pub fn config(message: impl Into<String>) -> Self {
        EcgError::ConfigurationError {
            message: message.into(),
        }
    }

    /// Shorthand for device errors
    pub fn device(device: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        EcgError::DeviceError {
            device: device.into(),
            reason: reason.to_string(),
        }
    }

    /// True for errors that end the session before any sample is processed
    pub fn is_startup_fatal(&self) -> bool {
        matches!(
            self,
            EcgError::DeviceError { .. } | EcgError::NoDeviceFound { .. }
        )
    }
}
