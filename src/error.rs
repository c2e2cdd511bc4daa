//! Custom error types for the buffering library.
//!
//! This module defines the primary error type, `BufferError`, together with
//! `DeviceError`, the error reported by eye-tracker implementations when a
//! subscription request is refused.
//!
//! ## Error Hierarchy
//!
//! Most conditions in this crate are *not* errors: redundant lifecycle calls and
//! unsupported streams are reported as `false`, and consume/peek calls only ever
//! return empty results. `BufferError` covers the few conditions that must stop
//! the caller:
//!
//! - **`DeviceOpen`**: the eye tracker at the given address could not be opened,
//!   so no `BufferManager` is produced.
//! - **`UnknownStream`**: a stream name that does not map onto a `DataStream`.
//! - **`Config`**: wraps errors from `figment` while loading configuration files.
//! - **`Validation`**: semantic errors in a configuration that parsed successfully.

use thiserror::Error;

use crate::stream::DataStream;

/// Convenience alias for results using the library error type.
pub type BufferResult<T> = std::result::Result<T, BufferError>;

/// Primary error type for the buffering library.
#[derive(Error, Debug)]
pub enum BufferError {
    /// The eye tracker could not be opened or validated.
    #[error("Failed to open eye tracker at '{address}': {reason}")]
    DeviceOpen {
        /// Address the connection was attempted on.
        address: String,
        /// Reason reported by the connector.
        reason: String,
    },

    /// A stream name did not match any known stream.
    #[error("Unknown stream '{0}'. Expected one of: gaze, eyeImage, externalSignal, timeSync")]
    UnknownStream(String),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    /// Configuration was loaded but contains invalid values.
    #[error("Configuration validation error: {0}")]
    Validation(String),
}

impl From<figment::Error> for BufferError {
    fn from(err: figment::Error) -> Self {
        BufferError::Config(Box::new(err))
    }
}

/// Error reported by an [`EyeTracker`](crate::hardware::EyeTracker) implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// The device does not provide the requested stream.
    #[error("Stream '{0}' is not supported by this eye tracker")]
    StreamNotSupported(DataStream),

    /// The connection to the device was lost.
    #[error("Connection to eye tracker lost")]
    ConnectionLost,

    /// The device rejected the operation in its current state.
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Any other status code reported by the driver.
    #[error("Eye tracker status {code}: {message}")]
    Status {
        /// Raw status code.
        code: i32,
        /// Driver-provided description.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_open_message() {
        let err = BufferError::DeviceOpen {
            address: "tet-tcp://169.254.10.20".into(),
            reason: "timed out".into(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to open eye tracker at 'tet-tcp://169.254.10.20': timed out"
        );
    }

    #[test]
    fn test_stream_not_supported_names_stream() {
        let err = DeviceError::StreamNotSupported(DataStream::EyeImage);
        assert!(err.to_string().contains("eyeImage"));
    }
}
