//! # Error Types
//!
//! Custom error types for RoboRemote using `thiserror`.

use std::io;

use thiserror::Error;

/// Main error type for RoboRemote
#[derive(Debug, Error)]
pub enum RoboRemoteError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Input device errors (permission denied, device unplugged, ...)
    #[error("Controller error: {0}")]
    Controller(String),

    /// No input device matched the requested selection
    #[error("No input device found: {0}")]
    ControllerNotFound(String),

    /// Robot connection errors
    #[error(transparent)]
    Connect(#[from] ConnectError),
}

/// Errors reported synchronously by `ConnectionManager::connect`.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// The address is not a valid `host:port` pair. Never retried.
    #[error("Invalid robot address '{0}': expected host:port")]
    InvalidAddress(String),

    /// The host could not be reached or refused the connection.
    #[error("Cannot reach robot at {address}: {source}")]
    Unreachable {
        address: String,
        #[source]
        source: io::Error,
    },

    /// A `disconnect()` was requested while the attempt was in flight.
    #[error("Connection attempt to {0} was aborted")]
    Aborted(String),
}

impl ConnectError {
    /// Returns `true` for errors a caller may reasonably retry.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, ConnectError::Unreachable { .. })
    }
}

/// Result type alias for RoboRemote
pub type Result<T> = std::result::Result<T, RoboRemoteError>;
