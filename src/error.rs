//! Error types and handling.

use thiserror::Error;

use crate::lanbox::{SessionState, TransportKind};

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Numeric parameter outside its protocol bound
    #[error("{field} out of range: {value} (allowed {min}..={max})")]
    Range {
        field: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    /// Text field longer (or shorter) than the protocol allows
    #[error("{field} length {len} not allowed (max {max})")]
    Length {
        field: &'static str,
        len: usize,
        max: usize,
    },

    /// Text field contains bytes the wire format cannot carry
    #[error("Invalid text: {0}")]
    InvalidText(String),

    /// Channel read/write failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Received bytes do not match the expected response shape
    #[error("Frame error: {0}")]
    Frame(String),

    /// Operation not allowed in the current session state
    #[error("Operation not allowed in session state: {0}")]
    InvalidState(SessionState),

    /// Controller did not answer in time
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Could not open the byte channel
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Transport has no built-in link layer
    #[error("Transport not supported by this client: {0}")]
    UnsupportedTransport(TransportKind),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),
}

/// Result type alias for AppError
pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    /// Create a range error for `field`
    pub fn range(field: &'static str, value: impl Into<i64>, min: i64, max: i64) -> Self {
        Self::Range {
            field,
            value: value.into(),
            min,
            max,
        }
    }

    /// Create a frame error with message
    pub fn frame(msg: impl Into<String>) -> Self {
        Self::Frame(msg.into())
    }

    /// Create a config error with message
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// True for errors raised before any byte reached the channel.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Range { .. } | Self::Length { .. } | Self::InvalidText(_))
    }
}
