//! Error types for stepper-control.
//!
//! Provides unified error handling across configuration and command
//! submission. Nothing here is fatal: the worst runtime outcome is a
//! rejected command, which the caller surfaces to the operator.
//!
//! Deliberately absent from this taxonomy:
//! - Out-of-range command parameters are resolved by clamping, not by
//!   erroring (speed 0 maps to the maximum step interval rather than a
//!   divide-by-zero).
//! - A driver hardware fault is an observable flag
//!   ([`MotionHandle::has_fault`](crate::engine::MotionHandle::has_fault)),
//!   never an error; reacting to it is a safety policy left to the caller.
//! - Unsupported microstep divisors fall back to full step.

use core::fmt;

/// Result type alias using the library's Error type.
pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for all stepper-control operations.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Configuration parsing or validation error
    Config(ConfigError),
    /// Command queue error
    Queue(QueueError),
}

/// Configuration-related errors.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Failed to parse TOML configuration
    ParseError(heapless::String<128>),
    /// Invalid maximum speed (must be > 0)
    InvalidMaxSpeed(f32),
    /// Invalid timer tick period (must be > 0)
    InvalidTickPeriod(u32),
    /// Invalid step pulse width (must be > 0)
    InvalidPulseWidth(u32),
    /// File I/O error (std only)
    #[cfg(feature = "std")]
    IoError(heapless::String<128>),
}

/// Command queue errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum QueueError {
    /// The command queue stayed full for the whole bounded wait.
    ///
    /// Non-fatal: the motor is busy or its consumer task is stalled.
    /// Surface to the operator; retry explicitly rather than in a loop.
    Full,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(e) => write!(f, "Configuration error: {}", e),
            Error::Queue(e) => write!(f, "Queue error: {}", e),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            ConfigError::InvalidMaxSpeed(v) => {
                write!(f, "Invalid max speed: {}. Must be > 0", v)
            }
            ConfigError::InvalidTickPeriod(v) => {
                write!(f, "Invalid tick period: {} us. Must be > 0", v)
            }
            ConfigError::InvalidPulseWidth(v) => {
                write!(f, "Invalid pulse width: {} us. Must be > 0", v)
            }
            #[cfg(feature = "std")]
            ConfigError::IoError(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl fmt::Display for QueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueError::Full => write!(f, "Command queue full"),
        }
    }
}

// Conversion impls
impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<QueueError> for Error {
    fn from(e: QueueError) -> Self {
        Error::Queue(e)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}

#[cfg(feature = "std")]
impl std::error::Error for QueueError {}
