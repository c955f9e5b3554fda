//! Configuration module for stepper-control.
//!
//! Provides types for loading and validating motion controller
//! configuration from TOML files (with `std` feature) or pre-parsed data.

mod controller;
#[cfg(feature = "std")]
mod loader;
pub mod units;

pub use controller::ControllerConfig;

#[cfg(feature = "std")]
pub use loader::{load_config, parse_config};

// Re-export unit types at config level
pub use units::{Steps, StepsPerSec, StepsPerSecSquared};
