//! # stepper-control
//!
//! Real-time stepper motor control over embedded-hal 1.0 drivers.
//!
//! ## Features
//!
//! - **Driver abstraction**: One [`StepperDriver`] contract for
//!   STEP/DIR chips (DRV8825-class, with microstepping, sleep and fault
//!   reporting) and dual H-bridge commutation
//! - **Interrupt-driven engine**: Timer-tick motion with acceleration
//!   ramping, absolute/relative positioning, jog and continuous modes
//! - **Bounded command queue**: Lock-free submission from any context,
//!   explicit backpressure when full
//! - **Polled fallback**: A single-context controller for hosts without
//!   a spare timer
//! - **Configuration-driven**: Controller limits from TOML (std)
//! - **no_std compatible**: Core library works without the standard
//!   library
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stepper_control::{
//!     engine, Command, CommandQueue, ControllerConfig, SharedState,
//!     StepDirDriver, Steps, StepsPerSec,
//! };
//!
//! static SHARED: SharedState = SharedState::new();
//! static QUEUE: CommandQueue = CommandQueue::new();
//!
//! let config: ControllerConfig = stepper_control::load_config("motor.toml")?;
//! let driver = StepDirDriver::new(step_pin, dir_pin, enable_pin, delay);
//!
//! let (mut engine, mut consumer, handle) =
//!     engine::bind(driver, &SHARED, &QUEUE, &config);
//!
//! // From the periodic timer interrupt:
//! //     engine.tick(timestamp_us());
//! // From the consumer task:
//! //     loop { consumer.service(&mut delay); }
//!
//! handle.submit(
//!     Command::MoveBySteps { delta: Steps(800), speed: StepsPerSec(2000.0) },
//!     &mut delay,
//! )?;
//! ```
//!
//! ## Feature Flags
//!
//! - `std` (default): Enables file I/O and TOML parsing
//! - `defmt`: Enables defmt logging for embedded targets

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

// Core modules
pub mod command;
pub mod config;
pub mod driver;
pub mod engine;
pub mod error;
pub mod polled;

// Re-exports for ergonomic API
pub use command::Command;
pub use config::ControllerConfig;
pub use driver::{
    BridgeDriver, Direction, MicrostepMode, NoPin, StepDirDriver, StepperDriver,
};
pub use engine::{
    CommandConsumer, CommandQueue, MotionEngine, MotionHandle, SharedState,
    COMMAND_QUEUE_CAPACITY,
};
pub use error::{Error, Result};
pub use polled::PolledController;

// Configuration loading (std only)
#[cfg(feature = "std")]
pub use config::{load_config, parse_config};

// Unit types
pub use config::units::{Steps, StepsPerSec, StepsPerSecSquared};
