//! Stepper driver abstraction.
//!
//! [`StepperDriver`] is the capability contract the motion engine drives:
//! concrete drivers are dumb pulse generators and hide pulse generation,
//! direction, enable/disable and optional microstepping/sleep behind a
//! uniform interface. Step timing is entirely the engine's
//! responsibility.

mod bridge;
mod step_dir;

pub use bridge::BridgeDriver;
pub use step_dir::{NoPin, StepDirDriver, WAKE_SETTLE_US};

use crate::config::units::StepsPerSec;

/// Direction of motor rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Clockwise (positive step count).
    Clockwise,
    /// Counter-clockwise (negative step count).
    CounterClockwise,
}

impl Direction {
    /// Get direction from signed step count.
    #[inline]
    pub fn from_steps(steps: i64) -> Self {
        if steps >= 0 {
            Direction::Clockwise
        } else {
            Direction::CounterClockwise
        }
    }

    /// Get the sign multiplier.
    #[inline]
    pub fn sign(self) -> i64 {
        match self {
            Direction::Clockwise => 1,
            Direction::CounterClockwise => -1,
        }
    }
}

/// Microstep resolution for drivers that support mode-select pins.
///
/// Only the six modes the select pattern table defines are
/// representable; [`MicrostepMode::from_divisor`] maps anything else to
/// full step rather than failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MicrostepMode {
    /// Full step (no microstepping). The fallback mode.
    #[default]
    Full,
    /// Half step.
    Half,
    /// Quarter step.
    Quarter,
    /// Eighth step.
    Eighth,
    /// Sixteenth step.
    Sixteenth,
    /// Thirty-second step.
    ThirtySecond,
}

impl MicrostepMode {
    /// Get the step divisor (1, 2, 4, 8, 16 or 32).
    #[inline]
    pub const fn divisor(self) -> u16 {
        match self {
            MicrostepMode::Full => 1,
            MicrostepMode::Half => 2,
            MicrostepMode::Quarter => 4,
            MicrostepMode::Eighth => 8,
            MicrostepMode::Sixteenth => 16,
            MicrostepMode::ThirtySecond => 32,
        }
    }

    /// Map a divisor to a mode; unrecognized values fall back to full step.
    #[inline]
    pub const fn from_divisor(divisor: u16) -> Self {
        match divisor {
            2 => MicrostepMode::Half,
            4 => MicrostepMode::Quarter,
            8 => MicrostepMode::Eighth,
            16 => MicrostepMode::Sixteenth,
            32 => MicrostepMode::ThirtySecond,
            _ => MicrostepMode::Full,
        }
    }
}

/// Capability contract implemented by concrete stepper drivers.
///
/// All methods are infallible by design: drivers clamp or ignore
/// out-of-range input silently, and pin errors are swallowed (on real
/// hardware embedded-hal pin writes are typically infallible). Callers
/// must not rely on validation at this layer.
///
/// Invariant: `step()` has no effect while the driver is internally
/// tracked as disabled. The engine additionally enforces
/// enable-before-step, but every driver must hold this on its own.
pub trait StepperDriver {
    /// Initialize the driver: leave it disabled, apply the initial
    /// direction and (where supported) the configured microstep mode.
    ///
    /// Pin mode setup (input/output muxing) is the platform's job;
    /// embedded-hal pins arrive already configured.
    fn init(&mut self);

    /// Set the rotation direction.
    fn set_direction(&mut self, direction: Direction);

    /// Store the speed setting, clamped to `[0, max_speed]`.
    ///
    /// Purely informational: drivers never derive timing from it.
    fn set_speed(&mut self, speed: StepsPerSec);

    /// Emit exactly one step edge.
    ///
    /// Blocks only for the documented minimum pulse width. Must be a
    /// no-op while disabled.
    fn step(&mut self);

    /// Enable the power stage.
    fn enable(&mut self);

    /// Disable the power stage.
    fn disable(&mut self);

    /// Set the maximum speed used for `set_speed` clamping.
    fn set_max_speed(&mut self, max_speed: StepsPerSec);

    /// Get the maximum speed.
    fn max_speed(&self) -> StepsPerSec;

    /// Get the stored speed setting.
    fn speed(&self) -> StepsPerSec;

    /// Whether the power stage is currently enabled.
    fn is_enabled(&self) -> bool;

    /// Get the current rotation direction.
    fn direction(&self) -> Direction;

    /// Select the microstep resolution. Default: no-op.
    fn set_microstep_mode(&mut self, _mode: MicrostepMode) {}

    /// Get the current microstep resolution. Default: full step.
    fn microstep_mode(&self) -> MicrostepMode {
        MicrostepMode::Full
    }

    /// Whether the driver is reporting a hardware fault. Default: no.
    fn has_fault(&mut self) -> bool {
        false
    }

    /// Enter the low-power state. Default: no-op.
    ///
    /// Only call while the motor is stopped; a sleeping driver must not
    /// be pulsed.
    fn sleep(&mut self) {}

    /// Leave the low-power state. Default: no-op.
    ///
    /// Synchronous: supporting drivers budget a settle delay before
    /// returning so that pulses can be trusted immediately after.
    fn wake(&mut self) {}
}
