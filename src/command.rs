//! Motion command model.
//!
//! A closed set of motion commands passed by value across the
//! producer/consumer boundary. Each variant carries only the fields it
//! needs; commands are immutable, copied into the queue, and hold no
//! reference to the engine.

use crate::config::units::{Steps, StepsPerSec, StepsPerSecSquared};
use crate::driver::Direction;

/// A motion command.
///
/// Commands are applied in queue arrival order by the single consumer
/// task; their effects are observed by the timer tick at its next
/// firing. Speeds are clamped to the configured maximum on application,
/// never rejected.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// Move to an absolute position with acceleration ramping.
    MoveToAbsolute {
        /// Target position in steps.
        position: Steps,
        /// Cruise speed.
        speed: StepsPerSec,
    },
    /// Move by a relative number of steps with acceleration ramping.
    MoveBySteps {
        /// Signed step delta from the current position.
        delta: Steps,
        /// Cruise speed.
        speed: StepsPerSec,
    },
    /// Change the commanded speed without changing motion mode.
    ///
    /// Takes effect on the next tick; with ramping enabled the current
    /// speed ramps toward the new value.
    SetSpeed {
        /// New commanded speed.
        speed: StepsPerSec,
    },
    /// Enter jog mode: direct drive without ramping, no position target.
    ///
    /// Position and direction come from subsequent [`Command::MoveJogSteps`].
    StartJog {
        /// Jog speed.
        speed: StepsPerSec,
    },
    /// Leave jog mode and stop the motor.
    StopJog,
    /// Jog by a relative number of steps, bypassing the ramp.
    ///
    /// Same position-target semantics as [`Command::MoveBySteps`] but
    /// the commanded speed is applied instantaneously for low-latency
    /// manual control.
    MoveJogSteps {
        /// Signed step delta from the current position.
        delta: Steps,
        /// Jog speed.
        speed: StepsPerSec,
    },
    /// Start unbounded continuous rotation.
    StartContinuous {
        /// Rotation direction.
        direction: Direction,
        /// Rotation speed.
        speed: StepsPerSec,
    },
    /// Stop any motion and disable the driver.
    StopMotor,
    /// Change the acceleration used for speed ramping.
    ///
    /// Zero disables ramping; negative values clamp to zero.
    SetAcceleration {
        /// New acceleration.
        value: StepsPerSecSquared,
    },
}
