//! Application-facing motion handle.
//!
//! A cheap, copyable view over the queue and the shared state for the
//! parts of the system that issue commands and display status. The
//! handle never touches the driver.

use embedded_hal::delay::DelayNs;
use portable_atomic::Ordering;

use crate::command::Command;
use crate::config::units::{Steps, StepsPerSec, StepsPerSecSquared};
use crate::driver::MicrostepMode;
use crate::engine::queue::CommandQueue;
use crate::engine::shared::{SharedState, POWER_SLEEP, POWER_WAKE};
use crate::error::QueueError;

/// How long [`MotionHandle::submit`] waits for queue space.
const SUBMIT_TIMEOUT_MS: u32 = 100;

/// Command submission and status interface.
///
/// `Copy`, so every UI screen or protocol task can hold its own. All
/// operations are lock-free; [`MotionHandle::submit`] is the only one
/// that waits, and only when the queue is full.
#[derive(Clone, Copy)]
pub struct MotionHandle<'a> {
    queue: &'a CommandQueue,
    shared: &'a SharedState,
}

impl<'a> MotionHandle<'a> {
    pub(crate) fn new(queue: &'a CommandQueue, shared: &'a SharedState) -> Self {
        Self { queue, shared }
    }

    /// Submit a command without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Full`] when the queue is at capacity.
    pub fn try_submit(&self, command: Command) -> Result<(), QueueError> {
        self.queue.enqueue(command)
    }

    /// Submit a command, waiting up to 100 ms for queue space in 1 ms
    /// slices.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Full`] if the queue stayed full for the
    /// whole wait, which means the consumer task is not draining it.
    pub fn submit<D: DelayNs>(&self, command: Command, delay: &mut D) -> Result<(), QueueError> {
        let mut waited_ms = 0;
        loop {
            match self.queue.enqueue(command) {
                Ok(()) => return Ok(()),
                Err(QueueError::Full) if waited_ms < SUBMIT_TIMEOUT_MS => {
                    delay.delay_ms(1);
                    waited_ms += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Whether the motor is currently in motion.
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Relaxed)
    }

    /// Current absolute position in steps.
    pub fn current_position(&self) -> Steps {
        Steps(self.shared.current_position.load(Ordering::Relaxed))
    }

    /// Rebase the position counter so the current physical position
    /// reads as `position` (re-zeroing, e.g. after homing).
    ///
    /// The target is rebased to the same value, so an in-flight move is
    /// cancelled at the next owed step. Intended for use while idle.
    pub fn set_current_position(&self, position: Steps) {
        let shared = self.shared;
        shared.current_position.store(position.0, Ordering::Relaxed);
        shared.target_position.store(position.0, Ordering::Relaxed);
    }

    /// Commanded speed the ramp is converging toward.
    pub fn commanded_speed(&self) -> StepsPerSec {
        StepsPerSec(self.shared.commanded_speed.load(Ordering::Relaxed))
    }

    /// Currently configured acceleration.
    pub fn acceleration(&self) -> StepsPerSecSquared {
        StepsPerSecSquared(self.shared.acceleration.load(Ordering::Relaxed))
    }

    /// Change the ramp acceleration directly, bypassing the queue.
    ///
    /// Equivalent to [`Command::SetAcceleration`] but immediate; an
    /// in-flight ramp picks the new rate up at its next tick.
    pub fn set_acceleration(&self, value: StepsPerSecSquared) {
        self.shared
            .acceleration
            .store(value.clamped().0, Ordering::Relaxed);
    }

    /// Request the driver's low-power state.
    ///
    /// Honored at the next idle tick; ignored by drivers without sleep
    /// support. Never request sleep while motion is queued.
    pub fn sleep(&self) {
        self.shared
            .power_request
            .store(POWER_SLEEP, Ordering::Relaxed);
    }

    /// Request leaving the low-power state.
    pub fn wake(&self) {
        self.shared
            .power_request
            .store(POWER_WAKE, Ordering::Relaxed);
    }

    /// Active microstep resolution.
    pub fn microstep_mode(&self) -> MicrostepMode {
        MicrostepMode::from_divisor(self.shared.microstep_divisor.load(Ordering::Relaxed) as u16)
    }

    /// Whether the driver reported a hardware fault at its last tick.
    pub fn has_fault(&self) -> bool {
        self.shared.fault.load(Ordering::Relaxed)
    }

    /// Number of commands waiting in the queue.
    pub fn pending_commands(&self) -> usize {
        self.queue.len()
    }
}
