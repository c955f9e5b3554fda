//! Command consumer task.
//!
//! Drains the [`CommandQueue`] in a normal (non-interrupt) execution
//! context and turns each command into a grouped write to the
//! [`SharedState`]. The consumer is the only writer of the mode flags
//! and the target position, so the tick never has to arbitrate between
//! competing commands: it just observes the latest published group.

use embedded_hal::delay::DelayNs;

use crate::command::Command;
use crate::config::units::{Steps, StepsPerSec};
use crate::driver::Direction;
use crate::engine::queue::CommandQueue;
use crate::engine::shared::{SharedState, POWER_WAKE};
use portable_atomic::Ordering;

/// How long one `service` call waits for a command before yielding.
const RECEIVE_WAIT_MS: u32 = 10;

/// Yield slice between polls while waiting.
const POLL_SLICE_MS: u32 = 1;

/// Applies queued commands to the shared motion state.
///
/// Run [`CommandConsumer::service`] from a dedicated task loop, or call
/// [`CommandConsumer::poll_once`] from a superloop.
pub struct CommandConsumer<'a> {
    queue: &'a CommandQueue,
    shared: &'a SharedState,
    max_speed: StepsPerSec,
}

impl<'a> CommandConsumer<'a> {
    pub(crate) fn new(
        queue: &'a CommandQueue,
        shared: &'a SharedState,
        max_speed: StepsPerSec,
    ) -> Self {
        Self {
            queue,
            shared,
            max_speed,
        }
    }

    /// Apply at most one queued command. Returns whether one was applied.
    pub fn poll_once(&mut self) -> bool {
        match self.queue.dequeue() {
            Some(command) => {
                self.apply(command);
                true
            }
            None => false,
        }
    }

    /// One scheduling slice of the consumer loop: wait up to 10 ms for
    /// a command, apply everything that arrives, then yield for 1 ms.
    ///
    /// Call this in a loop from the consumer task:
    ///
    /// ```rust,ignore
    /// loop {
    ///     consumer.service(&mut delay);
    /// }
    /// ```
    pub fn service<D: DelayNs>(&mut self, delay: &mut D) {
        let mut waited_ms = 0;
        while !self.poll_once() {
            if waited_ms >= RECEIVE_WAIT_MS {
                break;
            }
            delay.delay_ms(POLL_SLICE_MS);
            waited_ms += POLL_SLICE_MS;
        }

        // Drain whatever else is already queued before yielding.
        while self.poll_once() {}

        delay.delay_ms(POLL_SLICE_MS);
    }

    /// Apply a single command to the shared state.
    ///
    /// Writes that start or redirect motion are grouped and published
    /// with a single epoch bump so the tick restarts its ramp exactly
    /// once. Speed-only and acceleration-only updates do not bump the
    /// epoch; the tick picks them up mid-ramp.
    fn apply(&mut self, command: Command) {
        let shared = self.shared;
        match command {
            Command::MoveToAbsolute { position, speed } => {
                self.begin_positioning(position, speed, false);
            }
            Command::MoveBySteps { delta, speed } => {
                let current = Steps(shared.current_position.load(Ordering::Relaxed));
                self.begin_positioning(current + delta, speed, false);
            }
            Command::SetSpeed { speed } => {
                shared
                    .commanded_speed
                    .store(speed.clamped(self.max_speed).0, Ordering::Relaxed);
            }
            Command::StartJog { speed } => {
                // Enter jog at the current position; motion follows from
                // the next MoveJogSteps. A zero-length target stops at
                // the first tick, which is the intended idle state.
                let current = Steps(shared.current_position.load(Ordering::Relaxed));
                self.begin_positioning(current, speed, true);
            }
            Command::StopJog => self.stop(),
            Command::MoveJogSteps { delta, speed } => {
                let current = Steps(shared.current_position.load(Ordering::Relaxed));
                self.begin_positioning(current + delta, speed, true);
            }
            Command::StartContinuous { direction, speed } => {
                shared
                    .commanded_speed
                    .store(speed.clamped(self.max_speed).0, Ordering::Relaxed);
                shared
                    .direction_cw
                    .store(direction == Direction::Clockwise, Ordering::Relaxed);
                shared.jog.store(false, Ordering::Relaxed);
                shared.continuous.store(true, Ordering::Relaxed);
                shared.running.store(true, Ordering::Relaxed);
                shared.publish();

                // Make sure a sleeping driver is brought back before
                // motion is expected.
                shared.power_request.store(POWER_WAKE, Ordering::Relaxed);
            }
            Command::StopMotor => self.stop(),
            Command::SetAcceleration { value } => {
                shared
                    .acceleration
                    .store(value.clamped().0, Ordering::Relaxed);
            }
        }
    }

    /// Start a positioning move toward `target`. `jog` selects the
    /// ramp-bypassing jog mode.
    fn begin_positioning(&mut self, target: Steps, speed: StepsPerSec, jog: bool) {
        let shared = self.shared;
        shared.target_position.store(target.0, Ordering::Relaxed);
        shared
            .commanded_speed
            .store(speed.clamped(self.max_speed).0, Ordering::Relaxed);
        shared.continuous.store(false, Ordering::Relaxed);
        shared.jog.store(jog, Ordering::Relaxed);
        shared.running.store(true, Ordering::Relaxed);
        shared.publish();
    }

    /// Stop motion and leave every mode.
    fn stop(&mut self) {
        let shared = self.shared;
        shared.running.store(false, Ordering::Relaxed);
        shared.continuous.store(false, Ordering::Relaxed);
        shared.jog.store(false, Ordering::Relaxed);
        shared.publish();
    }
}
