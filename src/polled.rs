//! Minimal polling controller.
//!
//! A single-context alternative to the interrupt-driven engine for
//! hosts without a spare timer or for bring-up: the application owns
//! the controller outright and calls [`PolledController::poll`] from
//! its main loop as often as it can. No ramping, no queue, no shared
//! state; one step is emitted whenever the speed-derived interval has
//! elapsed.

use crate::config::units::{Steps, StepsPerSec};
use crate::driver::{Direction, StepperDriver};

/// Step interval used when the speed is zero or invalid, so a
/// misconfigured controller creeps instead of free-running.
const MAX_STEP_INTERVAL_US: u64 = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Idle,
    Positioning,
    Continuous(Direction),
}

/// Polling stepper controller.
///
/// Step timing accuracy is bounded by the poll rate: poll at least
/// twice per step interval for usable motion.
pub struct PolledController<D: StepperDriver> {
    driver: D,
    mode: Mode,
    current_position: i64,
    target_position: i64,
    step_interval_us: u64,
    last_step_us: u64,
    max_speed: StepsPerSec,
}

impl<D: StepperDriver> PolledController<D> {
    /// Wrap a driver. Call [`PolledController::init`] before moving.
    pub fn new(driver: D, max_speed: StepsPerSec) -> Self {
        Self {
            driver,
            mode: Mode::Idle,
            current_position: 0,
            target_position: 0,
            step_interval_us: MAX_STEP_INTERVAL_US,
            last_step_us: 0,
            max_speed,
        }
    }

    /// Initialize the wrapped driver and leave it disabled.
    pub fn init(&mut self) {
        self.driver.init();
        self.driver.set_max_speed(self.max_speed);
    }

    /// Start a relative move at the current speed setting.
    pub fn move_by(&mut self, delta: Steps) {
        self.target_position = self.current_position + delta.0;
        if self.target_position != self.current_position {
            self.mode = Mode::Positioning;
            self.driver.enable();
        }
    }

    /// Start continuous rotation at the current speed setting.
    pub fn start_continuous(&mut self, direction: Direction, speed: StepsPerSec) {
        self.set_speed(speed);
        self.mode = Mode::Continuous(direction);
        self.driver.enable();
    }

    /// Stop and disable the driver.
    pub fn stop(&mut self) {
        self.mode = Mode::Idle;
        self.target_position = self.current_position;
        self.driver.disable();
    }

    /// Set the stepping speed. Zero and invalid speeds map to the
    /// slowest interval instead of stopping.
    pub fn set_speed(&mut self, speed: StepsPerSec) {
        let clamped = speed.clamped(self.max_speed);
        self.driver.set_speed(clamped);
        self.step_interval_us = if clamped.0 > 0.0 {
            (1_000_000.0 / clamped.0 as f64) as u64
        } else {
            MAX_STEP_INTERVAL_US
        };
    }

    /// Set the maximum speed used for clamping.
    pub fn set_max_speed(&mut self, max_speed: StepsPerSec) {
        self.max_speed = max_speed;
        self.driver.set_max_speed(max_speed);
    }

    /// Emit at most one step if the step interval has elapsed.
    ///
    /// `now_us` is a monotonic microsecond timestamp. Returns whether a
    /// step was emitted.
    pub fn poll(&mut self, now_us: u64) -> bool {
        let direction = match self.mode {
            Mode::Idle => return false,
            Mode::Positioning => {
                let remaining = self.target_position - self.current_position;
                if remaining == 0 {
                    self.stop();
                    return false;
                }
                Direction::from_steps(remaining)
            }
            Mode::Continuous(direction) => direction,
        };

        if now_us.saturating_sub(self.last_step_us) < self.step_interval_us {
            return false;
        }
        self.last_step_us = now_us;

        self.driver.set_direction(direction);
        self.driver.step();
        self.current_position += direction.sign();

        if self.mode == Mode::Positioning && self.current_position == self.target_position {
            self.stop();
        }
        true
    }

    /// Whether a move or continuous rotation is active.
    pub fn is_running(&self) -> bool {
        self.mode != Mode::Idle
    }

    /// Current absolute position in steps.
    pub fn current_position(&self) -> Steps {
        Steps(self.current_position)
    }

    /// Rebase the position counter (re-zeroing, e.g. after homing).
    ///
    /// The target is rebased to the same value, cancelling any
    /// in-flight move.
    pub fn set_current_position(&mut self, position: Steps) {
        self.current_position = position.0;
        self.target_position = position.0;
    }

    /// Steps remaining to the target; zero when idle or continuous.
    pub fn distance_to_go(&self) -> Steps {
        match self.mode {
            Mode::Positioning => Steps(self.target_position - self.current_position),
            _ => Steps(0),
        }
    }

    /// Borrow the wrapped driver.
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Mutably borrow the wrapped driver, e.g. for microstep setup.
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RecordingDriver {
        enabled: bool,
        direction: Direction,
        speed: StepsPerSec,
        max_speed: StepsPerSec,
        steps: i64,
    }

    impl RecordingDriver {
        fn new() -> Self {
            Self {
                enabled: false,
                direction: Direction::Clockwise,
                speed: StepsPerSec(0.0),
                max_speed: StepsPerSec(0.0),
                steps: 0,
            }
        }
    }

    impl StepperDriver for RecordingDriver {
        fn init(&mut self) {
            self.enabled = false;
        }

        fn set_direction(&mut self, direction: Direction) {
            self.direction = direction;
        }

        fn set_speed(&mut self, speed: StepsPerSec) {
            self.speed = speed.clamped(self.max_speed);
        }

        fn step(&mut self) {
            if self.enabled {
                self.steps += self.direction.sign();
            }
        }

        fn enable(&mut self) {
            self.enabled = true;
        }

        fn disable(&mut self) {
            self.enabled = false;
        }

        fn set_max_speed(&mut self, max_speed: StepsPerSec) {
            self.max_speed = max_speed;
        }

        fn max_speed(&self) -> StepsPerSec {
            self.max_speed
        }

        fn speed(&self) -> StepsPerSec {
            self.speed
        }

        fn is_enabled(&self) -> bool {
            self.enabled
        }

        fn direction(&self) -> Direction {
            self.direction
        }
    }

    fn controller() -> PolledController<RecordingDriver> {
        let mut controller = PolledController::new(RecordingDriver::new(), StepsPerSec(10_000.0));
        controller.init();
        controller
    }

    #[test]
    fn test_positioning_completes_and_disables() {
        let mut controller = controller();
        controller.set_speed(StepsPerSec(1000.0));
        controller.move_by(Steps(5));
        assert!(controller.is_running());
        assert_eq!(controller.distance_to_go(), Steps(5));

        let mut now = 0u64;
        while controller.is_running() {
            controller.poll(now);
            now += 1000;
            assert!(now < 100_000, "move did not terminate");
        }

        assert_eq!(controller.current_position(), Steps(5));
        assert_eq!(controller.driver().steps, 5);
        assert!(!controller.driver().enabled);
    }

    #[test]
    fn test_step_interval_honored() {
        let mut controller = controller();
        controller.set_speed(StepsPerSec(100.0)); // 10 ms interval
        controller.move_by(Steps(10));

        assert!(controller.poll(10_000));
        assert!(!controller.poll(15_000));
        assert!(controller.poll(20_000));
        assert_eq!(controller.current_position(), Steps(2));
    }

    #[test]
    fn test_continuous_until_stop() {
        let mut controller = controller();
        controller.start_continuous(Direction::CounterClockwise, StepsPerSec(1000.0));

        let mut now = 1000u64;
        for _ in 0..50 {
            controller.poll(now);
            now += 1000;
        }
        assert_eq!(controller.current_position(), Steps(-50));

        controller.stop();
        assert!(!controller.is_running());
        assert!(!controller.poll(now + 1000));
        assert_eq!(controller.current_position(), Steps(-50));
    }

    #[test]
    fn test_zero_speed_falls_back_to_slowest_interval() {
        let mut controller = controller();
        controller.set_speed(StepsPerSec(0.0));
        controller.move_by(Steps(3));

        assert!(!controller.poll(500_000));
        assert!(controller.poll(1_000_000));
    }

    #[test]
    fn test_set_current_position_rezeros() {
        let mut controller = controller();
        controller.set_speed(StepsPerSec(1000.0));
        controller.move_by(Steps(10));
        controller.poll(1000);
        controller.poll(2000);
        assert_eq!(controller.current_position(), Steps(2));

        controller.set_current_position(Steps(100));
        assert_eq!(controller.current_position(), Steps(100));
        assert_eq!(controller.distance_to_go(), Steps(0));
    }
}
