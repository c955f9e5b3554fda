//! Timer tick motion engine.
//!
//! [`MotionEngine::tick`] is the interrupt-side half of the engine: it
//! owns the driver exclusively, derives step timing from the shared
//! motion state and emits at most a handful of step pulses per firing.
//! It never blocks, never allocates and touches the shared state only
//! through atomics.

use portable_atomic::Ordering;

use crate::config::units::{Steps, StepsPerSec};
use crate::config::ControllerConfig;
use crate::driver::{Direction, MicrostepMode, StepperDriver};
use crate::engine::shared::{SharedState, POWER_NONE, POWER_SLEEP, POWER_WAKE};

/// Interrupt-context motion engine.
///
/// Owns the [`StepperDriver`] and the ramp state (current speed and the
/// fractional-step accumulator); nothing else may touch the driver once
/// the engine is constructed. Call [`MotionEngine::tick`] from the
/// periodic timer interrupt with a monotonic microsecond timestamp.
pub struct MotionEngine<'a, D: StepperDriver> {
    driver: D,
    shared: &'a SharedState,
    /// Ramped speed in steps/sec. f64 so that the accumulator error
    /// stays below one step over arbitrarily long moves.
    current_speed: f64,
    /// Fractional steps accrued but not yet emitted, in `[0, 1)` between
    /// ticks.
    step_accumulator: f64,
    last_update_us: u64,
    epoch: u32,
}

impl<'a, D: StepperDriver> MotionEngine<'a, D> {
    /// Take ownership of the driver and bring it to a known state:
    /// initialized, disabled, configured for the requested maximum
    /// speed and microstep resolution.
    pub(crate) fn new(mut driver: D, shared: &'a SharedState, config: &ControllerConfig) -> Self {
        driver.init();
        driver.set_max_speed(config.max_speed);

        let mode = MicrostepMode::from_divisor(config.microsteps);
        driver.set_microstep_mode(mode);
        shared
            .microstep_divisor
            .store(driver.microstep_mode().divisor() as u8, Ordering::Relaxed);
        shared
            .acceleration
            .store(config.acceleration.clamped().0, Ordering::Relaxed);

        Self {
            driver,
            shared,
            current_speed: 0.0,
            step_accumulator: 0.0,
            last_update_us: 0,
            epoch: shared.epoch.load(Ordering::Acquire),
        }
    }

    /// Advance motion by one timer period.
    ///
    /// `now_us` is a monotonic microsecond timestamp; only deltas
    /// matter, so any free-running counter works. The very first tick
    /// after a command only establishes the time base.
    pub fn tick(&mut self, now_us: u64) {
        let shared = self.shared;

        // A new command group restarts the ramp from standstill.
        let epoch = shared.epoch.load(Ordering::Acquire);
        if epoch != self.epoch {
            self.epoch = epoch;
            self.current_speed = 0.0;
            self.step_accumulator = 0.0;
            self.last_update_us = now_us;
        }

        if !shared.running.load(Ordering::Relaxed) {
            self.idle(now_us);
            return;
        }

        if !self.driver.is_enabled() {
            self.driver.enable();
        }

        let elapsed_s = (now_us.saturating_sub(self.last_update_us)) as f64 / 1_000_000.0;
        self.last_update_us = now_us;

        self.update_speed(elapsed_s);
        self.step_accumulator += self.current_speed * elapsed_s;

        let continuous = shared.continuous.load(Ordering::Relaxed);
        while self.step_accumulator >= 1.0 {
            self.step_accumulator -= 1.0;

            let direction = if continuous {
                if shared.direction_cw.load(Ordering::Relaxed) {
                    Direction::Clockwise
                } else {
                    Direction::CounterClockwise
                }
            } else {
                let remaining = shared.target_position.load(Ordering::Relaxed)
                    - shared.current_position.load(Ordering::Relaxed);
                if remaining == 0 {
                    // Target reached: stop and power down in the same
                    // tick, so running=false is never observed with the
                    // stage still energized. Mode flags are left alone,
                    // they belong to the consumer.
                    shared.running.store(false, Ordering::Relaxed);
                    self.driver.disable();
                    self.current_speed = 0.0;
                    self.step_accumulator = 0.0;
                    break;
                }
                Direction::from_steps(remaining)
            };

            self.driver.set_direction(direction);
            self.driver.step();
            shared
                .current_position
                .fetch_add(direction.sign(), Ordering::Relaxed);
        }

        shared
            .fault
            .store(self.driver.has_fault(), Ordering::Relaxed);
    }

    /// Idle branch: power the motor down, service sleep/wake requests
    /// and keep the time base fresh so the next move does not see a
    /// huge first elapsed interval.
    fn idle(&mut self, now_us: u64) {
        if self.driver.is_enabled() {
            self.driver.disable();
        }
        self.current_speed = 0.0;
        self.step_accumulator = 0.0;
        self.last_update_us = now_us;

        self.service_power_request();

        self.shared
            .fault
            .store(self.driver.has_fault(), Ordering::Relaxed);
    }

    /// Ramp the current speed toward the commanded speed.
    ///
    /// Jog mode and zero acceleration both apply the commanded speed
    /// instantaneously. The ramp never overshoots the commanded value
    /// and never goes negative.
    fn update_speed(&mut self, elapsed_s: f64) {
        let shared = self.shared;
        let commanded = shared.commanded_speed.load(Ordering::Relaxed) as f64;
        let acceleration = shared.acceleration.load(Ordering::Relaxed) as f64;

        if shared.jog.load(Ordering::Relaxed) || acceleration <= 0.0 {
            self.current_speed = commanded;
            return;
        }

        let delta = acceleration * elapsed_s;
        if self.current_speed < commanded {
            self.current_speed = (self.current_speed + delta).min(commanded);
        } else if self.current_speed > commanded {
            self.current_speed = (self.current_speed - delta).max(commanded).max(0.0);
        }
    }

    /// Honor a pending sleep/wake request. Only called while idle; a
    /// wake settle delay in interrupt context is harmless here because
    /// no motion is pending.
    fn service_power_request(&mut self) {
        match self.shared.power_request.swap(POWER_NONE, Ordering::Relaxed) {
            POWER_SLEEP => {
                self.driver.disable();
                self.driver.sleep();
            }
            POWER_WAKE => self.driver.wake(),
            _ => {}
        }
    }

    /// Borrow the driver, e.g. to read its speed setting in tests.
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Current ramped speed in steps per second.
    pub fn current_speed(&self) -> StepsPerSec {
        StepsPerSec(self.current_speed as f32)
    }

    /// Steps remaining to the positioning target.
    pub fn distance_to_go(&self) -> Steps {
        Steps(
            self.shared.target_position.load(Ordering::Relaxed)
                - self.shared.current_position.load(Ordering::Relaxed),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Counting test double; records steps per direction.
    struct CountingDriver {
        enabled: bool,
        direction: Direction,
        speed: StepsPerSec,
        max_speed: StepsPerSec,
        cw_steps: u64,
        ccw_steps: u64,
        sleeping: bool,
        fault: bool,
    }

    impl Default for CountingDriver {
        fn default() -> Self {
            Self {
                enabled: false,
                direction: Direction::Clockwise,
                speed: StepsPerSec(0.0),
                max_speed: StepsPerSec(0.0),
                cw_steps: 0,
                ccw_steps: 0,
                sleeping: false,
                fault: false,
            }
        }
    }

    impl StepperDriver for CountingDriver {
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
            if !self.enabled {
                return;
            }
            match self.direction {
                Direction::Clockwise => self.cw_steps += 1,
                Direction::CounterClockwise => self.ccw_steps += 1,
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

        fn has_fault(&mut self) -> bool {
            self.fault
        }

        fn sleep(&mut self) {
            self.sleeping = true;
        }

        fn wake(&mut self) {
            self.sleeping = false;
        }
    }

    const TICK_US: u64 = 1000;

    fn run_ticks(engine: &mut MotionEngine<'_, CountingDriver>, start_us: u64, count: u64) -> u64 {
        let mut now = start_us;
        for _ in 0..count {
            engine.tick(now);
            now += TICK_US;
        }
        now
    }

    #[test]
    fn test_positioning_terminates_at_target() {
        let shared = SharedState::new();
        let config = ControllerConfig {
            acceleration: crate::config::units::StepsPerSecSquared(0.0),
            ..Default::default()
        };
        let mut engine = MotionEngine::new(CountingDriver::default(), &shared, &config);

        shared.target_position.store(50, Ordering::Relaxed);
        shared.commanded_speed.store(1000.0, Ordering::Relaxed);
        shared.running.store(true, Ordering::Relaxed);
        shared.publish();

        run_ticks(&mut engine, 0, 200);

        assert_eq!(shared.current_position.load(Ordering::Relaxed), 50);
        assert!(!shared.running.load(Ordering::Relaxed));
        assert_eq!(engine.driver().cw_steps, 50);
    }

    #[test]
    fn test_driver_disabled_in_the_stopping_tick() {
        let shared = SharedState::new();
        let config = ControllerConfig {
            acceleration: crate::config::units::StepsPerSecSquared(0.0),
            ..Default::default()
        };
        let mut engine = MotionEngine::new(CountingDriver::default(), &shared, &config);

        shared.target_position.store(1, Ordering::Relaxed);
        shared.commanded_speed.store(4000.0, Ordering::Relaxed);
        shared.running.store(true, Ordering::Relaxed);
        shared.publish();

        // First tick establishes the time base; the second emits the
        // single step and reaches the target.
        engine.tick(0);
        engine.tick(TICK_US);

        assert_eq!(shared.current_position.load(Ordering::Relaxed), 1);
        assert!(!shared.running.load(Ordering::Relaxed));
        assert!(!engine.driver().enabled);
    }

    #[test]
    fn test_negative_positioning_steps_ccw() {
        let shared = SharedState::new();
        let config = ControllerConfig {
            acceleration: crate::config::units::StepsPerSecSquared(0.0),
            ..Default::default()
        };
        let mut engine = MotionEngine::new(CountingDriver::default(), &shared, &config);

        shared.target_position.store(-30, Ordering::Relaxed);
        shared.commanded_speed.store(1000.0, Ordering::Relaxed);
        shared.running.store(true, Ordering::Relaxed);
        shared.publish();

        run_ticks(&mut engine, 0, 200);

        assert_eq!(shared.current_position.load(Ordering::Relaxed), -30);
        assert_eq!(engine.driver().ccw_steps, 30);
        assert_eq!(engine.driver().cw_steps, 0);
    }

    #[test]
    fn test_ramp_is_monotonic_until_cruise() {
        let shared = SharedState::new();
        let config = ControllerConfig::default();
        let mut engine = MotionEngine::new(CountingDriver::default(), &shared, &config);

        shared.target_position.store(1_000_000, Ordering::Relaxed);
        shared.commanded_speed.store(2000.0, Ordering::Relaxed);
        shared.running.store(true, Ordering::Relaxed);
        shared.publish();

        let mut now = 0u64;
        let mut last_speed = 0.0f32;
        engine.tick(now);
        now += TICK_US;
        // 2000 steps/s at 3200 steps/s^2 takes 625 ms to reach.
        for _ in 0..700 {
            engine.tick(now);
            now += TICK_US;
            let speed = engine.current_speed().0;
            assert!(speed >= last_speed);
            assert!(speed <= 2000.0 + 1e-3);
            last_speed = speed;
        }
        assert!((last_speed - 2000.0).abs() < 1e-3);
    }

    #[test]
    fn test_jog_bypasses_ramp() {
        let shared = SharedState::new();
        let config = ControllerConfig::default();
        let mut engine = MotionEngine::new(CountingDriver::default(), &shared, &config);

        shared.target_position.store(10_000, Ordering::Relaxed);
        shared.commanded_speed.store(1500.0, Ordering::Relaxed);
        shared.jog.store(true, Ordering::Relaxed);
        shared.running.store(true, Ordering::Relaxed);
        shared.publish();

        engine.tick(0);
        engine.tick(TICK_US);
        assert_eq!(engine.current_speed().0, 1500.0);
    }

    #[test]
    fn test_continuous_runs_until_stopped() {
        let shared = SharedState::new();
        let config = ControllerConfig {
            acceleration: crate::config::units::StepsPerSecSquared(0.0),
            ..Default::default()
        };
        let mut engine = MotionEngine::new(CountingDriver::default(), &shared, &config);

        shared.commanded_speed.store(1000.0, Ordering::Relaxed);
        shared.direction_cw.store(false, Ordering::Relaxed);
        shared.continuous.store(true, Ordering::Relaxed);
        shared.running.store(true, Ordering::Relaxed);
        shared.publish();

        let now = run_ticks(&mut engine, 0, 101);
        let moved = engine.driver().ccw_steps;
        assert!(moved >= 99 && moved <= 101, "moved {} steps", moved);

        shared.running.store(false, Ordering::Relaxed);
        shared.continuous.store(false, Ordering::Relaxed);
        shared.publish();
        engine.tick(now);
        assert!(!engine.driver().enabled);
        assert_eq!(engine.driver().ccw_steps, moved);
    }

    #[test]
    fn test_step_rate_converges_to_commanded() {
        let shared = SharedState::new();
        let config = ControllerConfig {
            acceleration: crate::config::units::StepsPerSecSquared(0.0),
            ..Default::default()
        };
        let mut engine = MotionEngine::new(CountingDriver::default(), &shared, &config);

        shared.commanded_speed.store(733.0, Ordering::Relaxed);
        shared.continuous.store(true, Ordering::Relaxed);
        shared.running.store(true, Ordering::Relaxed);
        shared.publish();

        // 10 simulated seconds at 1 kHz.
        run_ticks(&mut engine, 0, 10_001);
        let steps = engine.driver().cw_steps as i64;
        assert!((steps - 7330).abs() <= 1, "emitted {} steps", steps);
    }

    #[test]
    fn test_idle_tick_disables_driver_and_services_power() {
        let shared = SharedState::new();
        let config = ControllerConfig::default();
        let mut engine = MotionEngine::new(CountingDriver::default(), &shared, &config);

        engine.driver.enable();
        shared.power_request.store(POWER_SLEEP, Ordering::Relaxed);
        engine.tick(0);

        assert!(!engine.driver().enabled);
        assert!(engine.driver().sleeping);
        assert_eq!(shared.power_request.load(Ordering::Relaxed), POWER_NONE);

        shared.power_request.store(POWER_WAKE, Ordering::Relaxed);
        engine.tick(TICK_US);
        assert!(!engine.driver().sleeping);
    }

    #[test]
    fn test_fault_flag_is_mirrored() {
        let shared = SharedState::new();
        let config = ControllerConfig::default();
        let mut engine = MotionEngine::new(CountingDriver::default(), &shared, &config);

        engine.tick(0);
        assert!(!shared.fault.load(Ordering::Relaxed));

        engine.driver.fault = true;
        engine.tick(TICK_US);
        assert!(shared.fault.load(Ordering::Relaxed));
    }
}
