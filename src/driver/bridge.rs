//! Dual H-bridge driver for 2-phase, 4-wire stepper motors.
//!
//! Generates the standard 4-step full-step commutation sequence on four
//! phase pins; two enable pins gate the bridges and are always driven
//! together. No microstepping, no low-power mode.

use embedded_hal::digital::OutputPin;

use crate::config::units::StepsPerSec;

use super::{Direction, StepperDriver};

/// Full-step commutation table, indexed by sequence position.
///
/// Each entry is the (A, B, C, D) phase pin state: 1010, 0110, 0101, 1001.
const SEQUENCE: [(bool, bool, bool, bool); 4] = [
    (true, false, true, false),
    (false, true, true, false),
    (false, true, false, true),
    (true, false, false, true),
];

/// Driver for a dual H-bridge (e.g. L298N-class) stepper stage.
///
/// Generic over the four phase pins and two enable pins, all
/// `embedded-hal 1.0` [`OutputPin`]s.
pub struct BridgeDriver<A, B, C, D, EA, EB>
where
    A: OutputPin,
    B: OutputPin,
    C: OutputPin,
    D: OutputPin,
    EA: OutputPin,
    EB: OutputPin,
{
    phase_a: A,
    phase_b: B,
    phase_c: C,
    phase_d: D,
    enable_a: EA,
    enable_b: EB,

    /// Position in the 4-step commutation sequence.
    sequence_index: u8,

    enabled: bool,
    direction: Direction,
    speed: StepsPerSec,
    max_speed: StepsPerSec,
}

impl<A, B, C, D, EA, EB> BridgeDriver<A, B, C, D, EA, EB>
where
    A: OutputPin,
    B: OutputPin,
    C: OutputPin,
    D: OutputPin,
    EA: OutputPin,
    EB: OutputPin,
{
    /// Create a new bridge driver from its six pins.
    ///
    /// The driver starts disabled; call [`StepperDriver::init`] before use.
    pub fn new(phase_a: A, phase_b: B, phase_c: C, phase_d: D, enable_a: EA, enable_b: EB) -> Self {
        Self {
            phase_a,
            phase_b,
            phase_c,
            phase_d,
            enable_a,
            enable_b,
            sequence_index: 0,
            enabled: false,
            direction: Direction::Clockwise,
            speed: StepsPerSec(0.0),
            max_speed: StepsPerSec(1000.0),
        }
    }

    /// Current position in the 4-step commutation sequence (0..=3).
    #[inline]
    pub fn sequence_index(&self) -> u8 {
        self.sequence_index
    }

    fn apply_phase_pattern(&mut self) {
        let (a, b, c, d) = SEQUENCE[self.sequence_index as usize];
        let _ = self.phase_a.set_state(a.into());
        let _ = self.phase_b.set_state(b.into());
        let _ = self.phase_c.set_state(c.into());
        let _ = self.phase_d.set_state(d.into());
    }
}

impl<A, B, C, D, EA, EB> StepperDriver for BridgeDriver<A, B, C, D, EA, EB>
where
    A: OutputPin,
    B: OutputPin,
    C: OutputPin,
    D: OutputPin,
    EA: OutputPin,
    EB: OutputPin,
{
    fn init(&mut self) {
        self.disable();

        // Rest position: all phases released.
        let _ = self.phase_a.set_low();
        let _ = self.phase_b.set_low();
        let _ = self.phase_c.set_low();
        let _ = self.phase_d.set_low();
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

        self.sequence_index = match self.direction {
            Direction::Clockwise => (self.sequence_index + 1) % 4,
            Direction::CounterClockwise => self.sequence_index.checked_sub(1).unwrap_or(3),
        };

        self.apply_phase_pattern();
    }

    fn enable(&mut self) {
        let _ = self.enable_a.set_high();
        let _ = self.enable_b.set_high();
        self.enabled = true;
    }

    fn disable(&mut self) {
        let _ = self.enable_a.set_low();
        let _ = self.enable_b.set_low();
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

#[cfg(test)]
mod tests {
    use embedded_hal_mock::eh1::digital::{
        Mock as PinMock, State as PinState, Transaction as PinTransaction,
    };

    use super::*;

    fn phase_expectations(pattern: (bool, bool, bool, bool)) -> [Vec<PinTransaction>; 4] {
        let state = |high: bool| {
            if high {
                PinState::High
            } else {
                PinState::Low
            }
        };
        [
            vec![PinTransaction::set(state(pattern.0))],
            vec![PinTransaction::set(state(pattern.1))],
            vec![PinTransaction::set(state(pattern.2))],
            vec![PinTransaction::set(state(pattern.3))],
        ]
    }

    #[test]
    fn test_clockwise_sequence_wraps() {
        // Four CW steps visit patterns 1..=3 then wrap back to 0.
        let mut expectations: [Vec<PinTransaction>; 4] = Default::default();
        for index in [1usize, 2, 3, 0] {
            let per_pin = phase_expectations(SEQUENCE[index]);
            for (pin, transactions) in expectations.iter_mut().zip(per_pin) {
                pin.extend(transactions);
            }
        }

        let [a, b, c, d] = expectations;
        let mut phase_a = PinMock::new(&a);
        let mut phase_b = PinMock::new(&b);
        let mut phase_c = PinMock::new(&c);
        let mut phase_d = PinMock::new(&d);
        let mut enable_a = PinMock::new(&[PinTransaction::set(PinState::High)]);
        let mut enable_b = PinMock::new(&[PinTransaction::set(PinState::High)]);

        let mut driver = BridgeDriver::new(
            phase_a.clone(),
            phase_b.clone(),
            phase_c.clone(),
            phase_d.clone(),
            enable_a.clone(),
            enable_b.clone(),
        );

        driver.enable();
        assert_eq!(driver.sequence_index(), 0);

        for expected_index in [1, 2, 3, 0] {
            driver.step();
            assert_eq!(driver.sequence_index(), expected_index);
        }

        phase_a.done();
        phase_b.done();
        phase_c.done();
        phase_d.done();
        enable_a.done();
        enable_b.done();
    }

    #[test]
    fn test_counterclockwise_reverses_sequence() {
        let mut expectations: [Vec<PinTransaction>; 4] = Default::default();
        for index in [3usize, 2, 1, 0] {
            let per_pin = phase_expectations(SEQUENCE[index]);
            for (pin, transactions) in expectations.iter_mut().zip(per_pin) {
                pin.extend(transactions);
            }
        }

        let [a, b, c, d] = expectations;
        let mut phase_a = PinMock::new(&a);
        let mut phase_b = PinMock::new(&b);
        let mut phase_c = PinMock::new(&c);
        let mut phase_d = PinMock::new(&d);
        let mut enable_a = PinMock::new(&[PinTransaction::set(PinState::High)]);
        let mut enable_b = PinMock::new(&[PinTransaction::set(PinState::High)]);

        let mut driver = BridgeDriver::new(
            phase_a.clone(),
            phase_b.clone(),
            phase_c.clone(),
            phase_d.clone(),
            enable_a.clone(),
            enable_b.clone(),
        );

        driver.enable();
        driver.set_direction(Direction::CounterClockwise);

        for expected_index in [3, 2, 1, 0] {
            driver.step();
            assert_eq!(driver.sequence_index(), expected_index);
        }

        phase_a.done();
        phase_b.done();
        phase_c.done();
        phase_d.done();
        enable_a.done();
        enable_b.done();
    }

    #[test]
    fn test_step_while_disabled_is_a_no_op() {
        // No pin transactions expected at all.
        let mut phase_a = PinMock::new(&[]);
        let mut phase_b = PinMock::new(&[]);
        let mut phase_c = PinMock::new(&[]);
        let mut phase_d = PinMock::new(&[]);
        let mut enable_a = PinMock::new(&[]);
        let mut enable_b = PinMock::new(&[]);

        let mut driver = BridgeDriver::new(
            phase_a.clone(),
            phase_b.clone(),
            phase_c.clone(),
            phase_d.clone(),
            enable_a.clone(),
            enable_b.clone(),
        );

        driver.step();
        assert_eq!(driver.sequence_index(), 0);

        phase_a.done();
        phase_b.done();
        phase_c.done();
        phase_d.done();
        enable_a.done();
        enable_b.done();
    }

    #[test]
    fn test_enable_drives_both_bridges() {
        let mut phase_a = PinMock::new(&[]);
        let mut phase_b = PinMock::new(&[]);
        let mut phase_c = PinMock::new(&[]);
        let mut phase_d = PinMock::new(&[]);
        let mut enable_a = PinMock::new(&[
            PinTransaction::set(PinState::High),
            PinTransaction::set(PinState::Low),
        ]);
        let mut enable_b = PinMock::new(&[
            PinTransaction::set(PinState::High),
            PinTransaction::set(PinState::Low),
        ]);

        let mut driver = BridgeDriver::new(
            phase_a.clone(),
            phase_b.clone(),
            phase_c.clone(),
            phase_d.clone(),
            enable_a.clone(),
            enable_b.clone(),
        );

        driver.enable();
        assert!(driver.is_enabled());
        driver.disable();
        assert!(!driver.is_enabled());

        phase_a.done();
        phase_b.done();
        phase_c.done();
        phase_d.done();
        enable_a.done();
        enable_b.done();
    }
}
