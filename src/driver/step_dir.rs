//! STEP/DIR driver for external microstepping driver chips.
//!
//! Drives a DRV8825-class stage: one pulse per step on STEP, level
//! direction on DIR, active-low ENABLE, optional M0/M1/M2 microstep
//! select pins, an optional combined SLEEP/RESET pin (high = awake) and
//! an optional active-low FAULT input.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, InputPin, OutputPin};

use crate::config::units::StepsPerSec;

use super::{Direction, MicrostepMode, StepperDriver};

/// Settle time budgeted after waking the driver, in microseconds.
///
/// The chip needs this long after SLEEP goes high before step pulses
/// can be trusted.
pub const WAKE_SETTLE_US: u32 = 1000;

/// Default step pulse width in microseconds.
const DEFAULT_PULSE_WIDTH_US: u32 = 5;

/// Placeholder for a driver pin that is not wired.
///
/// Implements both pin traits so optional pins can be left off without
/// naming a concrete HAL type: writes are ignored and reads never
/// indicate a fault.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPin;

impl ErrorType for NoPin {
    type Error = core::convert::Infallible;
}

impl OutputPin for NoPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl InputPin for NoPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(false)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(false)
    }
}

/// Microstep select pattern (M0, M1, M2) for each mode.
const fn select_pattern(mode: MicrostepMode) -> (bool, bool, bool) {
    match mode {
        MicrostepMode::Full => (false, false, false),
        MicrostepMode::Half => (true, false, false),
        MicrostepMode::Quarter => (false, true, false),
        MicrostepMode::Eighth => (true, true, false),
        MicrostepMode::Sixteenth => (false, false, true),
        MicrostepMode::ThirtySecond => (true, false, true),
    }
}

/// STEP/DIR stepper driver with optional microstepping and power
/// management.
///
/// Construct with [`StepDirDriver::new`], then attach optional pins
/// with the `with_*` methods:
///
/// ```rust,ignore
/// let mut driver = StepDirDriver::new(step_pin, dir_pin, enable_pin, delay)
///     .with_microstep_pins(m0, m1, m2)
///     .with_sleep_pin(sleep_pin)
///     .with_fault_pin(fault_pin)
///     .with_microsteps(16);
/// driver.init();
/// ```
pub struct StepDirDriver<STEP, DIR, EN, DELAY, M0 = NoPin, M1 = NoPin, M2 = NoPin, SLP = NoPin, FLT = NoPin>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
    DELAY: DelayNs,
    M0: OutputPin,
    M1: OutputPin,
    M2: OutputPin,
    SLP: OutputPin,
    FLT: InputPin,
{
    step_pin: STEP,
    dir_pin: DIR,
    enable_pin: EN,
    delay: DELAY,

    microstep_pins: Option<(M0, M1, M2)>,
    sleep_pin: Option<SLP>,
    fault_pin: Option<FLT>,

    enabled: bool,
    asleep: bool,
    direction: Direction,
    speed: StepsPerSec,
    max_speed: StepsPerSec,
    microstep_mode: MicrostepMode,
    pulse_width_us: u32,
}

impl<STEP, DIR, EN, DELAY> StepDirDriver<STEP, DIR, EN, DELAY>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
    DELAY: DelayNs,
{
    /// Create a driver from the three mandatory pins and a delay
    /// provider (used for pulse width and wake settle timing).
    ///
    /// The driver starts disabled; call [`StepperDriver::init`] before use.
    pub fn new(step_pin: STEP, dir_pin: DIR, enable_pin: EN, delay: DELAY) -> Self {
        Self {
            step_pin,
            dir_pin,
            enable_pin,
            delay,
            microstep_pins: None,
            sleep_pin: None,
            fault_pin: None,
            enabled: false,
            asleep: false,
            direction: Direction::Clockwise,
            speed: StepsPerSec(0.0),
            max_speed: StepsPerSec(1000.0),
            microstep_mode: MicrostepMode::Full,
            pulse_width_us: DEFAULT_PULSE_WIDTH_US,
        }
    }
}

impl<STEP, DIR, EN, DELAY, M0, M1, M2, SLP, FLT> StepDirDriver<STEP, DIR, EN, DELAY, M0, M1, M2, SLP, FLT>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
    DELAY: DelayNs,
    M0: OutputPin,
    M1: OutputPin,
    M2: OutputPin,
    SLP: OutputPin,
    FLT: InputPin,
{
    /// Attach the three microstep select pins.
    pub fn with_microstep_pins<N0, N1, N2>(
        self,
        m0: N0,
        m1: N1,
        m2: N2,
    ) -> StepDirDriver<STEP, DIR, EN, DELAY, N0, N1, N2, SLP, FLT>
    where
        N0: OutputPin,
        N1: OutputPin,
        N2: OutputPin,
    {
        StepDirDriver {
            step_pin: self.step_pin,
            dir_pin: self.dir_pin,
            enable_pin: self.enable_pin,
            delay: self.delay,
            microstep_pins: Some((m0, m1, m2)),
            sleep_pin: self.sleep_pin,
            fault_pin: self.fault_pin,
            enabled: self.enabled,
            asleep: self.asleep,
            direction: self.direction,
            speed: self.speed,
            max_speed: self.max_speed,
            microstep_mode: self.microstep_mode,
            pulse_width_us: self.pulse_width_us,
        }
    }

    /// Attach the combined SLEEP/RESET pin (high = awake).
    ///
    /// The driver is considered asleep until [`StepperDriver::init`]
    /// or [`StepperDriver::wake`] raises the pin.
    pub fn with_sleep_pin<NSLP>(
        self,
        sleep_pin: NSLP,
    ) -> StepDirDriver<STEP, DIR, EN, DELAY, M0, M1, M2, NSLP, FLT>
    where
        NSLP: OutputPin,
    {
        StepDirDriver {
            step_pin: self.step_pin,
            dir_pin: self.dir_pin,
            enable_pin: self.enable_pin,
            delay: self.delay,
            microstep_pins: self.microstep_pins,
            sleep_pin: Some(sleep_pin),
            fault_pin: self.fault_pin,
            enabled: self.enabled,
            asleep: true,
            direction: self.direction,
            speed: self.speed,
            max_speed: self.max_speed,
            microstep_mode: self.microstep_mode,
            pulse_width_us: self.pulse_width_us,
        }
    }

    /// Attach the active-low FAULT input.
    pub fn with_fault_pin<NFLT>(
        self,
        fault_pin: NFLT,
    ) -> StepDirDriver<STEP, DIR, EN, DELAY, M0, M1, M2, SLP, NFLT>
    where
        NFLT: InputPin,
    {
        StepDirDriver {
            step_pin: self.step_pin,
            dir_pin: self.dir_pin,
            enable_pin: self.enable_pin,
            delay: self.delay,
            microstep_pins: self.microstep_pins,
            sleep_pin: self.sleep_pin,
            fault_pin: Some(fault_pin),
            enabled: self.enabled,
            asleep: self.asleep,
            direction: self.direction,
            speed: self.speed,
            max_speed: self.max_speed,
            microstep_mode: self.microstep_mode,
            pulse_width_us: self.pulse_width_us,
        }
    }

    /// Set the microstep divisor; unrecognized values fall back to full
    /// step. Applied to the select pins on `init`.
    pub fn with_microsteps(mut self, divisor: u16) -> Self {
        self.microstep_mode = MicrostepMode::from_divisor(divisor);
        self
    }

    /// Set the step pulse width in microseconds.
    pub fn with_pulse_width(mut self, microseconds: u32) -> Self {
        self.set_pulse_width(microseconds);
        self
    }

    /// Change the step pulse width in microseconds. Zero is ignored.
    pub fn set_pulse_width(&mut self, microseconds: u32) {
        if microseconds > 0 {
            self.pulse_width_us = microseconds;
        }
    }

    /// Whether the driver is in its low-power state.
    #[inline]
    pub fn is_asleep(&self) -> bool {
        self.asleep
    }

    fn apply_select_pins(&mut self) {
        if let Some((m0, m1, m2)) = self.microstep_pins.as_mut() {
            let (p0, p1, p2) = select_pattern(self.microstep_mode);
            let _ = m0.set_state(p0.into());
            let _ = m1.set_state(p1.into());
            let _ = m2.set_state(p2.into());
        }
    }
}

impl<STEP, DIR, EN, DELAY, M0, M1, M2, SLP, FLT> StepperDriver
    for StepDirDriver<STEP, DIR, EN, DELAY, M0, M1, M2, SLP, FLT>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
    DELAY: DelayNs,
    M0: OutputPin,
    M1: OutputPin,
    M2: OutputPin,
    SLP: OutputPin,
    FLT: InputPin,
{
    fn init(&mut self) {
        // Raise SLEEP/RESET so the chip is out of reset. No settle
        // needed here: the driver stays disabled until the first move.
        if let Some(pin) = self.sleep_pin.as_mut() {
            let _ = pin.set_high();
            self.asleep = false;
        }

        self.disable();

        let dir = self.direction;
        self.set_direction(dir);
        self.apply_select_pins();
    }

    fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
        let _ = self
            .dir_pin
            .set_state(matches!(direction, Direction::Clockwise).into());
    }

    fn set_speed(&mut self, speed: StepsPerSec) {
        self.speed = speed.clamped(self.max_speed);
    }

    fn step(&mut self) {
        if !self.enabled {
            return;
        }

        let _ = self.step_pin.set_high();
        self.delay.delay_us(self.pulse_width_us);
        let _ = self.step_pin.set_low();
    }

    fn enable(&mut self) {
        if self.asleep {
            self.wake();
        }

        // ENABLE is active-low.
        let _ = self.enable_pin.set_low();
        self.enabled = true;
    }

    fn disable(&mut self) {
        let _ = self.enable_pin.set_high();
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

    fn set_microstep_mode(&mut self, mode: MicrostepMode) {
        self.microstep_mode = mode;
        self.apply_select_pins();
    }

    fn microstep_mode(&self) -> MicrostepMode {
        self.microstep_mode
    }

    fn has_fault(&mut self) -> bool {
        // FAULT is active-low; an unwired pin never faults.
        match self.fault_pin.as_mut() {
            Some(pin) => pin.is_low().unwrap_or(false),
            None => false,
        }
    }

    fn sleep(&mut self) {
        if let Some(pin) = self.sleep_pin.as_mut() {
            let _ = pin.set_low();
            self.asleep = true;
        }
    }

    fn wake(&mut self) {
        if let Some(pin) = self.sleep_pin.as_mut() {
            let _ = pin.set_high();
            self.asleep = false;

            // Pulses are not trusted until the settle time has passed.
            self.delay.delay_us(WAKE_SETTLE_US);
        }
    }
}
