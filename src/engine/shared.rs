//! Motion state shared across the interrupt/task boundary.
//!
//! Every cross-boundary field is an individual atomic sized to the
//! platform word (via `portable-atomic` on targets without native
//! 64-bit or float atomics). The consumer groups related writes and
//! publishes them by bumping [`SharedState::epoch`]; the tick loads the
//! epoch with acquire ordering before reading the fields, so a command
//! application is visible as a unit at the next tick. Interrupt-owned
//! ramp state (current speed, step accumulator, timestamps) lives in
//! [`MotionEngine`](crate::engine::MotionEngine), never here.

use portable_atomic::{AtomicBool, AtomicF32, AtomicI64, AtomicU32, AtomicU8, Ordering};

/// No power transition requested.
pub(crate) const POWER_NONE: u8 = 0;
/// Low-power entry requested.
pub(crate) const POWER_SLEEP: u8 = 1;
/// Low-power exit requested.
pub(crate) const POWER_WAKE: u8 = 2;

/// Lock-free motion state shared between the command consumer, the
/// timer tick and external readers.
///
/// `const`-constructible so it can live in a `static` and be handed to
/// the timer registration explicitly:
///
/// ```rust,ignore
/// static SHARED: SharedState = SharedState::new();
/// ```
pub struct SharedState {
    /// Absolute position in steps. Written by the tick (one step at a
    /// time) and by position rebasing; read everywhere.
    pub(crate) current_position: AtomicI64,

    /// Target position in steps. Consumer-written, tick-read.
    pub(crate) target_position: AtomicI64,

    /// Ramp target in steps/sec. Consumer-written, tick-read.
    pub(crate) commanded_speed: AtomicF32,

    /// Ramp rate in steps/sec^2; zero disables ramping.
    pub(crate) acceleration: AtomicF32,

    /// Continuous-mode direction; true = clockwise.
    pub(crate) direction_cw: AtomicBool,

    /// Whether the motor is in motion. Consumer-set on start/stop
    /// commands; tick-cleared when a positioning target is reached.
    pub(crate) running: AtomicBool,

    /// Continuous rotation mode flag. Mutually exclusive with `jog`.
    pub(crate) continuous: AtomicBool,

    /// Jog mode flag (ramp bypass). Mutually exclusive with `continuous`.
    pub(crate) jog: AtomicBool,

    /// Command-group publication counter. The tick resets its ramp
    /// state (full acceleration from standstill) when this changes.
    pub(crate) epoch: AtomicU32,

    /// Pending sleep/wake request, serviced by idle ticks only.
    pub(crate) power_request: AtomicU8,

    /// Driver fault flag, mirrored by the tick for external readers.
    pub(crate) fault: AtomicBool,

    /// Active microstep divisor, mirrored at engine bring-up.
    pub(crate) microstep_divisor: AtomicU8,
}

impl SharedState {
    /// Create a fresh state: position and target zero, not running.
    pub const fn new() -> Self {
        Self {
            current_position: AtomicI64::new(0),
            target_position: AtomicI64::new(0),
            commanded_speed: AtomicF32::new(0.0),
            acceleration: AtomicF32::new(0.0),
            direction_cw: AtomicBool::new(true),
            running: AtomicBool::new(false),
            continuous: AtomicBool::new(false),
            jog: AtomicBool::new(false),
            epoch: AtomicU32::new(0),
            power_request: AtomicU8::new(POWER_NONE),
            fault: AtomicBool::new(false),
            microstep_divisor: AtomicU8::new(1),
        }
    }

    /// Publish a grouped command application to the tick.
    #[inline]
    pub(crate) fn publish(&self) {
        self.epoch.fetch_add(1, Ordering::Release);
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}
