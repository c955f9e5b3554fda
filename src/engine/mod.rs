//! Real-time motion engine.
//!
//! The engine is split along the interrupt boundary:
//!
//! - [`MotionEngine`] runs in the periodic timer interrupt, owns the
//!   driver and emits step pulses.
//! - [`CommandConsumer`] runs as a normal task, drains the bounded
//!   [`CommandQueue`] and publishes grouped state updates.
//! - [`MotionHandle`] is the copyable application-facing interface for
//!   submitting commands and reading status.
//!
//! All three are wired to the same statics by [`bind`]; nothing is
//! reached through globals, so the wiring is visible at the call site:
//!
//! ```rust,ignore
//! static SHARED: SharedState = SharedState::new();
//! static QUEUE: CommandQueue = CommandQueue::new();
//!
//! let config = ControllerConfig::default();
//! let (mut engine, mut consumer, handle) =
//!     engine::bind(driver, &SHARED, &QUEUE, &config);
//!
//! // Timer ISR, at config.tick_period_us:
//! //     engine.tick(timestamp_us());
//! // Consumer task:
//! //     loop { consumer.service(&mut delay); }
//! // Anywhere else:
//! //     handle.submit(Command::MoveBySteps { .. }, &mut delay)?;
//! ```

mod consumer;
mod handle;
mod queue;
mod shared;
mod tick;

pub use consumer::CommandConsumer;
pub use handle::MotionHandle;
pub use queue::{CommandQueue, COMMAND_QUEUE_CAPACITY};
pub use shared::SharedState;
pub use tick::MotionEngine;

use crate::config::ControllerConfig;
use crate::driver::StepperDriver;

/// Wire a driver, shared state and command queue into the three engine
/// halves.
///
/// Consumes the driver; from here on only the returned [`MotionEngine`]
/// touches it. The shared state and queue are borrowed so they can live
/// in `static`s and outlive every task.
pub fn bind<'a, D: StepperDriver>(
    driver: D,
    shared: &'a SharedState,
    queue: &'a CommandQueue,
    config: &ControllerConfig,
) -> (MotionEngine<'a, D>, CommandConsumer<'a>, MotionHandle<'a>) {
    let engine = MotionEngine::new(driver, shared, config);
    let consumer = CommandConsumer::new(queue, shared, config.max_speed);
    let handle = MotionHandle::new(queue, shared);
    (engine, consumer, handle)
}
