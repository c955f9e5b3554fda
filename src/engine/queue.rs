//! Bounded command queue.
//!
//! The only certified handoff point between command producers and the
//! single consumer task. Lock-free on both ends: producers may run in
//! any context and the consumer never blocks producers.

use heapless::mpmc::MpMcQueue;
use portable_atomic::{AtomicUsize, Ordering};

use crate::command::Command;
use crate::error::QueueError;

/// Number of commands the queue holds before `enqueue` reports
/// [`QueueError::Full`].
pub const COMMAND_QUEUE_CAPACITY: usize = 10;

/// Lock-free bounded FIFO carrying [`Command`]s from any number of
/// producer contexts to exactly one consumer.
///
/// `const`-constructible so it can live in a `static` next to
/// [`SharedState`](crate::engine::SharedState). The heapless storage is
/// rounded up to a power of two; an occupancy counter enforces the
/// exact capacity.
pub struct CommandQueue {
    inner: MpMcQueue<Command, 16>,
    occupancy: AtomicUsize,
}

impl CommandQueue {
    /// Create an empty queue.
    pub const fn new() -> Self {
        Self {
            inner: MpMcQueue::new(),
            occupancy: AtomicUsize::new(0),
        }
    }

    /// Try to enqueue a command without blocking.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Full`] when the queue already holds
    /// [`COMMAND_QUEUE_CAPACITY`] commands. No command is ever dropped
    /// silently: either it is queued or the caller is told.
    pub fn enqueue(&self, command: Command) -> Result<(), QueueError> {
        // Reserve a slot first so the capacity bound holds under
        // concurrent producers.
        let mut occupancy = self.occupancy.load(Ordering::Relaxed);
        loop {
            if occupancy >= COMMAND_QUEUE_CAPACITY {
                return Err(QueueError::Full);
            }
            match self.occupancy.compare_exchange_weak(
                occupancy,
                occupancy + 1,
                Ordering::Acquire,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(observed) => occupancy = observed,
            }
        }

        if self.inner.enqueue(command).is_err() {
            // Storage exceeds the reserved capacity, so this only
            // happens if a dequeue raced the counter; give the slot back.
            self.occupancy.fetch_sub(1, Ordering::Release);
            return Err(QueueError::Full);
        }

        Ok(())
    }

    /// Dequeue the oldest command, if any.
    pub fn dequeue(&self) -> Option<Command> {
        let command = self.inner.dequeue()?;
        self.occupancy.fetch_sub(1, Ordering::Release);
        Some(command)
    }

    /// Number of commands currently queued.
    pub fn len(&self) -> usize {
        self.occupancy.load(Ordering::Relaxed)
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for CommandQueue {
    fn default() -> Self {
        Self::new()
    }
}
