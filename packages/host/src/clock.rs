//! A frame clock driven by hand.

use std::cell::{Cell, RefCell};

use crate::traits::{FrameCallback, FrameClock};
use crate::HostError;

/// A frame clock that only advances when [`tick`](Self::tick) is called.
///
/// Callbacks requested before a tick run during that tick, in request
/// order. Callbacks requested while a tick is running wait for the next
/// one, so a callback can never starve the clock by re-requesting itself.
pub struct ManualFrameClock {
    queue: RefCell<Vec<FrameCallback>>,
    frame: Cell<u64>,
    available: bool,
}

impl Default for ManualFrameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualFrameClock {
    /// Create a working clock.
    pub fn new() -> Self {
        Self {
            queue: RefCell::new(Vec::new()),
            frame: Cell::new(0),
            available: true,
        }
    }

    /// Create a clock that models a host with no frame primitive.
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    /// Run one frame. Returns the number of callbacks that ran.
    pub fn tick(&self) -> usize {
        let due = std::mem::take(&mut *self.queue.borrow_mut());
        self.frame.set(self.frame.get() + 1);
        let ran = due.len();
        for callback in due {
            callback();
        }
        ran
    }

    /// Number of callbacks waiting for the next frame.
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Number of frames run so far.
    pub fn frame(&self) -> u64 {
        self.frame.get()
    }
}

impl FrameClock for ManualFrameClock {
    fn is_available(&self) -> bool {
        self.available
    }

    fn request_frame(&self, callback: FrameCallback) -> Result<(), HostError> {
        if !self.available {
            return Err(HostError::ClockUnavailable);
        }
        self.queue.borrow_mut().push(callback);
        Ok(())
    }
}
