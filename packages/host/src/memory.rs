//! A complete in-memory host: tree plus clock.

use std::rc::Rc;

use crate::clock::ManualFrameClock;
use crate::tree::MemoryTree;

/// Upper bound on frames run by [`MemoryHost::run_until_idle`].
const MAX_IDLE_FRAMES: usize = 256;

/// An in-memory tree and a manual frame clock, driven together.
///
/// One host frame is a clock tick followed by mutation delivery: writes
/// flushed during the tick are committed before any observer sees them.
#[derive(Clone)]
pub struct MemoryHost {
    /// The render tree.
    pub tree: Rc<MemoryTree>,
    /// The frame clock.
    pub clock: Rc<ManualFrameClock>,
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryHost {
    /// Create a fresh tree with a working clock.
    pub fn new() -> Self {
        Self {
            tree: Rc::new(MemoryTree::new()),
            clock: Rc::new(ManualFrameClock::new()),
        }
    }

    /// Create a fresh tree whose clock is unavailable.
    pub fn without_clock() -> Self {
        Self {
            tree: Rc::new(MemoryTree::new()),
            clock: Rc::new(ManualFrameClock::unavailable()),
        }
    }

    /// Run one frame: tick the clock, then deliver mutations.
    ///
    /// Returns the number of frame callbacks plus observer callbacks run.
    pub fn run_frame(&self) -> usize {
        let ticked = self.clock.tick();
        ticked + self.tree.deliver_mutations()
    }

    /// Whether nothing is waiting on the clock or the mutation queue.
    pub fn is_idle(&self) -> bool {
        self.clock.pending() == 0 && self.tree.pending_deliveries() == 0
    }

    /// Run frames until the host is idle. Returns the number of frames run.
    pub fn run_until_idle(&self) -> usize {
        let mut frames = 0;
        while !self.is_idle() {
            if frames == MAX_IDLE_FRAMES {
                log::warn!("host still busy after {} frames; giving up", frames);
                break;
            }
            self.run_frame();
            frames += 1;
        }
        frames
    }
}
