//! Frame-aligned write batching.
//!
//! Writes are recorded per (node, property) and applied together once per
//! frame. A later write to the same pair replaces the earlier one. Exactly
//! one flush is requested per frame, no matter how many writes are queued.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use nodestate_host::{FrameClock, NodeId};

use crate::codec::PropertyName;
use crate::node_store::NodeStore;
use crate::{Error, Result};

/// A write waiting for the next flush.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingWrite {
    /// Set the property to this text.
    Set(String),
    /// Remove the property.
    Remove,
}

type PendingMap = BTreeMap<NodeId, BTreeMap<PropertyName, PendingWrite>>;

struct SchedulerInner {
    nodes: NodeStore,
    clock: Rc<dyn FrameClock>,
    pending: RefCell<PendingMap>,
    flush_scheduled: Cell<bool>,
}

/// Coalesces writes and applies them once per frame.
///
/// The scheduler owns the pending-write map; nothing queued outlives the
/// flush that applies it. The map is taken out before it is applied, so a
/// write queued while a flush is running lands in the next frame.
///
/// Handles are cheap to clone and share one queue.
#[derive(Clone)]
pub struct BatchScheduler {
    inner: Rc<SchedulerInner>,
}

impl BatchScheduler {
    /// Create a scheduler that flushes through `nodes` on `clock`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchedulerUnavailable`] when the clock cannot schedule
    /// frames. Batching is what makes multi-key updates land together, so
    /// there is no unbatched fallback.
    pub fn new(nodes: NodeStore, clock: Rc<dyn FrameClock>) -> Result<Self> {
        if !clock.is_available() {
            return Err(Error::SchedulerUnavailable);
        }
        Ok(Self {
            inner: Rc::new(SchedulerInner {
                nodes,
                clock,
                pending: RefCell::new(BTreeMap::new()),
                flush_scheduled: Cell::new(false),
            }),
        })
    }

    /// Queue `text` for `property` on `node`.
    pub fn queue(&self, node: NodeId, property: PropertyName, text: String) -> Result<()> {
        self.enqueue(node, property, PendingWrite::Set(text))
    }

    /// Queue removal of `property` from `node`.
    pub fn queue_removal(&self, node: NodeId, property: PropertyName) -> Result<()> {
        self.enqueue(node, property, PendingWrite::Remove)
    }

    fn enqueue(&self, node: NodeId, property: PropertyName, write: PendingWrite) -> Result<()> {
        log::trace!("queue {:?} for {} on {}", write, property, node);
        self.inner
            .pending
            .borrow_mut()
            .entry(node)
            .or_default()
            .insert(property, write);
        self.schedule_flush()
    }

    fn schedule_flush(&self) -> Result<()> {
        if self.inner.flush_scheduled.replace(true) {
            return Ok(());
        }

        let weak: Weak<SchedulerInner> = Rc::downgrade(&self.inner);
        let requested = self.inner.clock.request_frame(Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.flush_scheduled.set(false);
                if let Err(e) = (BatchScheduler { inner }).flush_all() {
                    log::warn!("frame flush incomplete: {}", e);
                }
            }
        }));

        if let Err(e) = requested {
            self.inner.flush_scheduled.set(false);
            return Err(e.into());
        }
        Ok(())
    }

    /// Apply everything queued for `node` now.
    ///
    /// Entries for other nodes stay queued for the frame flush.
    pub fn flush_node(&self, node: NodeId) -> Result<()> {
        let writes = self.inner.pending.borrow_mut().remove(&node);
        match writes {
            Some(writes) => self.apply(node, writes),
            None => Ok(()),
        }
    }

    /// Apply everything queued, for every node.
    ///
    /// This is what the frame callback runs. Every write is attempted; the
    /// first failure is returned after the rest have been applied. A frame
    /// already requested stays requested and serves later writes.
    pub fn flush_all(&self) -> Result<()> {
        let pending = std::mem::take(&mut *self.inner.pending.borrow_mut());
        if pending.is_empty() {
            return Ok(());
        }

        log::debug!("flushing queued writes for {} node(s)", pending.len());
        let mut first_error = None;
        for (node, writes) in pending {
            if let Err(e) = self.apply(node, writes) {
                log::warn!("dropping queued writes for {}: {}", node, e);
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn apply(&self, node: NodeId, writes: BTreeMap<PropertyName, PendingWrite>) -> Result<()> {
        let nodes = &self.inner.nodes;
        for (property, write) in writes {
            match write {
                PendingWrite::Set(text) => nodes.write(node, &property, &text)?,
                PendingWrite::Remove => nodes.remove(node, &property)?,
            }
        }
        Ok(())
    }

    /// The write queued for `property` on `node`, if any.
    pub fn pending(&self, node: NodeId, property: &PropertyName) -> Option<PendingWrite> {
        self.inner
            .pending
            .borrow()
            .get(&node)
            .and_then(|writes| writes.get(property))
            .cloned()
    }

    /// Number of queued (node, property) writes.
    pub fn pending_len(&self) -> usize {
        self.inner.pending.borrow().values().map(BTreeMap::len).sum()
    }

    /// Whether a frame flush has been requested and not yet run.
    pub fn is_flush_scheduled(&self) -> bool {
        self.inner.flush_scheduled.get()
    }

    /// Drop everything queued without applying it.
    pub fn clear(&self) {
        self.inner.pending.borrow_mut().clear();
    }
}

impl std::fmt::Debug for BatchScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchScheduler")
            .field("pending", &self.pending_len())
            .field("flush_scheduled", &self.is_flush_scheduled())
            .finish()
    }
}
