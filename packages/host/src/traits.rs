//! Core traits for the host layer.

use std::rc::Rc;

use crate::HostError;

/// An opaque handle to a node in a host-owned tree.
///
/// Handles are cheap to copy and carry no ownership. A handle may outlive the
/// node it names; operations on such a handle fail with
/// [`HostError::UnknownNode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    /// Create a handle from its raw index.
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw index behind this handle.
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Handle for a live mutation watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObserverId(u64);

impl ObserverId {
    /// Create a handle from its raw value.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl std::fmt::Display for ObserverId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "observer#{}", self.0)
    }
}

/// Structure of the host tree.
///
/// Nodes live in nested encapsulation boundaries. Inside a boundary,
/// [`parent`](Self::parent) walks toward the boundary's top and then stops;
/// the only way out is [`boundary_host`](Self::boundary_host), a pure lookup
/// that never creates an ownership edge.
pub trait NodeTree {
    /// The process-wide root node.
    fn root(&self) -> NodeId;

    /// Whether `node` names a live node that can hold properties.
    fn contains(&self, node: NodeId) -> bool;

    /// The parent of `node` inside its own boundary.
    ///
    /// Returns `None` at the root, at the top of a boundary, and for unknown
    /// nodes.
    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// The host node of the boundary that contains `node`, if `node` lives
    /// inside a boundary.
    fn boundary_host(&self, node: NodeId) -> Option<NodeId>;
}

/// Per-node text properties.
///
/// This is the unit of physical storage. Text is opaque here.
pub trait PropertyHost: NodeTree {
    /// Set `name` to `text` on exactly `node`.
    fn set_property(&self, node: NodeId, name: &str, text: &str) -> Result<(), HostError>;

    /// Remove `name` from exactly `node`. Removing an unset property is not
    /// an error.
    fn remove_property(&self, node: NodeId, name: &str) -> Result<(), HostError>;

    /// The text set on exactly `node`, ignoring anything inherited.
    fn local_property(&self, node: NodeId, name: &str) -> Result<Option<String>, HostError>;

    /// The text the host itself resolves for `node`.
    ///
    /// Hosts apply their own native inheritance here, so a node may report a
    /// value it never had set on it.
    fn computed_property(&self, node: NodeId, name: &str) -> Result<Option<String>, HostError>;
}

/// A single "something changed" notification.
///
/// Records name the node that was mutated and nothing else. There is no
/// payload: observers must re-read whatever they care about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutationRecord {
    /// The node whose properties were mutated.
    pub target: NodeId,
}

/// How far a mutation watch reaches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObserveOptions {
    /// Also report mutations of descendants inside the same boundary.
    pub subtree: bool,
}

/// Callback invoked with each delivered batch of records.
pub type MutationCallback = Rc<dyn Fn(&[MutationRecord])>;

/// The host's coarse mutation signal.
pub trait MutationSource {
    /// Start watching `node`.
    ///
    /// The callback runs on the host's delivery turn, after the mutations it
    /// reports have been committed.
    fn observe(
        &self,
        node: NodeId,
        options: ObserveOptions,
        callback: MutationCallback,
    ) -> Result<ObserverId, HostError>;

    /// Stop a watch. Records queued for it but not yet delivered are dropped.
    fn disconnect(&self, id: ObserverId) -> Result<(), HostError>;
}

/// Single-shot callback run before the next render pass.
pub type FrameCallback = Box<dyn FnOnce()>;

/// The host's frame clock.
pub trait FrameClock {
    /// Whether this host can schedule frame callbacks at all.
    fn is_available(&self) -> bool {
        true
    }

    /// Run `callback` once before the next render pass.
    fn request_frame(&self, callback: FrameCallback) -> Result<(), HostError>;
}

/// Everything the store needs from a host tree.
pub trait Host: PropertyHost + MutationSource {}
impl<T: PropertyHost + MutationSource + ?Sized> Host for T {}

// Blanket implementations for shared handles

impl<T: NodeTree + ?Sized> NodeTree for Rc<T> {
    fn root(&self) -> NodeId {
        self.as_ref().root()
    }

    fn contains(&self, node: NodeId) -> bool {
        self.as_ref().contains(node)
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.as_ref().parent(node)
    }

    fn boundary_host(&self, node: NodeId) -> Option<NodeId> {
        self.as_ref().boundary_host(node)
    }
}

impl<T: PropertyHost + ?Sized> PropertyHost for Rc<T> {
    fn set_property(&self, node: NodeId, name: &str, text: &str) -> Result<(), HostError> {
        self.as_ref().set_property(node, name, text)
    }

    fn remove_property(&self, node: NodeId, name: &str) -> Result<(), HostError> {
        self.as_ref().remove_property(node, name)
    }

    fn local_property(&self, node: NodeId, name: &str) -> Result<Option<String>, HostError> {
        self.as_ref().local_property(node, name)
    }

    fn computed_property(&self, node: NodeId, name: &str) -> Result<Option<String>, HostError> {
        self.as_ref().computed_property(node, name)
    }
}

impl<T: MutationSource + ?Sized> MutationSource for Rc<T> {
    fn observe(
        &self,
        node: NodeId,
        options: ObserveOptions,
        callback: MutationCallback,
    ) -> Result<ObserverId, HostError> {
        self.as_ref().observe(node, options, callback)
    }

    fn disconnect(&self, id: ObserverId) -> Result<(), HostError> {
        self.as_ref().disconnect(id)
    }
}

impl<T: FrameClock + ?Sized> FrameClock for Rc<T> {
    fn is_available(&self) -> bool {
        self.as_ref().is_available()
    }

    fn request_frame(&self, callback: FrameCallback) -> Result<(), HostError> {
        self.as_ref().request_frame(callback)
    }
}
