//! Error types for the host layer.
//!
//! Errors at this level are about handles only: a node or observer the host
//! does not know, or a primitive the host cannot provide. Key naming and
//! value semantics belong in higher layers.

use crate::traits::{NodeId, ObserverId};

/// Errors at the host layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    /// The node handle does not refer to a live node.
    UnknownNode(NodeId),

    /// The node exists but cannot carry properties.
    ///
    /// Boundary roots anchor a subtree but have no property storage of
    /// their own.
    NotAnElement(NodeId),

    /// The observer handle was never issued or was already disconnected.
    UnknownObserver(ObserverId),

    /// The host has no frame clock to schedule against.
    ClockUnavailable,

    /// The operation is not supported by this host.
    NotSupported,
}

impl std::fmt::Display for HostError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HostError::UnknownNode(node) => write!(f, "unknown node: {}", node),
            HostError::NotAnElement(node) => {
                write!(f, "node {} cannot hold properties", node)
            }
            HostError::UnknownObserver(id) => write!(f, "unknown observer: {}", id),
            HostError::ClockUnavailable => write!(f, "frame clock unavailable"),
            HostError::NotSupported => write!(f, "operation not supported"),
        }
    }
}

impl std::error::Error for HostError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_works() {
        let e = HostError::NotSupported;
        assert_eq!(format!("{}", e), "operation not supported");

        let e = HostError::UnknownNode(NodeId::from_raw(7));
        assert!(format!("{}", e).contains("node#7"));

        let e = HostError::NotAnElement(NodeId::from_raw(3));
        assert!(format!("{}", e).contains("cannot hold properties"));
    }

    #[test]
    fn clock_unavailable_display() {
        assert_eq!(
            format!("{}", HostError::ClockUnavailable),
            "frame clock unavailable"
        );
    }
}
