//! Scope-aware inheritance walk.
//!
//! Starting at a node, look for a value on the node itself and then on each
//! ancestor in turn. The nearest value wins; nothing is merged. The walk is
//! confined to the starting node's boundary unless boundary crossing is
//! enabled, in which case it continues at the boundary's host node.
//!
//! Only values set on each visited node count. The host's native inheritance
//! is not consulted, because it knows nothing about scopes, `inherit`, or
//! boundary policy.

use nodestate_host::{NodeId, NodeTree};

use crate::codec::PropertyName;
use crate::node_store::NodeStore;
use crate::Result;

/// Knobs for a single walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkOptions {
    /// Visit ancestors at all.
    pub inherit: bool,
    /// Continue at a boundary's host node instead of stopping.
    pub cross_boundary: bool,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            inherit: true,
            cross_boundary: false,
        }
    }
}

/// A value found by [`find_inherited`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Found {
    /// Node that holds the value.
    pub node: NodeId,
    /// Raw property text.
    pub text: String,
}

/// Walks from `start` toward the root looking for `property`.
///
/// Returns the nearest value, or `None` if the walk ends without one. The
/// root is checked once and ends the walk.
pub fn find_inherited(
    nodes: &NodeStore,
    start: NodeId,
    property: &PropertyName,
    options: WalkOptions,
) -> Result<Option<Found>> {
    let tree = nodes.host();
    let root = tree.root();
    let mut current = start;

    loop {
        if let Some(text) = nodes.read_local(current, property)? {
            return Ok(Some(Found {
                node: current,
                text,
            }));
        }

        if !options.inherit || current == root {
            return Ok(None);
        }

        current = match tree.parent(current) {
            Some(parent) => parent,
            None => match tree.boundary_host(current) {
                Some(host) if options.cross_boundary => {
                    log::trace!("crossing boundary from {} to {}", current, host);
                    host
                }
                _ => return Ok(None),
            },
        };
    }
}
