//! Host primitives for nodestate.
//!
//! This is the narrow waist between the scoped reactive store and whatever
//! owns the render tree. Everything at this level is plain text on plain
//! nodes - no key naming, no scopes, no value semantics.
//!
//! The host provides four things:
//! - A node tree ([`NodeTree`]) with encapsulation boundaries whose host node
//!   bridges back into the enclosing tree
//! - Per-node text properties ([`PropertyHost`]) plus the host's own native
//!   (scope-unaware) computed resolution
//! - A coarse mutation signal ([`MutationSource`]) that reports *which node*
//!   changed, never *what* changed
//! - A frame clock ([`FrameClock`]) that runs a callback once before the next
//!   render pass
//!
//! [`MemoryTree`], [`ManualFrameClock`] and [`MemoryHost`] implement all of
//! this in memory, for tests and for embedders without a real render tree.
//!
//! # Example
//!
//! ```rust
//! use nodestate_host::{MemoryTree, NodeTree, PropertyHost};
//!
//! let tree = MemoryTree::new();
//! let root = tree.root();
//! let panel = tree.append_child(root).unwrap();
//!
//! tree.set_property(root, "--state-theme", "\"dark\"").unwrap();
//! assert_eq!(tree.local_property(panel, "--state-theme").unwrap(), None);
//! assert_eq!(
//!     tree.computed_property(panel, "--state-theme").unwrap(),
//!     Some("\"dark\"".to_string())
//! );
//! ```

mod clock;
mod error;
mod memory;
mod traits;
mod tree;

pub use clock::ManualFrameClock;
pub use error::HostError;
pub use memory::MemoryHost;
pub use traits::{
    FrameCallback, FrameClock, Host, MutationCallback, MutationRecord, MutationSource, NodeId,
    NodeTree, ObserveOptions, ObserverId, PropertyHost,
};
pub use tree::MemoryTree;
