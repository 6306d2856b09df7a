//! Scoped reactive state on a host tree.
//!
//! Values live as text properties on the nodes of a tree the host owns.
//! This crate adds meaning on top of the plain text properties of
//! `nodestate-host`:
//! - Property naming: `--state-` + optional scope + key ([`PropertyName`])
//! - Inheritance: reads walk toward the root, stopping at encapsulation
//!   boundaries unless told to cross them
//! - Batching: writes are coalesced per node and property and applied once per
//!   frame ([`BatchScheduler`])
//! - Observation: watches built on the host's "this node changed" signal,
//!   re-reading the value on every notification
//! - Derived values and durable persistence built from the above
//!
//! [`StateStore`] ties it all together.
//!
//! # Example
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use nodestate_core::{Options, StateStore, Value};
//! use nodestate_host::{MemoryHost, NodeTree};
//! use serde_json::json;
//!
//! let host = MemoryHost::new();
//! let store = StateStore::from_memory_host(&host).unwrap();
//! let card = host.tree.append_child(host.tree.root()).unwrap();
//! let options = Options::at(card).with_scope("cart");
//!
//! let seen: Rc<RefCell<Vec<Option<Value>>>> = Rc::default();
//! let sink = Rc::clone(&seen);
//! let disposer = store
//!     .watch("items", move |value| sink.borrow_mut().push(value), &options)
//!     .unwrap();
//!
//! store.set("items", json!(["apple"]), &options).unwrap();
//! host.run_until_idle();
//! assert_eq!(*seen.borrow(), vec![Some(json!(["apple"]))]);
//!
//! disposer.dispose();
//! ```

mod batch;
mod codec;
mod derive;
mod disposer;
mod error;
mod inherit;
mod node_store;
mod observe;
mod options;
mod persist;
mod scope;
mod store;

pub use batch::{BatchScheduler, PendingWrite};
pub use codec::{
    deserialize, is_state_property, serialize, storage_key, Codec, JsonCodec, PropertyName,
    DEFAULT_PREFIX, STORAGE_PREFIX,
};
pub use disposer::Disposer;
pub use error::{Error, Result};
pub use inherit::{find_inherited, Found, WalkOptions};
pub use node_store::NodeStore;
pub use options::{Options, PersistOptions};
pub use persist::{DurableStorage, MemoryStorage};
pub use scope::{Access, Resolved, ScopeResolver};
pub use store::{StateStore, StateStoreBuilder, WeakStateStore};

pub use serde_json::Value;
