//! Serde integration for nodestate.
//!
//! This layer provides typed access to a [`StateStore`] via serde. It adds:
//! - `TypedState`: `get_as`, `set_as` and `watch_as` for any serde type
//! - Value <-> serde conversions
//!
//! # Example
//!
//! ```rust
//! use nodestate_core::{Options, StateStore};
//! use nodestate_host::MemoryHost;
//! use nodestate_serde::TypedState;
//!
//! let host = MemoryHost::new();
//! let store = StateStore::from_memory_host(&host).unwrap();
//!
//! store.set_as("volume", &7u8, &Options::default()).unwrap();
//! host.run_frame();
//! assert_eq!(store.get_as::<u8>("volume", &Options::default()).unwrap(), Some(7));
//! ```

mod convert;
mod typed;

pub use convert::{from_value, to_value};
pub use typed::TypedState;

// Re-export core types for convenience
pub use nodestate_core::{Disposer, Error, Options, Result, StateStore, Value};
