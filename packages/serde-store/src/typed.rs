//! Typed state access extension trait.

use nodestate_core::{Disposer, Options, Result, StateStore};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::convert::{from_value, to_value};

/// Extension trait for typed state access.
///
/// Implemented for [`StateStore`]. Values go through serde on their way in
/// and out, so any type that round-trips through JSON can be stored.
///
/// # Example
///
/// ```rust
/// use nodestate_core::{Options, StateStore};
/// use nodestate_host::MemoryHost;
/// use nodestate_serde::TypedState;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, PartialEq, Serialize, Deserialize)]
/// struct Cart {
///     items: Vec<String>,
/// }
///
/// let host = MemoryHost::new();
/// let store = StateStore::from_memory_host(&host).unwrap();
/// let now = Options::default().with_immediate(true);
///
/// let cart = Cart { items: vec!["apple".into()] };
/// store.set_as("cart", &cart, &now).unwrap();
/// assert_eq!(store.get_as::<Cart>("cart", &now).unwrap(), Some(cart));
/// ```
pub trait TypedState {
    /// Read `key` and deserialize it into `T`.
    ///
    /// Returns `Ok(None)` when nothing is stored. A stored value of the
    /// wrong shape is an [`Error::Decode`](nodestate_core::Error::Decode).
    fn get_as<T: DeserializeOwned>(&self, key: &str, options: &Options) -> Result<Option<T>>;

    /// Serialize `data` and write it under `key`.
    fn set_as<T: Serialize + ?Sized>(&self, key: &str, data: &T, options: &Options)
        -> Result<()>;

    /// Watch `key`, deserializing every re-read value into `T`.
    ///
    /// Values that do not fit `T` reach the callback as errors.
    fn watch_as<T, F>(&self, key: &str, callback: F, options: &Options) -> Result<Disposer>
    where
        T: DeserializeOwned + 'static,
        F: FnMut(Result<Option<T>>) + 'static;
}

impl TypedState for StateStore {
    fn get_as<T: DeserializeOwned>(&self, key: &str, options: &Options) -> Result<Option<T>> {
        self.get(key, options)?.map(from_value).transpose()
    }

    fn set_as<T: Serialize + ?Sized>(
        &self,
        key: &str,
        data: &T,
        options: &Options,
    ) -> Result<()> {
        let value = to_value(data)?;
        self.set(key, value, options)
    }

    fn watch_as<T, F>(&self, key: &str, mut callback: F, options: &Options) -> Result<Disposer>
    where
        T: DeserializeOwned + 'static,
        F: FnMut(Result<Option<T>>) + 'static,
    {
        self.watch(
            key,
            move |value| callback(value.map(from_value).transpose()),
            options,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodestate_core::Error;
    use nodestate_host::{MemoryHost, NodeTree, PropertyHost};
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Form {
        email: String,
        subscribed: bool,
    }

    fn store() -> (MemoryHost, StateStore) {
        let host = MemoryHost::new();
        let store = StateStore::from_memory_host(&host).unwrap();
        (host, store)
    }

    #[test]
    fn typed_roundtrip() {
        let (_host, store) = store();
        let now = Options::default().with_immediate(true);

        let form = Form {
            email: "a@example.com".to_string(),
            subscribed: false,
        };
        store.set_as("form", &form, &now).unwrap();

        let recovered: Form = store.get_as("form", &now).unwrap().unwrap();
        assert_eq!(form, recovered);
    }

    #[test]
    fn read_missing_returns_none() {
        let (_host, store) = store();
        let result: Option<Form> = store.get_as("nothing", &Options::default()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn raw_text_reads_as_string() {
        let (host, store) = store();
        host.tree
            .set_property(host.tree.root(), "--state-theme", "dark")
            .unwrap();

        let theme: Option<String> = store.get_as("theme", &Options::default()).unwrap();
        assert_eq!(theme.as_deref(), Some("dark"));

        assert!(matches!(
            store.get_as::<u32>("theme", &Options::default()),
            Err(Error::Decode { .. })
        ));
    }
}
