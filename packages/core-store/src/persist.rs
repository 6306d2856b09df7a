//! Wiring state to durable storage.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::codec::storage_key;
use crate::scope::Access;
use crate::{Codec, Disposer, Error, PersistOptions, Result, StateStore};

/// Durable key/text storage that outlives the render tree.
///
/// Implementations own their failure handling: a `save` that cannot be
/// completed is theirs to log or retry.
pub trait DurableStorage {
    /// The text stored under `key`, if any.
    fn load(&self, key: &str) -> Option<String>;

    /// Store `text` under `key`, replacing what was there.
    fn save(&self, key: &str, text: &str);
}

impl<T: DurableStorage + ?Sized> DurableStorage for Rc<T> {
    fn load(&self, key: &str) -> Option<String> {
        self.as_ref().load(key)
    }

    fn save(&self, key: &str, text: &str) {
        self.as_ref().save(key, text)
    }
}

/// Durable storage kept in memory.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RefCell<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl DurableStorage for MemoryStorage {
    fn load(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    fn save(&self, key: &str, text: &str) {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), text.to_string());
    }
}

/// Restore `key` from `storage` once, then save it back on every change.
pub(crate) fn persist(
    store: &StateStore,
    key: &str,
    storage: Rc<dyn DurableStorage>,
    options: &PersistOptions,
) -> Result<Disposer> {
    if !options.enabled {
        return Ok(Disposer::noop());
    }

    let state = &options.state;
    store
        .resolve(key, state, Access::Watch)?
        .ok_or(Error::MissingTarget)?;
    let storage_key = storage_key(state.scope(), key)?;

    if let Some(text) = storage.load(&storage_key) {
        log::debug!("restoring {:?} from {:?}", key, storage_key);
        store.set(key, store.codec().decode(&text), state)?;
    }

    let weak = store.downgrade();
    store.watch(
        key,
        move |value| {
            let (Some(value), Some(store)) = (value, weak.upgrade()) else {
                return;
            };
            match store.codec().encode(&value) {
                Ok(text) => storage.save(&storage_key, &text),
                Err(e) => log::warn!("not saving {:?}: {}", storage_key, e),
            }
        },
        state,
    )
}
