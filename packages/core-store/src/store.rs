//! The `StateStore` facade.

use std::fmt;
use std::rc::{Rc, Weak};

use nodestate_host::{FrameClock, Host, MemoryHost, NodeId, NodeTree};
use serde_json::Value;

use crate::batch::BatchScheduler;
use crate::codec::{Codec, JsonCodec, PropertyName, DEFAULT_PREFIX};
use crate::inherit::{find_inherited, WalkOptions};
use crate::node_store::NodeStore;
use crate::persist::DurableStorage;
use crate::scope::{Access, Resolved, ScopeResolver};
use crate::{derive, observe, persist, Disposer, Options, PersistOptions, Result};

struct StoreInner {
    nodes: NodeStore,
    scheduler: BatchScheduler,
    clock: Rc<dyn FrameClock>,
    codec: Rc<dyn Codec>,
    resolver: ScopeResolver,
}

/// Scoped reactive state kept on the nodes of a host tree.
///
/// Values are stored as text properties on nodes, looked up through
/// ancestors, written in frame-aligned batches and observed through the
/// host's mutation signal. Handles are cheap to clone and share everything.
///
/// Reads see committed state only: a batched write becomes visible once the
/// frame flush (or an explicit [`flush`](Self::flush)) has applied it.
///
/// # Example
///
/// ```rust
/// use nodestate_core::{Options, StateStore};
/// use nodestate_host::{MemoryHost, NodeTree};
/// use serde_json::json;
///
/// let host = MemoryHost::new();
/// let store = StateStore::from_memory_host(&host).unwrap();
/// let panel = host.tree.append_child(host.tree.root()).unwrap();
///
/// store.set("theme", json!("dark"), &Options::default()).unwrap();
/// assert_eq!(store.get("theme", &Options::default()).unwrap(), None);
///
/// host.run_frame();
/// assert_eq!(store.get("theme", &Options::at(panel)).unwrap(), Some(json!("dark")));
/// ```
#[derive(Clone)]
pub struct StateStore {
    inner: Rc<StoreInner>,
}

/// A non-owning handle to a [`StateStore`].
#[derive(Clone)]
pub struct WeakStateStore {
    inner: Weak<StoreInner>,
}

impl WeakStateStore {
    /// The store, if it is still alive.
    pub fn upgrade(&self) -> Option<StateStore> {
        self.inner.upgrade().map(|inner| StateStore { inner })
    }
}

impl fmt::Debug for WeakStateStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakStateStore")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

/// Configures a [`StateStore`] before it is attached to a host.
pub struct StateStoreBuilder {
    codec: Rc<dyn Codec>,
    prefix: String,
}

impl Default for StateStoreBuilder {
    fn default() -> Self {
        Self {
            codec: Rc::new(JsonCodec),
            prefix: DEFAULT_PREFIX.to_string(),
        }
    }
}

impl StateStoreBuilder {
    /// Use `codec` for property text.
    pub fn codec(mut self, codec: impl Codec + 'static) -> Self {
        self.codec = Rc::new(codec);
        self
    }

    /// Default property prefix for operations that do not set one.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Attach to `host`, batching writes on `clock`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchedulerUnavailable`](crate::Error::SchedulerUnavailable)
    /// if the clock cannot schedule frames.
    pub fn build<H, C>(self, host: Rc<H>, clock: Rc<C>) -> Result<StateStore>
    where
        H: Host + 'static,
        C: FrameClock + 'static,
    {
        let nodes = NodeStore::new(host);
        let clock: Rc<dyn FrameClock> = clock;
        let scheduler = BatchScheduler::new(nodes.clone(), Rc::clone(&clock))?;
        log::debug!("state store attached with prefix {:?}", self.prefix);
        Ok(StateStore {
            inner: Rc::new(StoreInner {
                nodes,
                scheduler,
                clock,
                codec: self.codec,
                resolver: ScopeResolver::new(self.prefix),
            }),
        })
    }
}

impl StateStore {
    /// Attach a store with default settings.
    pub fn new<H, C>(host: Rc<H>, clock: Rc<C>) -> Result<Self>
    where
        H: Host + 'static,
        C: FrameClock + 'static,
    {
        Self::builder().build(host, clock)
    }

    /// Attach a store to an in-memory host.
    pub fn from_memory_host(host: &MemoryHost) -> Result<Self> {
        Self::new(Rc::clone(&host.tree), Rc::clone(&host.clock))
    }

    pub fn builder() -> StateStoreBuilder {
        StateStoreBuilder::default()
    }

    /// The host's root node.
    pub fn root(&self) -> NodeId {
        self.inner.nodes.host().root()
    }

    /// The default property prefix.
    pub fn prefix(&self) -> &str {
        self.inner.resolver.prefix()
    }

    /// The property name `key` maps to under `options`.
    pub fn property_name(&self, key: &str, options: &Options) -> Result<PropertyName> {
        self.inner.resolver.property_name(key, options)
    }

    /// Read `key`, walking ancestors as `options` allow.
    ///
    /// Returns `None` when no visited node holds a value. Text that is not
    /// valid for the codec comes back as a string value.
    ///
    /// # Errors
    ///
    /// [`InvalidKey`](crate::Error::InvalidKey) for an empty key and
    /// [`InvalidTarget`](crate::Error::InvalidTarget) for a dead target.
    pub fn get(&self, key: &str, options: &Options) -> Result<Option<Value>> {
        let Some(Resolved { node, property }) = self.resolve(key, options, Access::Read)? else {
            return Ok(None);
        };
        let walk = WalkOptions {
            inherit: options.inherit,
            cross_boundary: options.cross_boundary,
        };
        let found = find_inherited(&self.inner.nodes, node, &property, walk)?;
        Ok(found.map(|found| self.inner.codec.decode(&found.text)))
    }

    /// Read `key` the way the host itself resolves it at the target node,
    /// native inheritance included.
    pub fn get_computed(&self, key: &str, options: &Options) -> Result<Option<Value>> {
        let Some(Resolved { node, property }) = self.resolve(key, options, Access::Read)? else {
            return Ok(None);
        };
        let text = self.inner.nodes.read(node, &property)?;
        Ok(text.map(|text| self.inner.codec.decode(&text)))
    }

    /// Write `value` under `key`.
    ///
    /// The write is queued for the next frame unless `options.immediate` is
    /// set. With `cross_boundary`, the write is mirrored onto the host node
    /// of the target's boundary.
    ///
    /// A scoped write that would land on the root without
    /// `allow_root_scope` does nothing.
    pub fn set(&self, key: &str, value: Value, options: &Options) -> Result<()> {
        let Some(resolved) = self.resolve(key, options, Access::Write)? else {
            return Ok(());
        };
        let text = self.inner.codec.encode(&value)?;
        self.for_each_write_node(resolved.node, options, |node| {
            if options.immediate {
                self.inner.nodes.write(node, &resolved.property, &text)
            } else {
                self.inner
                    .scheduler
                    .queue(node, resolved.property.clone(), text.clone())
            }
        })
    }

    /// Remove `key`. Follows the same rules as [`set`](Self::set).
    pub fn remove(&self, key: &str, options: &Options) -> Result<()> {
        let Some(resolved) = self.resolve(key, options, Access::Write)? else {
            return Ok(());
        };
        self.for_each_write_node(resolved.node, options, |node| {
            if options.immediate {
                self.inner.nodes.remove(node, &resolved.property)
            } else {
                self.inner
                    .scheduler
                    .queue_removal(node, resolved.property.clone())
            }
        })
    }

    fn for_each_write_node(
        &self,
        node: NodeId,
        options: &Options,
        mut write: impl FnMut(NodeId) -> Result<()>,
    ) -> Result<()> {
        write(node)?;
        if options.cross_boundary {
            if let Some(host) = self.inner.nodes.host().boundary_host(node) {
                log::trace!("mirroring write from {} onto {}", node, host);
                write(host)?;
            }
        }
        Ok(())
    }

    /// Call `callback` with the current value of `key` after every mutation
    /// of the target node.
    ///
    /// The host signal does not say what changed, so the callback may see
    /// the same value more than once. Treat it as "a write happened".
    ///
    /// # Errors
    ///
    /// Besides key and target validation, a scoped watch that would land on
    /// the root without `allow_root_scope` fails with
    /// [`MissingTarget`](crate::Error::MissingTarget).
    pub fn watch<F>(&self, key: &str, callback: F, options: &Options) -> Result<Disposer>
    where
        F: FnMut(Option<Value>) + 'static,
    {
        observe::watch(self, key, callback, options)
    }

    /// Keep `key` equal to `compute` applied to the values of `deps`.
    ///
    /// `compute` runs once right away and then at most once per frame in
    /// which a dependency changed. It receives the dependency values in the
    /// order of `deps`.
    pub fn derive<F>(
        &self,
        key: &str,
        deps: &[&str],
        compute: F,
        options: &Options,
    ) -> Result<Disposer>
    where
        F: Fn(&[Option<Value>]) -> Value + 'static,
    {
        derive::derive(self, key, deps, compute, options)
    }

    /// Restore `key` from `storage`, then save it there on every change.
    ///
    /// The storage key is `state-` followed by the scope and key.
    pub fn persist(
        &self,
        key: &str,
        storage: impl DurableStorage + 'static,
        options: &PersistOptions,
    ) -> Result<Disposer> {
        persist::persist(self, key, Rc::new(storage), options)
    }

    /// Apply every queued write for `node` now.
    pub fn flush_node(&self, node: NodeId) -> Result<()> {
        self.inner.scheduler.flush_node(node)
    }

    /// Apply every queued write now instead of waiting for the frame.
    pub fn flush(&self) -> Result<()> {
        self.inner.scheduler.flush_all()
    }

    /// Number of queued writes.
    pub fn pending_writes(&self) -> usize {
        self.inner.scheduler.pending_len()
    }

    pub fn downgrade(&self) -> WeakStateStore {
        WeakStateStore {
            inner: Rc::downgrade(&self.inner),
        }
    }

    pub(crate) fn resolve(
        &self,
        key: &str,
        options: &Options,
        access: Access,
    ) -> Result<Option<Resolved>> {
        self.inner
            .resolver
            .resolve(self.inner.nodes.host(), key, options, access)
    }

    pub(crate) fn host(&self) -> &Rc<dyn Host> {
        self.inner.nodes.host()
    }

    pub(crate) fn clock(&self) -> &Rc<dyn FrameClock> {
        &self.inner.clock
    }

    pub(crate) fn codec(&self) -> &Rc<dyn Codec> {
        &self.inner.codec
    }
}

impl fmt::Debug for StateStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateStore")
            .field("prefix", &self.prefix())
            .field("scheduler", &self.inner.scheduler)
            .finish()
    }
}
