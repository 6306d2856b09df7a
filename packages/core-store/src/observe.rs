//! Change observation on top of the host's coarse mutation signal.
//!
//! The host reports that a node was mutated and nothing more, so every
//! notification is answered by re-reading the watched key.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use nodestate_host::{Host, MutationRecord, MutationSource, NodeId, ObserveOptions};
use serde_json::Value;

use crate::scope::Access;
use crate::{Disposer, Options, Result, StateStore};

/// Install a host watch on `node` that calls `on_change` for every delivered
/// batch that names `node` itself.
///
/// Records for other nodes are ignored, whatever the host decides to report.
/// The returned disposer disconnects the host watch; after it runs,
/// `on_change` is never called again.
pub(crate) fn observe_node(
    host: &Rc<dyn Host>,
    node: NodeId,
    on_change: impl Fn() + 'static,
) -> Result<Disposer> {
    let active = Rc::new(Cell::new(true));

    let live = Rc::clone(&active);
    let id = host.observe(
        node,
        ObserveOptions::default(),
        Rc::new(move |records: &[MutationRecord]| {
            if live.get() && records.iter().any(|r| r.target == node) {
                on_change();
            }
        }),
    )?;
    log::debug!("{} watching {}", id, node);

    let host = Rc::clone(host);
    Ok(Disposer::new(move || {
        active.set(false);
        match host.disconnect(id) {
            Ok(()) => log::debug!("{} released", id),
            Err(e) => log::warn!("releasing {}: {}", id, e),
        }
    }))
}

/// Watch `key` under `options`, calling `callback` with the re-read value
/// after every mutation of the target node.
pub(crate) fn watch<F>(
    store: &StateStore,
    key: &str,
    callback: F,
    options: &Options,
) -> Result<Disposer>
where
    F: FnMut(Option<Value>) + 'static,
{
    let resolved = store.resolve(key, options, Access::Watch)?;
    let Some(resolved) = resolved else {
        return Err(crate::Error::MissingTarget);
    };

    let weak = store.downgrade();
    let key = key.to_string();
    let read_options = options.clone().with_target(resolved.node);
    let callback = RefCell::new(callback);

    observe_node(store.host(), resolved.node, move || {
        let Some(store) = weak.upgrade() else {
            return;
        };
        let value = match store.get(&key, &read_options) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("re-reading {:?} after mutation: {}", key, e);
                return;
            }
        };
        match callback.try_borrow_mut() {
            Ok(mut callback) => callback(value),
            Err(_) => log::warn!("watch callback for {:?} re-entered; skipping", key),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodestate_host::{MemoryTree, NodeTree, PropertyHost};

    #[test]
    fn only_own_node_triggers() {
        let tree = Rc::new(MemoryTree::new());
        let child = tree.append_child(tree.root()).unwrap();
        let host: Rc<dyn Host> = tree.clone();
        let hits = Rc::new(Cell::new(0));

        let seen = Rc::clone(&hits);
        let disposer = observe_node(&host, tree.root(), move || seen.set(seen.get() + 1)).unwrap();

        tree.set_property(child, "--state-a", "1").unwrap();
        tree.deliver_mutations();
        assert_eq!(hits.get(), 0);

        tree.set_property(tree.root(), "--state-a", "1").unwrap();
        tree.set_property(tree.root(), "--state-b", "2").unwrap();
        tree.deliver_mutations();
        assert_eq!(hits.get(), 1);

        disposer.dispose();
    }

    #[test]
    fn disposal_drops_undelivered_records() {
        let tree = Rc::new(MemoryTree::new());
        let host: Rc<dyn Host> = tree.clone();
        let hits = Rc::new(Cell::new(0));

        let seen = Rc::clone(&hits);
        let disposer = observe_node(&host, tree.root(), move || seen.set(seen.get() + 1)).unwrap();

        tree.set_property(tree.root(), "--state-a", "1").unwrap();
        disposer.dispose();
        disposer.dispose();
        tree.deliver_mutations();

        assert_eq!(hits.get(), 0);
        assert_eq!(tree.observer_count(), 0);
    }

    #[test]
    fn observing_a_dead_node_fails() {
        let tree = Rc::new(MemoryTree::new());
        let host: Rc<dyn Host> = tree.clone();
        let ghost = NodeId::from_raw(40);

        assert!(matches!(
            observe_node(&host, ghost, || {}),
            Err(crate::Error::InvalidTarget(n)) if n == ghost
        ));
    }
}
