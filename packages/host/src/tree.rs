//! In-memory host tree.
//!
//! An arena of nodes with encapsulation boundaries, per-node text
//! properties, native computed resolution and a coarse mutation queue.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use crate::traits::{
    MutationCallback, MutationRecord, MutationSource, NodeId, NodeTree, ObserveOptions,
    ObserverId, PropertyHost,
};
use crate::HostError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeKind {
    Element,
    /// Top of an encapsulation boundary, anchored to `host`.
    BoundaryRoot { host: NodeId },
}

#[derive(Debug)]
struct Node {
    kind: NodeKind,
    /// Raw parent. For the top-level nodes of a boundary this is the
    /// boundary root, which is not an element.
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    boundary: Option<NodeId>,
    properties: BTreeMap<String, String>,
}

impl Node {
    fn new(kind: NodeKind, parent: Option<NodeId>) -> Self {
        Self {
            kind,
            parent,
            children: Vec::new(),
            boundary: None,
            properties: BTreeMap::new(),
        }
    }
}

struct Registration {
    node: NodeId,
    options: ObserveOptions,
    callback: MutationCallback,
}

#[derive(Default)]
struct TreeState {
    nodes: Vec<Option<Node>>,
    observers: BTreeMap<ObserverId, Registration>,
    pending: BTreeMap<ObserverId, Vec<MutationRecord>>,
    next_observer: u64,
}

impl TreeState {
    fn node(&self, id: NodeId) -> Result<&Node, HostError> {
        self.nodes
            .get(id.raw() as usize)
            .and_then(Option::as_ref)
            .ok_or(HostError::UnknownNode(id))
    }

    fn element(&self, id: NodeId) -> Result<&Node, HostError> {
        let node = self.node(id)?;
        match node.kind {
            NodeKind::Element => Ok(node),
            NodeKind::BoundaryRoot { .. } => Err(HostError::NotAnElement(id)),
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Result<&mut Node, HostError> {
        let node = self
            .nodes
            .get_mut(id.raw() as usize)
            .and_then(Option::as_mut)
            .ok_or(HostError::UnknownNode(id))?;
        match node.kind {
            NodeKind::Element => Ok(node),
            NodeKind::BoundaryRoot { .. } => Err(HostError::NotAnElement(id)),
        }
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId::from_raw(self.nodes.len() as u32);
        self.nodes.push(Some(node));
        id
    }

    /// Parent element inside the same boundary.
    fn element_parent(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.node(id).ok()?.parent?;
        match self.node(parent).ok()?.kind {
            NodeKind::Element => Some(parent),
            NodeKind::BoundaryRoot { .. } => None,
        }
    }

    /// Parent in the flattened tree: boundary tops continue at their host.
    fn flat_parent(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.node(id).ok()?.parent?;
        match self.node(parent).ok()?.kind {
            NodeKind::Element => Some(parent),
            NodeKind::BoundaryRoot { host } => Some(host),
        }
    }

    fn boundary_host(&self, id: NodeId) -> Option<NodeId> {
        let mut current = id;
        loop {
            let node = self.node(current).ok()?;
            if let NodeKind::BoundaryRoot { host } = node.kind {
                return Some(host);
            }
            current = node.parent?;
        }
    }

    fn is_same_or_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.element_parent(id);
        }
        false
    }

    fn queue_mutation(&mut self, target: NodeId) {
        let interested: Vec<ObserverId> = self
            .observers
            .iter()
            .filter(|(_, reg)| {
                reg.node == target
                    || (reg.options.subtree && self.is_same_or_ancestor(reg.node, target))
            })
            .map(|(id, _)| *id)
            .collect();

        for id in interested {
            self.pending
                .entry(id)
                .or_default()
                .push(MutationRecord { target });
        }
    }

    /// Every node in the subtree rooted at `id`, including attached
    /// boundaries.
    fn collect_subtree(&self, id: NodeId, out: &mut BTreeSet<NodeId>) {
        if !out.insert(id) {
            return;
        }
        if let Ok(node) = self.node(id) {
            for child in &node.children {
                self.collect_subtree(*child, out);
            }
            if let Some(boundary) = node.boundary {
                self.collect_subtree(boundary, out);
            }
        }
    }
}

/// An in-memory render tree.
///
/// The tree starts with a single root element. Elements can have children
/// and at most one attached boundary; a boundary root anchors its own
/// subtree and is not itself an element.
///
/// Every property mutation queues a record for each observer watching the
/// mutated node (or an ancestor, for subtree watches). Nothing is delivered
/// until [`deliver_mutations`](Self::deliver_mutations) runs, mirroring a
/// host that delivers notifications on a later turn.
pub struct MemoryTree {
    state: RefCell<TreeState>,
}

impl Default for MemoryTree {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTree {
    /// Create a tree holding only the root element.
    pub fn new() -> Self {
        let mut state = TreeState::default();
        state.push(Node::new(NodeKind::Element, None));
        Self {
            state: RefCell::new(state),
        }
    }

    /// Append a new element under `parent` (an element or a boundary root).
    pub fn append_child(&self, parent: NodeId) -> Result<NodeId, HostError> {
        let mut state = self.state.borrow_mut();
        state.node(parent)?;
        let id = state.push(Node::new(NodeKind::Element, Some(parent)));
        if let Some(Some(node)) = state.nodes.get_mut(parent.raw() as usize) {
            node.children.push(id);
        }
        Ok(id)
    }

    /// Attach an encapsulation boundary to `host`, returning the boundary
    /// root. Children appended to the boundary root live inside it.
    pub fn attach_boundary(&self, host: NodeId) -> Result<NodeId, HostError> {
        let mut state = self.state.borrow_mut();
        if state.element(host)?.boundary.is_some() {
            return Err(HostError::NotSupported);
        }
        let boundary = state.push(Node::new(NodeKind::BoundaryRoot { host }, None));
        state.element_mut(host)?.boundary = Some(boundary);
        Ok(boundary)
    }

    /// Detach and drop the subtree rooted at `node`.
    ///
    /// Watches on dropped nodes are released along with any records still
    /// queued for them. The root cannot be removed.
    pub fn remove(&self, node: NodeId) -> Result<(), HostError> {
        let mut state = self.state.borrow_mut();
        if node == NodeId::from_raw(0) {
            return Err(HostError::NotSupported);
        }
        let parent = state.node(node)?.parent;

        let mut doomed = BTreeSet::new();
        state.collect_subtree(node, &mut doomed);

        if let Some(parent) = parent {
            if let Some(Some(p)) = state.nodes.get_mut(parent.raw() as usize) {
                p.children.retain(|c| *c != node);
            }
        }
        if let NodeKind::BoundaryRoot { host } = state.node(node)?.kind {
            if let Some(Some(h)) = state.nodes.get_mut(host.raw() as usize) {
                h.boundary = None;
            }
        }
        for id in &doomed {
            if let Some(slot) = state.nodes.get_mut(id.raw() as usize) {
                *slot = None;
            }
        }

        let released: Vec<ObserverId> = state
            .observers
            .iter()
            .filter(|(_, reg)| doomed.contains(&reg.node))
            .map(|(id, _)| *id)
            .collect();
        for id in released {
            state.observers.remove(&id);
            state.pending.remove(&id);
        }
        log::debug!("removed {} node(s) under {}", doomed.len(), node);
        Ok(())
    }

    /// Number of observers with undelivered records.
    pub fn pending_deliveries(&self) -> usize {
        self.state.borrow().pending.len()
    }

    /// Number of live watches.
    pub fn observer_count(&self) -> usize {
        self.state.borrow().observers.len()
    }

    /// Deliver every record queued so far.
    ///
    /// Each observer is invoked at most once with its whole batch. Records
    /// queued by callbacks during this pass wait for the next one. A
    /// panicking callback is logged and does not stop delivery to the
    /// others. Returns the number of callbacks invoked.
    pub fn deliver_mutations(&self) -> usize {
        let batches = std::mem::take(&mut self.state.borrow_mut().pending);
        let mut delivered = 0;

        for (id, records) in batches {
            let callback = {
                let state = self.state.borrow();
                match state.observers.get(&id) {
                    Some(reg) => Rc::clone(&reg.callback),
                    // Disconnected by an earlier callback in this pass.
                    None => continue,
                }
            };

            let outcome = panic::catch_unwind(AssertUnwindSafe(|| callback(records.as_slice())));
            if outcome.is_err() {
                log::error!("{} panicked during delivery; continuing", id);
            }
            delivered += 1;
        }
        delivered
    }
}

impl NodeTree for MemoryTree {
    fn root(&self) -> NodeId {
        NodeId::from_raw(0)
    }

    fn contains(&self, node: NodeId) -> bool {
        self.state.borrow().element(node).is_ok()
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.state.borrow().element_parent(node)
    }

    fn boundary_host(&self, node: NodeId) -> Option<NodeId> {
        self.state.borrow().boundary_host(node)
    }
}

impl PropertyHost for MemoryTree {
    fn set_property(&self, node: NodeId, name: &str, text: &str) -> Result<(), HostError> {
        let mut state = self.state.borrow_mut();
        state
            .element_mut(node)?
            .properties
            .insert(name.to_string(), text.to_string());
        state.queue_mutation(node);
        Ok(())
    }

    fn remove_property(&self, node: NodeId, name: &str) -> Result<(), HostError> {
        let mut state = self.state.borrow_mut();
        let removed = state.element_mut(node)?.properties.remove(name);
        if removed.is_some() {
            state.queue_mutation(node);
        }
        Ok(())
    }

    fn local_property(&self, node: NodeId, name: &str) -> Result<Option<String>, HostError> {
        let state = self.state.borrow();
        Ok(state.element(node)?.properties.get(name).cloned())
    }

    fn computed_property(&self, node: NodeId, name: &str) -> Result<Option<String>, HostError> {
        let state = self.state.borrow();
        state.element(node)?;

        let mut current = Some(node);
        while let Some(id) = current {
            if let Some(text) = state.element(id)?.properties.get(name) {
                return Ok(Some(text.clone()));
            }
            current = state.flat_parent(id);
        }
        Ok(None)
    }
}

impl MutationSource for MemoryTree {
    fn observe(
        &self,
        node: NodeId,
        options: ObserveOptions,
        callback: MutationCallback,
    ) -> Result<ObserverId, HostError> {
        let mut state = self.state.borrow_mut();
        state.element(node)?;
        let id = ObserverId::from_raw(state.next_observer);
        state.next_observer += 1;
        state.observers.insert(
            id,
            Registration {
                node,
                options,
                callback,
            },
        );
        Ok(id)
    }

    fn disconnect(&self, id: ObserverId) -> Result<(), HostError> {
        let mut state = self.state.borrow_mut();
        state.pending.remove(&id);
        state
            .observers
            .remove(&id)
            .map(|_| ())
            .ok_or(HostError::UnknownObserver(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn counter() -> (Rc<Cell<usize>>, MutationCallback) {
        let hits = Rc::new(Cell::new(0));
        let seen = Rc::clone(&hits);
        let callback: MutationCallback = Rc::new(move |records: &[MutationRecord]| {
            seen.set(seen.get() + records.len());
        });
        (hits, callback)
    }

    #[test]
    fn parent_stops_at_boundary_top() {
        let tree = MemoryTree::new();
        let host = tree.append_child(tree.root()).unwrap();
        let boundary = tree.attach_boundary(host).unwrap();
        let inner = tree.append_child(boundary).unwrap();
        let leaf = tree.append_child(inner).unwrap();

        assert_eq!(tree.parent(leaf), Some(inner));
        assert_eq!(tree.parent(inner), None);
        assert_eq!(tree.boundary_host(leaf), Some(host));
        assert_eq!(tree.boundary_host(host), None);
        assert_eq!(tree.parent(host), Some(tree.root()));
        assert_eq!(tree.parent(tree.root()), None);
    }

    #[test]
    fn computed_inherits_through_boundaries() {
        let tree = MemoryTree::new();
        let host = tree.append_child(tree.root()).unwrap();
        let boundary = tree.attach_boundary(host).unwrap();
        let inner = tree.append_child(boundary).unwrap();

        tree.set_property(tree.root(), "--state-k", "1").unwrap();
        assert_eq!(tree.local_property(inner, "--state-k").unwrap(), None);
        assert_eq!(
            tree.computed_property(inner, "--state-k").unwrap(),
            Some("1".to_string())
        );
    }

    #[test]
    fn boundary_root_is_not_an_element() {
        let tree = MemoryTree::new();
        let host = tree.append_child(tree.root()).unwrap();
        let boundary = tree.attach_boundary(host).unwrap();

        assert!(!tree.contains(boundary));
        assert_eq!(
            tree.set_property(boundary, "--state-k", "1").unwrap_err(),
            HostError::NotAnElement(boundary)
        );
        assert_eq!(
            tree.attach_boundary(host).unwrap_err(),
            HostError::NotSupported
        );
    }

    #[test]
    fn observers_see_only_their_node_unless_subtree() {
        let tree = MemoryTree::new();
        let child = tree.append_child(tree.root()).unwrap();

        let (direct_hits, direct) = counter();
        let (subtree_hits, subtree) = counter();
        tree.observe(tree.root(), ObserveOptions::default(), direct)
            .unwrap();
        tree.observe(tree.root(), ObserveOptions { subtree: true }, subtree)
            .unwrap();

        tree.set_property(child, "--state-a", "1").unwrap();
        tree.deliver_mutations();

        assert_eq!(direct_hits.get(), 0);
        assert_eq!(subtree_hits.get(), 1);
    }

    #[test]
    fn delivery_is_deferred_and_batched() {
        let tree = MemoryTree::new();
        let calls = Rc::new(Cell::new(0));
        let records = Rc::new(Cell::new(0));
        let (c, r) = (Rc::clone(&calls), Rc::clone(&records));
        tree.observe(
            tree.root(),
            ObserveOptions::default(),
            Rc::new(move |batch: &[MutationRecord]| {
                c.set(c.get() + 1);
                r.set(r.get() + batch.len());
            }),
        )
        .unwrap();

        tree.set_property(tree.root(), "--state-a", "1").unwrap();
        tree.set_property(tree.root(), "--state-b", "2").unwrap();
        assert_eq!(calls.get(), 0);

        assert_eq!(tree.deliver_mutations(), 1);
        assert_eq!(calls.get(), 1);
        assert_eq!(records.get(), 2);
    }

    #[test]
    fn disconnect_drops_pending_records() {
        let tree = MemoryTree::new();
        let (hits, callback) = counter();
        let id = tree
            .observe(tree.root(), ObserveOptions::default(), callback)
            .unwrap();

        tree.set_property(tree.root(), "--state-a", "1").unwrap();
        tree.disconnect(id).unwrap();
        tree.deliver_mutations();

        assert_eq!(hits.get(), 0);
        assert_eq!(
            tree.disconnect(id).unwrap_err(),
            HostError::UnknownObserver(id)
        );
    }

    #[test]
    fn panicking_observer_does_not_block_others() {
        let tree = MemoryTree::new();
        tree.observe(
            tree.root(),
            ObserveOptions::default(),
            Rc::new(|_: &[MutationRecord]| panic!("observer failure")),
        )
        .unwrap();
        let (hits, callback) = counter();
        tree.observe(tree.root(), ObserveOptions::default(), callback)
            .unwrap();

        tree.set_property(tree.root(), "--state-a", "1").unwrap();
        assert_eq!(tree.deliver_mutations(), 2);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn removing_unset_property_is_silent() {
        let tree = MemoryTree::new();
        let (hits, callback) = counter();
        tree.observe(tree.root(), ObserveOptions::default(), callback)
            .unwrap();

        tree.remove_property(tree.root(), "--state-missing").unwrap();
        tree.deliver_mutations();
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn remove_releases_subtree_and_watches() {
        let tree = MemoryTree::new();
        let panel = tree.append_child(tree.root()).unwrap();
        let boundary = tree.attach_boundary(panel).unwrap();
        let inner = tree.append_child(boundary).unwrap();
        let (_hits, callback) = counter();
        tree.observe(inner, ObserveOptions::default(), callback)
            .unwrap();

        tree.remove(panel).unwrap();

        assert!(!tree.contains(panel));
        assert!(!tree.contains(inner));
        assert_eq!(tree.observer_count(), 0);
        assert_eq!(tree.remove(tree.root()).unwrap_err(), HostError::NotSupported);
    }
}
