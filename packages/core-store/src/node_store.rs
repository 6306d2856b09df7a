//! Reads and writes of a single property on a single node.

use std::rc::Rc;

use nodestate_host::{Host, NodeId, NodeTree, PropertyHost};

use crate::codec::PropertyName;
use crate::Result;

/// The unit of physical storage: text under a property name on one node.
///
/// Blank text is treated the same as an unset property.
#[derive(Clone)]
pub struct NodeStore {
    host: Rc<dyn Host>,
}

impl NodeStore {
    /// Wrap a host.
    pub fn new(host: Rc<dyn Host>) -> Self {
        Self { host }
    }

    /// The underlying host.
    pub fn host(&self) -> &Rc<dyn Host> {
        &self.host
    }

    /// Write `text` under `property` on `node`.
    pub fn write(&self, node: NodeId, property: &PropertyName, text: &str) -> Result<()> {
        self.host.set_property(node, property.as_str(), text)?;
        Ok(())
    }

    /// Remove `property` from `node`.
    pub fn remove(&self, node: NodeId, property: &PropertyName) -> Result<()> {
        self.host.remove_property(node, property.as_str())?;
        Ok(())
    }

    /// The text the host resolves for `property` at `node`, including
    /// anything the host inherits natively.
    pub fn read(&self, node: NodeId, property: &PropertyName) -> Result<Option<String>> {
        let text = self.host.computed_property(node, property.as_str())?;
        Ok(non_blank(text))
    }

    /// The text set on exactly `node`.
    pub fn read_local(&self, node: NodeId, property: &PropertyName) -> Result<Option<String>> {
        let text = self.host.local_property(node, property.as_str())?;
        Ok(non_blank(text))
    }
}

impl std::fmt::Debug for NodeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeStore")
            .field("root", &self.host.root())
            .finish()
    }
}

fn non_blank(text: Option<String>) -> Option<String> {
    text.filter(|t| !t.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::DEFAULT_PREFIX;
    use crate::Error;
    use nodestate_host::MemoryTree;

    fn name(key: &str) -> PropertyName {
        PropertyName::new(DEFAULT_PREFIX, None, key).unwrap()
    }

    #[test]
    fn write_then_read() {
        let tree = Rc::new(MemoryTree::new());
        let store = NodeStore::new(tree.clone());
        let root = tree.root();

        store.write(root, &name("a"), "1").unwrap();
        assert_eq!(store.read(root, &name("a")).unwrap(), Some("1".to_string()));
        assert_eq!(store.read(root, &name("b")).unwrap(), None);
    }

    #[test]
    fn read_sees_native_inheritance_but_read_local_does_not() {
        let tree = Rc::new(MemoryTree::new());
        let store = NodeStore::new(tree.clone());
        let child = tree.append_child(tree.root()).unwrap();

        store.write(tree.root(), &name("a"), "1").unwrap();
        assert_eq!(store.read(child, &name("a")).unwrap(), Some("1".to_string()));
        assert_eq!(store.read_local(child, &name("a")).unwrap(), None);
    }

    #[test]
    fn blank_text_reads_as_unset() {
        let tree = Rc::new(MemoryTree::new());
        let store = NodeStore::new(tree.clone());

        store.write(tree.root(), &name("a"), "   ").unwrap();
        assert_eq!(store.read_local(tree.root(), &name("a")).unwrap(), None);
    }

    #[test]
    fn unknown_node_is_invalid_target() {
        let tree = Rc::new(MemoryTree::new());
        let store = NodeStore::new(tree);
        let ghost = NodeId::from_raw(99);

        assert!(matches!(
            store.write(ghost, &name("a"), "1"),
            Err(Error::InvalidTarget(n)) if n == ghost
        ));
        assert!(matches!(
            store.read(ghost, &name("a")),
            Err(Error::InvalidTarget(_))
        ));
    }
}
