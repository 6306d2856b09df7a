//! Scope resolution: which node, which property name.

use nodestate_host::{NodeId, NodeTree};

use crate::codec::PropertyName;
use crate::{Error, Options, Result};

/// The physical location an operation resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// Node that holds (or starts the search for) the value.
    pub node: NodeId,
    /// Property name on that node.
    pub property: PropertyName,
}

/// What the caller intends to do with the resolved location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Reads resolve to the target or the root and never fail on policy.
    Read,
    /// Scoped writes to the root are dropped unless explicitly allowed.
    Write,
    /// Long-lived subscriptions on scoped state need a real target.
    Watch,
}

/// Computes property names and target nodes from [`Options`].
#[derive(Debug, Clone)]
pub struct ScopeResolver {
    prefix: String,
}

impl ScopeResolver {
    /// Create a resolver whose default prefix is `prefix`.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// The default prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The property name `key` maps to under `options`.
    pub fn property_name(&self, key: &str, options: &Options) -> Result<PropertyName> {
        let prefix = options.prefix.as_deref().unwrap_or(&self.prefix);
        PropertyName::new(prefix, options.scope(), key)
    }

    /// Resolve `key` under `options` for the given kind of access.
    ///
    /// Returns `Ok(None)` only for a [`Access::Write`] of scoped state to the
    /// root without `allow_root_scope`: that write is silently dropped so
    /// scoped state cannot leak into the global root.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidKey`] for an empty key
    /// - [`Error::InvalidTarget`] when the target is not a live node
    /// - [`Error::MissingTarget`] for a scoped [`Access::Watch`] that would
    ///   land on the root without `allow_root_scope`
    pub fn resolve<T: NodeTree + ?Sized>(
        &self,
        tree: &T,
        key: &str,
        options: &Options,
        access: Access,
    ) -> Result<Option<Resolved>> {
        let property = self.property_name(key, options)?;

        let root = tree.root();
        let node = options.target.unwrap_or(root);
        if !tree.contains(node) {
            return Err(Error::InvalidTarget(node));
        }

        let guarded = node == root && options.scope().is_some() && !options.allow_root_scope;
        if guarded {
            match access {
                Access::Read => {}
                Access::Write => {
                    log::debug!("dropping scoped write of {} to the root", property);
                    return Ok(None);
                }
                Access::Watch => return Err(Error::MissingTarget),
            }
        }

        Ok(Some(Resolved { node, property }))
    }
}

impl Default for ScopeResolver {
    fn default() -> Self {
        Self::new(crate::codec::DEFAULT_PREFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodestate_host::MemoryTree;

    #[test]
    fn unscoped_defaults_to_root() {
        let tree = MemoryTree::new();
        let resolver = ScopeResolver::default();

        let resolved = resolver
            .resolve(&tree, "count", &Options::default(), Access::Write)
            .unwrap()
            .unwrap();
        assert_eq!(resolved.node, tree.root());
        assert_eq!(resolved.property.as_str(), "--state-count");
    }

    #[test]
    fn scope_and_prefix_shape_the_name() {
        let tree = MemoryTree::new();
        let node = tree.append_child(tree.root()).unwrap();
        let resolver = ScopeResolver::default();

        let options = Options::at(node).with_scope("cart").with_prefix("--app-");
        let resolved = resolver
            .resolve(&tree, "items", &options, Access::Write)
            .unwrap()
            .unwrap();
        assert_eq!(resolved.node, node);
        assert_eq!(resolved.property.as_str(), "--app-cart-items");
    }

    #[test]
    fn scoped_root_write_is_dropped() {
        let tree = MemoryTree::new();
        let resolver = ScopeResolver::default();
        let options = Options::new().with_scope("s");

        assert_eq!(
            resolver
                .resolve(&tree, "k", &options, Access::Write)
                .unwrap(),
            None
        );
        assert!(resolver
            .resolve(&tree, "k", &options, Access::Read)
            .unwrap()
            .is_some());
        assert!(matches!(
            resolver.resolve(&tree, "k", &options, Access::Watch),
            Err(Error::MissingTarget)
        ));
    }

    #[test]
    fn explicit_root_target_is_guarded_too() {
        let tree = MemoryTree::new();
        let resolver = ScopeResolver::default();
        let options = Options::at(tree.root()).with_scope("s");

        assert_eq!(
            resolver
                .resolve(&tree, "k", &options, Access::Write)
                .unwrap(),
            None
        );
    }

    #[test]
    fn allow_root_scope_lifts_the_guard() {
        let tree = MemoryTree::new();
        let resolver = ScopeResolver::default();
        let options = Options::new().with_scope("s").with_allow_root_scope(true);

        let resolved = resolver
            .resolve(&tree, "k", &options, Access::Watch)
            .unwrap()
            .unwrap();
        assert_eq!(resolved.node, tree.root());
        assert_eq!(resolved.property.as_str(), "--state-s-k");
    }

    #[test]
    fn bad_inputs_fail() {
        let tree = MemoryTree::new();
        let resolver = ScopeResolver::default();

        assert!(matches!(
            resolver.resolve(&tree, "", &Options::default(), Access::Read),
            Err(Error::InvalidKey)
        ));

        let ghost = NodeId::from_raw(42);
        assert!(matches!(
            resolver.resolve(&tree, "k", &Options::at(ghost), Access::Read),
            Err(Error::InvalidTarget(n)) if n == ghost
        ));
    }
}
