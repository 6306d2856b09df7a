//! Per-operation configuration.

use nodestate_host::NodeId;

/// Where and how a single store operation applies.
///
/// Every field has a default, so `Options::default()` means "unscoped, at
/// the root, inheriting, batched".
///
/// ```rust
/// use nodestate_core::Options;
/// use nodestate_host::NodeId;
///
/// let options = Options::new()
///     .with_target(NodeId::from_raw(4))
///     .with_scope("cart")
///     .with_cross_boundary(true);
/// assert!(options.inherit);
/// assert_eq!(options.scope(), Some("cart"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Node the operation applies to. `None` means the root.
    pub target: Option<NodeId>,
    /// Namespace embedded in the property name.
    pub scope: Option<String>,
    /// Property prefix. `None` uses the store's default.
    pub prefix: Option<String>,
    /// Walk ancestors when the target has no value.
    pub inherit: bool,
    /// Let reads continue past a boundary at its host node, and mirror
    /// writes onto that host node.
    pub cross_boundary: bool,
    /// Apply writes synchronously instead of queueing them.
    pub immediate: bool,
    /// Permit scoped state on the root node.
    pub allow_root_scope: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            target: None,
            scope: None,
            prefix: None,
            inherit: true,
            cross_boundary: false,
            immediate: false,
            allow_root_scope: false,
        }
    }
}

impl Options {
    /// Default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Options targeting `node`.
    pub fn at(node: NodeId) -> Self {
        Self::default().with_target(node)
    }

    /// Set the target node.
    pub fn with_target(mut self, node: NodeId) -> Self {
        self.target = Some(node);
        self
    }

    /// Set the scope.
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Set the property prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Enable or disable ancestor inheritance.
    pub fn with_inherit(mut self, inherit: bool) -> Self {
        self.inherit = inherit;
        self
    }

    /// Enable or disable boundary crossing.
    pub fn with_cross_boundary(mut self, cross: bool) -> Self {
        self.cross_boundary = cross;
        self
    }

    /// Enable or disable immediate writes.
    pub fn with_immediate(mut self, immediate: bool) -> Self {
        self.immediate = immediate;
        self
    }

    /// Permit or forbid scoped state on the root.
    pub fn with_allow_root_scope(mut self, allow: bool) -> Self {
        self.allow_root_scope = allow;
        self
    }

    /// The effective scope. An empty scope is the same as none.
    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref().filter(|s| !s.is_empty())
    }
}

/// Configuration for [`StateStore::persist`](crate::StateStore::persist).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistOptions {
    /// When false, persistence is skipped entirely.
    pub enabled: bool,
    /// Options for the underlying reads, writes and watch.
    pub state: Options,
}

impl Default for PersistOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            state: Options::default(),
        }
    }
}

impl PersistOptions {
    /// Persist with the given state options.
    pub fn new(state: Options) -> Self {
        Self {
            enabled: true,
            state,
        }
    }

    /// Enable or disable persistence.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}
