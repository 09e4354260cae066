//! Arena of routers linked into a parent/child tree.
//!
//! Routers are added detached and linked with [`RouterTree::attach`], which
//! rejects re-attachment, self-attachment and cycles at setup time. Dispatch
//! only ever reads the tree through [`RouterTree::chain_head`] and
//! [`RouterTree::chain_tail`].

use tracing::debug;

use super::Router;
use crate::error::ConfigError;

/// Stable handle of a router inside an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouterId(usize);

impl RouterId {
    /// The application's own router.
    pub const ROOT: RouterId = RouterId(0);

    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug)]
struct Node {
    router: Router,
    parent: Option<RouterId>,
    children: Vec<RouterId>,
}

/// Router arena; index 0 is the root.
#[derive(Debug)]
pub struct RouterTree {
    nodes: Vec<Node>,
}

impl RouterTree {
    pub(crate) fn new(root: Router) -> Self {
        Self {
            nodes: vec![Node {
                router: root,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    /// Add a detached router.
    pub fn add(&mut self, router: Router) -> RouterId {
        let id = RouterId(self.nodes.len());
        self.nodes.push(Node {
            router,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// The application's own router.
    #[must_use]
    pub fn root(&self) -> &Router {
        &self.nodes[RouterId::ROOT.0].router
    }

    pub fn root_mut(&mut self) -> &mut Router {
        &mut self.nodes[RouterId::ROOT.0].router
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn node(&self, id: RouterId) -> Result<&Node, ConfigError> {
        self.nodes
            .get(id.0)
            .ok_or(ConfigError::UnknownRouter { id: id.0 })
    }

    pub fn get(&self, id: RouterId) -> Result<&Router, ConfigError> {
        self.node(id).map(|n| &n.router)
    }

    pub fn get_mut(&mut self, id: RouterId) -> Result<&mut Router, ConfigError> {
        self.nodes
            .get_mut(id.0)
            .map(|n| &mut n.router)
            .ok_or(ConfigError::UnknownRouter { id: id.0 })
    }

    #[must_use]
    pub fn parent(&self, id: RouterId) -> Option<RouterId> {
        self.nodes.get(id.0).and_then(|n| n.parent)
    }

    #[must_use]
    pub fn children(&self, id: RouterId) -> &[RouterId] {
        self.nodes
            .get(id.0)
            .map(|n| n.children.as_slice())
            .unwrap_or_default()
    }

    /// Make `child` a sub-router of `parent`.
    pub fn attach(&mut self, child: RouterId, parent: RouterId) -> Result<(), ConfigError> {
        let child_node = self.node(child)?;
        let parent_node = self.node(parent)?;
        let name = |n: &Node| n.router.name().to_string();

        if child == RouterId::ROOT {
            return Err(ConfigError::RootAttachment);
        }
        if let Some(current) = child_node.parent {
            return Err(ConfigError::AlreadyAttached {
                router: name(child_node),
                parent: name(self.node(current)?),
            });
        }
        if child == parent {
            return Err(ConfigError::SelfAttachment {
                router: name(child_node),
            });
        }
        if self.chain_head(parent).any(|id| id == child) {
            return Err(ConfigError::CircularAttachment {
                router: name(child_node),
                parent: name(parent_node),
            });
        }

        debug!(
            router = %child_node.router.name(),
            parent = %parent_node.router.name(),
            "Router attached"
        );
        if let Some(node) = self.nodes.get_mut(child.0) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.nodes.get_mut(parent.0) {
            node.children.push(child);
        }
        Ok(())
    }

    /// `id`, its parent, and so on up to the root.
    #[must_use]
    pub fn chain_head(&self, id: RouterId) -> ChainHead<'_> {
        ChainHead {
            tree: self,
            next: self.nodes.get(id.0).map(|_| id),
        }
    }

    /// `id` and all of its descendants, depth first, children in attachment
    /// order.
    #[must_use]
    pub fn chain_tail(&self, id: RouterId) -> ChainTail<'_> {
        let stack = if self.nodes.get(id.0).is_some() {
            vec![id]
        } else {
            Vec::new()
        };
        ChainTail { tree: self, stack }
    }
}

/// Iterator returned by [`RouterTree::chain_head`].
#[derive(Debug, Clone)]
pub struct ChainHead<'t> {
    tree: &'t RouterTree,
    next: Option<RouterId>,
}

impl Iterator for ChainHead<'_> {
    type Item = RouterId;

    fn next(&mut self) -> Option<RouterId> {
        let current = self.next?;
        self.next = self.tree.parent(current);
        Some(current)
    }
}

/// Iterator returned by [`RouterTree::chain_tail`].
#[derive(Debug, Clone)]
pub struct ChainTail<'t> {
    tree: &'t RouterTree,
    stack: Vec<RouterId>,
}

impl Iterator for ChainTail<'_> {
    type Item = RouterId;

    fn next(&mut self) -> Option<RouterId> {
        let current = self.stack.pop()?;
        self.stack
            .extend(self.tree.children(current).iter().rev().copied());
        Some(current)
    }
}
