//! Compiled format values.
//!
//! A [`FormatText`] pairs an immutable, `Arc`-shared picture tree with the
//! lexical environment its dynamic expressions are evaluated in. The tree is
//! flattened into an arena so that frames can keep one state slot per node.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::picture::{Count, Insertion, Pattern, PictureNode};

/// Opaque reference to the host environment captured by a format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnvHandle(pub u64);

/// Index of a node in a [`PictureTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Arena form of a [`PictureNode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeNode {
    Insertion(Insertion),
    Picture(Arc<Pattern>),
    Replicator { count: Count, child: NodeId },
    Collection(Vec<NodeId>),
}

/// Flattened picture tree; the root is always node 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PictureTree {
    nodes: Vec<TreeNode>,
}

impl PictureTree {
    #[must_use]
    pub fn new(root: &PictureNode) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        tree.push(root);
        tree
    }

    fn push(&mut self, node: &PictureNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        // Reserve the slot so the parent precedes its children.
        self.nodes.push(TreeNode::Collection(Vec::new()));
        let built = match node {
            PictureNode::Insertion(ins) => TreeNode::Insertion(ins.clone()),
            PictureNode::Picture(pattern) => TreeNode::Picture(Arc::new(pattern.clone())),
            PictureNode::Replicator { count, child } => {
                let child = self.push(child);
                TreeNode::Replicator {
                    count: *count,
                    child,
                }
            }
            PictureNode::Collection(children) => {
                TreeNode::Collection(children.iter().map(|c| self.push(c)).collect())
            }
        };
        self.nodes[id.0] = built;
        id
    }

    #[must_use]
    pub const fn root(&self) -> NodeId {
        NodeId(0)
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id.0]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// A format with no items at all: an empty root collection.
    #[must_use]
    pub fn has_items(&self) -> bool {
        match self.nodes.first() {
            None => false,
            Some(TreeNode::Collection(children)) => !children.is_empty(),
            Some(_) => true,
        }
    }

    /// The pattern of a picture node, if `id` is one.
    #[must_use]
    pub fn pattern(&self, id: NodeId) -> Option<&Arc<Pattern>> {
        match self.node(id) {
            TreeNode::Picture(p) => Some(p),
            _ => None,
        }
    }
}

/// A format value: shared tree plus environment. `tree` is `None` for nil.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatText {
    tree: Option<Arc<PictureTree>>,
    env: EnvHandle,
}

impl FormatText {
    /// Compile-side constructor: flattens `root` once.
    #[must_use]
    pub fn new(root: &PictureNode, env: EnvHandle) -> Self {
        Self {
            tree: Some(Arc::new(PictureTree::new(root))),
            env,
        }
    }

    /// The nil format.
    #[must_use]
    pub fn nil() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_nil(&self) -> bool {
        self.tree.is_none()
    }

    #[must_use]
    pub fn tree(&self) -> Option<&Arc<PictureTree>> {
        self.tree.as_ref()
    }

    #[must_use]
    pub const fn env(&self) -> EnvHandle {
        self.env
    }

    /// Same tree, different environment.
    #[must_use]
    pub fn with_env(&self, env: EnvHandle) -> Self {
        Self {
            tree: self.tree.clone(),
            env,
        }
    }
}
