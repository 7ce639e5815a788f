//! Format activation frames.
//!
//! Each open format owns a [`FormatFrame`]: one [`CollItemState`] slot per
//! tree node plus a link to the frame that was active when it was opened.
//! Frames live on an explicit [`FrameStack`] so nested and re-entrant
//! transput calls can grow it independently of the Rust call stack.

use std::sync::Arc;

use crate::error::{Result, TransputError};
use crate::format::{FormatText, NodeId, PictureTree, TreeNode};

/// Consumption state of one node within a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollItemState {
    /// Not yet reached since the frame was opened.
    Uninitialised,
    /// Fully consumed for the current pass.
    Exhausted,
    /// Uses (pictures, insertions) or iterations (replicators) left.
    Remaining(u64),
}

/// Position of a frame on its [`FrameStack`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(pub(crate) usize);

impl FrameId {
    #[must_use]
    pub const fn depth(self) -> usize {
        self.0 + 1
    }
}

/// Activation record of one open format.
#[derive(Debug, Clone)]
pub struct FormatFrame {
    format: FormatText,
    tree: Arc<PictureTree>,
    parent: Option<FrameId>,
    states: Vec<CollItemState>,
}

impl FormatFrame {
    /// Open `format`; nil and empty formats are undefined.
    pub fn open(format: FormatText, parent: Option<FrameId>) -> Result<Self> {
        let tree = match format.tree() {
            Some(tree) if tree.has_items() => Arc::clone(tree),
            _ => return Err(TransputError::FormatUndefined),
        };
        let mut frame = Self {
            states: vec![CollItemState::Uninitialised; tree.len()],
            format,
            tree,
            parent,
        };
        frame.restart();
        Ok(frame)
    }

    #[must_use]
    pub fn format(&self) -> &FormatText {
        &self.format
    }

    #[must_use]
    pub fn tree(&self) -> &Arc<PictureTree> {
        &self.tree
    }

    /// Embedded frames return to a parent at end of format.
    #[must_use]
    pub const fn is_embedded(&self) -> bool {
        self.parent.is_some()
    }

    #[must_use]
    pub fn state(&self, node: NodeId) -> CollItemState {
        self.states[node.index()]
    }

    pub fn set_state(&mut self, node: NodeId, state: CollItemState) {
        self.states[node.index()] = state;
    }

    /// Reinitialise the whole tree, as on first entry.
    pub fn restart(&mut self) {
        let tree = Arc::clone(&self.tree);
        self.reset(&tree, tree.root());
    }

    /// Reset `node`'s subtree for a fresh pass: leaves get their replication
    /// factor of one; replicators re-evaluate their count when reached.
    pub fn reset(&mut self, tree: &PictureTree, node: NodeId) {
        match tree.node(node) {
            TreeNode::Insertion(_) | TreeNode::Picture(_) => {
                self.set_state(node, CollItemState::Remaining(1));
            }
            TreeNode::Replicator { .. } => self.set_state(node, CollItemState::Uninitialised),
            TreeNode::Collection(children) => {
                self.set_state(node, CollItemState::Remaining(1));
                for &child in children {
                    self.reset(tree, child);
                }
            }
        }
    }
}

/// LIFO stack of open frames for one channel.
#[derive(Debug, Clone, Default)]
pub struct FrameStack {
    frames: Vec<FormatFrame>,
}

impl FrameStack {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frame: FormatFrame) -> FrameId {
        self.frames.push(frame);
        FrameId(self.frames.len() - 1)
    }

    pub fn pop(&mut self) -> Option<FormatFrame> {
        self.frames.pop()
    }

    #[must_use]
    pub fn top_id(&self) -> Option<FrameId> {
        self.frames.len().checked_sub(1).map(FrameId)
    }

    #[must_use]
    pub fn get(&self, id: FrameId) -> Option<&FormatFrame> {
        self.frames.get(id.0)
    }

    pub fn get_mut(&mut self, id: FrameId) -> Option<&mut FormatFrame> {
        self.frames.get_mut(id.0)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::EnvHandle;
    use crate::picture::{Count, GeneralPattern, Pattern, PictureNode};

    fn g() -> PictureNode {
        PictureNode::Picture(Pattern::General(GeneralPattern::default()))
    }

    fn format(root: PictureNode) -> FormatText {
        FormatText::new(&root, EnvHandle(0))
    }

    #[test]
    fn open_initialises_states() {
        let frame = FormatFrame::open(
            format(PictureNode::Collection(vec![
                PictureNode::literal("x"),
                PictureNode::replicate(Count::Static(3), g()),
            ])),
            None,
        )
        .unwrap();
        assert_eq!(frame.state(NodeId(1)), CollItemState::Remaining(1));
        assert_eq!(frame.state(NodeId(2)), CollItemState::Uninitialised);
        assert!(!frame.is_embedded());
    }

    #[test]
    fn nil_and_empty_are_undefined() {
        assert_eq!(
            FormatFrame::open(FormatText::nil(), None).unwrap_err(),
            TransputError::FormatUndefined
        );
        assert_eq!(
            FormatFrame::open(format(PictureNode::Collection(vec![])), None).unwrap_err(),
            TransputError::FormatUndefined
        );
    }

    #[test]
    fn restart_resets_consumed_states() {
        let mut frame = FormatFrame::open(
            format(PictureNode::Collection(vec![
                PictureNode::literal("x"),
                PictureNode::replicate(Count::Static(2), g()),
            ])),
            None,
        )
        .unwrap();
        frame.set_state(NodeId(1), CollItemState::Exhausted);
        frame.set_state(NodeId(2), CollItemState::Remaining(1));
        frame.restart();
        assert_eq!(frame.state(NodeId(1)), CollItemState::Remaining(1));
        assert_eq!(frame.state(NodeId(2)), CollItemState::Uninitialised);
    }

    #[test]
    fn stack_is_lifo() {
        let mut stack = FrameStack::new();
        let f = format(g());
        let outer = stack.push(FormatFrame::open(f.clone(), None).unwrap());
        let inner = stack.push(FormatFrame::open(f, Some(outer)).unwrap());
        assert_eq!(stack.top_id(), Some(inner));
        assert_eq!(inner.depth(), 2);
        assert!(stack.get(inner).unwrap().is_embedded());
        assert!(stack.pop().is_some());
        assert_eq!(stack.top_id(), Some(outer));
        assert!(stack.pop().is_some());
        assert!(stack.is_empty());
    }
}
