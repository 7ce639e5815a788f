//! Picture selection over the frame stack.
//!
//! [`Transput::next_pattern`] walks the top frame's tree depth-first and
//! left to right. Insertions met on the way are performed immediately,
//! replicator counts are evaluated on first entry, and the first picture
//! with uses left is handed back. Sub-format pictures open an embedded
//! frame and the walk carries on inside it.

use std::sync::Arc;

use crate::error::{Result, TransputError};
use crate::format::{EnvHandle, FormatText, NodeId, PictureTree, TreeNode};
use crate::frame::{CollItemState, FormatFrame, FrameId};
use crate::host::Host;
use crate::insertion::resolve_insertion;
use crate::metrics::TransputMetrics;
use crate::picture::{Count, Pattern, PatternKind};
use crate::trace::TraceEvent;
use crate::transput::Transput;

/// What to do when the active frame runs out of pictures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// A value is waiting: restart or return to the parent and keep looking.
    Required,
    /// Statement end: stop at exhaustion.
    Drain,
}

/// A selected picture and the environment its counts are evaluated in.
#[derive(Debug, Clone)]
pub struct PictureRef {
    pattern: Arc<Pattern>,
    env: EnvHandle,
    depth: usize,
}

impl PictureRef {
    #[must_use]
    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    #[must_use]
    pub fn shared_pattern(&self) -> Arc<Pattern> {
        Arc::clone(&self.pattern)
    }

    #[must_use]
    pub fn kind(&self) -> PatternKind {
        self.pattern.kind()
    }

    #[must_use]
    pub const fn env(&self) -> EnvHandle {
        self.env
    }

    /// Depth of the frame the picture came from (1 = outermost).
    #[must_use]
    pub const fn depth(&self) -> usize {
        self.depth
    }
}

impl Transput<'_> {
    /// Open `format` as a new outermost frame.
    pub fn open(&mut self, format: FormatText) -> Result<FrameId> {
        self.push_frame(format, None)
    }

    fn push_frame(&mut self, format: FormatText, parent: Option<FrameId>) -> Result<FrameId> {
        let depth = self.frames.len() + 1;
        let limit = self.config.max_frame_depth;
        if depth > limit {
            return Err(TransputError::FrameDepthExceeded { depth, limit });
        }
        let frame = FormatFrame::open(format, parent)?;
        let id = self.frames.push(frame);
        TransputMetrics::inc(&self.metrics().frames_opened);
        self.trace(TraceEvent::FrameOpened {
            depth,
            embedded: parent.is_some(),
        });
        Ok(id)
    }

    fn pop_frame(&mut self) {
        let depth = self.frames.len();
        if self.frames.pop().is_some() {
            self.trace(TraceEvent::FrameClosed { depth });
        }
    }

    /// Return from an exhausted embedded frame to its parent.
    fn return_to_parent(&mut self) {
        let depth = self.frames.len();
        TransputMetrics::inc(&self.metrics().embedded_returns);
        self.trace(TraceEvent::FormatReturned { depth });
        self.pop_frame();
    }

    /// Finish the frame `id`: perform trailing insertions, report leftover
    /// pictures, unwind embedded frames above it and pop it.
    pub fn close(&mut self, host: &mut dyn Host, id: FrameId) -> Result<()> {
        loop {
            let top = self.frames.top_id().ok_or(TransputError::FrameOrder {
                expected: 0,
                found: id.depth(),
            })?;
            if top.depth() < id.depth() {
                return Err(TransputError::FrameOrder {
                    expected: top.depth(),
                    found: id.depth(),
                });
            }
            while let Some(picture) = self.next_pattern(host, Selection::Drain)? {
                self.format_error(TransputError::UnusedPictures {
                    pattern: picture.kind(),
                })?;
            }
            match self.frames.top_id() {
                Some(top) if top == id => {
                    self.pop_frame();
                    return Ok(());
                }
                Some(top) if top.depth() > id.depth() => self.return_to_parent(),
                _ => {}
            }
        }
    }

    /// Select the next picture of the top frame.
    pub fn next_pattern(
        &mut self,
        host: &mut dyn Host,
        selection: Selection,
    ) -> Result<Option<PictureRef>> {
        let mut ended = false;
        loop {
            let Some(top) = self.frames.top_id() else {
                return match selection {
                    Selection::Drain => Ok(None),
                    Selection::Required => Err(TransputError::FormatUndefined),
                };
            };
            let (tree, env, embedded) = {
                let frame = self.frame(top)?;
                (
                    Arc::clone(frame.tree()),
                    frame.format().env(),
                    frame.is_embedded(),
                )
            };

            if let Some(node) = self.scan(host, top, &tree, tree.root())? {
                let Some(pattern) = tree.pattern(node).cloned() else {
                    continue;
                };
                if let Pattern::Format(expr) = *pattern {
                    let format = host.eval_format(expr, env, self)?;
                    self.push_frame(format, Some(top))?;
                    continue;
                }
                self.trace(TraceEvent::PatternSelected {
                    depth: top.depth(),
                    pattern: pattern.kind(),
                });
                return Ok(Some(PictureRef {
                    pattern,
                    env,
                    depth: top.depth(),
                }));
            }

            if selection == Selection::Drain {
                return Ok(None);
            }
            if embedded {
                self.return_to_parent();
                continue;
            }
            if ended {
                return Err(TransputError::FormatExhausted);
            }
            ended = true;
            if !self.file.on_format_end() {
                self.frame_mut(top)?.restart();
                TransputMetrics::inc(&self.metrics().restarts);
                self.trace(TraceEvent::FormatRestarted { depth: top.depth() });
            }
        }
    }

    fn frame(&self, id: FrameId) -> Result<&FormatFrame> {
        let expected = self.frames.len();
        self.frames.get(id).ok_or(TransputError::FrameOrder {
            expected,
            found: id.depth(),
        })
    }

    fn frame_mut(&mut self, id: FrameId) -> Result<&mut FormatFrame> {
        let expected = self.frames.len();
        self.frames.get_mut(id).ok_or(TransputError::FrameOrder {
            expected,
            found: id.depth(),
        })
    }

    fn set_state(&mut self, id: FrameId, node: NodeId, state: CollItemState) -> Result<()> {
        self.frame_mut(id)?.set_state(node, state);
        Ok(())
    }

    /// Depth-first search below `node` for a picture with uses left.
    ///
    /// The frame is addressed by id on every access: a host evaluation may
    /// push and pop frames of its own in between.
    fn scan(
        &mut self,
        host: &mut dyn Host,
        id: FrameId,
        tree: &PictureTree,
        node: NodeId,
    ) -> Result<Option<NodeId>> {
        let env = self.frame(id)?.format().env();
        match tree.node(node) {
            TreeNode::Insertion(insertion) => {
                if matches!(self.frame(id)?.state(node), CollItemState::Remaining(_)) {
                    self.set_state(id, node, CollItemState::Exhausted)?;
                    let mut ops = Vec::new();
                    {
                        let mut eval = |count: Count| self.eval_count(host, count, env);
                        resolve_insertion(insertion, &mut eval, &mut ops)?;
                    }
                    self.execute_ops(&ops)?;
                    TransputMetrics::inc(&self.metrics().insertions);
                }
                Ok(None)
            }
            TreeNode::Picture(_) => match self.frame(id)?.state(node) {
                CollItemState::Remaining(n) if n > 0 => {
                    let next = if n > 1 {
                        CollItemState::Remaining(n - 1)
                    } else {
                        CollItemState::Exhausted
                    };
                    self.set_state(id, node, next)?;
                    Ok(Some(node))
                }
                _ => Ok(None),
            },
            TreeNode::Replicator { count, child } => loop {
                match self.frame(id)?.state(node) {
                    CollItemState::Exhausted | CollItemState::Remaining(0) => return Ok(None),
                    CollItemState::Uninitialised => {
                        let k = self.eval_count(host, *count, env)?;
                        if k == 0 {
                            self.set_state(id, node, CollItemState::Exhausted)?;
                            return Ok(None);
                        }
                        let frame = self.frame_mut(id)?;
                        frame.set_state(node, CollItemState::Remaining(k));
                        frame.reset(tree, *child);
                    }
                    CollItemState::Remaining(k) => {
                        if let Some(found) = self.scan(host, id, tree, *child)? {
                            return Ok(Some(found));
                        }
                        let frame = self.frame_mut(id)?;
                        if k > 1 {
                            frame.set_state(node, CollItemState::Remaining(k - 1));
                            frame.reset(tree, *child);
                        } else {
                            frame.set_state(node, CollItemState::Exhausted);
                            return Ok(None);
                        }
                    }
                }
            },
            TreeNode::Collection(children) => {
                for &child in children {
                    if let Some(found) = self.scan(host, id, tree, child)? {
                        return Ok(Some(found));
                    }
                }
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::MemoryFile;
    use crate::format::FormatText;
    use crate::host::{StaticHost, TableHost};
    use crate::picture::{ExprHandle, GeneralPattern, PictureNode};
    use crate::trace::MemoryTrace;

    fn g() -> PictureNode {
        PictureNode::Picture(Pattern::General(GeneralPattern::default()))
    }

    fn fmt(root: PictureNode) -> FormatText {
        FormatText::new(&root, EnvHandle(0))
    }

    #[test]
    fn replicator_hands_out_picture_count_times() {
        let mut file = MemoryFile::new();
        let mut chan = Transput::new(&mut file);
        let mut host = StaticHost;
        chan.open(fmt(PictureNode::replicate(Count::Static(3), g())))
            .unwrap();
        for _ in 0..3 {
            let pic = chan.next_pattern(&mut host, Selection::Drain).unwrap();
            assert_eq!(pic.unwrap().kind(), PatternKind::General);
        }
        assert!(chan.next_pattern(&mut host, Selection::Drain).unwrap().is_none());
    }

    #[test]
    fn zero_replicator_is_skipped() {
        let mut file = MemoryFile::new();
        let mut chan = Transput::new(&mut file);
        let mut host = StaticHost;
        chan.open(fmt(PictureNode::Collection(vec![
            PictureNode::replicate(Count::Static(0), PictureNode::literal("never")),
            PictureNode::literal("x"),
            g(),
        ])))
        .unwrap();
        assert!(chan.next_pattern(&mut host, Selection::Required).unwrap().is_some());
        drop(chan);
        assert_eq!(file.output(), "x");
    }

    #[test]
    fn required_restarts_outermost_frame() {
        let mut file = MemoryFile::new();
        let trace = Arc::new(MemoryTrace::new());
        let mut chan = Transput::new(&mut file).with_trace(trace.clone());
        let mut host = StaticHost;
        chan.open(fmt(PictureNode::Collection(vec![PictureNode::literal("<"), g()])))
            .unwrap();
        assert!(chan.next_pattern(&mut host, Selection::Required).unwrap().is_some());
        assert!(chan.next_pattern(&mut host, Selection::Required).unwrap().is_some());
        assert_eq!(chan.metrics().snapshot().restarts, 1);
        assert!(
            trace
                .events()
                .contains(&TraceEvent::FormatRestarted { depth: 1 })
        );
        drop(chan);
        assert_eq!(file.output(), "<<");
    }

    #[test]
    fn picture_free_format_is_exhausted() {
        let mut file = MemoryFile::new();
        let mut chan = Transput::new(&mut file);
        let mut host = StaticHost;
        chan.open(fmt(PictureNode::literal("-"))).unwrap();
        let err = chan
            .next_pattern(&mut host, Selection::Required)
            .unwrap_err();
        assert_eq!(err, TransputError::FormatExhausted);
    }

    #[test]
    fn negative_dynamic_count_is_invalid() {
        let mut file = MemoryFile::new();
        let mut chan = Transput::new(&mut file);
        let mut host = TableHost::new().with_int(ExprHandle(1), -1);
        chan.open(fmt(PictureNode::replicate(
            Count::Dynamic(ExprHandle(1)),
            g(),
        )))
        .unwrap();
        let err = chan
            .next_pattern(&mut host, Selection::Required)
            .unwrap_err();
        assert_eq!(err, TransputError::ReplicatorInvalid { count: -1 });
    }

    #[test]
    fn embedded_format_returns_to_parent() {
        let inner = fmt(PictureNode::Collection(vec![PictureNode::literal("["), g()]));
        let mut host = TableHost::new().with_format(ExprHandle(7), inner);
        let mut file = MemoryFile::new();
        let mut chan = Transput::new(&mut file);
        chan.open(fmt(PictureNode::Collection(vec![
            PictureNode::Picture(Pattern::Format(ExprHandle(7))),
            PictureNode::literal("]"),
            g(),
        ])))
        .unwrap();
        let first = chan
            .next_pattern(&mut host, Selection::Required)
            .unwrap()
            .unwrap();
        assert_eq!(first.depth(), 2);
        let second = chan
            .next_pattern(&mut host, Selection::Required)
            .unwrap()
            .unwrap();
        assert_eq!(second.depth(), 1);
        assert_eq!(chan.frame_depth(), 1);
        assert_eq!(chan.metrics().snapshot().embedded_returns, 1);
        drop(chan);
        assert_eq!(file.output(), "[]");
    }

    #[test]
    fn close_reports_unused_pictures() {
        let mut file = MemoryFile::new();
        let mut chan = Transput::new(&mut file);
        let mut host = StaticHost;
        let id = chan.open(fmt(g())).unwrap();
        let err = chan.close(&mut host, id).unwrap_err();
        assert_eq!(
            err,
            TransputError::UnusedPictures {
                pattern: PatternKind::General
            }
        );
    }

    #[test]
    fn close_with_handled_unused_pictures_pops_frame() {
        let mut file = MemoryFile::new().on_format_error_with(|| true);
        let mut chan = Transput::new(&mut file);
        let mut host = StaticHost;
        let id = chan
            .open(fmt(PictureNode::Collection(vec![g(), PictureNode::literal(".")])))
            .unwrap();
        chan.close(&mut host, id).unwrap();
        assert_eq!(chan.frame_depth(), 0);
        drop(chan);
        assert_eq!(file.output(), ".");
    }

    #[test]
    fn self_embedding_format_hits_depth_limit() {
        let mut host = TableHost::new();
        let looped = fmt(PictureNode::Picture(Pattern::Format(ExprHandle(1))));
        host = host.with_format(ExprHandle(1), looped.clone());
        let mut file = MemoryFile::new();
        let mut chan = Transput::new(&mut file);
        chan.open(looped).unwrap();
        let err = chan
            .next_pattern(&mut host, Selection::Required)
            .unwrap_err();
        assert!(matches!(err, TransputError::FrameDepthExceeded { limit: 64, .. }));
    }
}
