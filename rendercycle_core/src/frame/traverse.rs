// Copyright 2026 the Rendercycle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frame tree traversals.
//!
//! The lifecycle driver runs collaborator callbacks while it walks frames,
//! and those callbacks may create or destroy frames. Every walk below
//! therefore returns a snapshot of handles taken before any frame is
//! visited; consumers check [`FrameTree::is_alive`] before using each one.

use alloc::vec;
use alloc::vec::Vec;

use super::id::{FrameId, FrameKind, INVALID};
use super::store::FrameTree;

/// An iterator over the direct children of a frame.
///
/// Created by [`FrameTree::children`].
#[derive(Debug)]
pub struct ChildFrames<'a> {
    tree: &'a FrameTree,
    current: u32,
}

impl<'a> ChildFrames<'a> {
    pub(crate) fn new(tree: &'a FrameTree, first: u32) -> Self {
        Self {
            tree,
            current: first,
        }
    }
}

impl Iterator for ChildFrames<'_> {
    type Item = FrameId;

    fn next(&mut self) -> Option<FrameId> {
        if self.current == INVALID {
            return None;
        }
        let idx = self.current;
        self.current = self.tree.next_sibling[idx as usize];
        Some(self.tree.id_at(idx))
    }
}

/// Whether a frame is visited before or after the frames it embeds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TraversalOrder {
    /// Parents before children.
    PreOrder,
    /// Children before the parent that embeds them.
    PostOrder,
}

impl FrameTree {
    /// The local children of a frame, in order.
    #[must_use]
    pub fn child_local_frames(&self, id: FrameId) -> Vec<FrameId> {
        self.children(id)
            .filter(|child| self.kind[child.idx as usize] == FrameKind::Local)
            .collect()
    }

    /// Every local frame reachable from `root` through local frames, in
    /// pre-order, throttled or not.
    #[must_use]
    pub fn local_frames(&self, root: FrameId) -> Vec<FrameId> {
        self.validate(root);
        let mut out = Vec::new();
        self.walk_local(root.idx, &mut |_, _| true, TraversalOrder::PreOrder, &mut out);
        out
    }

    /// The local frames below `root` that are not throttled, skipping the
    /// whole subtree of a throttled frame.
    #[must_use]
    pub fn non_throttled_local_frames(&self, root: FrameId, order: TraversalOrder) -> Vec<FrameId> {
        self.validate(root);
        let mut out = Vec::new();
        self.walk_local(
            root.idx,
            &mut |tree, idx| !tree.should_throttle_rendering_at(idx),
            order,
            &mut out,
        );
        out
    }

    /// The local frames below `root` that are throttled, in pre-order.
    #[must_use]
    pub fn throttled_local_frames(&self, root: FrameId) -> Vec<FrameId> {
        self.validate(root);
        let mut all = Vec::new();
        self.walk_local(root.idx, &mut |_, _| true, TraversalOrder::PreOrder, &mut all);
        all.retain(|f| self.should_throttle_rendering_at(f.idx));
        all
    }

    /// The remote frames embedded in `root`'s local subtree.
    #[must_use]
    pub fn remote_frames(&self, root: FrameId) -> Vec<FrameId> {
        self.validate(root);
        let mut out = Vec::new();
        let mut stack = vec![root.idx];
        while let Some(idx) = stack.pop() {
            let first = stack.len();
            let mut child = self.first_child[idx as usize];
            while child != INVALID {
                match self.kind[child as usize] {
                    FrameKind::Local => stack.push(child),
                    FrameKind::Remote => out.push(self.id_at(child)),
                }
                child = self.next_sibling[child as usize];
            }
            stack[first..].reverse();
        }
        out
    }

    /// Depth-first walk over local frames, entering a frame's subtree only
    /// when `enter` accepts the frame.
    fn walk_local(
        &self,
        root: u32,
        enter: &mut dyn FnMut(&Self, u32) -> bool,
        order: TraversalOrder,
        out: &mut Vec<FrameId>,
    ) {
        if self.kind[root as usize] != FrameKind::Local || !enter(self, root) {
            return;
        }
        // (frame, children already pushed)
        let mut stack: Vec<(u32, bool)> = vec![(root, false)];
        while let Some((idx, expanded)) = stack.pop() {
            if expanded {
                out.push(self.id_at(idx));
                continue;
            }
            if order == TraversalOrder::PreOrder {
                out.push(self.id_at(idx));
            } else {
                stack.push((idx, true));
            }
            let first = stack.len();
            let mut child = self.first_child[idx as usize];
            while child != INVALID {
                if self.kind[child as usize] == FrameKind::Local && enter(self, child) {
                    stack.push((child, false));
                }
                child = self.next_sibling[child as usize];
            }
            // Visit children in order.
            stack[first..].reverse();
        }
    }
}
