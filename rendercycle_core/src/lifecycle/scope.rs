// Copyright 2026 the Rendercycle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scoped overrides of local-root state.
//!
//! Each scope borrows the [`FrameTree`] mutably, changes one piece of state
//! on a local frame root and puts the previous value back when dropped. The
//! scope dereferences to the tree so work can continue through it.

use core::ops::{Deref, DerefMut};

use super::state::LifecycleState;
use crate::frame::{FrameId, FrameTree};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ThrottlingMode {
    Allow,
    Disallow,
    Force,
}

/// Changes whether frames under a local root may throttle.
///
/// [`allow`](Self::allow) lets throttled frames be skipped,
/// [`disallow`](Self::disallow) makes every frame run, and
/// [`force`](Self::force) skips every frame.
#[derive(Debug)]
pub struct ThrottlingScope<'a> {
    tree: &'a mut FrameTree,
    root: FrameId,
    mode: ThrottlingMode,
    previous: bool,
}

impl<'a> ThrottlingScope<'a> {
    /// Allows throttling under `frame`'s local root.
    pub fn allow(tree: &'a mut FrameTree, frame: FrameId) -> Self {
        Self::enter(tree, frame, ThrottlingMode::Allow)
    }

    /// Disallows throttling under `frame`'s local root.
    pub fn disallow(tree: &'a mut FrameTree, frame: FrameId) -> Self {
        Self::enter(tree, frame, ThrottlingMode::Disallow)
    }

    /// Throttles every frame under `frame`'s local root.
    pub fn force(tree: &'a mut FrameTree, frame: FrameId) -> Self {
        Self::enter(tree, frame, ThrottlingMode::Force)
    }

    fn enter(tree: &'a mut FrameTree, frame: FrameId, mode: ThrottlingMode) -> Self {
        tree.validate(frame);
        let root = tree.id_at(tree.local_root_idx(frame.idx));
        let state = &mut tree.root_state[root.idx as usize];
        let previous = match mode {
            ThrottlingMode::Allow => core::mem::replace(&mut state.allow_throttling, true),
            ThrottlingMode::Disallow => core::mem::replace(&mut state.allow_throttling, false),
            ThrottlingMode::Force => core::mem::replace(&mut state.force_throttling, true),
        };
        Self {
            tree,
            root,
            mode,
            previous,
        }
    }
}

impl Deref for ThrottlingScope<'_> {
    type Target = FrameTree;

    fn deref(&self) -> &FrameTree {
        self.tree
    }
}

impl DerefMut for ThrottlingScope<'_> {
    fn deref_mut(&mut self) -> &mut FrameTree {
        self.tree
    }
}

impl Drop for ThrottlingScope<'_> {
    fn drop(&mut self) {
        if !self.tree.is_alive(self.root) {
            return;
        }
        let state = &mut self.tree.root_state[self.root.idx as usize];
        match self.mode {
            ThrottlingMode::Allow | ThrottlingMode::Disallow => {
                state.allow_throttling = self.previous;
            }
            ThrottlingMode::Force => state.force_throttling = self.previous,
        }
    }
}

/// Records the target state of the update running on a local root.
///
/// While the scope lives, [`FrameTree::is_updating_lifecycle`] is true for
/// the root.
#[derive(Debug)]
pub(crate) struct TargetStateScope<'a> {
    tree: &'a mut FrameTree,
    root: FrameId,
    previous: LifecycleState,
}

impl<'a> TargetStateScope<'a> {
    pub(crate) fn new(tree: &'a mut FrameTree, root: FrameId, target: LifecycleState) -> Self {
        let previous = core::mem::replace(
            &mut tree.root_state[root.idx as usize].target_state,
            target,
        );
        Self {
            tree,
            root,
            previous,
        }
    }
}

impl Deref for TargetStateScope<'_> {
    type Target = FrameTree;

    fn deref(&self) -> &FrameTree {
        self.tree
    }
}

impl DerefMut for TargetStateScope<'_> {
    fn deref_mut(&mut self) -> &mut FrameTree {
        self.tree
    }
}

impl Drop for TargetStateScope<'_> {
    fn drop(&mut self) {
        if self.tree.is_alive(self.root) {
            self.tree.root_state[self.root.idx as usize].target_state = self.previous;
        }
    }
}
