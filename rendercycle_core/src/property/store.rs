// Copyright 2026 the Rendercycle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays storage for the transform, clip and effect trees.

use alloc::vec::Vec;

use kurbo::{Rect, Vec2};
use understory_dirty::{CycleHandling, DirtyTracker, EagerPolicy};

use super::id::{ClipId, EffectId, PropertyTreeState, TransformId};
use super::scroll::ScrollNode;
use crate::dirty;
use crate::transform::Transform3d;

/// Marks "no parent" in the parent arrays.
pub(crate) const INVALID: u32 = u32::MAX;

/// The paint property trees of one frame tree.
///
/// Each tree starts with a root node at index 0. Nodes are appended and never
/// removed; an object that stops needing a node simply stops referencing it.
/// Mutations mark [`dirty`](crate::dirty) channels which
/// [`evaluate`](Self::evaluate) drains into a
/// [`PropertyChanges`](super::PropertyChanges).
#[derive(Debug)]
pub struct PropertyTrees {
    // -- Transform tree --
    pub(crate) transform_parent: Vec<u32>,
    pub(crate) local_transform: Vec<Transform3d>,
    pub(crate) scroll: Vec<Option<ScrollNode>>,
    pub(crate) scroll_offset: Vec<Vec2>,
    pub(crate) pending_scroll_delta: Vec<Vec2>,
    pub(crate) requires_cull_rect_expansion: Vec<bool>,

    // -- Clip tree --
    pub(crate) clip_parent: Vec<u32>,
    pub(crate) clip_space: Vec<u32>,
    pub(crate) clip_rect: Vec<Option<Rect>>,

    // -- Effect tree --
    pub(crate) effect_parent: Vec<u32>,
    pub(crate) opacity: Vec<f32>,

    // -- Dirty tracking --
    pub(crate) transform_dirty: DirtyTracker<u32>,
    pub(crate) clip_dirty: DirtyTracker<u32>,
}

impl Default for PropertyTrees {
    fn default() -> Self {
        Self::new()
    }
}

impl PropertyTrees {
    /// Creates trees holding only their root nodes.
    #[must_use]
    pub fn new() -> Self {
        Self {
            transform_parent: alloc::vec![INVALID],
            local_transform: alloc::vec![Transform3d::IDENTITY],
            scroll: alloc::vec![None],
            scroll_offset: alloc::vec![Vec2::ZERO],
            pending_scroll_delta: alloc::vec![Vec2::ZERO],
            requires_cull_rect_expansion: alloc::vec![false],
            clip_parent: alloc::vec![INVALID],
            clip_space: alloc::vec![TransformId::ROOT.0],
            clip_rect: alloc::vec![None],
            effect_parent: alloc::vec![INVALID],
            opacity: alloc::vec![1.0],
            transform_dirty: DirtyTracker::with_cycle_handling(CycleHandling::Error),
            clip_dirty: DirtyTracker::with_cycle_handling(CycleHandling::Error),
        }
    }

    /// The state made of the three roots.
    #[inline]
    #[must_use]
    pub const fn root_state(&self) -> PropertyTreeState {
        PropertyTreeState::ROOT
    }

    /// Number of transform nodes, including the root.
    #[must_use]
    pub fn transform_count(&self) -> usize {
        self.transform_parent.len()
    }

    /// Number of clip nodes, including the root.
    #[must_use]
    pub fn clip_count(&self) -> usize {
        self.clip_parent.len()
    }

    // -- Transform tree --

    /// Appends a transform node below `parent`.
    pub fn create_transform(&mut self, parent: TransformId, local: Transform3d) -> TransformId {
        self.validate_transform(parent);
        let idx = self.push_transform(parent.0, local, None);
        TransformId(idx)
    }

    /// Appends a scroll translation below `parent`, starting at offset zero.
    pub fn create_scroll_translation(
        &mut self,
        parent: TransformId,
        scroll: ScrollNode,
    ) -> TransformId {
        self.validate_transform(parent);
        let idx = self.push_transform(parent.0, Transform3d::IDENTITY, Some(scroll));
        TransformId(idx)
    }

    fn push_transform(&mut self, parent: u32, local: Transform3d, scroll: Option<ScrollNode>) -> u32 {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "node counts are bounded well below u32::MAX"
        )]
        let idx = self.transform_parent.len() as u32;
        self.transform_parent.push(parent);
        self.local_transform.push(local);
        self.scroll.push(scroll);
        self.scroll_offset.push(Vec2::ZERO);
        self.pending_scroll_delta.push(Vec2::ZERO);
        self.requires_cull_rect_expansion.push(false);
        let _ = self.transform_dirty.add_dependency(idx, parent, dirty::TRANSFORM);
        self.transform_dirty.mark(idx, dirty::TRANSFORM);
        idx
    }

    /// Returns the parent transform, or `None` for the root.
    #[must_use]
    pub fn transform_parent(&self, id: TransformId) -> Option<TransformId> {
        self.validate_transform(id);
        let p = self.transform_parent[id.0 as usize];
        (p != INVALID).then_some(TransformId(p))
    }

    /// Returns the matrix mapping this node's space into its parent's space.
    #[must_use]
    pub fn local_transform(&self, id: TransformId) -> Transform3d {
        self.validate_transform(id);
        self.local_transform[id.0 as usize]
    }

    /// Sets the local matrix.
    ///
    /// Marks the TRANSFORM channel dirty with eager propagation to descendants.
    pub fn set_local_transform(&mut self, id: TransformId, local: Transform3d) {
        self.validate_transform(id);
        self.local_transform[id.0 as usize] = local;
        self.transform_dirty
            .mark_with(id.0, dirty::TRANSFORM, &EagerPolicy);
    }

    /// Returns the scroll node if this is a scroll translation.
    #[must_use]
    pub fn scroll_node(&self, id: TransformId) -> Option<&ScrollNode> {
        self.validate_transform(id);
        self.scroll[id.0 as usize].as_ref()
    }

    /// Replaces the scroll geometry of a scroll translation.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not a scroll translation.
    pub fn set_scroll_node(&mut self, id: TransformId, scroll: ScrollNode) {
        self.validate_transform(id);
        let slot = &mut self.scroll[id.0 as usize];
        assert!(slot.is_some(), "{id:?} is not a scroll translation");
        *slot = Some(scroll);
        self.transform_dirty
            .mark_with(id.0, dirty::TRANSFORM, &EagerPolicy);
    }

    /// Returns the current scroll offset of a scroll translation.
    #[must_use]
    pub fn scroll_offset(&self, id: TransformId) -> Vec2 {
        self.validate_transform(id);
        self.scroll_offset[id.0 as usize]
    }

    /// Scrolls a scroll translation to `offset`.
    ///
    /// The local matrix becomes a translation by `-offset`. The change is
    /// accumulated as a delta and marked on the local SCROLL channel; whether
    /// it invalidates any cull rect is decided later from the delta.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not a scroll translation.
    pub fn set_scroll_offset(&mut self, id: TransformId, offset: Vec2) {
        self.validate_transform(id);
        let idx = id.0 as usize;
        assert!(
            self.scroll[idx].is_some(),
            "{id:?} is not a scroll translation"
        );
        let delta = offset - self.scroll_offset[idx];
        if delta == Vec2::ZERO {
            return;
        }
        self.scroll_offset[idx] = offset;
        self.local_transform[idx] = Transform3d::from_translation(-offset.x, -offset.y, 0.0);
        self.pending_scroll_delta[idx] += delta;
        self.transform_dirty.mark(id.0, dirty::SCROLL);
    }

    /// Whether content under this node can move unpredictably, so its cull
    /// rect gets a heuristic expansion.
    #[must_use]
    pub fn requires_cull_rect_expansion(&self, id: TransformId) -> bool {
        self.validate_transform(id);
        self.requires_cull_rect_expansion[id.0 as usize]
    }

    /// Sets the cull-rect expansion flag, typically for nodes promoted for
    /// transform animation.
    pub fn set_requires_cull_rect_expansion(&mut self, id: TransformId, requires: bool) {
        self.validate_transform(id);
        let slot = &mut self.requires_cull_rect_expansion[id.0 as usize];
        if *slot != requires {
            *slot = requires;
            self.transform_dirty
                .mark_with(id.0, dirty::TRANSFORM, &EagerPolicy);
        }
    }

    // -- Clip tree --

    /// Appends a clip node below `parent`.
    ///
    /// `rect` is expressed in `local_transform_space`; `None` never clips.
    pub fn create_clip(
        &mut self,
        parent: ClipId,
        local_transform_space: TransformId,
        rect: Option<Rect>,
    ) -> ClipId {
        self.validate_clip(parent);
        self.validate_transform(local_transform_space);
        #[expect(
            clippy::cast_possible_truncation,
            reason = "node counts are bounded well below u32::MAX"
        )]
        let idx = self.clip_parent.len() as u32;
        self.clip_parent.push(parent.0);
        self.clip_space.push(local_transform_space.0);
        self.clip_rect.push(rect);
        let _ = self.clip_dirty.add_dependency(idx, parent.0, dirty::CLIP);
        self.clip_dirty.mark(idx, dirty::CLIP);
        ClipId(idx)
    }

    /// Returns the parent clip, or `None` for the root.
    #[must_use]
    pub fn clip_parent(&self, id: ClipId) -> Option<ClipId> {
        self.validate_clip(id);
        let p = self.clip_parent[id.0 as usize];
        (p != INVALID).then_some(ClipId(p))
    }

    /// Returns the transform space the clip rect is expressed in.
    #[must_use]
    pub fn clip_local_transform_space(&self, id: ClipId) -> TransformId {
        self.validate_clip(id);
        TransformId(self.clip_space[id.0 as usize])
    }

    /// Returns the clip rect, or `None` if the node does not clip.
    #[must_use]
    pub fn clip_rect(&self, id: ClipId) -> Option<Rect> {
        self.validate_clip(id);
        self.clip_rect[id.0 as usize]
    }

    /// Sets the clip rect.
    ///
    /// Marks the CLIP channel dirty with eager propagation to descendants.
    pub fn set_clip_rect(&mut self, id: ClipId, rect: Option<Rect>) {
        self.validate_clip(id);
        self.clip_rect[id.0 as usize] = rect;
        self.clip_dirty.mark_with(id.0, dirty::CLIP, &EagerPolicy);
    }

    // -- Effect tree --

    /// Appends an effect node below `parent`.
    pub fn create_effect(&mut self, parent: EffectId, opacity: f32) -> EffectId {
        self.validate_effect(parent);
        #[expect(
            clippy::cast_possible_truncation,
            reason = "node counts are bounded well below u32::MAX"
        )]
        let idx = self.effect_parent.len() as u32;
        self.effect_parent.push(parent.0);
        self.opacity.push(opacity);
        EffectId(idx)
    }

    /// Returns the parent effect, or `None` for the root.
    #[must_use]
    pub fn effect_parent(&self, id: EffectId) -> Option<EffectId> {
        self.validate_effect(id);
        let p = self.effect_parent[id.0 as usize];
        (p != INVALID).then_some(EffectId(p))
    }

    /// Returns the opacity of an effect node.
    #[must_use]
    pub fn opacity(&self, id: EffectId) -> f32 {
        self.validate_effect(id);
        self.opacity[id.0 as usize]
    }

    /// Sets the opacity of an effect node.
    ///
    /// Effects do not influence cull rects, so nothing is marked dirty.
    pub fn set_opacity(&mut self, id: EffectId, opacity: f32) {
        self.validate_effect(id);
        self.opacity[id.0 as usize] = opacity;
    }

    // -- Validation --

    pub(crate) fn validate_transform(&self, id: TransformId) {
        assert!(
            (id.0 as usize) < self.transform_parent.len(),
            "unknown {id:?} (node count: {})",
            self.transform_parent.len()
        );
    }

    pub(crate) fn validate_clip(&self, id: ClipId) {
        assert!(
            (id.0 as usize) < self.clip_parent.len(),
            "unknown {id:?} (node count: {})",
            self.clip_parent.len()
        );
    }

    pub(crate) fn validate_effect(&self, id: EffectId) {
        assert!(
            (id.0 as usize) < self.effect_parent.len(),
            "unknown {id:?} (node count: {})",
            self.effect_parent.len()
        );
    }
}
