// Copyright 2026 the Rendercycle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Draining property-tree dirty channels.
//!
//! Evaluation drains each channel in turn:
//!
//! 1. **TRANSFORM**: every node whose mapping to the root changed, including
//!    descendants of the node that was mutated.
//! 2. **SCROLL**: scroll translations whose offset changed, with the delta
//!    accumulated since the previous evaluation.
//! 3. **CLIP**: every clip node whose rect changed, its descendants, and any
//!    clip expressed in a transform space reported in step 1.
//!
//! [`PropertyChanges`] uses raw node indices so that consumers can build
//! lookup tables without going through the typed handles.

use alloc::vec;
use alloc::vec::Vec;

use kurbo::Vec2;
use understory_dirty::EagerPolicy;

use super::id::TransformId;
use super::store::PropertyTrees;
use crate::dirty;

/// The set of changes produced by one [`PropertyTrees::evaluate`] call.
#[derive(Clone, Debug, Default)]
pub struct PropertyChanges {
    /// Transform nodes whose mapping to the root changed.
    pub transforms: Vec<u32>,
    /// Scroll translations that scrolled, with the accumulated delta.
    pub scrolls: Vec<(TransformId, Vec2)>,
    /// Clip nodes whose accumulated clip changed.
    pub clips: Vec<u32>,
}

impl PropertyChanges {
    /// Clears all change lists.
    pub fn clear(&mut self) {
        self.transforms.clear();
        self.scrolls.clear();
        self.clips.clear();
    }

    /// Whether nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty() && self.scrolls.is_empty() && self.clips.is_empty()
    }
}

impl PropertyTrees {
    /// Drains all dirty channels and returns what changed.
    pub fn evaluate(&mut self) -> PropertyChanges {
        let mut changes = PropertyChanges::default();
        self.evaluate_into(&mut changes);
        changes
    }

    /// Like [`evaluate`](Self::evaluate), but reuses a caller-provided buffer.
    pub fn evaluate_into(&mut self, changes: &mut PropertyChanges) {
        changes.clear();

        changes.transforms = self
            .transform_dirty
            .drain(dirty::TRANSFORM)
            .affected()
            .deterministic()
            .run()
            .collect();

        let scrolled: Vec<u32> = self
            .transform_dirty
            .drain(dirty::SCROLL)
            .deterministic()
            .run()
            .collect();
        for idx in scrolled {
            let delta = core::mem::take(&mut self.pending_scroll_delta[idx as usize]);
            if delta != Vec2::ZERO {
                changes.scrolls.push((TransformId(idx), delta));
            }
        }

        // Clips in a moved space moved too.
        if !changes.transforms.is_empty() {
            let mut moved = vec![false; self.transform_parent.len()];
            for &idx in &changes.transforms {
                moved[idx as usize] = true;
            }
            for c in 0..self.clip_parent.len() {
                if moved[self.clip_space[c] as usize] {
                    #[expect(
                        clippy::cast_possible_truncation,
                        reason = "node counts are bounded well below u32::MAX"
                    )]
                    let idx = c as u32;
                    self.clip_dirty.mark_with(idx, dirty::CLIP, &EagerPolicy);
                }
            }
        }

        changes.clips = self
            .clip_dirty
            .drain(dirty::CLIP)
            .affected()
            .deterministic()
            .run()
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use kurbo::Rect;

    use super::*;
    use crate::geometry::PixelRect;
    use crate::property::{ClipId, ScrollNode};
    use crate::transform::Transform3d;

    #[test]
    fn new_nodes_are_reported_once() {
        let mut trees = PropertyTrees::new();
        let t = trees.create_transform(TransformId::ROOT, Transform3d::IDENTITY);
        let changes = trees.evaluate();
        assert!(changes.transforms.contains(&t.0));
        assert!(trees.evaluate().is_empty());
    }

    #[test]
    fn transform_change_reaches_descendants_and_their_clips() {
        let mut trees = PropertyTrees::new();
        let a = trees.create_transform(TransformId::ROOT, Transform3d::IDENTITY);
        let b = trees.create_transform(a, Transform3d::IDENTITY);
        let other = trees.create_transform(TransformId::ROOT, Transform3d::IDENTITY);
        let clip = trees.create_clip(ClipId::ROOT, b, Some(Rect::new(0.0, 0.0, 10.0, 10.0)));
        let child_clip = trees.create_clip(clip, TransformId::ROOT, None);
        let _ = trees.evaluate();

        trees.set_local_transform(a, Transform3d::from_translation(5.0, 0.0, 0.0));
        let changes = trees.evaluate();
        assert!(changes.transforms.contains(&a.0));
        assert!(changes.transforms.contains(&b.0));
        assert!(!changes.transforms.contains(&other.0));
        assert!(changes.clips.contains(&clip.0));
        assert!(changes.clips.contains(&child_clip.0));
    }

    #[test]
    fn scrolling_is_local_and_accumulates() {
        let mut trees = PropertyTrees::new();
        let s = trees.create_scroll_translation(
            TransformId::ROOT,
            ScrollNode::new(PixelRect::new(0, 0, 100, 100), PixelRect::new(0, 0, 100, 1000)),
        );
        let child = trees.create_transform(s, Transform3d::IDENTITY);
        let _ = trees.evaluate();

        trees.set_scroll_offset(s, Vec2::new(0.0, 100.0));
        trees.set_scroll_offset(s, Vec2::new(0.0, 300.0));
        let changes = trees.evaluate();
        assert!(changes.transforms.is_empty());
        assert!(!changes.transforms.contains(&child.0));
        assert_eq!(changes.scrolls, vec![(s, Vec2::new(0.0, 300.0))]);

        // Scrolling back to where we were nets out to nothing.
        trees.set_scroll_offset(s, Vec2::new(0.0, 200.0));
        trees.set_scroll_offset(s, Vec2::new(0.0, 300.0));
        assert!(trees.evaluate().scrolls.is_empty());
    }
}
