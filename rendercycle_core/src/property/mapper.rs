// Copyright 2026 the Rendercycle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Geometry mapping between property-tree states.
//!
//! Mappings are computed on demand by walking parent links; nothing is
//! cached. A mapping from `source` to `destination` is the matrix taking
//! points in the source space to points in the destination space:
//!
//! - if `destination` is an ancestor of `source`, the product of the local
//!   matrices on the path;
//! - if `source` is an ancestor of `destination`, the inverse of that product;
//! - otherwise `inverse(to_root(destination)) * to_root(source)`.
//!
//! A destination space that cannot be inverted maps everything to an empty
//! rect. Points that project behind the eye make the mapped rect unbounded.

use kurbo::Rect;

use super::id::{PropertyTreeState, TransformId};
use super::store::{INVALID, PropertyTrees};
use crate::geometry::{MAX_LAYOUT_INT, PixelRect};
use crate::transform::Transform3d;

/// A float clip rect that may be infinite.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FloatClipRect {
    rect: Rect,
    infinite: bool,
}

impl FloatClipRect {
    /// A clip that clips nothing.
    pub const INFINITE: Self = Self {
        rect: Rect::ZERO,
        infinite: true,
    };

    /// A finite clip.
    #[must_use]
    pub const fn new(rect: Rect) -> Self {
        Self {
            rect,
            infinite: false,
        }
    }

    /// Whether the clip clips nothing.
    #[inline]
    #[must_use]
    pub const fn is_infinite(&self) -> bool {
        self.infinite
    }

    /// The clip rect. Meaningless when [`is_infinite`](Self::is_infinite).
    #[inline]
    #[must_use]
    pub const fn rect(&self) -> Rect {
        self.rect
    }

    /// Whether the clip excludes everything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.infinite && (self.rect.width() <= 0.0 || self.rect.height() <= 0.0)
    }

    /// Narrows the clip to its overlap with `rect`.
    pub fn intersect(&mut self, rect: Rect) {
        if self.infinite {
            *self = Self::new(rect);
        } else {
            let overlap = self.rect.intersect(rect);
            self.rect = overlap;
        }
    }
}

/// The rect an unbounded projection maps to.
const UNBOUNDED: PixelRect =
    PixelRect::from_ltrb(-MAX_LAYOUT_INT, -MAX_LAYOUT_INT, MAX_LAYOUT_INT, MAX_LAYOUT_INT);

/// Extents below this are treated as collapsed by a degenerate transform.
const FLAT_EPSILON: f64 = 1e-6;

impl PropertyTrees {
    /// Returns the matrix mapping `id`'s space into the root space.
    #[must_use]
    pub fn to_root(&self, id: TransformId) -> Transform3d {
        self.validate_transform(id);
        let mut m = self.local_transform[id.0 as usize];
        let mut t = self.transform_parent[id.0 as usize];
        while t != INVALID {
            m = self.local_transform[t as usize] * m;
            t = self.transform_parent[t as usize];
        }
        m
    }

    /// Product of local matrices from `node` up to (excluding) `ancestor`, or
    /// `None` if `ancestor` is not on the path.
    fn to_ancestor(&self, node: TransformId, ancestor: TransformId) -> Option<Transform3d> {
        let mut m = Transform3d::IDENTITY;
        let mut t = node.0;
        while t != ancestor.0 {
            if t == INVALID {
                return None;
            }
            m = self.local_transform[t as usize] * m;
            t = self.transform_parent[t as usize];
        }
        Some(m)
    }

    /// Returns the matrix mapping `source` space into `destination` space, or
    /// `None` if the destination space is not invertible.
    #[must_use]
    pub fn source_to_destination_projection(
        &self,
        source: TransformId,
        destination: TransformId,
    ) -> Option<Transform3d> {
        self.validate_transform(source);
        self.validate_transform(destination);
        if source == destination {
            return Some(Transform3d::IDENTITY);
        }
        if let Some(m) = self.to_ancestor(source, destination) {
            return Some(m);
        }
        if let Some(m) = self.to_ancestor(destination, source) {
            return m.inverse();
        }
        let inv = self.to_root(destination).inverse()?;
        Some(inv * self.to_root(source))
    }

    /// Maps a float rect, returning `None` when the result is unbounded.
    ///
    /// A non-invertible destination yields an empty rect.
    fn map_float_rect(&self, source: TransformId, destination: TransformId, rect: Rect) -> Option<Rect> {
        match self.source_to_destination_projection(source, destination) {
            Some(m) => m.map_rect(rect),
            None => Some(Rect::ZERO),
        }
    }

    /// Maps `rect` from `source` space into `destination` space and returns
    /// the enclosing integer rect of the projected quad.
    #[must_use]
    pub fn source_to_destination_rect(
        &self,
        source: TransformId,
        destination: TransformId,
        rect: PixelRect,
    ) -> PixelRect {
        if source == destination {
            return rect;
        }
        match self.map_float_rect(source, destination, rect.to_kurbo()) {
            Some(mapped) => {
                // Keep the flattened position of a collapsed quad, but with no
                // area on the collapsed axis.
                let mut r = PixelRect::enclosing(mapped);
                if mapped.width() < FLAT_EPSILON {
                    r.set_width(0);
                }
                if mapped.height() < FLAT_EPSILON {
                    r.set_height(0);
                }
                r
            }
            None => UNBOUNDED,
        }
    }

    /// Returns the smaller side of the unit square at the `root` origin
    /// mapped into `local` space.
    ///
    /// This is `1.0` when the two are the same node and `0.0` when `local`
    /// is not invertible. Unbounded projections report infinity.
    #[must_use]
    pub fn source_to_destination_approximate_minimum_scale(
        &self,
        root: TransformId,
        local: TransformId,
    ) -> f64 {
        if root == local {
            return 1.0;
        }
        match self.map_float_rect(root, local, Rect::new(0.0, 0.0, 1.0, 1.0)) {
            Some(mapped) => mapped.width().min(mapped.height()),
            None => f64::INFINITY,
        }
    }

    /// Returns the accumulated clip between `local` and `ancestor`, in the
    /// `ancestor` transform space.
    ///
    /// Clips from `local.clip` up to but excluding `ancestor.clip` are
    /// mapped and intersected. Clips whose mapping is unbounded are skipped.
    #[must_use]
    pub fn local_to_ancestor_clip_rect(
        &self,
        local: &PropertyTreeState,
        ancestor: &PropertyTreeState,
    ) -> FloatClipRect {
        self.validate_clip(local.clip);
        self.validate_clip(ancestor.clip);
        let mut result = FloatClipRect::INFINITE;
        let mut c = local.clip.0;
        while c != ancestor.clip.0 && c != INVALID {
            if let Some(rect) = self.clip_rect[c as usize] {
                let space = TransformId(self.clip_space[c as usize]);
                if let Some(mapped) = self.map_float_rect(space, ancestor.transform, rect) {
                    result.intersect(mapped);
                }
            }
            c = self.clip_parent[c as usize];
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::ClipId;

    #[test]
    fn projection_through_sibling_spaces() {
        let mut trees = PropertyTrees::new();
        let a = trees.create_transform(
            TransformId::ROOT,
            Transform3d::from_translation(10.0, 0.0, 0.0),
        );
        let b = trees.create_transform(
            TransformId::ROOT,
            Transform3d::from_translation(0.0, 20.0, 0.0),
        );
        let r = trees.source_to_destination_rect(a, b, PixelRect::new(0, 0, 5, 5));
        assert_eq!(r, PixelRect::new(10, -20, 5, 5));
    }

    #[test]
    fn ancestor_to_descendant_uses_inverse() {
        let mut trees = PropertyTrees::new();
        let s = trees.create_transform(TransformId::ROOT, Transform3d::from_scale(2.0, 2.0, 1.0));
        let r = trees.source_to_destination_rect(
            TransformId::ROOT,
            s,
            PixelRect::new(0, 0, 100, 50),
        );
        assert_eq!(r, PixelRect::new(0, 0, 50, 25));
        assert_eq!(
            trees.source_to_destination_rect(s, TransformId::ROOT, r),
            PixelRect::new(0, 0, 100, 50)
        );
    }

    #[test]
    fn singular_destination_maps_to_empty() {
        let mut trees = PropertyTrees::new();
        let s = trees.create_transform(TransformId::ROOT, Transform3d::from_scale(0.0, 1.0, 1.0));
        let r = trees.source_to_destination_rect(
            TransformId::ROOT,
            s,
            PixelRect::new(0, 0, 100, 100),
        );
        assert!(r.is_empty());
        assert_eq!(
            trees.source_to_destination_approximate_minimum_scale(TransformId::ROOT, s),
            0.0
        );
    }

    #[test]
    fn behind_the_eye_is_unbounded() {
        let mut trees = PropertyTrees::new();
        let p = trees.create_transform(
            TransformId::ROOT,
            Transform3d::from_perspective(100.0) * Transform3d::from_translation(0.0, 0.0, 150.0),
        );
        let r = trees.source_to_destination_rect(p, TransformId::ROOT, PixelRect::new(0, 0, 10, 10));
        assert_eq!(r, UNBOUNDED);
    }

    #[test]
    fn minimum_scale_of_zoomed_space() {
        let mut trees = PropertyTrees::new();
        let s = trees.create_transform(TransformId::ROOT, Transform3d::from_scale(4.0, 2.0, 1.0));
        let scale = trees.source_to_destination_approximate_minimum_scale(TransformId::ROOT, s);
        assert!((scale - 0.25).abs() < 1e-9);
        assert_eq!(
            trees.source_to_destination_approximate_minimum_scale(s, s),
            1.0
        );
    }

    #[test]
    fn clip_rect_is_mapped_into_ancestor_space() {
        let mut trees = PropertyTrees::new();
        let t = trees.create_transform(
            TransformId::ROOT,
            Transform3d::from_translation(100.0, 0.0, 0.0),
        );
        let outer = trees.create_clip(
            ClipId::ROOT,
            TransformId::ROOT,
            Some(Rect::new(0.0, 0.0, 150.0, 150.0)),
        );
        let inner = trees.create_clip(outer, t, Some(Rect::new(0.0, 0.0, 100.0, 100.0)));
        let mut local = PropertyTreeState::ROOT;
        local.transform = t;
        local.clip = inner;

        let clip = trees.local_to_ancestor_clip_rect(&local, &PropertyTreeState::ROOT);
        assert!(!clip.is_infinite());
        assert_eq!(clip.rect(), Rect::new(100.0, 0.0, 150.0, 100.0));

        let mut mid = PropertyTreeState::ROOT;
        mid.clip = outer;
        let clip = trees.local_to_ancestor_clip_rect(&local, &mid);
        assert_eq!(clip.rect(), Rect::new(100.0, 0.0, 200.0, 100.0));

        let same = trees.local_to_ancestor_clip_rect(&local, &local);
        assert!(same.is_infinite());
    }
}
