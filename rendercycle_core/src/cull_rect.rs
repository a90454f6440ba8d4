// Copyright 2026 the Rendercycle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cull rects: the region of a paint layer that must be painted.
//!
//! A [`CullRect`] is either infinite or a [`PixelRect`] in the space of the
//! property-tree state it was computed for. It starts infinite (or as the
//! viewport) at the root and is narrowed by clips and mapped by transforms as
//! it is pushed down the property trees with
//! [`apply_paint_properties`](CullRect::apply_paint_properties).
//!
//! # Expansion
//!
//! Under a scroller that prefers composited scrolling, the rect is *expanded*
//! beyond the visible viewport so that scrolling can reuse painted output
//! instead of repainting on every frame:
//!
//! ```text
//!        contents_rect
//!   +-------------------+
//!   |  .............    |   .... expanded cull rect
//!   |  :           :    |
//!   |  : +-------+ :    |   container_rect (visible)
//!   |  : |       | :    |
//!   |  : +-------+ :    |
//!   |  :...........:    |
//!   +-------------------+
//! ```
//!
//! The expansion is clipped to the contents rect, so it never covers more
//! than can be scrolled into view. Nodes flagged with
//! [`requires_cull_rect_expansion`](PropertyTrees::requires_cull_rect_expansion)
//! get a fixed outset as well, since their future position is unknown.
//!
//! # Reuse
//!
//! An expanded rect is an approximation, so a new rect that is only slightly
//! different from the cached one is not worth a repaint.
//! [`changed_enough`](CullRect::changed_enough) decides, and
//! [`has_scrolled_enough`](CullRect::has_scrolled_enough) is the cheaper
//! check run on every scroll.

use kurbo::{Affine, Vec2};
use smallvec::SmallVec;

use crate::geometry::{MAX_LAYOUT_INT, PixelOffset, PixelRect, float_rects_intersect};
use crate::property::{
    ClipId, CompositedScrollingPreference, EffectId, PropertyTreeState, PropertyTrees, ScrollNode,
    TransformId,
};

/// Tuning parameters for cull-rect expansion and reuse.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CullRectConfig {
    /// Base outset, in screen pixels, for expanded cull rects.
    pub pixel_distance_to_expand: i32,
    /// Changes smaller than this, in pixels, do not justify a new cull rect.
    pub changed_enough_minimum_distance: i32,
    /// Coordinates are clamped to `±reasonable_pixel_limit`. Also bounds the
    /// scale used for expansion.
    pub reasonable_pixel_limit: i32,
    /// Split the outset between axes according to the scroll ranges. When
    /// `false`, the whole outset is applied to both axes.
    pub dynamic_scroll_expansion: bool,
    /// Scrollers the user cannot scroll are not expanded.
    pub require_user_scrollable: bool,
}

impl CullRectConfig {
    /// The default tuning.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pixel_distance_to_expand: 4000,
            changed_enough_minimum_distance: 512,
            reasonable_pixel_limit: MAX_LAYOUT_INT,
            dynamic_scroll_expansion: true,
            require_user_scrollable: true,
        }
    }

    /// A configuration that never expands.
    #[must_use]
    pub const fn without_expansion() -> Self {
        let mut config = Self::new();
        config.pixel_distance_to_expand = 0;
        config
    }
}

impl Default for CullRectConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Which axes of a cull rect were expanded beyond the exact visible region.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ExpandedAxes {
    /// Horizontal axis.
    pub x: bool,
    /// Vertical axis.
    pub y: bool,
}

impl ExpandedAxes {
    /// Neither axis.
    pub const NONE: Self = Self { x: false, y: false };
    /// Both axes.
    pub const BOTH: Self = Self { x: true, y: true };

    /// Creates a new value.
    #[inline]
    #[must_use]
    pub const fn new(x: bool, y: bool) -> Self {
        Self { x, y }
    }

    /// Whether either axis was expanded.
    #[inline]
    #[must_use]
    pub const fn any(&self) -> bool {
        self.x || self.y
    }
}

/// A rect outside of which nothing needs to be painted, or infinity.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CullRect {
    rect: Option<PixelRect>,
}

impl core::fmt::Debug for CullRect {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.rect {
            Some(rect) => write!(f, "CullRect({rect:?})"),
            None => f.write_str("CullRect(infinite)"),
        }
    }
}

impl Default for CullRect {
    fn default() -> Self {
        Self::INFINITE
    }
}

impl CullRect {
    /// The cull rect that intersects everything.
    pub const INFINITE: Self = Self { rect: None };

    /// A finite cull rect.
    #[inline]
    #[must_use]
    pub const fn new(rect: PixelRect) -> Self {
        Self { rect: Some(rect) }
    }

    /// Whether this is the infinite cull rect.
    ///
    /// A finite rect covering the whole coordinate space is still finite.
    #[inline]
    #[must_use]
    pub const fn is_infinite(&self) -> bool {
        self.rect.is_none()
    }

    /// The rect, or [`PixelRect::INFINITE`] for the infinite cull rect.
    #[inline]
    #[must_use]
    pub const fn rect(&self) -> PixelRect {
        match self.rect {
            Some(rect) => rect,
            None => PixelRect::INFINITE,
        }
    }

    /// Whether `rect` must be painted. Empty rects never need painting.
    #[must_use]
    pub fn intersects(&self, rect: &PixelRect) -> bool {
        if rect.is_empty() {
            return false;
        }
        match &self.rect {
            None => true,
            Some(own) => rect.intersects(own),
        }
    }

    /// Like [`intersects`](Self::intersects), for `rect` mapped by `transform`.
    #[must_use]
    pub fn intersects_transformed(&self, transform: Affine, rect: kurbo::Rect) -> bool {
        let rect = rect.abs();
        if rect.width() <= 0.0 || rect.height() <= 0.0 {
            return false;
        }
        match &self.rect {
            None => true,
            Some(own) => float_rects_intersect(transform.transform_rect_bbox(rect), own.to_kurbo()),
        }
    }

    /// Whether the horizontal span `lo..hi` overlaps the rect's span.
    #[must_use]
    pub fn intersects_horizontal_range(&self, lo: i32, hi: i32) -> bool {
        let rect = self.rect();
        !(lo >= rect.right() || hi <= rect.x())
    }

    /// Whether the vertical span `lo..hi` overlaps the rect's span.
    #[must_use]
    pub fn intersects_vertical_range(&self, lo: i32, hi: i32) -> bool {
        let rect = self.rect();
        !(lo >= rect.bottom() || hi <= rect.y())
    }

    /// Translates the rect. The infinite cull rect does not move.
    pub fn move_by(&mut self, offset: PixelOffset) {
        if let Some(rect) = &mut self.rect {
            rect.offset(offset);
        }
    }

    /// Maps the rect from the parent space of `transform` into its own space.
    pub fn apply_transform(&mut self, trees: &PropertyTrees, transform: TransformId) {
        let Some(rect) = self.rect else {
            return;
        };
        let parent = trees.transform_parent(transform);
        debug_assert!(parent.is_some(), "the root transform has no parent space");
        if let Some(parent) = parent {
            self.rect = Some(trees.source_to_destination_rect(parent, transform, rect));
        }
    }

    /// Maps the rect through a scroll translation into the scrolled contents
    /// space, expanding it when the scroller allows.
    ///
    /// The rect is first clipped to the scroller's container rect. Returns
    /// which axes were expanded.
    pub fn apply_scroll_translation(
        &mut self,
        trees: &PropertyTrees,
        config: &CullRectConfig,
        root_transform: TransformId,
        scroll_translation: TransformId,
        disable_expansion: bool,
    ) -> ExpandedAxes {
        debug_assert!(
            trees.scroll_node(scroll_translation).is_some(),
            "{scroll_translation:?} is not a scroll translation"
        );
        let Some(scroll) = trees.scroll_node(scroll_translation).copied() else {
            return ExpandedAxes::NONE;
        };

        let container = scroll.container_rect;
        let mut rect = self.rect();
        rect.intersect(container);
        self.rect = Some(rect);
        if rect.is_empty() {
            return ExpandedAxes::NONE;
        }

        self.apply_transform(trees, scroll_translation);

        if disable_expansion || !can_expand_for_scroll(&scroll, config) {
            return ExpandedAxes::NONE;
        }

        let mut expanded = ExpandedAxes::BOTH;
        let outset =
            local_pixel_distance_to_expand(trees, config, root_transform, scroll_translation);
        let mut rect = self.rect();
        if config.dynamic_scroll_expansion {
            let range_x = scroll.scroll_range_x();
            let range_y = scroll.scroll_range_y();
            if range_x <= 0 {
                rect.outset(0, outset);
                expanded.x = false;
            } else if range_y <= 0 {
                rect.outset(outset, 0);
                expanded.y = false;
            } else {
                // Scrollable both ways: split the outset so the area stays
                // bounded, giving any excess beyond one range to the other.
                let mut outset_x = outset / 2;
                let mut outset_y = outset_x;
                if outset_x > range_x {
                    outset_y += outset_x - range_x;
                    outset_x = range_x;
                } else if outset_y > range_y {
                    outset_x += outset_y - range_y;
                    outset_y = range_y;
                }
                rect.outset(outset_x, outset_y);
            }
        } else {
            rect.outset(outset, outset);
        }
        rect.intersect(scroll.contents_rect);
        self.rect = Some(rect);
        expanded
    }

    /// Maps the rect from `source` to `destination` without expanding it.
    ///
    /// The rect is first intersected with the clip between the two states.
    /// Returns `false` when that clip leaves nothing. A rect flattened to
    /// nothing by the transform still returns `true`, because a later
    /// transform may make the content visible again.
    pub fn apply_paint_properties_without_expansion(
        &mut self,
        trees: &PropertyTrees,
        source: &PropertyTreeState,
        destination: &PropertyTreeState,
    ) -> bool {
        let clip = trees.local_to_ancestor_clip_rect(destination, source);
        if clip.is_empty() {
            self.rect = Some(PixelRect::ZERO);
            return false;
        }
        if !clip.is_infinite() {
            let mut rect = self.rect();
            rect.intersect(PixelRect::enclosing(clip.rect()));
            self.rect = Some(rect);
            if rect.is_empty() {
                return false;
            }
        }
        if let Some(rect) = self.rect {
            self.rect = Some(trees.source_to_destination_rect(
                source.transform,
                destination.transform,
                rect,
            ));
        }
        true
    }

    /// Maps the rect from `source` to `destination`, expanding it under
    /// scrollers and unpredictably moving transforms.
    ///
    /// `root` is the state of the root of the walk; scales are measured
    /// against its transform. If `old_cull_rect` is given and the new rect did
    /// not [change enough](Self::changed_enough), the old rect is kept.
    ///
    /// If `source` is not an ancestor of `destination` in both the transform
    /// and clip trees, the rect is recomputed from `root` starting infinite.
    ///
    /// Returns whether any axis was expanded. `source` must differ from
    /// `destination`.
    pub fn apply_paint_properties(
        &mut self,
        trees: &PropertyTrees,
        config: &CullRectConfig,
        root: &PropertyTreeState,
        source: &PropertyTreeState,
        destination: &PropertyTreeState,
        old_cull_rect: Option<&Self>,
        disable_expansion: bool,
    ) -> bool {
        debug_assert_ne!(source, destination, "mapping a cull rect onto itself");

        // Only a clip can make an infinite cull rect finite.
        if self.is_infinite() && destination.clip == source.clip {
            return false;
        }

        let mut scroll_translations: SmallVec<[TransformId; 4]> = SmallVec::new();
        let mut clips: SmallVec<[ClipId; 4]> = SmallVec::new();
        let mut abnormal_hierarchy = false;

        let mut t = Some(destination.transform);
        while t != Some(source.transform) {
            let Some(node) = t else {
                return false;
            };
            if node == root.transform {
                abnormal_hierarchy = true;
                break;
            }
            if trees.scroll_node(node).is_some() {
                scroll_translations.push(node);
            }
            t = trees.transform_parent(node);
        }

        if !abnormal_hierarchy {
            let mut c = Some(destination.clip);
            while c != Some(source.clip) {
                let Some(node) = c else {
                    return false;
                };
                if node == root.clip {
                    abnormal_hierarchy = true;
                    break;
                }
                clips.push(node);
                c = trees.clip_parent(node);
            }
        }

        if abnormal_hierarchy {
            tracing::debug!(
                ?source,
                ?destination,
                "source state is not an ancestor; mapping an infinite cull rect from the root"
            );
            *self = Self::INFINITE;
            return root != destination
                && self.apply_paint_properties(
                    trees,
                    config,
                    root,
                    root,
                    destination,
                    old_cull_rect,
                    disable_expansion,
                );
        }

        scroll_translations.reverse();
        clips.reverse();

        // Either the source transform/clip or those of the last scroll
        // translation processed.
        let mut last_transform = source.transform;
        let mut last_clip = source.clip;
        let mut expanded = ExpandedAxes::NONE;

        let mut ci = 0;
        for &scroll_translation in &scroll_translations {
            if ci == clips.len() {
                break;
            }
            let scroll_parent = trees.transform_parent(scroll_translation);
            let in_scroll_parent_space =
                |clip: ClipId| Some(trees.clip_local_transform_space(clip)) == scroll_parent;

            while ci < clips.len() && !in_scroll_parent_space(clips[ci]) {
                ci += 1;
            }
            let mut updated_last_clip = None;
            while ci < clips.len() && in_scroll_parent_space(clips[ci]) {
                updated_last_clip = Some(clips[ci]);
                ci += 1;
            }

            if let (Some(clip), Some(parent)) = (updated_last_clip, scroll_parent) {
                if !self.apply_paint_properties_without_expansion(
                    trees,
                    &PropertyTreeState::new(last_transform, last_clip, EffectId::ROOT),
                    &PropertyTreeState::new(parent, clip, EffectId::ROOT),
                ) {
                    return false;
                }
                last_clip = clip;
            }

            // Only the innermost scroller's expansion matters.
            expanded = self.apply_scroll_translation(
                trees,
                config,
                root.transform,
                scroll_translation,
                disable_expansion,
            );
            last_transform = scroll_translation;
        }

        let last_state = PropertyTreeState::new(last_transform, last_clip, EffectId::ROOT);
        if !self.apply_paint_properties_without_expansion(trees, &last_state, destination) {
            return false;
        }
        let Some(mut rect) = self.rect else {
            return false;
        };

        // Perspective can produce huge coordinates. Clamping only grows the
        // painted area.
        let limit = config.reasonable_pixel_limit;
        if rect.x() < -limit {
            rect.set_x(-limit);
        }
        if rect.y() < -limit {
            rect.set_y(-limit);
        }
        if rect.right() > limit {
            rect.set_width(limit.saturating_sub(rect.x()));
        }
        if rect.bottom() > limit {
            rect.set_height(limit.saturating_sub(rect.y()));
        }

        let mut expansion_bounds = None;
        if expanded.any() {
            debug_assert!(
                trees.scroll_node(last_transform).is_some(),
                "expansion without a scroll translation"
            );
            if let Some(scroll) = trees.scroll_node(last_transform) {
                let mut bounds = scroll.contents_rect;
                if last_transform != destination.transform || last_clip != destination.clip {
                    // Map the bounds the same way the rect was mapped above.
                    let clip = trees.local_to_ancestor_clip_rect(destination, &last_state);
                    if !clip.is_infinite() {
                        bounds.intersect(PixelRect::enclosing(clip.rect()));
                    }
                    bounds = trees.source_to_destination_rect(
                        last_transform,
                        destination.transform,
                        bounds,
                    );
                }
                expansion_bounds = Some(bounds);
            }
        }

        if !disable_expansion
            && last_transform != destination.transform
            && trees.requires_cull_rect_expansion(destination.transform)
        {
            // The content can move arbitrarily, so there is no exact cull
            // rect. Rects already larger than the outset are left alone to
            // avoid compounding expansion through nested nodes.
            let distance =
                local_pixel_distance_to_expand(trees, config, root.transform, destination.transform);
            if rect.width() < distance {
                rect.outset(distance, 0);
                if let Some(bounds) = &mut expansion_bounds {
                    bounds.outset(distance, 0);
                }
                expanded.x = true;
            }
            if rect.height() < distance {
                rect.outset(0, distance);
                if let Some(bounds) = &mut expansion_bounds {
                    bounds.outset(0, distance);
                }
                expanded.y = true;
            }
        }

        self.rect = Some(rect);

        if let Some(old) = old_cull_rect {
            if !self.changed_enough(config, expanded, old, expansion_bounds) {
                self.rect = old.rect;
            }
        }

        expanded.any()
    }

    /// Decides whether this newly computed rect differs enough from
    /// `old_cull_rect` to replace it.
    ///
    /// Axes that were not expanded are exact, so any change on them counts.
    /// On expanded axes, shrinking never counts, and growth counts once it
    /// exceeds the minimum distance or reaches an edge of `expansion_bounds`
    /// that the old rect did not reach.
    #[must_use]
    pub fn changed_enough(
        &self,
        config: &CullRectConfig,
        expanded: ExpandedAxes,
        old_cull_rect: &Self,
        expansion_bounds: Option<PixelRect>,
    ) -> bool {
        let new_rect = self.rect();
        let old_rect = old_cull_rect.rect();
        if old_rect.is_empty() && new_rect.is_empty() {
            return false;
        }

        if !expanded.x && (new_rect.x() != old_rect.x() || new_rect.width() != old_rect.width()) {
            return true;
        }
        if !expanded.y && (new_rect.y() != old_rect.y() || new_rect.height() != old_rect.height())
        {
            return true;
        }

        if old_rect.contains(&new_rect) {
            return false;
        }
        if old_rect.is_empty() {
            return true;
        }

        let mut old_with_threshold = old_rect;
        let threshold = config.changed_enough_minimum_distance;
        old_with_threshold.outset(threshold, threshold);
        if !old_with_threshold.contains(&new_rect) {
            return true;
        }

        let Some(bounds) = expansion_bounds else {
            return false;
        };
        debug_assert!(
            bounds.contains(&new_rect),
            "expanded cull rect {new_rect:?} escapes its bounds {bounds:?}"
        );

        // Nothing more can be exposed past an edge of the bounds, so reaching
        // one for the first time cannot wait for the threshold.
        (new_rect.x() == bounds.x() && old_rect.x() != bounds.x())
            || (new_rect.y() == bounds.y() && old_rect.y() != bounds.y())
            || (new_rect.right() == bounds.right() && old_rect.right() != bounds.right())
            || (new_rect.bottom() == bounds.bottom() && old_rect.bottom() != bounds.bottom())
    }

    /// Decides whether scrolling `scroll_translation` by `delta` may need this
    /// cull rect (the contents cull rect of the scroller) to be recomputed.
    #[must_use]
    pub fn has_scrolled_enough(
        &self,
        trees: &PropertyTrees,
        config: &CullRectConfig,
        delta: Vec2,
        scroll_translation: TransformId,
    ) -> bool {
        let Some(scroll) = trees
            .scroll_node(scroll_translation)
            .filter(|scroll| can_expand_for_scroll(scroll, config))
        else {
            return delta != Vec2::ZERO;
        };
        let min = f64::from(config.changed_enough_minimum_distance);
        if delta.x.abs() < min && delta.y.abs() < min {
            return false;
        }

        // Scrolling cannot expose anything the rect already covers.
        let contents = scroll.contents_rect;
        let rect = self.rect();
        if rect.contains(&contents) {
            return false;
        }
        (delta.x < 0.0 && rect.x() != contents.x())
            || (delta.x > 0.0 && rect.right() != contents.right())
            || (delta.y < 0.0 && rect.y() != contents.y())
            || (delta.y > 0.0 && rect.bottom() != contents.bottom())
    }
}

/// Whether scrolling content under `scroll` gets an expanded cull rect.
fn can_expand_for_scroll(scroll: &ScrollNode, config: &CullRectConfig) -> bool {
    if scroll.composited_scrolling_preference == CompositedScrollingPreference::NotPreferred {
        return false;
    }
    if config.require_user_scrollable && !scroll.user_scrollable() {
        return false;
    }
    scroll.scroll_range_x() > 0 || scroll.scroll_range_y() > 0
}

/// The outset in `local` space corresponding to the configured screen-space
/// distance.
#[expect(
    clippy::cast_possible_truncation,
    reason = "the scale is bounded so the product stays within the reasonable pixel limit"
)]
fn local_pixel_distance_to_expand(
    trees: &PropertyTrees,
    config: &CullRectConfig,
    root: TransformId,
    local: TransformId,
) -> i32 {
    let distance = config.pixel_distance_to_expand;
    if distance <= 0 {
        return 0;
    }
    let scale = trees.source_to_destination_approximate_minimum_scale(root, local);
    // Huge scales come from (nearly) singular transforms; fall back to 1.
    if scale > f64::from(config.reasonable_pixel_limit / distance) {
        return distance;
    }
    (scale * f64::from(distance)) as i32
}
