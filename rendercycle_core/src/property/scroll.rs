// Copyright 2026 the Rendercycle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scroll nodes attached to scroll-translation transforms.

use crate::geometry::PixelRect;

/// Whether a scroller benefits from composited scrolling.
///
/// Scrollers that do not (form controls such as list boxes) never get an
/// expanded cull rect.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CompositedScrollingPreference {
    /// Composited scrolling is preferred; the cull rect may be expanded.
    #[default]
    Preferred,
    /// Composited scrolling is not preferred.
    NotPreferred,
}

/// Geometry of a scroll container.
///
/// Both rects are in the space of the scroll translation's parent, before the
/// scroll offset is applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ScrollNode {
    /// The visible viewport of the scroller.
    pub container_rect: PixelRect,
    /// The full scrollable extent.
    pub contents_rect: PixelRect,
    /// Whether the user can scroll horizontally.
    pub user_scrollable_horizontal: bool,
    /// Whether the user can scroll vertically.
    pub user_scrollable_vertical: bool,
    /// See [`CompositedScrollingPreference`].
    pub composited_scrolling_preference: CompositedScrollingPreference,
}

impl ScrollNode {
    /// Creates a user-scrollable node that prefers composited scrolling.
    #[must_use]
    pub const fn new(container_rect: PixelRect, contents_rect: PixelRect) -> Self {
        Self {
            container_rect,
            contents_rect,
            user_scrollable_horizontal: true,
            user_scrollable_vertical: true,
            composited_scrolling_preference: CompositedScrollingPreference::Preferred,
        }
    }

    /// Returns a copy with the given user-scrollable bits.
    #[must_use]
    pub const fn with_user_scrollable(mut self, horizontal: bool, vertical: bool) -> Self {
        self.user_scrollable_horizontal = horizontal;
        self.user_scrollable_vertical = vertical;
        self
    }

    /// Returns a copy with the given scrolling preference.
    #[must_use]
    pub const fn with_preference(mut self, preference: CompositedScrollingPreference) -> Self {
        self.composited_scrolling_preference = preference;
        self
    }

    /// Whether the user can scroll in either direction.
    #[inline]
    #[must_use]
    pub const fn user_scrollable(&self) -> bool {
        self.user_scrollable_horizontal || self.user_scrollable_vertical
    }

    /// Horizontal scroll range. Zero or negative when the contents fit.
    #[inline]
    #[must_use]
    pub const fn scroll_range_x(&self) -> i32 {
        self.contents_rect
            .width()
            .saturating_sub(self.container_rect.width())
    }

    /// Vertical scroll range. Zero or negative when the contents fit.
    #[inline]
    #[must_use]
    pub const fn scroll_range_y(&self) -> i32 {
        self.contents_rect
            .height()
            .saturating_sub(self.container_rect.height())
    }
}
