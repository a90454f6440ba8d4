// Copyright 2026 the Rendercycle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pixel-snapped integer rectangles.
//!
//! [`PixelRect`] is the rectangle type cull rects are expressed in. It follows
//! the usual integer-rect conventions of layout engines:
//!
//! - width and height never go negative (setters clamp to zero),
//! - all edge arithmetic saturates instead of overflowing,
//! - an empty rect intersects nothing, but may be contained in another rect.
//!
//! Float geometry (mapped quads, clip rects) uses [`kurbo::Rect`] and is
//! snapped back with [`PixelRect::enclosing`].

use core::fmt;

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;

/// An integer offset in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PixelOffset {
    /// Horizontal component.
    pub x: i32,
    /// Vertical component.
    pub y: i32,
}

impl PixelOffset {
    /// Creates a new offset.
    #[inline]
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned integer rectangle.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PixelRect {
    x: i32,
    y: i32,
    width: i32,
    height: i32,
}

impl fmt::Debug for PixelRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{} {}x{}", self.x, self.y, self.width, self.height)
    }
}

impl PixelRect {
    /// The empty rect at the origin.
    pub const ZERO: Self = Self {
        x: 0,
        y: 0,
        width: 0,
        height: 0,
    };

    /// The largest rect the layout coordinate space can address.
    ///
    /// This is a regular finite rect; "infinite" cull rects are tracked
    /// separately and only report this extent when asked for their bounds.
    pub const INFINITE: Self = Self {
        x: -(MAX_LAYOUT_INT / 2),
        y: -(MAX_LAYOUT_INT / 2),
        width: MAX_LAYOUT_INT,
        height: MAX_LAYOUT_INT,
    };

    /// Creates a rect from origin and size. Negative sizes clamp to zero.
    #[inline]
    #[must_use]
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width: clamp_size(x, width),
            height: clamp_size(y, height),
        }
    }

    /// Creates a rect from its four edges.
    #[inline]
    #[must_use]
    pub const fn from_ltrb(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self::new(
            left,
            top,
            right.saturating_sub(left),
            bottom.saturating_sub(top),
        )
    }

    /// Returns the smallest integer rect containing `rect`.
    ///
    /// Non-finite and out-of-range coordinates saturate to half the `i32`
    /// range so the resulting width and height stay representable.
    #[must_use]
    pub fn enclosing(rect: kurbo::Rect) -> Self {
        let rect = rect.abs();
        Self::from_ltrb(
            saturating_f64_to_i32(rect.x0.floor()),
            saturating_f64_to_i32(rect.y0.floor()),
            saturating_f64_to_i32(rect.x1.ceil()),
            saturating_f64_to_i32(rect.y1.ceil()),
        )
    }

    /// Left edge.
    #[inline]
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Top edge.
    #[inline]
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// Width, never negative.
    #[inline]
    #[must_use]
    pub const fn width(&self) -> i32 {
        self.width
    }

    /// Height, never negative.
    #[inline]
    #[must_use]
    pub const fn height(&self) -> i32 {
        self.height
    }

    /// Right edge (exclusive).
    #[inline]
    #[must_use]
    pub const fn right(&self) -> i32 {
        self.x.saturating_add(self.width)
    }

    /// Bottom edge (exclusive).
    #[inline]
    #[must_use]
    pub const fn bottom(&self) -> i32 {
        self.y.saturating_add(self.height)
    }

    /// Returns whether the rect has no area.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Moves the left edge, keeping the width.
    pub fn set_x(&mut self, x: i32) {
        self.x = x;
        self.width = clamp_size(x, self.width);
    }

    /// Moves the top edge, keeping the height.
    pub fn set_y(&mut self, y: i32) {
        self.y = y;
        self.height = clamp_size(y, self.height);
    }

    /// Sets the width. Negative values clamp to zero.
    pub fn set_width(&mut self, width: i32) {
        self.width = clamp_size(self.x, width);
    }

    /// Sets the height. Negative values clamp to zero.
    pub fn set_height(&mut self, height: i32) {
        self.height = clamp_size(self.y, height);
    }

    /// Translates the rect.
    pub fn offset(&mut self, offset: PixelOffset) {
        self.x = self.x.saturating_add(offset.x);
        self.y = self.y.saturating_add(offset.y);
        self.width = clamp_size(self.x, self.width);
        self.height = clamp_size(self.y, self.height);
    }

    /// Shrinks the rect to its overlap with `other`.
    ///
    /// Becomes [`PixelRect::ZERO`] when the two do not overlap.
    pub fn intersect(&mut self, other: Self) {
        if self.is_empty() || other.is_empty() {
            *self = Self::ZERO;
            return;
        }
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if left >= right || top >= bottom {
            *self = Self::ZERO;
            return;
        }
        *self = Self::from_ltrb(left, top, right, bottom);
    }

    /// Returns the overlap of the two rects.
    #[must_use]
    pub fn intersection(mut self, other: Self) -> Self {
        self.intersect(other);
        self
    }

    /// Returns whether the rects share any area.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// Returns whether `other` lies entirely within this rect.
    #[must_use]
    pub fn contains(&self, other: &Self) -> bool {
        other.x >= self.x
            && other.right() <= self.right()
            && other.y >= self.y
            && other.bottom() <= self.bottom()
    }

    /// Grows the rect by `horizontal` on the left and right and by `vertical`
    /// on the top and bottom. Negative amounts shrink it.
    pub fn outset(&mut self, horizontal: i32, vertical: i32) {
        let left = self.x.saturating_sub(horizontal);
        let top = self.y.saturating_sub(vertical);
        let right = self.right().saturating_add(horizontal);
        let bottom = self.bottom().saturating_add(vertical);
        *self = Self::from_ltrb(left, top, right.max(left), bottom.max(top));
    }

    /// Converts to a float rect.
    #[must_use]
    pub fn to_kurbo(&self) -> kurbo::Rect {
        kurbo::Rect::new(
            f64::from(self.x),
            f64::from(self.y),
            f64::from(self.right()),
            f64::from(self.bottom()),
        )
    }
}

/// The largest integer a layout unit can represent (`2^25 - 1`).
pub const MAX_LAYOUT_INT: i32 = 33_554_431;

/// Clamps a size to be non-negative and keeps `origin + size` within `i32`.
#[expect(
    clippy::cast_possible_truncation,
    reason = "`room` only narrows when it is smaller than an `i32` size"
)]
const fn clamp_size(origin: i32, size: i32) -> i32 {
    if size <= 0 {
        return 0;
    }
    let room = i32::MAX as i64 - origin as i64;
    if (size as i64) > room {
        room as i32
    } else {
        size
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "float-to-int `as` casts saturate, which is the intended clamping"
)]
fn saturating_f64_to_i32(v: f64) -> i32 {
    (v as i32).clamp(-HALF_RANGE, HALF_RANGE)
}

/// Bound for snapped float coordinates.
const HALF_RANGE: i32 = i32::MAX / 2;

/// Returns whether two float rects overlap with non-zero area.
pub(crate) fn float_rects_intersect(a: kurbo::Rect, b: kurbo::Rect) -> bool {
    let (a, b) = (a.abs(), b.abs());
    a.width() > 0.0
        && a.height() > 0.0
        && b.width() > 0.0
        && b.height() > 0.0
        && a.x0 < b.x1
        && b.x0 < a.x1
        && a.y0 < b.y1
        && b.y0 < a.y1
}
