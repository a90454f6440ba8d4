// Copyright 2026 the Rendercycle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Minimal column-major 4×4 transform.
//!
//! This type covers the subset of 3-D transforms that the property trees
//! actually need (composition, inversion, and flattening a rect through a
//! possibly-perspective matrix) without pulling in a full linear-algebra
//! crate.

use core::ops::Mul;
#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;
use kurbo::{Point, Rect};

/// A column-major 4×4 transform stored as `[[f64; 4]; 4]`.
///
/// Each inner array is one *column* of the matrix.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform3d {
    /// Four columns, each a 4-element array `[x, y, z, w]`.
    pub cols: [[f64; 4]; 4],
}

/// Homogeneous `w` values at or below this are treated as behind the eye.
const MIN_W: f64 = 1e-9;

impl Transform3d {
    /// The 4×4 identity matrix.
    pub const IDENTITY: Self = Self {
        cols: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    /// Creates a transform from four column arrays.
    #[inline]
    #[must_use]
    pub const fn from_cols(col0: [f64; 4], col1: [f64; 4], col2: [f64; 4], col3: [f64; 4]) -> Self {
        Self {
            cols: [col0, col1, col2, col3],
        }
    }

    /// Returns column `i` (0-based).
    ///
    /// # Panics
    ///
    /// Panics if `i >= 4`.
    #[inline]
    #[must_use]
    pub const fn col(self, i: usize) -> [f64; 4] {
        self.cols[i]
    }

    /// Creates a pure translation transform.
    #[inline]
    #[must_use]
    pub const fn from_translation(x: f64, y: f64, z: f64) -> Self {
        Self {
            cols: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [x, y, z, 1.0],
            ],
        }
    }

    /// Creates a non-uniform scale transform.
    #[inline]
    #[must_use]
    pub const fn from_scale(sx: f64, sy: f64, sz: f64) -> Self {
        Self {
            cols: [
                [sx, 0.0, 0.0, 0.0],
                [0.0, sy, 0.0, 0.0],
                [0.0, 0.0, sz, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Creates a rotation around the Z axis (radians).
    #[inline]
    #[must_use]
    pub fn from_rotation_z(radians: f64) -> Self {
        let (s, c) = sin_cos(radians);
        Self {
            cols: [
                [c, s, 0.0, 0.0],
                [-s, c, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Creates a rotation around the X axis (radians).
    ///
    /// A quarter turn collapses the Y axis, which flattens every rect to zero
    /// height.
    #[inline]
    #[must_use]
    pub fn from_rotation_x(radians: f64) -> Self {
        let (s, c) = sin_cos(radians);
        Self {
            cols: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, c, s, 0.0],
                [0.0, -s, c, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Creates a CSS-style perspective transform with the eye at distance
    /// `depth` from the z=0 plane.
    #[inline]
    #[must_use]
    pub const fn from_perspective(depth: f64) -> Self {
        Self {
            cols: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, -1.0 / depth],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Returns the 2-D translation if this is a pure translation in x/y.
    #[must_use]
    pub fn as_translation_2d(&self) -> Option<kurbo::Vec2> {
        let mut without = *self;
        without.cols[3][0] = 0.0;
        without.cols[3][1] = 0.0;
        (without == Self::IDENTITY).then(|| kurbo::Vec2::new(self.cols[3][0], self.cols[3][1]))
    }

    /// Is this transform [finite]?
    ///
    /// [finite]: f64::is_finite
    #[inline]
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.cols.iter().flatten().all(|v| v.is_finite())
    }

    /// Returns the determinant of the full 4×4 matrix.
    #[must_use]
    pub fn determinant(&self) -> f64 {
        let m = self.to_rows();
        let (_, det) = cofactors(&m);
        det
    }

    /// Returns the inverse, or `None` if the matrix is singular.
    #[must_use]
    pub fn inverse(&self) -> Option<Self> {
        let m = self.to_rows();
        let (adj, det) = cofactors(&m);
        if det.abs() < f64::EPSILON * 16.0 || !det.is_finite() {
            return None;
        }
        let inv_det = 1.0 / det;
        // `adj` is row-major; transpose into columns.
        let mut cols = [[0.0_f64; 4]; 4];
        let mut c = 0;
        while c < 4 {
            let mut r = 0;
            while r < 4 {
                cols[c][r] = adj[r][c] * inv_det;
                r += 1;
            }
            c += 1;
        }
        Some(Self { cols })
    }

    /// Maps a point on the z=0 plane, dividing by `w`.
    ///
    /// Returns `None` if the point lands behind the eye.
    #[must_use]
    pub fn map_point(&self, p: Point) -> Option<Point> {
        let c = &self.cols;
        let x = c[0][0] * p.x + c[1][0] * p.y + c[3][0];
        let y = c[0][1] * p.x + c[1][1] * p.y + c[3][1];
        let w = c[0][3] * p.x + c[1][3] * p.y + c[3][3];
        if w <= MIN_W || !w.is_finite() {
            return None;
        }
        Some(Point::new(x / w, y / w))
    }

    /// Maps a rect on the z=0 plane and returns the bounds of the flattened
    /// quad.
    ///
    /// Returns `None` when any corner lands behind the eye, in which case the
    /// projection is unbounded.
    #[must_use]
    pub fn map_rect(&self, rect: Rect) -> Option<Rect> {
        let corners = [
            Point::new(rect.x0, rect.y0),
            Point::new(rect.x1, rect.y0),
            Point::new(rect.x1, rect.y1),
            Point::new(rect.x0, rect.y1),
        ];
        let first = self.map_point(corners[0])?;
        let mut bounds = Rect::from_points(first, first);
        for corner in &corners[1..] {
            bounds = bounds.union_pt(self.map_point(*corner)?);
        }
        Some(bounds)
    }

    /// Row-major copy of the matrix.
    fn to_rows(self) -> [[f64; 4]; 4] {
        let mut rows = [[0.0_f64; 4]; 4];
        let mut r = 0;
        while r < 4 {
            let mut c = 0;
            while c < 4 {
                rows[r][c] = self.cols[c][r];
                c += 1;
            }
            r += 1;
        }
        rows
    }
}

fn sin_cos(radians: f64) -> (f64, f64) {
    #[cfg(feature = "std")]
    {
        radians.sin_cos()
    }
    #[cfg(not(feature = "std"))]
    {
        (radians.sin(), radians.cos())
    }
}

/// Returns the adjugate (transposed cofactors, row-major) and determinant.
fn cofactors(m: &[[f64; 4]; 4]) -> ([[f64; 4]; 4], f64) {
    let mut adj = [[0.0_f64; 4]; 4];
    for r in 0..4 {
        for c in 0..4 {
            let minor = minor3(m, r, c);
            let sign = if (r + c) % 2 == 0 { 1.0 } else { -1.0 };
            adj[c][r] = sign * minor;
        }
    }
    let det = m[0][0] * adj[0][0] + m[0][1] * adj[1][0] + m[0][2] * adj[2][0] + m[0][3] * adj[3][0];
    (adj, det)
}

/// Determinant of the 3×3 matrix left after removing `row` and `col`.
fn minor3(m: &[[f64; 4]; 4], row: usize, col: usize) -> f64 {
    let mut sub = [[0.0_f64; 3]; 3];
    let mut sr = 0;
    for r in 0..4 {
        if r == row {
            continue;
        }
        let mut sc = 0;
        for c in 0..4 {
            if c == col {
                continue;
            }
            sub[sr][sc] = m[r][c];
            sc += 1;
        }
        sr += 1;
    }
    sub[0][0] * (sub[1][1] * sub[2][2] - sub[1][2] * sub[2][1])
        - sub[0][1] * (sub[1][0] * sub[2][2] - sub[1][2] * sub[2][0])
        + sub[0][2] * (sub[1][0] * sub[2][1] - sub[1][1] * sub[2][0])
}

impl Default for Transform3d {
    #[inline]
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul for Transform3d {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        let a = &self.cols;
        let b = &rhs.cols;
        let mut out = [[0.0_f64; 4]; 4];
        let mut j = 0;
        while j < 4 {
            let mut i = 0;
            while i < 4 {
                out[j][i] =
                    a[0][i] * b[j][0] + a[1][i] * b[j][1] + a[2][i] * b[j][2] + a[3][i] * b[j][3];
                i += 1;
            }
            j += 1;
        }
        Self { cols: out }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn approx_eq(a: &Transform3d, b: &Transform3d) -> bool {
        a.cols
            .iter()
            .flatten()
            .zip(b.cols.iter().flatten())
            .all(|(x, y)| (x - y).abs() < EPS)
    }

    #[test]
    fn translation_composition() {
        let a = Transform3d::from_translation(1.0, 0.0, 0.0);
        let b = Transform3d::from_translation(0.0, 2.0, 0.0);
        assert_eq!((a * b).col(3), [1.0, 2.0, 0.0, 1.0]);
    }

    #[test]
    fn scale_then_translate() {
        let s = Transform3d::from_scale(2.0, 2.0, 2.0);
        let t = Transform3d::from_translation(3.0, 4.0, 0.0);
        let combined = t * s;
        assert_eq!(combined.col(0), [2.0, 0.0, 0.0, 0.0]);
        assert_eq!(combined.col(3), [3.0, 4.0, 0.0, 1.0]);
    }

    #[test]
    fn inverse_of_translate_scale() {
        let t = Transform3d::from_translation(10.0, -4.0, 0.0)
            * Transform3d::from_scale(2.0, 4.0, 1.0);
        let inv = t.inverse().unwrap();
        assert!(approx_eq(&(t * inv), &Transform3d::IDENTITY));
        assert!(approx_eq(&(inv * t), &Transform3d::IDENTITY));
    }

    #[test]
    fn inverse_of_rotation() {
        let r = Transform3d::from_rotation_z(0.3);
        let inv = r.inverse().unwrap();
        assert!(approx_eq(&inv, &Transform3d::from_rotation_z(-0.3)));
    }

    #[test]
    fn quarter_turn_about_x_is_singular_in_the_plane() {
        let r = Transform3d::from_rotation_x(core::f64::consts::FRAC_PI_2);
        let mapped = r.map_rect(Rect::new(0.0, 0.0, 100.0, 100.0)).unwrap();
        assert!(mapped.height().abs() < EPS);
        assert!((mapped.width() - 100.0).abs() < EPS);
    }

    #[test]
    fn zero_scale_has_no_inverse() {
        assert!(Transform3d::from_scale(0.0, 1.0, 1.0).inverse().is_none());
    }

    #[test]
    fn map_rect_translates() {
        let t = Transform3d::from_translation(5.0, 7.0, 0.0);
        let r = t.map_rect(Rect::new(0.0, 0.0, 10.0, 10.0)).unwrap();
        assert_eq!(r, Rect::new(5.0, 7.0, 15.0, 17.0));
    }

    #[test]
    fn perspective_enlarges_points_in_front() {
        // Push the plane toward the eye: everything scales up.
        let t = Transform3d::from_perspective(100.0)
            * Transform3d::from_translation(0.0, 0.0, 50.0);
        let p = t.map_point(Point::new(10.0, 0.0)).unwrap();
        assert!((p.x - 20.0).abs() < EPS);
    }

    #[test]
    fn behind_the_eye_is_unbounded() {
        let t = Transform3d::from_perspective(100.0)
            * Transform3d::from_translation(0.0, 0.0, 150.0);
        assert!(t.map_rect(Rect::new(0.0, 0.0, 1.0, 1.0)).is_none());
    }

    #[test]
    fn pure_translation_detected() {
        let t = Transform3d::from_translation(3.0, -2.0, 0.0);
        assert_eq!(t.as_translation_2d(), Some(kurbo::Vec2::new(3.0, -2.0)));
        assert_eq!(Transform3d::from_scale(2.0, 1.0, 1.0).as_translation_2d(), None);
    }

    #[test]
    fn nan_is_not_finite() {
        let mut t = Transform3d::IDENTITY;
        t.cols[2][1] = f64::NAN;
        assert!(!t.is_finite());
    }
}
