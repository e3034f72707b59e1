//! # Geometry Primitives
//!
//! Plain value types shared across the composition pipeline: sizes, frame
//! rectangles, time ranges, and the 2-D affine transform used to normalize
//! source orientation and place tracks inside the render frame.

use serde::{Deserialize, Serialize};

/// Width/height pair in pixels (or display units, for overlay input).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Wider-than-tall test used to pick the output preset.
    pub fn is_landscape(&self) -> bool {
        self.width > self.height
    }
}

/// Axis-aligned rectangle, origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }

    /// Scale position and extent by independent horizontal/vertical ratios.
    pub fn scaled(&self, sx: f64, sy: f64) -> Self {
        Self {
            x: self.x * sx,
            y: self.y * sy,
            width: self.width * sx,
            height: self.height * sy,
        }
    }
}

/// Half-open time window `[start, start + duration)` in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeRange {
    pub start: f64,
    pub duration: f64,
}

impl TimeRange {
    pub fn new(start: f64, duration: f64) -> Self {
        Self { start, duration }
    }

    pub fn from_start_end(start: f64, end: f64) -> Self {
        Self {
            start,
            duration: end - start,
        }
    }

    pub fn end(&self) -> f64 {
        self.start + self.duration
    }

    pub fn contains(&self, t: f64) -> bool {
        t >= self.start && t < self.end()
    }

    pub fn is_valid(&self) -> bool {
        self.start >= 0.0 && self.duration > 0.0 && self.start.is_finite() && self.duration.is_finite()
    }
}

/// 2-D affine transform: linear part `[[a, b], [c, d]]` plus translation
/// `(tx, ty)`.
///
/// A point `(x, y)` maps to `(a*x + b*y + tx, c*x + d*y + ty)`. Source
/// tracks carry one of these as capture-device orientation metadata; the
/// pipeline concatenates it with scale and centering translations to build
/// each layer's placement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub tx: f64,
    pub ty: f64,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        tx: 0.0,
        ty: 0.0,
    };

    pub const fn new(a: f64, b: f64, c: f64, d: f64, tx: f64, ty: f64) -> Self {
        Self { a, b, c, d, tx, ty }
    }

    pub fn scale(sx: f64, sy: f64) -> Self {
        Self::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    pub fn translation(tx: f64, ty: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    /// The linear part as an `(a, b, c, d)` tuple, for orientation matching.
    pub fn linear(&self) -> (f64, f64, f64, f64) {
        (self.a, self.b, self.c, self.d)
    }

    /// Replace the translation, keeping the linear part.
    pub fn with_translation(&self, tx: f64, ty: f64) -> Self {
        Self { tx, ty, ..*self }
    }

    /// Apply the transform to a point.
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.a * x + self.b * y + self.tx,
            self.c * x + self.d * y + self.ty,
        )
    }

    /// Concatenation: the returned transform applies `self` first, `next`
    /// second.
    pub fn then(&self, next: &Transform) -> Self {
        Self {
            a: next.a * self.a + next.b * self.c,
            b: next.a * self.b + next.b * self.d,
            c: next.c * self.a + next.d * self.c,
            d: next.c * self.b + next.d * self.d,
            tx: next.a * self.tx + next.b * self.ty + next.tx,
            ty: next.c * self.tx + next.d * self.ty + next.ty,
        }
    }

    pub fn determinant(&self) -> f64 {
        self.a * self.d - self.b * self.c
    }

    /// Inverse transform, or `None` when the linear part is singular.
    pub fn invert(&self) -> Option<Self> {
        let det = self.determinant();
        if det.abs() < f64::EPSILON {
            return None;
        }

        let a = self.d / det;
        let b = -self.b / det;
        let c = -self.c / det;
        let d = self.a / det;

        Some(Self {
            a,
            b,
            c,
            d,
            tx: -(a * self.tx + b * self.ty),
            ty: -(c * self.tx + d * self.ty),
        })
    }

    /// Map the rectangle `[0, size.width] x [0, size.height]` through the
    /// transform and return the bounding box of its four corners.
    pub fn map_bounding_box(&self, size: Size) -> Rect {
        let corners = [
            self.apply(0.0, 0.0),
            self.apply(size.width, 0.0),
            self.apply(0.0, size.height),
            self.apply(size.width, size.height),
        ];

        let min_x = corners.iter().map(|c| c.0).fold(f64::INFINITY, f64::min);
        let max_x = corners.iter().map(|c| c.0).fold(f64::NEG_INFINITY, f64::max);
        let min_y = corners.iter().map(|c| c.1).fold(f64::INFINITY, f64::min);
        let max_y = corners.iter().map(|c| c.1).fold(f64::NEG_INFINITY, f64::max);

        Rect::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_time_range_bounds() {
        let range = TimeRange::from_start_end(2.0, 6.0);
        assert!((range.duration - 4.0).abs() < EPS);
        assert!(range.contains(2.0));
        assert!(range.contains(5.999));
        assert!(!range.contains(6.0));
        assert!(range.is_valid());
        assert!(!TimeRange::new(-1.0, 2.0).is_valid());
        assert!(!TimeRange::new(0.0, 0.0).is_valid());
    }

    #[test]
    fn test_transform_apply_rotation() {
        // Quarter-turn: (x, y) -> (y, -x), then shifted by the width.
        let t = Transform::new(0.0, 1.0, -1.0, 0.0, 0.0, 100.0);
        let (x, y) = t.apply(100.0, 0.0);
        assert!((x - 0.0).abs() < EPS);
        assert!((y - 0.0).abs() < EPS);
    }

    #[test]
    fn test_then_applies_in_order() {
        let scale = Transform::scale(2.0, 2.0);
        let shift = Transform::translation(10.0, 20.0);

        // Scale first, then translate.
        let combined = scale.then(&shift);
        let (x, y) = combined.apply(3.0, 4.0);
        assert!((x - 16.0).abs() < EPS);
        assert!((y - 28.0).abs() < EPS);

        // The other order scales the translation too.
        let combined = shift.then(&scale);
        let (x, y) = combined.apply(3.0, 4.0);
        assert!((x - 26.0).abs() < EPS);
        assert!((y - 48.0).abs() < EPS);
    }

    #[test]
    fn test_invert_round_trip() {
        let t = Transform::new(0.0, -1.0, 1.0, 0.0, 5.0, -3.0)
            .then(&Transform::scale(0.5, 0.5))
            .then(&Transform::translation(7.0, 11.0));
        let inv = t.invert().expect("invertible");

        let (x, y) = t.apply(12.0, 34.0);
        let (rx, ry) = inv.apply(x, y);
        assert!((rx - 12.0).abs() < 1e-6);
        assert!((ry - 34.0).abs() < 1e-6);
    }

    #[test]
    fn test_singular_transform_has_no_inverse() {
        let t = Transform::new(1.0, 2.0, 2.0, 4.0, 0.0, 0.0);
        assert!(t.invert().is_none());
    }

    #[test]
    fn test_bounding_box_of_rotated_frame() {
        // (x, y) -> (y, -x) maps a 1920x1080 frame to x in [0, 1080],
        // y in [-1920, 0].
        let t = Transform::new(0.0, 1.0, -1.0, 0.0, 0.0, 0.0);
        let bbox = t.map_bounding_box(Size::new(1920.0, 1080.0));
        assert!((bbox.x - 0.0).abs() < EPS);
        assert!((bbox.y + 1920.0).abs() < EPS);
        assert!((bbox.width - 1080.0).abs() < EPS);
        assert!((bbox.height - 1920.0).abs() < EPS);
    }
}
