use crate::geometry::{Size, Transform};

/// Orientation of a source track, as recorded by its capture device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Up,
    Down,
    Left,
    Right,
}

impl Orientation {
    pub fn is_portrait(&self) -> bool {
        matches!(self, Orientation::Left | Orientation::Right)
    }
}

/// Classify a raw preferred transform into an orientation case.
///
/// Matching is exact against the four canonical rotations; anything else
/// (sheared or fractional metadata) falls back to `Up`, leaving the source
/// unnormalized.
pub fn classify(transform: &Transform) -> Orientation {
    let linear = transform.linear();
    if linear == (0.0, 1.0, -1.0, 0.0) {
        Orientation::Right
    } else if linear == (0.0, -1.0, 1.0, 0.0) {
        Orientation::Left
    } else if linear == (-1.0, 0.0, 0.0, -1.0) {
        Orientation::Down
    } else {
        Orientation::Up
    }
}

/// Recompute a raw transform's translation so the rotated content's bounding
/// box lands with its top-left corner at the origin.
///
/// Covers the eight canonical sign/swap combinations of the linear part;
/// any other transform keeps its original translation.
pub fn fixed_transform(raw: &Transform, natural_size: Size) -> Transform {
    let w = natural_size.width;
    let h = natural_size.height;
    let linear = raw.linear();

    let cases: [((f64, f64, f64, f64), (f64, f64)); 8] = [
        ((1.0, 0.0, 0.0, 1.0), (0.0, 0.0)),
        ((1.0, 0.0, 0.0, -1.0), (0.0, h)),
        ((-1.0, 0.0, 0.0, 1.0), (w, 0.0)),
        ((-1.0, 0.0, 0.0, -1.0), (w, h)),
        ((0.0, -1.0, 1.0, 0.0), (h, 0.0)),
        ((0.0, 1.0, -1.0, 0.0), (0.0, w)),
        ((0.0, 1.0, 1.0, 0.0), (0.0, 0.0)),
        ((0.0, -1.0, -1.0, 0.0), (h, w)),
    ];

    for (candidate, (tx, ty)) in cases {
        if linear == candidate {
            return raw.with_translation(tx, ty);
        }
    }

    *raw
}
