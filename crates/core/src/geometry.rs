//! Axis-aligned box and point primitives in absolute pixel coordinates.
//!
//! Boxes and points serialize as plain JSON arrays (`[x1, y1, x2, y2]` and
//! `[x, y]`) to match the annotation wire format.
//!
//! Coordinates are `i64` but may come straight from client JSON or a
//! detector, so spans and areas are computed in `u128` and never overflow.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// BBox
// ---------------------------------------------------------------------------

/// An axis-aligned bounding box from `(x1, y1)` to `(x2, y2)` in pixels.
///
/// Construction does not enforce ordering; use
/// [`validation::check_element`](crate::validation::check_element) to verify
/// a box against image bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[i64; 4]", into = "[i64; 4]")]
pub struct BBox {
    pub x1: i64,
    pub y1: i64,
    pub x2: i64,
    pub y2: i64,
}

impl BBox {
    pub const fn new(x1: i64, y1: i64, x2: i64, y2: i64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> u128 {
        span(self.x1, self.x2)
    }

    pub fn height(&self) -> u128 {
        span(self.y1, self.y2)
    }

    /// Area in square pixels; inverted boxes have zero area.
    pub fn area(&self) -> u128 {
        self.width() * self.height()
    }

    /// Whether `x1 < x2` and `y1 < y2`.
    pub fn is_ordered(&self) -> bool {
        self.x1 < self.x2 && self.y1 < self.y2
    }

    /// Area of the overlap with `other`, zero when disjoint or only touching.
    pub fn intersection_area(&self, other: &BBox) -> u128 {
        let w = span(self.x1.max(other.x1), self.x2.min(other.x2));
        let h = span(self.y1.max(other.y1), self.y2.min(other.y2));
        w * h
    }

    /// Whether `point` lies strictly inside the box (edges excluded).
    pub fn contains_strictly(&self, point: &Point) -> bool {
        self.x1 < point.x && point.x < self.x2 && self.y1 < point.y && point.y < self.y2
    }

    /// Integer centre of the box, pulled one pixel inside any edge it lands on.
    ///
    /// Boxes narrower than 2 px have no interior pixel; the result then sits
    /// on the boundary and will fail strict-interior validation.
    pub fn center(&self) -> Point {
        let cx = midpoint(self.x1, self.x2);
        let cy = midpoint(self.y1, self.y2);
        Point {
            x: clamp_inside(cx, self.x1, self.x2),
            y: clamp_inside(cy, self.y1, self.y2),
        }
    }
}

impl From<[i64; 4]> for BBox {
    fn from([x1, y1, x2, y2]: [i64; 4]) -> Self {
        Self { x1, y1, x2, y2 }
    }
}

impl From<BBox> for [i64; 4] {
    fn from(b: BBox) -> Self {
        [b.x1, b.y1, b.x2, b.y2]
    }
}

// ---------------------------------------------------------------------------
// Point
// ---------------------------------------------------------------------------

/// A click point in absolute pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[i64; 2]", into = "[i64; 2]")]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

impl Point {
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// Move the point strictly inside `bbox`, one pixel from any edge.
    pub fn clamped_into(&self, bbox: &BBox) -> Point {
        Point {
            x: clamp_inside(self.x, bbox.x1, bbox.x2),
            y: clamp_inside(self.y, bbox.y1, bbox.y2),
        }
    }
}

impl From<[i64; 2]> for Point {
    fn from([x, y]: [i64; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Point> for [i64; 2] {
    fn from(p: Point) -> Self {
        [p.x, p.y]
    }
}

/// `hi - lo`, or zero when inverted.
fn span(lo: i64, hi: i64) -> u128 {
    // Non-negative after the clamp, and at most `u64::MAX`.
    (i128::from(hi) - i128::from(lo)).max(0) as u128
}

/// Floor of the mean of `a` and `b`.
fn midpoint(a: i64, b: i64) -> i64 {
    // The mean of two i64 values always fits back into i64.
    ((i128::from(a) + i128::from(b)).div_euclid(2)) as i64
}

/// Clamp `v` into `[lo + 1, hi - 1]`, never past `hi`.
fn clamp_inside(v: i64, lo: i64, hi: i64) -> i64 {
    v.min(hi.saturating_sub(1))
        .max(lo.saturating_add(1))
        .min(hi.max(lo))
}

// ---------------------------------------------------------------------------
// Overlap
// ---------------------------------------------------------------------------

/// Intersection-over-Union of two boxes.
///
/// Returns `0.0` when the boxes do not overlap or when the union is empty
/// (two degenerate boxes), so the result is always within `[0.0, 1.0]`.
pub fn iou(a: &BBox, b: &BBox) -> f64 {
    let inter = a.intersection_area(b);
    if inter == 0 {
        return 0.0;
    }
    let union = a.area() as f64 + b.area() as f64 - inter as f64;
    if union <= 0.0 {
        return 0.0;
    }
    (inter as f64 / union).min(1.0)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
