//! Coordinate validation for annotation elements.
//!
//! Pure functions that decide whether a box/point pair is acceptable for an
//! image of a given size. Raw coordinates arrive as `f64` (they come from
//! JSON, where `4.0` and `4` are both legal numbers); integral values are
//! accepted and truncated, anything fractional is rejected outright.

use crate::geometry::{BBox, Point};

// ---------------------------------------------------------------------------
// Rejection reasons
// ---------------------------------------------------------------------------

/// Why a box/point pair was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CoordinateIssue {
    #[error("non-integer coordinate")]
    NonIntegerCoordinate,

    #[error("inverted or degenerate box")]
    InvertedOrDegenerateBox,

    #[error("box exceeds image bounds")]
    BoxExceedsBounds,

    #[error("point outside box")]
    PointOutsideBox,

    #[error("point on box boundary")]
    PointOnBoundary,
}

// ---------------------------------------------------------------------------
// Integral coercion
// ---------------------------------------------------------------------------

/// Convert `v` to an integer if it has no fractional part.
///
/// Returns `None` for NaN, infinities, fractional values, and values outside
/// the `i64` range.
pub fn integral(v: f64) -> Option<i64> {
    if !v.is_finite() || v.fract() != 0.0 {
        return None;
    }
    if v < i64::MIN as f64 || v >= i64::MAX as f64 {
        return None;
    }
    Some(v as i64)
}

// ---------------------------------------------------------------------------
// Validators
// ---------------------------------------------------------------------------

/// Validate raw numeric coordinates against an image of `width` x `height`.
///
/// On success returns the integer box and point. Checks run in a fixed
/// order: integrality, box ordering, image bounds, point placement.
pub fn validate_coordinates(
    width: i64,
    height: i64,
    bbox: [f64; 4],
    point: [f64; 2],
) -> Result<(BBox, Point), CoordinateIssue> {
    let mut ints = [0i64; 6];
    for (slot, raw) in ints.iter_mut().zip(bbox.iter().chain(point.iter())) {
        *slot = integral(*raw).ok_or(CoordinateIssue::NonIntegerCoordinate)?;
    }
    let [x1, y1, x2, y2, cx, cy] = ints;
    let bbox = BBox::new(x1, y1, x2, y2);
    let point = Point::new(cx, cy);
    check_element(width, height, &bbox, &point)?;
    Ok((bbox, point))
}

/// Validate an integer box/point pair against an image of `width` x `height`.
///
/// Requires `0 <= x1 < x2 <= width`, `0 <= y1 < y2 <= height`, and the
/// point strictly inside the box. A point exactly on an edge is reported as
/// [`CoordinateIssue::PointOnBoundary`].
pub fn check_element(
    width: i64,
    height: i64,
    bbox: &BBox,
    point: &Point,
) -> Result<(), CoordinateIssue> {
    if !bbox.is_ordered() {
        return Err(CoordinateIssue::InvertedOrDegenerateBox);
    }
    if bbox.x1 < 0 || bbox.y1 < 0 || bbox.x2 > width || bbox.y2 > height {
        return Err(CoordinateIssue::BoxExceedsBounds);
    }
    if bbox.contains_strictly(point) {
        return Ok(());
    }
    let within_x = bbox.x1 <= point.x && point.x <= bbox.x2;
    let within_y = bbox.y1 <= point.y && point.y <= bbox.y2;
    if within_x && within_y {
        Err(CoordinateIssue::PointOnBoundary)
    } else {
        Err(CoordinateIssue::PointOutsideBox)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const W: i64 = 200;
    const H: i64 = 100;

    fn check(bbox: [f64; 4], point: [f64; 2]) -> Result<(BBox, Point), CoordinateIssue> {
        validate_coordinates(W, H, bbox, point)
    }

    // -- accept --------------------------------------------------------------

    #[test]
    fn valid_element_accepted() {
        let (b, p) = check([10.0, 10.0, 50.0, 40.0], [30.0, 25.0]).unwrap();
        assert_eq!(b, BBox::new(10, 10, 50, 40));
        assert_eq!(p, Point::new(30, 25));
    }

    #[test]
    fn box_touching_image_edges_accepted() {
        assert!(check([0.0, 0.0, W as f64, H as f64], [1.0, 1.0]).is_ok());
    }

    #[test]
    fn integral_floats_are_truncated() {
        let (b, _) = check([4.0, 4.0, 8.0, 8.0], [6.0, 6.0]).unwrap();
        assert_eq!(b, BBox::new(4, 4, 8, 8));
    }

    #[test]
    fn exhaustive_small_grid_accepts_every_valid_combination() {
        let (w, h) = (6i64, 5i64);
        for x1 in 0..w {
            for x2 in (x1 + 1)..=w {
                for y1 in 0..h {
                    for y2 in (y1 + 1)..=h {
                        for cx in (x1 + 1)..x2 {
                            for cy in (y1 + 1)..y2 {
                                let r = validate_coordinates(
                                    w,
                                    h,
                                    [x1 as f64, y1 as f64, x2 as f64, y2 as f64],
                                    [cx as f64, cy as f64],
                                );
                                assert!(r.is_ok(), "{x1},{y1},{x2},{y2} / {cx},{cy}");
                            }
                        }
                    }
                }
            }
        }
    }

    // -- reject: integrality -------------------------------------------------

    #[test]
    fn fractional_coordinate_rejected() {
        assert_matches!(
            check([10.5, 10.0, 50.0, 40.0], [30.0, 25.0]),
            Err(CoordinateIssue::NonIntegerCoordinate)
        );
        assert_matches!(
            check([10.0, 10.0, 50.0, 40.0], [30.0, 25.25]),
            Err(CoordinateIssue::NonIntegerCoordinate)
        );
    }

    #[test]
    fn nan_and_infinity_rejected() {
        assert_matches!(
            check([f64::NAN, 10.0, 50.0, 40.0], [30.0, 25.0]),
            Err(CoordinateIssue::NonIntegerCoordinate)
        );
        assert_matches!(
            check([10.0, 10.0, f64::INFINITY, 40.0], [30.0, 25.0]),
            Err(CoordinateIssue::NonIntegerCoordinate)
        );
    }

    // -- reject: box ---------------------------------------------------------

    #[test]
    fn degenerate_box_rejected() {
        assert_matches!(
            check([10.0, 10.0, 10.0, 40.0], [10.0, 25.0]),
            Err(CoordinateIssue::InvertedOrDegenerateBox)
        );
        assert_matches!(
            check([10.0, 40.0, 50.0, 40.0], [30.0, 40.0]),
            Err(CoordinateIssue::InvertedOrDegenerateBox)
        );
    }

    #[test]
    fn inverted_box_rejected() {
        assert_matches!(
            check([50.0, 10.0, 10.0, 40.0], [30.0, 25.0]),
            Err(CoordinateIssue::InvertedOrDegenerateBox)
        );
    }

    #[test]
    fn negative_origin_rejected() {
        assert_matches!(
            check([-1.0, 10.0, 50.0, 40.0], [30.0, 25.0]),
            Err(CoordinateIssue::BoxExceedsBounds)
        );
    }

    #[test]
    fn box_past_right_or_bottom_edge_rejected() {
        assert_matches!(
            check([10.0, 10.0, 201.0, 40.0], [30.0, 25.0]),
            Err(CoordinateIssue::BoxExceedsBounds)
        );
        assert_matches!(
            check([10.0, 10.0, 50.0, 101.0], [30.0, 25.0]),
            Err(CoordinateIssue::BoxExceedsBounds)
        );
    }

    // -- reject: point -------------------------------------------------------

    #[test]
    fn point_on_left_edge_rejected() {
        assert_matches!(
            validate_coordinates(100, 100, [0.0, 0.0, 100.0, 100.0], [0.0, 50.0]),
            Err(CoordinateIssue::PointOnBoundary)
        );
    }

    #[test]
    fn point_on_each_edge_rejected() {
        let b = [10.0, 10.0, 50.0, 40.0];
        for p in [[10.0, 25.0], [50.0, 25.0], [30.0, 10.0], [30.0, 40.0], [50.0, 40.0]] {
            assert_matches!(check(b, p), Err(CoordinateIssue::PointOnBoundary));
        }
    }

    #[test]
    fn point_outside_box_rejected() {
        assert_matches!(
            check([10.0, 10.0, 50.0, 40.0], [60.0, 25.0]),
            Err(CoordinateIssue::PointOutsideBox)
        );
        assert_matches!(
            check([10.0, 10.0, 50.0, 40.0], [30.0, 5.0]),
            Err(CoordinateIssue::PointOutsideBox)
        );
    }

    #[test]
    fn reasons_are_human_readable() {
        assert_eq!(CoordinateIssue::PointOnBoundary.to_string(), "point on box boundary");
        assert_eq!(
            CoordinateIssue::InvertedOrDegenerateBox.to_string(),
            "inverted or degenerate box"
        );
    }

    #[test]
    fn integral_helper() {
        assert_eq!(integral(3.0), Some(3));
        assert_eq!(integral(-2.0), Some(-2));
        assert_eq!(integral(0.1), None);
        assert_eq!(integral(f64::NEG_INFINITY), None);
    }
}
