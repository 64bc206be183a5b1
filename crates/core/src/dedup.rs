//! Near-duplicate suppression and hint ranking for candidate boxes.
//!
//! Two boxes are duplicates when their IoU is strictly greater than the
//! configured threshold. When duplicates collide the representative is
//! chosen by, in order: higher detector confidence, larger area, earlier
//! input position. Selection is a linear-scan non-maximum suppression, so
//! no sort comparator has to be a total order over mixed
//! present/absent confidences.

use serde::{Deserialize, Serialize};

use crate::geometry::{iou, BBox, Point};
use crate::validation::integral;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default IoU above which two boxes are considered the same element.
pub const DEFAULT_DUPLICATE_IOU: f64 = 0.6;

/// Candidates whose centres are closer than this on both axes collapse
/// during hint ranking.
pub const CENTER_PROXIMITY_PX: i64 = 4;

// ---------------------------------------------------------------------------
// Boxed items
// ---------------------------------------------------------------------------

/// Anything that carries a box and, optionally, a detector confidence.
pub trait Boxed {
    fn bbox(&self) -> &BBox;

    fn confidence(&self) -> Option<f64> {
        None
    }
}

impl Boxed for BBox {
    fn bbox(&self) -> &BBox {
        self
    }
}

/// A detector proposal for one GUI element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub bbox: BBox,
    pub point: Point,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl Boxed for Candidate {
    fn bbox(&self) -> &BBox {
        &self.bbox
    }

    fn confidence(&self) -> Option<f64> {
        self.confidence
    }
}

impl Candidate {
    /// Build a candidate from raw detector numbers.
    ///
    /// Box coordinates are truncated toward zero; boxes that end up inverted
    /// or degenerate are discarded. A missing point, or one that does not
    /// land strictly inside the box, is replaced by the box centre.
    /// Confidence is clamped to `[0, 1]`.
    pub fn from_raw(bbox: [f64; 4], point: Option<[f64; 2]>, confidence: Option<f64>) -> Option<Self> {
        if bbox.iter().any(|v| !v.is_finite()) {
            return None;
        }
        let bbox = BBox::new(bbox[0] as i64, bbox[1] as i64, bbox[2] as i64, bbox[3] as i64);
        if !bbox.is_ordered() {
            return None;
        }
        let point = point
            .and_then(|[x, y]| Some(Point::new(integral(x.trunc())?, integral(y.trunc())?)))
            .filter(|p| bbox.contains_strictly(p))
            .unwrap_or_else(|| bbox.center());
        let confidence = confidence
            .filter(|c| c.is_finite())
            .map(|c| c.clamp(0.0, 1.0));
        Some(Self {
            bbox,
            point,
            confidence,
        })
    }
}

/// A ranked candidate carrying its 1-based hint id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hint {
    pub id: i64,
    pub bbox: BBox,
    pub point: Point,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl Boxed for Hint {
    fn bbox(&self) -> &BBox {
        &self.bbox
    }

    fn confidence(&self) -> Option<f64> {
        self.confidence
    }
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// Whether `a` should represent a duplicate group over `b`.
///
/// Strict: returns `false` on a full tie so the earlier item is kept.
fn beats<T: Boxed>(a: &T, b: &T) -> bool {
    match (a.confidence(), b.confidence()) {
        (Some(ca), Some(cb)) if ca != cb => ca > cb,
        _ => a.bbox().area() > b.bbox().area(),
    }
}

/// Greedy suppression returning kept indices in selection (preference) order.
///
/// `also_duplicate` lets callers add extra collapse rules on top of IoU.
fn select<T, F>(items: &[T], threshold: f64, also_duplicate: F) -> Vec<usize>
where
    T: Boxed,
    F: Fn(&T, &T) -> bool,
{
    let mut remaining: Vec<usize> = (0..items.len()).collect();
    let mut kept = Vec::new();

    while !remaining.is_empty() {
        let mut best_pos = 0;
        for pos in 1..remaining.len() {
            if beats(&items[remaining[pos]], &items[remaining[best_pos]]) {
                best_pos = pos;
            }
        }
        let best = remaining.remove(best_pos);
        kept.push(best);

        let winner = &items[best];
        remaining.retain(|&i| {
            let other = &items[i];
            !(iou(winner.bbox(), other.bbox()) > threshold || also_duplicate(winner, other))
        });
    }

    kept
}

/// Whether two boxes count as duplicates under `threshold` (exclusive).
pub fn is_duplicate(a: &BBox, b: &BBox, threshold: f64) -> bool {
    iou(a, b) > threshold
}

/// Collapse near-duplicate boxes to a single representative each.
///
/// Survivors keep their original relative order. Idempotent: the output
/// contains no duplicate pair, so a second pass returns it unchanged.
pub fn deduplicate<T: Boxed + Clone>(items: &[T], threshold: f64) -> Vec<T> {
    let mut kept = select(items, threshold, |_, _| false);
    kept.sort_unstable();
    kept.into_iter().map(|i| items[i].clone()).collect()
}

// ---------------------------------------------------------------------------
// Hint ranking
// ---------------------------------------------------------------------------

fn centers_close(a: &Candidate, b: &Candidate) -> bool {
    let (ca, cb) = (a.bbox.center(), b.bbox.center());
    let limit = CENTER_PROXIMITY_PX.unsigned_abs();
    ca.x.abs_diff(cb.x) < limit && ca.y.abs_diff(cb.y) < limit
}

/// Turn raw candidates into the numbered hint list sent to the language model.
///
/// Duplicates (by IoU or near-identical centres) are suppressed, the best
/// `max_elements` survivors are kept (`0` keeps all), and the result is
/// re-ordered top-to-bottom then left-to-right and numbered from 1.
pub fn rank_hints(candidates: &[Candidate], max_elements: usize, threshold: f64) -> Vec<Hint> {
    let mut kept = select(candidates, threshold, centers_close);
    if max_elements > 0 {
        kept.truncate(max_elements);
    }

    let mut ranked: Vec<&Candidate> = kept.iter().map(|&i| &candidates[i]).collect();
    ranked.sort_by_key(|c| {
        let center = c.bbox.center();
        (center.y, center.x)
    });

    ranked
        .into_iter()
        .enumerate()
        .map(|(i, c)| Hint {
            id: i as i64 + 1,
            bbox: c.bbox,
            point: c.point,
            confidence: c.confidence,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
