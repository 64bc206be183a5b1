//! Snapping language-model output back onto detector hints.
//!
//! The model is asked to choose among numbered hints, but its answer is
//! treated as untrusted: every element is re-anchored to the exact hint box
//! it names, anything that cannot be tied to a hint is dropped, and the
//! result is checked against the image before it is returned.

use std::collections::{HashMap, HashSet};

use serde_json::Value;

use crate::annotation::{Annotation, DetailLevel, Element, ImageSize, MAX_INSTRUCTION_LEN, OPTIONAL_FIELDS};
use crate::dedup::{is_duplicate, Hint};
use crate::geometry::{iou, BBox};
use crate::validation::{check_element, integral};

/// IoU above which two snapped elements are considered the same.
pub const SNAP_DUPLICATE_IOU: f64 = 0.5;

fn as_int(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_f64().and_then(|f| integral(f.trunc())),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_bbox(v: Option<&Value>) -> Option<BBox> {
    let arr = v?.as_array()?;
    if arr.len() != 4 {
        return None;
    }
    let mut out = [0i64; 4];
    for (slot, item) in out.iter_mut().zip(arr) {
        *slot = as_int(item)?;
    }
    Some(BBox::from(out))
}

/// Id of the hint overlapping `bbox` the most; the first hint when the
/// model gave no usable box.
fn best_hint_id(bbox: Option<BBox>, hints: &[Hint]) -> Option<i64> {
    let Some(bbox) = bbox else {
        return hints.first().map(|h| h.id);
    };
    let mut best: Option<(f64, i64)> = None;
    for h in hints {
        let score = iou(&bbox, &h.bbox);
        if best.map_or(true, |(s, _)| score > s) {
            best = Some((score, h.id));
        }
    }
    best.map(|(_, id)| id)
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Map raw model output onto `hints`.
///
/// For each element of `model_out["element"]`:
/// - resolve its hint via `source_id`, or the best-IoU hint when absent;
/// - drop it if the hint is unknown or was already used;
/// - replace `bbox` with the hint box and `point` with the hint point moved
///   strictly inside the box;
/// - trim and truncate the instruction, dropping elements left empty;
/// - keep only the optional fields `level` includes.
///
/// Elements that still fail coordinate validation against `size` are
/// dropped, then later elements duplicating an earlier one
/// (`IoU > SNAP_DUPLICATE_IOU`) are pruned.
pub fn snap_to_hints(
    model_out: &Value,
    hints: &[Hint],
    size: ImageSize,
    level: DetailLevel,
) -> Annotation {
    let by_id: HashMap<i64, &Hint> = hints.iter().map(|h| (h.id, h)).collect();
    let mut seen = HashSet::new();
    let mut snapped: Vec<Element> = Vec::new();

    let raw_elements = model_out
        .get("element")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    for raw in raw_elements {
        let Some(obj) = raw.as_object() else {
            continue;
        };

        let sid = match obj.get("source_id").filter(|v| !v.is_null()) {
            Some(v) => as_int(v),
            None => best_hint_id(as_bbox(obj.get("bbox")), hints),
        };
        let Some(hint) = sid.and_then(|id| by_id.get(&id)) else {
            continue;
        };
        if !seen.insert(hint.id) {
            continue;
        }

        let instruction = obj
            .get("instruction")
            .and_then(Value::as_str)
            .map(str::trim)
            .unwrap_or_default();
        if instruction.is_empty() {
            continue;
        }

        let mut el = Element::new(
            truncate_chars(instruction, MAX_INSTRUCTION_LEN),
            hint.bbox,
            hint.point.clamped_into(&hint.bbox),
        );
        el.source_id = Some(hint.id);
        for name in OPTIONAL_FIELDS {
            if !level.includes(name) {
                continue;
            }
            if let Some(text) = obj.get(name).and_then(Value::as_str) {
                let text = text.trim();
                if !text.is_empty() {
                    el.set_optional(name, Some(text.to_string()));
                }
            }
        }

        if check_element(size.width, size.height, &el.bbox, &el.point).is_err() {
            continue;
        }
        snapped.push(el);
    }

    let mut pruned: Vec<Element> = Vec::with_capacity(snapped.len());
    for el in snapped {
        if !pruned
            .iter()
            .any(|k| is_duplicate(&k.bbox, &el.bbox, SNAP_DUPLICATE_IOU))
        {
            pruned.push(el);
        }
    }

    Annotation {
        img_size: size,
        elements: pruned,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use serde_json::json;

    fn hint(id: i64, b: [i64; 4], p: [i64; 2]) -> Hint {
        Hint {
            id,
            bbox: BBox::from(b),
            point: Point::from(p),
            confidence: None,
        }
    }

    fn hints() -> Vec<Hint> {
        vec![
            hint(1, [10, 10, 60, 40], [35, 25]),
            hint(2, [100, 10, 150, 40], [100, 25]),
            hint(3, [10, 60, 60, 90], [35, 75]),
        ]
    }

    const SIZE: ImageSize = ImageSize::new(200, 100);

    #[test]
    fn snaps_box_to_hint_and_clamps_point() {
        let out = json!({"element": [
            {"instruction": "  Press Save  ", "bbox": [0, 0, 1, 1], "point": [0, 0], "source_id": 2}
        ]});
        let ann = snap_to_hints(&out, &hints(), SIZE, DetailLevel::High);
        assert_eq!(ann.elements.len(), 1);
        let el = &ann.elements[0];
        assert_eq!(el.instruction, "Press Save");
        assert_eq!(el.bbox, BBox::new(100, 10, 150, 40));
        assert_eq!(el.point, Point::new(101, 25));
        assert_eq!(el.source_id, Some(2));
    }

    #[test]
    fn missing_source_id_uses_best_overlap() {
        let out = json!({"element": [
            {"instruction": "Open", "bbox": [12, 58, 60, 92], "point": [30, 70]}
        ]});
        let ann = snap_to_hints(&out, &hints(), SIZE, DetailLevel::Low);
        assert_eq!(ann.elements[0].source_id, Some(3));
    }

    #[test]
    fn unknown_and_repeated_ids_dropped() {
        let out = json!({"element": [
            {"instruction": "a", "source_id": 9},
            {"instruction": "b", "source_id": 1},
            {"instruction": "c", "source_id": "1"},
            {"instruction": "d", "source_id": 3}
        ]});
        let ann = snap_to_hints(&out, &hints(), SIZE, DetailLevel::Low);
        let ids: Vec<_> = ann.elements.iter().map(|e| e.source_id).collect();
        assert_eq!(ids, vec![Some(1), Some(3)]);
    }

    #[test]
    fn optional_fields_follow_detail_level() {
        let out = json!({"element": [
            {"instruction": "Tab", "source_id": 1, "type": "tab", "label": "Home", "description": "goes home"}
        ]});
        let normal = snap_to_hints(&out, &hints(), SIZE, DetailLevel::Normal);
        assert_eq!(normal.elements[0].element_type.as_deref(), Some("tab"));
        assert_eq!(normal.elements[0].description, None);

        let low = snap_to_hints(&out, &hints(), SIZE, DetailLevel::Low);
        assert_eq!(low.elements[0].label, None);
    }

    #[test]
    fn long_instruction_truncated() {
        let long = "y".repeat(300);
        let out = json!({"element": [{"instruction": long, "source_id": 1}]});
        let ann = snap_to_hints(&out, &hints(), SIZE, DetailLevel::Low);
        assert_eq!(ann.elements[0].instruction.chars().count(), MAX_INSTRUCTION_LEN);
    }

    #[test]
    fn overlapping_hints_pruned_first_wins() {
        let hs = vec![
            hint(1, [0, 0, 100, 100], [50, 50]),
            hint(2, [5, 5, 100, 100], [50, 50]),
        ];
        let out = json!({"element": [
            {"instruction": "second", "source_id": 2},
            {"instruction": "first", "source_id": 1}
        ]});
        let ann = snap_to_hints(&out, &hs, ImageSize::new(200, 200), DetailLevel::Low);
        assert_eq!(ann.elements.len(), 1);
        assert_eq!(ann.elements[0].instruction, "second");
    }

    #[test]
    fn hints_outside_image_dropped() {
        let hs = vec![hint(1, [150, 50, 250, 90], [200, 70])];
        let out = json!({"element": [{"instruction": "x", "source_id": 1}]});
        let ann = snap_to_hints(&out, &hs, SIZE, DetailLevel::Low);
        assert!(ann.elements.is_empty());
    }

    #[test]
    fn garbage_output_yields_empty_annotation() {
        let ann = snap_to_hints(&json!({"foo": 1}), &hints(), SIZE, DetailLevel::High);
        assert_eq!(ann, Annotation::empty(SIZE));
    }
}
