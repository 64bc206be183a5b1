//! Prompt text for the grounding request.

use groundmark_core::annotation::{DetailLevel, ImageSize};
use groundmark_core::dedup::Hint;
use serde_json::json;

/// Marker placed before each crop image in the request.
pub fn crop_marker(hint_id: i64) -> String {
    format!("<crop id={hint_id} type=tight>")
}

fn detail_guidance(level: DetailLevel) -> &'static str {
    match level {
        DetailLevel::Low => {
            "    - Keep each \"instruction\" short (at most 10 words).\n\
             \x20   - Do NOT include optional contextual fields."
        }
        DetailLevel::Normal => {
            "    - Keep instructions concise (at most 14 words).\n\
             \x20   - Include \"label\" (exact visible text) when obvious.\n\
             \x20   - Include \"type\" when obvious."
        }
        DetailLevel::High => {
            "    - Provide \"type\", \"label\" (if any) and a brief \"description\" (at most 20 words).\n\
             \x20   - Add \"context\" with the nearby section, menu or group when useful.\n\
             \x20   - Add \"state\" when visually apparent (selected, disabled).\n\
             \x20   - Still follow every rule about bbox/point equality with hints."
        }
    }
}

/// Build the labelling prompt.
///
/// `hints` are listed as `{id, bbox, point}`; `with_crops` adds the
/// explanation of the `<crop id=K type=tight>` markers that follow the
/// full screenshot.
pub fn build_prompt(
    size: ImageSize,
    hints: &[Hint],
    max_instructions: usize,
    level: DetailLevel,
    with_crops: bool,
) -> String {
    let packed: Vec<_> = hints
        .iter()
        .map(|h| json!({"id": h.id, "bbox": h.bbox, "point": h.point}))
        .collect();
    let hints_text = serde_json::Value::Array(packed).to_string();

    let crop_section = if with_crops {
        "\n  <crop_images>\n\
         \x20   After the main screenshot, each crop is preceded by a marker line\n\
         \x20   <crop id=K type=tight> where K is the hint id in <hints>.\n\
         \x20   Treat these crops as the primary evidence for the visible label.\n\
         \x20 </crop_images>"
    } else {
        ""
    };

    let (w, h) = (size.width, size.height);
    let n = max_instructions;
    let guidance = detail_guidance(level);
    let level = level.as_str();

    format!(
        r#"<SYSTEM>
  You are a UI grounding labeler.

  GOAL:
    From the attached screenshot, select 1-{n} elements STRICTLY from <hints> and return precise groundings.

  OUTPUT (JSON ONLY):
    {{
      "img_size": [WIDTH_PX, HEIGHT_PX],
      "element": [
        {{
          "instruction": string,
          "bbox": [x1, y1, x2, y2],
          "point": [cx, cy],
          "source_id": int,
          "type": string, "label": string, "description": string,
          "context": string, "state": string
        }}
      ]
    }}
    The last five fields are optional and depend on <detail_level>.

  STRICT RULES:
    1) Choose ONLY among <hints>. Do NOT invent boxes.
    2) The output bbox MUST EQUAL the chosen hint's bbox exactly.
    3) Use the chosen hint's point; if it lies on an edge, move it 1 px inward.
    4) Avoid duplicates (IoU > 0.5 or centers within 4 px: keep one).
    5) Integers only; 0 <= x1 < x2 <= WIDTH_PX, 0 <= y1 < y2 <= HEIGHT_PX; point strictly inside bbox.
    6) Sort outputs top to bottom, then left to right.
    7) Return valid JSON only, no markdown or prose.
</SYSTEM>

<USER>
  <img_size>[{w}, {h}]</img_size>
  <max_elements>{n}</max_elements>
  <hints>{hints_text}</hints>{crop_section}
  <detail_level>{level}</detail_level>
  <detail_guidance>
{guidance}
  </detail_guidance>
  <return>JSON only.</return>
</USER>"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use groundmark_core::geometry::{BBox, Point};

    fn hint(id: i64) -> Hint {
        Hint {
            id,
            bbox: BBox::new(10, 20, 110, 60),
            point: Point::new(60, 40),
            confidence: Some(0.9),
        }
    }

    #[test]
    fn embeds_size_limit_and_hints() {
        let p = build_prompt(ImageSize::new(800, 600), &[hint(1)], 5, DetailLevel::Normal, false);
        assert!(p.contains("<img_size>[800, 600]</img_size>"));
        assert!(p.contains("<max_elements>5</max_elements>"));
        for field in [r#""id":1"#, r#""bbox":[10,20,110,60]"#, r#""point":[60,40]"#] {
            assert!(p.contains(field), "missing {field}");
        }
        assert!(p.contains("<detail_level>normal</detail_level>"));
        assert!(!p.contains("confidence"));
        assert!(!p.contains("<crop_images>"));
    }

    #[test]
    fn crop_section_only_with_crops() {
        let p = build_prompt(ImageSize::new(10, 10), &[hint(1)], 3, DetailLevel::High, true);
        assert!(p.contains("<crop_images>"));
        assert_eq!(crop_marker(7), "<crop id=7 type=tight>");
    }

    #[test]
    fn low_detail_forbids_optional_fields() {
        let p = build_prompt(ImageSize::new(10, 10), &[], 1, DetailLevel::Low, false);
        assert!(p.contains("Do NOT include optional contextual fields"));
    }
}
