//! Annotation document model, detail levels, and document-level validation.
//!
//! The persisted/wire shape is `{"img_size": [w, h], "element": [...]}`.
//! Incoming documents are parsed from untyped JSON so that every structural
//! and coordinate problem can be reported with its element index instead of
//! failing on the first serde error.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dedup::is_duplicate;
use crate::error::CoreError;
use crate::geometry::{BBox, Point};
use crate::validation::{check_element, integral, CoordinateIssue};

/// Maximum instruction length in Unicode scalar values.
pub const MAX_INSTRUCTION_LEN: usize = 120;

/// Largest accepted image side in pixels.
pub const MAX_IMAGE_SIDE: i64 = 1 << 16;

/// Optional descriptive fields an element may carry.
pub const OPTIONAL_FIELDS: [&str; 5] = ["type", "label", "description", "context", "state"];

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// Pixel dimensions of an image, serialized as `[width, height]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[i64; 2]", into = "[i64; 2]")]
pub struct ImageSize {
    pub width: i64,
    pub height: i64,
}

impl ImageSize {
    pub const fn new(width: i64, height: i64) -> Self {
        Self { width, height }
    }
}

impl From<[i64; 2]> for ImageSize {
    fn from([width, height]: [i64; 2]) -> Self {
        Self { width, height }
    }
}

impl From<ImageSize> for [i64; 2] {
    fn from(s: ImageSize) -> Self {
        [s.width, s.height]
    }
}

/// One grounded GUI element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub instruction: String,
    pub bbox: BBox,
    pub point: Point,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<i64>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub element_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl Element {
    /// An element with only the required fields set.
    pub fn new(instruction: impl Into<String>, bbox: BBox, point: Point) -> Self {
        Self {
            instruction: instruction.into(),
            bbox,
            point,
            source_id: None,
            element_type: None,
            label: None,
            description: None,
            context: None,
            state: None,
        }
    }

    fn optional_field_mut(&mut self, name: &str) -> Option<&mut Option<String>> {
        match name {
            "type" => Some(&mut self.element_type),
            "label" => Some(&mut self.label),
            "description" => Some(&mut self.description),
            "context" => Some(&mut self.context),
            "state" => Some(&mut self.state),
            _ => None,
        }
    }

    /// Set an optional descriptive field by its JSON name. Unknown names are ignored.
    pub fn set_optional(&mut self, name: &str, value: Option<String>) {
        if let Some(slot) = self.optional_field_mut(name) {
            *slot = value;
        }
    }

    /// Clear every optional field the detail level does not include.
    pub fn restrict_to(&mut self, level: DetailLevel) {
        for name in OPTIONAL_FIELDS {
            if !level.includes(name) {
                self.set_optional(name, None);
            }
        }
    }
}

/// The annotation document for one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub img_size: ImageSize,
    #[serde(rename = "element", default)]
    pub elements: Vec<Element>,
}

impl Annotation {
    pub fn empty(img_size: ImageSize) -> Self {
        Self {
            img_size,
            elements: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Detail levels
// ---------------------------------------------------------------------------

/// How much descriptive context generated elements carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailLevel {
    Low,
    Normal,
    #[default]
    High,
}

impl DetailLevel {
    /// Fields generated elements carry at this level.
    pub fn fields(self) -> &'static [&'static str] {
        match self {
            Self::Low => &["instruction"],
            Self::Normal => &["instruction", "type", "label"],
            Self::High => &["instruction", "type", "label", "description", "context", "state"],
        }
    }

    pub fn includes(self, field: &str) -> bool {
        self.fields().contains(&field)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
        }
    }

    /// Parse a user-supplied level, falling back to `default` when absent or unknown.
    pub fn parse_or(raw: Option<&str>, default: DetailLevel) -> DetailLevel {
        raw.and_then(|s| s.parse().ok()).unwrap_or(default)
    }
}

impl FromStr for DetailLevel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "normal" => Ok(Self::Normal),
            "high" => Ok(Self::High),
            other => Err(CoreError::Validation(format!(
                "Unknown detail level '{other}' (expected low, normal or high)"
            ))),
        }
    }
}

impl fmt::Display for DetailLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Issues
// ---------------------------------------------------------------------------

/// One problem found in an annotation document.
///
/// `index` is the offending element, or `None` for document-level problems.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationIssue {
    pub index: Option<usize>,
    pub reason: String,
}

impl AnnotationIssue {
    fn document(reason: impl Into<String>) -> Self {
        Self {
            index: None,
            reason: reason.into(),
        }
    }

    fn element(index: usize, reason: impl Into<String>) -> Self {
        Self {
            index: Some(index),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for AnnotationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(i) => write!(f, "element {i}: {}", self.reason),
            None => f.write_str(&self.reason),
        }
    }
}

/// Collapse a list of issues into a single validation error.
pub fn issues_to_error(issues: &[AnnotationIssue]) -> CoreError {
    let joined = issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ");
    CoreError::Validation(joined)
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

fn positive_int(v: &Value) -> Option<i64> {
    v.as_f64().and_then(integral).filter(|n| *n > 0)
}

fn int_array<const N: usize>(v: Option<&Value>) -> Result<[i64; N], &'static str> {
    let arr = match v.and_then(Value::as_array) {
        Some(a) if a.len() == N => a,
        _ => return Err("shape"),
    };
    let mut out = [0i64; N];
    for (slot, item) in out.iter_mut().zip(arr) {
        let n = item.as_f64().ok_or("shape")?;
        *slot = integral(n).ok_or("fraction")?;
    }
    Ok(out)
}

/// Parse an untyped JSON document into an [`Annotation`].
///
/// Checks structure (`img_size` is two positive integers, `element` is a list
/// of objects with `instruction`, a 4-number `bbox` and a 2-number `point`)
/// and coordinate integrality. Geometric rules are left to
/// [`validate_annotation`].
pub fn parse_annotation(doc: &Value) -> Result<Annotation, Vec<AnnotationIssue>> {
    let mut issues = Vec::new();

    let Some(obj) = doc.as_object() else {
        return Err(vec![AnnotationIssue::document("annotation must be a JSON object")]);
    };

    let img_size = match obj.get("img_size").and_then(Value::as_array) {
        Some(a) if a.len() == 2 => match (positive_int(&a[0]), positive_int(&a[1])) {
            (Some(w), Some(h)) => Some(ImageSize::new(w, h)),
            _ => None,
        },
        _ => None,
    };
    let img_size = match img_size {
        None => {
            issues.push(AnnotationIssue::document(
                "img_size must be a list of two positive integers",
            ));
            None
        }
        Some(size) if size.width > MAX_IMAGE_SIDE || size.height > MAX_IMAGE_SIDE => {
            issues.push(AnnotationIssue::document(format!(
                "img_size exceeds {MAX_IMAGE_SIDE} pixels per side"
            )));
            None
        }
        size => size,
    };

    let raw_elements: &[Value] = match obj.get("element") {
        Some(Value::Array(items)) => items.as_slice(),
        Some(_) => {
            issues.push(AnnotationIssue::document("element must be a list"));
            &[]
        }
        None => {
            issues.push(AnnotationIssue::document("missing element list"));
            &[]
        }
    };

    let mut elements = Vec::with_capacity(raw_elements.len());
    for (i, raw) in raw_elements.iter().enumerate() {
        match parse_element(raw) {
            Ok(el) => elements.push(el),
            Err(reason) => issues.push(AnnotationIssue::element(i, reason)),
        }
    }

    match img_size {
        Some(img_size) if issues.is_empty() => Ok(Annotation { img_size, elements }),
        _ => Err(issues),
    }
}

fn parse_element(raw: &Value) -> Result<Element, String> {
    let obj = raw.as_object().ok_or("element must be an object")?;

    let instruction = match obj.get("instruction") {
        Some(Value::String(s)) => s.clone(),
        Some(_) => return Err("instruction must be a string".into()),
        None => return Err("missing instruction".into()),
    };

    let bbox = match int_array::<4>(obj.get("bbox")) {
        Ok(b) => BBox::from(b),
        Err("fraction") => return Err(CoordinateIssue::NonIntegerCoordinate.to_string()),
        Err(_) => return Err("bbox must be a list of 4 numbers".into()),
    };
    let point = match int_array::<2>(obj.get("point")) {
        Ok(p) => Point::from(p),
        Err("fraction") => return Err(CoordinateIssue::NonIntegerCoordinate.to_string()),
        Err(_) => return Err("point must be a list of 2 numbers".into()),
    };

    let source_id = match obj.get("source_id") {
        None | Some(Value::Null) => None,
        Some(v) => Some(
            v.as_f64()
                .and_then(integral)
                .ok_or("source_id must be an integer")?,
        ),
    };

    let mut element = Element::new(instruction, bbox, point);
    element.source_id = source_id;
    for name in OPTIONAL_FIELDS {
        match obj.get(name) {
            None | Some(Value::Null) => {}
            Some(Value::String(s)) => element.set_optional(name, Some(s.clone())),
            Some(_) => return Err(format!("{name} must be a string")),
        }
    }
    Ok(element)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Check every element against the image bounds, the instruction length
/// limit, and pairwise duplication (`IoU > dup_threshold`).
///
/// Duplicates are reported on the later element of each pair. Only elements
/// that passed the coordinate check take part in the duplicate pass.
pub fn validate_annotation(
    annotation: &Annotation,
    dup_threshold: f64,
) -> Result<(), Vec<AnnotationIssue>> {
    let ImageSize { width, height } = annotation.img_size;
    let mut issues = Vec::new();

    if width <= 0 || height <= 0 {
        issues.push(AnnotationIssue::document(
            "img_size must be a list of two positive integers",
        ));
    }

    let mut placed: Vec<(usize, &BBox)> = Vec::with_capacity(annotation.elements.len());
    for (i, el) in annotation.elements.iter().enumerate() {
        match check_element(width, height, &el.bbox, &el.point) {
            Ok(()) => placed.push((i, &el.bbox)),
            Err(reason) => issues.push(AnnotationIssue::element(i, reason.to_string())),
        }
        if el.instruction.chars().count() > MAX_INSTRUCTION_LEN {
            issues.push(AnnotationIssue::element(
                i,
                format!("instruction exceeds {MAX_INSTRUCTION_LEN} characters"),
            ));
        }
    }

    for (pos, &(j, later)) in placed.iter().enumerate() {
        if let Some(&(i, _)) = placed[..pos]
            .iter()
            .find(|(_, earlier)| is_duplicate(earlier, later, dup_threshold))
        {
            issues.push(AnnotationIssue::element(j, format!("duplicate of element {i}")));
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues)
    }
}

/// Parse and validate in one step, returning a single validation error.
pub fn check_annotation(doc: &Value, dup_threshold: f64) -> Result<Annotation, CoreError> {
    let annotation = parse_annotation(doc).map_err(|issues| issues_to_error(&issues))?;
    validate_annotation(&annotation, dup_threshold).map_err(|issues| issues_to_error(&issues))?;
    Ok(annotation)
}

/// Remove the element at `index`, returning it.
pub fn remove_element(annotation: &mut Annotation, index: usize) -> Result<Element, CoreError> {
    let len = annotation.elements.len();
    if index >= len {
        return Err(CoreError::Validation(format!(
            "Element index {index} out of range (annotation has {len} elements)"
        )));
    }
    Ok(annotation.elements.remove(index))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
