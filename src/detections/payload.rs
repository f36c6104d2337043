//! Detections payload
//!
//! Cameras report either a list of detected items or a single flat
//! violation. Anything else is kept verbatim and summarised generically.

use serde_json::Value;

/// Summary used when no label can be extracted
pub const GENERIC_VIOLATION: &str = "Safety violation detected";

/// Summary used when the payload is not a JSON object
pub const UNKNOWN_VIOLATION: &str = "Unknown violation";

/// One detected item
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionItem {
    /// `class` or `violation`
    pub label: Option<String>,
    /// Model confidence
    pub confidence: Option<f64>,
    /// Bounding box
    pub bbox: Option<Vec<f64>>,
}

/// Parsed detections payload
#[derive(Debug, Clone, PartialEq)]
pub enum Detections {
    /// `{"items": [{class|violation, confidence, bbox}, ...]}`
    Items(Vec<DetectionItem>),
    /// `{violation|class, confidence, bbox}`
    Single(DetectionItem),
    /// Any other object
    Unrecognized,
    /// Not an object at all
    Invalid,
}

impl Detections {
    /// Classify a raw payload; never fails
    pub fn parse(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            return Detections::Invalid;
        };

        if let Some(items) = object.get("items").and_then(Value::as_array) {
            let items: Vec<DetectionItem> = items.iter().filter_map(parse_item).collect();
            if items.iter().any(|i| i.label.is_some()) {
                return Detections::Items(items);
            }
        }

        match parse_item(value) {
            Some(item) if item.label.is_some() => Detections::Single(item),
            _ => Detections::Unrecognized,
        }
    }

    /// Readable violation description, e.g. `No Helmet, No Vest`
    pub fn violation_summary(&self) -> String {
        match self {
            Detections::Items(items) => items
                .iter()
                .filter_map(|i| i.label.as_deref())
                .map(humanize)
                .collect::<Vec<_>>()
                .join(", "),
            Detections::Single(item) => item.label.as_deref().map(humanize).unwrap_or_else(|| GENERIC_VIOLATION.into()),
            Detections::Unrecognized => GENERIC_VIOLATION.into(),
            Detections::Invalid => UNKNOWN_VIOLATION.into(),
        }
    }

    /// Raw labels in reporting order
    pub fn labels(&self) -> Vec<String> {
        match self {
            Detections::Items(items) => items.iter().filter_map(|i| i.label.clone()).collect(),
            Detections::Single(item) => item.label.clone().into_iter().collect(),
            Detections::Unrecognized | Detections::Invalid => Vec::new(),
        }
    }
}

fn parse_item(value: &Value) -> Option<DetectionItem> {
    let object = value.as_object()?;
    let label = ["class", "violation"]
        .iter()
        .filter_map(|key| object.get(*key))
        .find_map(label_of);
    let confidence = object.get("confidence").and_then(Value::as_f64);
    let bbox = object
        .get("bbox")
        .and_then(Value::as_array)
        .map(|coords| coords.iter().filter_map(Value::as_f64).collect());

    Some(DetectionItem { label, confidence, bbox })
}

fn label_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(true) => Some("true".into()),
        _ => None,
    }
}

/// `no_helmet` -> `No Helmet`
fn humanize(label: &str) -> String {
    label
        .replace('_', " ")
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
