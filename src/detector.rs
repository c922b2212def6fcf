//! Input-shape parsing and source-type detection for search API exports.

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::error::IngestError;

const BLOG_AUTHOR_FIELD: &str = "bloggername";
const SHOPPING_FIELDS: [&str; 3] = ["productType", "maker", "mallName"];
const NEWS_DATE_FIELD: &str = "pubDate";
const NEWS_ID_FIELDS: [&str; 2] = ["articleId", "originallink"];

/// Classification of a batch's item layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceType {
    /// Blog search results (`bloggername`, `postdate`, ...).
    Blog,
    /// Shopping search results (`lprice`, `maker`, `mallName`, ...).
    Shopping,
    /// News search results (`pubDate`, `originallink`, ...).
    News,
    /// Anything else, including inconclusive detection.
    Generic,
}

impl SourceType {
    /// Stable lowercase label used in metadata and collection names.
    pub fn label(self) -> &'static str {
        match self {
            Self::Blog => "blog",
            Self::Shopping => "shopping",
            Self::News => "news",
            Self::Generic => "unknown",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Returned when a source type name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown source type {0:?} (expected blog, shopping, news, or generic)")]
pub struct UnknownSourceType(pub String);

impl FromStr for SourceType {
    type Err = UnknownSourceType;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "blog" | "블로그" => Ok(Self::Blog),
            "shopping" | "쇼핑" => Ok(Self::Shopping),
            "news" | "뉴스" => Ok(Self::News),
            "generic" | "general" | "unknown" => Ok(Self::Generic),
            _ => Err(UnknownSourceType(trimmed.to_string())),
        }
    }
}

/// Parses a caller-facing type selection where `auto` means "detect".
pub fn parse_selection(value: &str) -> Result<Option<SourceType>, UnknownSourceType> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("auto") || trimmed == "자동 감지" {
        return Ok(None);
    }
    trimmed.parse().map(Some)
}

/// Top-level layout of an input document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputShape {
    /// `{ "items": [ ... ] }` as returned by the search API.
    Wrapped,
    /// A bare JSON array of items.
    Bare,
}

/// Items extracted from an input document plus the batch classification.
#[derive(Debug, Clone)]
pub struct Batch {
    /// Layout the items were found in.
    pub shape: InputShape,
    /// Raw items in input order.
    pub items: Vec<Value>,
    /// Caller-supplied or detected type; `None` when neither was available.
    pub source: Option<SourceType>,
}

impl Batch {
    /// Parses raw JSON text and classifies it.
    pub fn parse(input: &str, explicit: Option<SourceType>) -> Result<Self, IngestError> {
        let value: Value = serde_json::from_str(input)?;
        Self::from_value(value, explicit)
    }

    /// Splits an already-parsed document into items and resolves its type once.
    ///
    /// An explicit type always wins and detection is skipped. Bare arrays are never
    /// sniffed.
    pub fn from_value(value: Value, explicit: Option<SourceType>) -> Result<Self, IngestError> {
        match value {
            Value::Object(mut map) => match map.remove("items") {
                Some(Value::Array(items)) => {
                    let source = explicit.or_else(|| Some(detect_items(&items)));
                    Ok(Self {
                        shape: InputShape::Wrapped,
                        items,
                        source,
                    })
                }
                Some(other) => Err(IngestError::UnsupportedShape {
                    found: describe(&other),
                }),
                None => Err(IngestError::UnsupportedShape {
                    found: "an object without `items`",
                }),
            },
            Value::Array(items) => Ok(Self {
                shape: InputShape::Bare,
                items,
                source: explicit,
            }),
            other => Err(IngestError::UnsupportedShape {
                found: describe(&other),
            }),
        }
    }

    /// Type used to pick the per-item field mapping.
    pub fn source_type(&self) -> SourceType {
        self.source.unwrap_or(SourceType::Generic)
    }

    /// Value stored in each document's `collection` metadata field.
    pub fn collection_tag(&self) -> &'static str {
        collection_tag(self.source)
    }
}

/// Tag for a batch classification; unclassified batches are `general`.
pub fn collection_tag(source: Option<SourceType>) -> &'static str {
    source.map(SourceType::label).unwrap_or("general")
}

/// Classifies a parsed document by inspecting the first element of `items`.
///
/// Non-objects, objects without `items`, and empty item lists are `Generic`.
pub fn detect(parsed: &Value) -> SourceType {
    match parsed.get("items").and_then(Value::as_array) {
        Some(items) => detect_items(items),
        None => SourceType::Generic,
    }
}

fn detect_items(items: &[Value]) -> SourceType {
    match items.first().and_then(Value::as_object) {
        Some(sample) => detect_item(sample),
        None => SourceType::Generic,
    }
}

// Checks run blog, shopping, news; the first match wins.
fn detect_item(sample: &Map<String, Value>) -> SourceType {
    if sample.contains_key(BLOG_AUTHOR_FIELD) {
        SourceType::Blog
    } else if SHOPPING_FIELDS.iter().any(|key| sample.contains_key(*key)) {
        SourceType::Shopping
    } else if sample.contains_key(NEWS_DATE_FIELD)
        && NEWS_ID_FIELDS.iter().any(|key| sample.contains_key(*key))
    {
        SourceType::News
    } else {
        SourceType::Generic
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
