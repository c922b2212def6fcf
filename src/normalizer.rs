//! Per-type field mapping from raw search items to embedding-ready documents.

use chrono::{DateTime, Local};
use serde::ser::{SerializeStruct, Serializer};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::detector::{collection_tag, Batch, SourceType};
use crate::html::strip_tags;

/// Cleaned text and metadata derived from one raw item.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedDocument {
    /// `title + " " + body`, both stripped of markup. Never null, may be blank.
    pub full_text: String,
    /// Per-type metadata in insertion order.
    pub metadata: Map<String, Value>,
    /// Collection tag copied into the `collection` metadata field.
    pub collection: String,
    /// Processing timestamp copied into `collected_at`.
    pub collected_at: DateTime<Local>,
}

impl Serialize for NormalizedDocument {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("NormalizedDocument", 4)?;
        state.serialize_field("full_text", &self.full_text)?;
        state.serialize_field("metadata", &self.metadata)?;
        state.serialize_field("collection", &self.collection)?;
        state.serialize_field("collected_at", &self.collected_at.to_rfc3339())?;
        state.end()
    }
}

type Clock = Box<dyn Fn() -> DateTime<Local> + Send + Sync>;

/// Maps raw items of one source type to [`NormalizedDocument`]s.
///
/// The source type is fixed for the lifetime of the normalizer; items are never
/// re-classified.
pub struct Normalizer {
    source: SourceType,
    collection: String,
    clock: Clock,
}

impl Normalizer {
    /// Builds a normalizer that stamps documents with `collection`.
    pub fn new(source: SourceType, collection: impl Into<String>) -> Self {
        Self {
            source,
            collection: collection.into(),
            clock: Box::new(Local::now),
        }
    }

    /// Normalizer for a type without batch context; `Generic` is tagged `general`.
    pub fn for_source(source: SourceType) -> Self {
        let tag = match source {
            SourceType::Generic => collection_tag(None),
            other => other.label(),
        };
        Self::new(source, tag)
    }

    /// Normalizer matching a parsed batch's classification.
    pub fn for_batch(batch: &Batch) -> Self {
        Self::new(batch.source_type(), batch.collection_tag())
    }

    /// Replaces the timestamp source.
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> DateTime<Local> + Send + Sync + 'static,
    {
        self.clock = Box::new(clock);
        self
    }

    /// Source type applied to every item.
    pub fn source(&self) -> SourceType {
        self.source
    }

    /// Normalizes one item. Missing or mistyped fields fall back to defaults.
    pub fn normalize(&self, item: &Value) -> NormalizedDocument {
        let empty = Map::new();
        let fields = Fields(item.as_object().unwrap_or(&empty));
        let collected_at = (self.clock)();

        let title = fields.clean("title");
        let body = match self.source {
            SourceType::Blog | SourceType::News => fields.clean("description"),
            SourceType::Shopping => fields.clean_or("description", "category3"),
            SourceType::Generic => fields.clean_or("description", "content"),
        };
        let full_text = format!("{title} {body}");

        let mut metadata = Map::new();
        metadata.insert("title".into(), Value::String(title));
        metadata.insert("collection".into(), Value::String(self.collection.clone()));
        metadata.insert("collected_at".into(), Value::String(collected_at.to_rfc3339()));
        match self.source {
            SourceType::Blog => {
                metadata.insert("url".into(), fields.scalar("link"));
                metadata.insert("date".into(), fields.scalar("postdate"));
                metadata.insert("bloggerName".into(), fields.scalar("bloggername"));
                metadata.insert("bloggerLink".into(), fields.scalar("bloggerlink"));
            }
            SourceType::Shopping => {
                let price = parse_price(fields.0.get("lprice"));
                metadata.insert("url".into(), fields.scalar("link"));
                metadata.insert("price".into(), price.map(Value::from).unwrap_or(Value::Null));
                for key in ["maker", "brand", "mallName", "productId", "productType"] {
                    metadata.insert(key.into(), fields.scalar(key));
                }
            }
            SourceType::News => {
                metadata.insert("url".into(), fields.scalar_or("link", "originallink"));
                metadata.insert("date".into(), fields.scalar("pubDate"));
                metadata.insert("publisher".into(), fields.scalar("publisher"));
            }
            SourceType::Generic => {
                if fields.has("link") {
                    metadata.insert("url".into(), fields.scalar("link"));
                }
            }
        }

        NormalizedDocument {
            full_text,
            metadata,
            collection: self.collection.clone(),
            collected_at,
        }
    }

    /// Normalizes every item, one output per input, in input order.
    pub fn normalize_all(&self, items: &[Value]) -> Vec<NormalizedDocument> {
        items.iter().map(|item| self.normalize(item)).collect()
    }
}

/// Normalizes one item with the default tag for `source`.
pub fn normalize(item: &Value, source: SourceType) -> NormalizedDocument {
    Normalizer::for_source(source).normalize(item)
}

/// Reads a listing price as an integer; anything unparseable is `None`.
pub fn parse_price(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::String(text) => text.trim().parse().ok(),
        Value::Number(number) => number.as_i64().or_else(|| {
            number
                .as_f64()
                .filter(|f| f.is_finite() && *f >= i64::MIN as f64 && *f < i64::MAX as f64)
                .map(|f| f.trunc() as i64)
        }),
        _ => None,
    }
}

struct Fields<'a>(&'a Map<String, Value>);

impl Fields<'_> {
    fn has(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    fn text(&self, key: &str) -> String {
        match self.0.get(key) {
            Some(Value::String(text)) => text.clone(),
            Some(value @ (Value::Number(_) | Value::Bool(_))) => value.to_string(),
            _ => String::new(),
        }
    }

    fn clean(&self, key: &str) -> String {
        strip_tags(Some(&self.text(key)))
    }

    // Fallback applies only when `key` is absent, not when it is blank.
    fn clean_or(&self, key: &str, fallback: &str) -> String {
        if self.has(key) {
            self.clean(key)
        } else {
            self.clean(fallback)
        }
    }

    fn scalar(&self, key: &str) -> Value {
        match self.0.get(key) {
            Some(value @ (Value::String(_) | Value::Number(_) | Value::Bool(_) | Value::Null)) => {
                value.clone()
            }
            _ => Value::String(String::new()),
        }
    }

    fn scalar_or(&self, key: &str, fallback: &str) -> Value {
        if self.has(key) {
            self.scalar(key)
        } else {
            self.scalar(fallback)
        }
    }
}
