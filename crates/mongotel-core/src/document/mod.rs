//! Normalized representation of a database command response.
//!
//! A [`Document`] is a tree: every field maps to a [`Value`] which is either
//! a nested document or a leaf. The set of leaf kinds is closed so that the
//! flattener matches on it exhaustively; a new kind cannot slip through as a
//! silent default.
//!
//! Documents are built by a [`DocumentSource`](crate::source::DocumentSource),
//! usually from MongoDB Extended JSON (see [`extjson`]).

pub mod extjson;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

pub use extjson::DecodeError;

/// A single field value inside a [`Document`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Nested sub-document.
    Document(Document),
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Double(f64),
    /// UTC date/time instant.
    DateTime(DateTime<Utc>),
    /// Replication (logical) timestamp: seconds since epoch + ordinal.
    Timestamp { time: u32, increment: u32 },
    String(String),
    ObjectId([u8; 12]),
    Array(Vec<Value>),
    Null,
    /// 128-bit decimal, kept in its textual form.
    Decimal128(String),
    Binary { subtype: u8, bytes: Vec<u8> },
    RegularExpression { pattern: String, options: String },
    JavaScriptCode(String),
    MinKey,
    MaxKey,
    Undefined,
    /// A type wrapper whose payload could not be decoded, e.g.
    /// `{"$numberLong": "abc"}`. Keeps the document usable; the field itself
    /// becomes an invalid metric.
    Malformed { wrapper: String, message: String },
}

impl Value {
    /// Stable name of the value kind, used in logs and error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Document(_) => "document",
            Value::Bool(_) => "bool",
            Value::Int32(_) => "int32",
            Value::Int64(_) => "int64",
            Value::Double(_) => "double",
            Value::DateTime(_) => "date",
            Value::Timestamp { .. } => "timestamp",
            Value::String(_) => "string",
            Value::ObjectId(_) => "objectId",
            Value::Array(_) => "array",
            Value::Null => "null",
            Value::Decimal128(_) => "decimal128",
            Value::Binary { .. } => "binData",
            Value::RegularExpression { .. } => "regex",
            Value::JavaScriptCode(_) => "javascript",
            Value::MinKey => "minKey",
            Value::MaxKey => "maxKey",
            Value::Undefined => "undefined",
            Value::Malformed { .. } => "malformed",
        }
    }

    /// Returns the value as `f64` if it is one of the numeric kinds.
    ///
    /// Booleans are not numeric here; callers that want `true -> 1.0`
    /// handle them explicitly.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int32(v) => Some(f64::from(*v)),
            Value::Int64(v) => Some(*v as f64),
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the nested document, if this value is one.
    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Value::Document(doc) => Some(doc),
            _ => None,
        }
    }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self {
        Value::Document(doc)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

/// Mapping from field name to [`Value`].
///
/// Field order carries no meaning; iteration is by field name so that two
/// walks over the same content always see the fields in the same order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    fields: BTreeMap<String, Value>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a field, replacing any previous value under the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Walks nested documents by field names.
    ///
    /// Returns `None` if any segment is missing or an intermediate value
    /// is not a document. An empty path yields `None`.
    pub fn get_path<S: AsRef<str>>(&self, path: &[S]) -> Option<&Value> {
        let (last, parents) = path.split_last()?;
        let mut doc = self;
        for segment in parents {
            doc = doc.get(segment.as_ref())?.as_document()?;
        }
        doc.get(last.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Parses a MongoDB Extended JSON text into a document.
    pub fn from_json_str(text: &str) -> Result<Self, DecodeError> {
        extjson::from_str(text)
    }

    /// Converts an already parsed Extended JSON value into a document.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, DecodeError> {
        extjson::from_value(value)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Document {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut doc = Document::new();
        for (k, v) in iter {
            doc.insert(k, v);
        }
        doc
    }
}
