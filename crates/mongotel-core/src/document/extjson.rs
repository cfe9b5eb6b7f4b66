//! MongoDB Extended JSON decoding.
//!
//! Accepts both canonical and relaxed mode. Type wrappers are objects whose
//! keys start with `$` (`{"$numberLong": "12"}`); any other object is a
//! nested document.
//!
//! Plain JSON numbers (relaxed mode) are mapped to `Int32` when they fit,
//! `Int64` for larger integers, and `Double` otherwise.
//!
//! A wrapper with a bad payload (`{"$numberLong": "abc"}`) does not fail the
//! document: it decodes to [`Value::Malformed`] and only that field is lost.

use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Map, Value as Json};
use tracing::debug;

use super::{Document, Value};

/// Error decoding Extended JSON into a [`Document`].
#[derive(Debug)]
pub enum DecodeError {
    /// Input text is not valid JSON.
    Syntax(String),
    /// Top-level value is not an object.
    NotAnObject,
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::Syntax(msg) => write!(f, "invalid JSON: {}", msg),
            DecodeError::NotAnObject => write!(f, "document root must be a JSON object"),
        }
    }
}

impl std::error::Error for DecodeError {}

/// Parses Extended JSON text.
pub fn from_str(text: &str) -> Result<Document, DecodeError> {
    let json: Json = serde_json::from_str(text).map_err(|e| DecodeError::Syntax(e.to_string()))?;
    from_value(&json)
}

/// Converts a parsed JSON value. The root must be an object.
pub fn from_value(json: &Json) -> Result<Document, DecodeError> {
    match json {
        Json::Object(map) => Ok(decode_document(map, "")),
        _ => Err(DecodeError::NotAnObject),
    }
}

fn decode_document(map: &Map<String, Json>, path: &str) -> Document {
    let mut doc = Document::new();
    for (name, json) in map {
        let child_path = if path.is_empty() {
            name.clone()
        } else {
            format!("{}.{}", path, name)
        };
        doc.insert(name.clone(), decode_value(json, &child_path));
    }
    doc
}

fn decode_value(json: &Json, path: &str) -> Value {
    match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => decode_number(n),
        Json::String(s) => Value::String(s.clone()),
        Json::Array(items) => Value::Array(
            items
                .iter()
                .enumerate()
                .map(|(i, item)| decode_value(item, &format!("{}.{}", path, i)))
                .collect(),
        ),
        Json::Object(map) => match decode_wrapper(map, path) {
            Some(value) => value,
            None => Value::Document(decode_document(map, path)),
        },
    }
}

fn decode_number(n: &serde_json::Number) -> Value {
    if let Some(i) = n.as_i64() {
        match i32::try_from(i) {
            Ok(small) => Value::Int32(small),
            Err(_) => Value::Int64(i),
        }
    } else {
        // u64 beyond i64::MAX or a real fraction; both land as double.
        Value::Double(n.as_f64().unwrap_or(f64::NAN))
    }
}

/// Recognizes a type wrapper object. Returns `None` for plain documents.
fn decode_wrapper(map: &Map<String, Json>, path: &str) -> Option<Value> {
    let wrapper = map.keys().next()?;
    if !wrapper.starts_with('$') {
        return None;
    }
    match wrapper_value(map) {
        Ok(value) => value,
        Err(message) => {
            debug!(field = %path, wrapper = %wrapper, error = %message, "malformed extended JSON value");
            Some(Value::Malformed {
                wrapper: wrapper.clone(),
                message,
            })
        }
    }
}

fn wrapper_value(map: &Map<String, Json>) -> Result<Option<Value>, String> {
    let invalid = |message: &str| message.to_string();

    // Legacy binary form: {"$binary": "<base64>", "$type": "00"}
    if map.len() == 2
        && let (Some(Json::String(data)), Some(Json::String(subtype))) =
            (map.get("$binary"), map.get("$type"))
    {
        return decode_binary(data, subtype).map(Some);
    }

    if map.len() == 2 && map.contains_key("$regex") {
        let pattern = string_field(map, "$regex").ok_or_else(|| invalid("$regex must be a string"))?;
        let options = string_field(map, "$options").unwrap_or_default();
        return Ok(Some(Value::RegularExpression { pattern, options }));
    }

    // $code may carry $scope; the scope is not representable and is dropped.
    if let Some(code) = map.get("$code") {
        let Json::String(code) = code else {
            return Err(invalid("$code must be a string"));
        };
        return Ok(Some(Value::JavaScriptCode(code.clone())));
    }

    if map.len() != 1 {
        return Ok(None);
    }

    let Some((key, payload)) = map.iter().next() else {
        return Ok(None);
    };

    let value = match key.as_str() {
        "$numberInt" => {
            let text = payload.as_str().ok_or_else(|| invalid("$numberInt must be a string"))?;
            Value::Int32(text.parse().map_err(|_| invalid("$numberInt is not a 32-bit integer"))?)
        }
        "$numberLong" => Value::Int64(parse_long(payload).ok_or_else(|| invalid("$numberLong is not a 64-bit integer"))?),
        "$numberDouble" => {
            let text = payload.as_str().ok_or_else(|| invalid("$numberDouble must be a string"))?;
            Value::Double(parse_double(text).ok_or_else(|| invalid("$numberDouble is not a number"))?)
        }
        "$numberDecimal" => {
            let text = payload.as_str().ok_or_else(|| invalid("$numberDecimal must be a string"))?;
            Value::Decimal128(text.to_string())
        }
        "$date" => Value::DateTime(parse_date(payload).ok_or_else(|| invalid("$date is not a valid instant"))?),
        "$timestamp" => {
            let t = payload.get("t").and_then(Json::as_u64).and_then(|v| u32::try_from(v).ok());
            let i = payload.get("i").and_then(Json::as_u64).and_then(|v| u32::try_from(v).ok());
            match (t, i) {
                (Some(time), Some(increment)) => Value::Timestamp { time, increment },
                _ => return Err(invalid("$timestamp requires 32-bit unsigned 't' and 'i'")),
            }
        }
        "$oid" => {
            let text = payload.as_str().ok_or_else(|| invalid("$oid must be a string"))?;
            Value::ObjectId(parse_object_id(text).ok_or_else(|| invalid("$oid must be 24 hex digits"))?)
        }
        "$binary" => {
            let Json::Object(inner) = payload else {
                return Err(invalid("$binary must be an object"));
            };
            let data = string_field(inner, "base64").ok_or_else(|| invalid("$binary.base64 missing"))?;
            let subtype = string_field(inner, "subType").ok_or_else(|| invalid("$binary.subType missing"))?;
            decode_binary(&data, &subtype)?
        }
        "$regularExpression" => {
            let Json::Object(inner) = payload else {
                return Err(invalid("$regularExpression must be an object"));
            };
            Value::RegularExpression {
                pattern: string_field(inner, "pattern").ok_or_else(|| invalid("$regularExpression.pattern missing"))?,
                options: string_field(inner, "options").unwrap_or_default(),
            }
        }
        "$minKey" => Value::MinKey,
        "$maxKey" => Value::MaxKey,
        "$undefined" => Value::Undefined,
        _ => return Ok(None),
    };

    Ok(Some(value))
}

fn string_field(map: &Map<String, Json>, key: &str) -> Option<String> {
    map.get(key).and_then(Json::as_str).map(str::to_string)
}

fn parse_long(payload: &Json) -> Option<i64> {
    match payload {
        Json::String(s) => s.parse().ok(),
        Json::Number(n) => n.as_i64(),
        _ => None,
    }
}

fn parse_double(text: &str) -> Option<f64> {
    match text {
        "Infinity" => Some(f64::INFINITY),
        "-Infinity" => Some(f64::NEG_INFINITY),
        "NaN" => Some(f64::NAN),
        other => other.parse().ok(),
    }
}

/// `$date` accepts an ISO-8601 string (relaxed), integer millis, or
/// `{"$numberLong": "<millis>"}` (canonical).
fn parse_date(payload: &Json) -> Option<DateTime<Utc>> {
    match payload {
        Json::String(s) => DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.with_timezone(&Utc)),
        Json::Number(n) => Utc.timestamp_millis_opt(n.as_i64()?).single(),
        Json::Object(inner) => {
            let millis = parse_long(inner.get("$numberLong")?)?;
            Utc.timestamp_millis_opt(millis).single()
        }
        _ => None,
    }
}

fn parse_object_id(text: &str) -> Option<[u8; 12]> {
    if text.len() != 24 || !text.is_ascii() {
        return None;
    }
    let mut out = [0u8; 12];
    for (i, byte) in out.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&text[i * 2..i * 2 + 2], 16).ok()?;
    }
    Some(out)
}

fn decode_binary(data: &str, subtype: &str) -> Result<Value, String> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(data)
        .map_err(|e| format!("invalid base64: {}", e))?;
    let subtype = u8::from_str_radix(subtype, 16).map_err(|_| format!("invalid binary subtype '{}'", subtype))?;
    Ok(Value::Binary { subtype, bytes })
}
