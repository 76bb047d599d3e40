use chrono::SecondsFormat;
use serde_json::{Map, Number, Value as JsonValue};

use crate::document::serialize_value;
use crate::value::Value;

/// Renders non-document values as JSON.
///
/// Datetimes use RFC 3339 with a `Z` suffix, object ids their hex form, enum members their label
/// or value. Non-finite floats become `null`. Map keys that are not strings are rendered as JSON
/// text.
pub fn serialize_fallback(value: &Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Bool(value) => JsonValue::Bool(*value),
        Value::Int(value) => JsonValue::from(*value),
        Value::Float(value) => Number::from_f64(*value).map_or(JsonValue::Null, JsonValue::Number),
        Value::String(value) => JsonValue::String(value.clone()),
        Value::DateTime(value) => JsonValue::String(value.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        Value::ObjectId(value) => JsonValue::String(value.to_hex()),
        Value::Enum(value) => JsonValue::String(value.as_str().to_owned()),
        Value::List(items) | Value::Set(items) => JsonValue::Array(items.iter().map(serialize_value).collect()),
        Value::Map(map) => {
            let mut object = Map::new();
            for (key, item) in map.iter() {
                let key = match key {
                    Value::String(key) => key.clone(),
                    other => serialize_value(other).to_string(),
                };
                object.insert(key, serialize_value(item));
            }
            JsonValue::Object(object)
        }
        Value::Document(document) => JsonValue::Object(document.to_dict()),
    }
}
