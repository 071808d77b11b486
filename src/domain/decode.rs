// Lenient JSON decoding for device payloads
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// A record that can always be built from a device payload.
///
/// Record fields are tagged with [`lenient`] or [`lenient_list`], so a
/// missing, `null` or mistyped field only resets that field to its default
/// and every sibling keeps its value. A payload that is not an object at all
/// decodes to the all-defaults record and is logged, so a firmware change on
/// the device never takes the poller down.
pub trait Decode: DeserializeOwned + Default {
    fn decode(raw: Value) -> Self {
        decode_value(raw)
    }
}

fn decode_value<T: DeserializeOwned + Default>(raw: Value) -> T {
    if raw.is_null() {
        return T::default();
    }
    match T::deserialize(raw) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(
                record = std::any::type_name::<T>(),
                error = %e,
                "payload did not match the expected shape, using defaults"
            );
            T::default()
        }
    }
}

/// Decode a JSON array element by element. Anything other than an array
/// yields an empty list.
pub fn decode_list<T: DeserializeOwned + Default>(raw: Value) -> Vec<T> {
    match raw {
        Value::Array(items) => items.into_iter().map(decode_value).collect(),
        Value::Null => Vec::new(),
        other => {
            tracing::warn!(
                record = std::any::type_name::<T>(),
                kind = json_kind(&other),
                "expected a JSON array"
            );
            Vec::new()
        }
    }
}

/// Field decoder: `null` or a value of the wrong type becomes the default.
pub(crate) fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    Value::deserialize(deserializer).map(decode_value)
}

/// Field decoder for lists of records: each element is decoded on its own,
/// so one bad entry does not empty the list.
pub(crate) fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    Value::deserialize(deserializer).map(decode_list)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
