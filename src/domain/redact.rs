// Masking of credentials and identifying details in diagnostic dumps
use serde_json::Value;

pub const REDACTED: &str = "**REDACTED**";

pub const REDACT_KEYS: [&str; 8] = [
    "password",
    "serial_number",
    "ssid",
    "psk",
    "ip",
    "mqtt_topic",
    "mqtt_topic_sub",
    "mqtt_client_id",
];

/// Replace the value of every sensitive key, at any depth, with a marker.
/// Absent or null values are left alone so the dump still shows what was
/// never configured.
pub fn redact(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, field) in map.iter_mut() {
                if REDACT_KEYS.contains(&key.as_str()) {
                    if !field.is_null() {
                        *field = Value::String(REDACTED.to_string());
                    }
                } else {
                    redact(field);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(redact),
        _ => {}
    }
}
