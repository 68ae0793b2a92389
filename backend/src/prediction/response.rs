use serde_json::{Map, Value};
use shared::PredictionResult;

pub const UNPARSEABLE_RESPONSE: &str = "unparseable response";

/// Turns a classifier response body into a `PredictionResult`.
///
/// Keys are matched case-insensitively. Never fails: malformed or
/// unexpected bodies come back as degraded results.
pub fn parse_prediction_body(body: &[u8]) -> PredictionResult {
    let value: Value = match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(e) => return PredictionResult::degraded(format!("malformed classifier response: {}", e)),
    };

    if !value.is_object() {
        return PredictionResult::degraded(UNPARSEABLE_RESPONSE);
    }

    match serde_json::from_value::<PredictionResult>(lowercase_keys(value)) {
        Ok(mut result) => {
            for item in &mut result.items {
                item.probability = item.probability.clamp(0.0, 1.0);
            }
            result
        }
        Err(e) => {
            log::debug!("Classifier response did not match expected shape: {}", e);
            PredictionResult::degraded(UNPARSEABLE_RESPONSE)
        }
    }
}

/// Extracts the `error` string from a body, if it carries one.
pub fn error_message(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    match lowercase_keys(value) {
        Value::Object(map) => map.get("error").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

fn lowercase_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (key.to_lowercase(), lowercase_keys(value)))
                .collect::<Map<String, Value>>(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(lowercase_keys).collect()),
        other => other,
    }
}
