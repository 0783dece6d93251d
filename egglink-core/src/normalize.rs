use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::{DeviceId, Fields, Metric, Sample, ValidationError};

/// What to do with a metric field that cannot be read as a number.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoercionPolicy {
    /// Store `0.0` in place of the bad value.
    #[default]
    Zero,
    /// Leave the value as sent. Consumers must then cope with non-numeric
    /// metrics.
    Keep,
}

/// Parse a request body and normalize it.
pub fn normalize_bytes(body: &[u8], policy: CoercionPolicy) -> Result<Sample, ValidationError> {
    let raw: Value = serde_json::from_slice(body)?;
    normalize(&raw, policy)
}

/// Turn a raw device payload into a [`Sample`].
///
/// Only a non-object payload is rejected. Missing metrics are fine, and a
/// metric that fails to parse is handled by `policy` instead of dropping the
/// whole reading.
pub fn normalize(raw: &Value, policy: CoercionPolicy) -> Result<Sample, ValidationError> {
    let Value::Object(map) = raw else {
        return Err(ValidationError::MalformedPayload(format!(
            "expected a JSON object, got {}",
            kind_of(raw)
        )));
    };

    let device_id = resolve_device_id(map.get("e"));
    let mut fields = Fields::from(map.clone());

    for metric in Metric::ALL {
        let key = metric.key();
        let Some(value) = fields.get(key) else {
            continue;
        };

        match coerce(value) {
            Some(number) => {
                fields.insert(key, Value::from(number));
            }
            None => {
                debug!(
                    device_id = %device_id,
                    field = key,
                    value = %value,
                    ?policy,
                    "field coercion failed"
                );
                if policy == CoercionPolicy::Zero {
                    fields.insert(key, Value::from(0.0));
                }
            }
        }
    }

    Ok(Sample { device_id, fields })
}

// Anything that is not a usable identifier lands in the shared "unknown"
// history.
fn resolve_device_id(raw: Option<&Value>) -> DeviceId {
    match raw {
        Some(Value::String(s)) if !s.trim().is_empty() => DeviceId::new(s.as_str()),
        Some(Value::Number(n)) => DeviceId::new(n.to_string()),
        _ => DeviceId::unknown(),
    }
}

fn coerce(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::Null | Value::Array(_) | Value::Object(_) => return None,
    };

    number.is_finite().then_some(number)
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
