//! Conversions between [`Value`] and `serde_json::Value` (requires `json` feature).
//!
//! JSON is lossy for several value kinds: `undefined` becomes `null`, byte
//! blobs become arrays of numbers, tags are dropped, non-text map keys are
//! rendered as their JSON text, and non-finite floats become `null`.

use serde_json::{Map, Number};

use crate::value::Value;

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::from(i)
                } else if let Some(u) = n.as_u64() {
                    Value::from(u)
                } else {
                    Value::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Value::Text(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(object) => Value::Map(
                object
                    .into_iter()
                    .map(|(k, v)| (Value::Text(k), Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl Value {
    /// Render as JSON for display and logging.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Undefined | Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Integer(n) => {
                if let Ok(i) = i64::try_from(*n) {
                    serde_json::Value::from(i)
                } else if let Ok(u) = u64::try_from(*n) {
                    serde_json::Value::from(u)
                } else {
                    float_to_json(*n as f64)
                }
            }
            Value::Float(f) => float_to_json(*f),
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::Bytes(b) => {
                serde_json::Value::Array(b.iter().map(|byte| serde_json::Value::from(*byte)).collect())
            }
            Value::Array(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect()),
            Value::Map(entries) => {
                let mut object = Map::with_capacity(entries.len());
                for (key, value) in entries {
                    let key = match key {
                        Value::Text(s) => s.clone(),
                        other => other.to_json().to_string(),
                    };
                    object.insert(key, value.to_json());
                }
                serde_json::Value::Object(object)
            }
            Value::Tag(_, inner) => inner.to_json(),
        }
    }
}

fn float_to_json(f: f64) -> serde_json::Value {
    Number::from_f64(f).map_or(serde_json::Value::Null, serde_json::Value::Number)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn json_object_becomes_text_keyed_map() {
        let value = Value::from(json!({ "cmd": { "info": {} }, "bin": null }));
        assert_eq!(value.get("bin"), Some(&Value::Null));
        assert_eq!(
            value.get("cmd").and_then(|c| c.get("info")),
            Some(&Value::empty_map())
        );
    }

    #[test]
    fn lossy_kinds_render_predictably() {
        let value = Value::map([
            (Value::from("blob"), Value::from(&[1u8, 2][..])),
            (Value::from(7), Value::Undefined),
            (Value::from("nan"), Value::Float(f64::NAN)),
        ]);
        assert_eq!(
            value.to_json(),
            json!({ "blob": [1, 2], "7": null, "nan": null })
        );
    }

    #[test]
    fn large_integers_keep_their_sign() {
        assert_eq!(Value::Integer(i128::from(u64::MAX)).to_json(), json!(u64::MAX));
        assert_eq!(Value::from(-5).to_json(), json!(-5));
    }
}
