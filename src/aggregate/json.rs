//! Strict JSON projection of the catalog document.
//!
//! Infinite floats become the string tokens `"inf"` and `"-inf"`. NaN has no
//! sentinel in the catalog and fails the projection. Strings that look like
//! timestamps are rendered in ISO 8601 form with a `T` separator.

use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Number, Value as JsonValue};
use serde_yaml::Value;

use crate::error::{Error, Result};

pub const POS_INF_TOKEN: &str = "inf";
pub const NEG_INF_TOKEN: &str = "-inf";

static TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}[ \t]+\d{1,2}:\d{2}:\d{2}(\.\d+)?(\s*(Z|[+-]\d{1,2}(:\d{2})?))?$")
        .expect("timestamp pattern is valid")
});

/// Project a catalog document to JSON.
pub fn to_json(value: &Value) -> Result<JsonValue> {
    project(value, "$")
}

/// Project and serialize a catalog document.
pub fn to_json_string(value: &Value) -> Result<String> {
    Ok(serde_json::to_string(&to_json(value)?)?)
}

fn project(value: &Value, path: &str) -> Result<JsonValue> {
    Ok(match value {
        Value::Null => JsonValue::Null,
        Value::Bool(b) => JsonValue::Bool(*b),
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                JsonValue::from(u)
            } else if let Some(i) = n.as_i64() {
                JsonValue::from(i)
            } else {
                project_float(n.as_f64().unwrap_or(f64::NAN), path)?
            }
        }
        Value::String(s) => JsonValue::String(iso_timestamp(s).unwrap_or_else(|| s.clone())),
        Value::Sequence(items) => JsonValue::Array(
            items
                .iter()
                .enumerate()
                .map(|(i, item)| project(item, &format!("{}[{}]", path, i)))
                .collect::<Result<_>>()?,
        ),
        Value::Mapping(map) => {
            let mut object = Map::with_capacity(map.len());
            for (key, item) in map {
                let key = json_key(key, path)?;
                let child = project(item, &format!("{}.{}", path, key))?;
                object.insert(key, child);
            }
            JsonValue::Object(object)
        }
        Value::Tagged(tagged) => project(&tagged.value, path)?,
    })
}

fn project_float(f: f64, path: &str) -> Result<JsonValue> {
    if f.is_nan() {
        return Err(Error::NonFiniteValue {
            path: path.to_string(),
        });
    }
    if f.is_infinite() {
        let token = if f > 0.0 { POS_INF_TOKEN } else { NEG_INF_TOKEN };
        return Ok(JsonValue::String(token.to_string()));
    }
    Number::from_f64(f)
        .map(JsonValue::Number)
        .ok_or_else(|| Error::NonFiniteValue {
            path: path.to_string(),
        })
}

fn json_key(key: &Value, path: &str) -> Result<String> {
    match key {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok("null".to_string()),
        other => Err(Error::MalformedContent {
            path: PathBuf::from(path),
            message: format!("mapping key {:?} has no JSON form", other),
        }),
    }
}

/// ISO 8601 rendering of a timestamp-looking string.
fn iso_timestamp(s: &str) -> Option<String> {
    if !TIMESTAMP.is_match(s) {
        return None;
    }
    let (date, rest) = s.split_once([' ', '\t'])?;
    let rest = rest.trim_start();
    // An offset separated by whitespace is attached to the time.
    let time: String = rest.split_whitespace().collect();
    Some(format!("{}T{}", date, time))
}
