//! Forgiving conversions for template data coming from the diet API.
//!
//! Template payloads are loosely typed: nutrient values show up as numbers,
//! numeric strings (`"200"`, `"12.5g"`) or garbage, ids as strings or numbers.
//! Everything here degrades to a safe default instead of failing the load.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{de::IgnoredAny, Deserialize, Deserializer};
use serde_json::Value;

lazy_static! {
    static ref LEADING_NUMBER: Regex =
        Regex::new(r"^\s*[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?").unwrap();
    static ref LEADING_INTEGER: Regex = Regex::new(r"^\s*[+-]?\d+").unwrap();
}

/// Nutrient value: finite and non-negative, otherwise `0`.
pub fn number_from_value(value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => LEADING_NUMBER
            .find(s)
            .and_then(|m| m.as_str().trim().parse::<f64>().ok()),
        _ => None,
    };
    sanitize_number(parsed.unwrap_or(0.0))
}

pub fn sanitize_number(n: f64) -> f64 {
    if n.is_finite() && n > 0.0 {
        n
    } else {
        0.0
    }
}

/// Serving count: a positive integer, otherwise `1`.
pub fn quantity_from_value(value: &Value) -> u32 {
    let parsed = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => LEADING_INTEGER
            .find(s)
            .and_then(|m| m.as_str().trim().parse::<i64>().ok()),
        _ => None,
    };
    match parsed {
        Some(n) if n >= 1 => u32::try_from(n).unwrap_or(u32::MAX),
        _ => 1,
    }
}

/// Opaque identifier: strings pass through, numbers are rendered, anything else is empty.
pub fn id_from_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

pub fn number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map(number_from_value).unwrap_or(0.0))
}

pub fn quantity<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map(quantity_from_value).unwrap_or(1))
}

pub fn id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map(id_from_value).unwrap_or_default())
}

pub fn optional_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .map(id_from_value)
        .filter(|id| !id.is_empty()))
}

/// Selection flag from the server: whatever was sent, a freshly loaded food starts unselected.
pub fn unselected<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    IgnoredAny::deserialize(deserializer)?;
    Ok(false)
}

/// Display text: strings pass through, `null` and missing become empty.
pub fn text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => s,
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    })
}
