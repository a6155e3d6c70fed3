//! Lenient field deserializers for browser-submitted forms
//!
//! HTML forms send blanks for untouched inputs and numbers as strings.
//! These helpers map blanks to `None` and coerce numeric strings.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// `null`, missing or blank strings become `None`; others are trimmed
pub fn optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.and_then(|s| {
        let trimmed = s.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }))
}

/// `null`, missing or blank become `None`; numbers and numeric strings are coerced
pub fn optional_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(other) => coerce_number(&other).map(Some).map_err(D::Error::custom),
    }
}

/// Required integer; numeric strings are coerced, fractions rejected
pub fn whole_number<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let number = coerce_number(&value).map_err(D::Error::custom)?;

    if number.fract() != 0.0 || number.abs() > i64::MAX as f64 {
        return Err(D::Error::custom("expected an integer"));
    }

    Ok(number as i64)
}

fn coerce_number(value: &Value) -> Result<f64, &'static str> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    parsed.filter(|n| n.is_finite()).ok_or("expected a number")
}
