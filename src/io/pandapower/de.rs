//! Lenient field deserializers.
//!
//! pandapower tables reach us through JSON, spreadsheets, pickles and SQLite,
//! and every one of them spells booleans, integers and missing values a little
//! differently. These helpers accept all of those spellings.

use serde::{Deserialize, Deserializer, de::Error};
use serde_json::Value;

fn as_number(val: &Value) -> Option<f64> {
    match val {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn is_missing(val: &Value) -> bool {
    match val {
        Value::Null => true,
        Value::String(s) => {
            let s = s.trim();
            s.is_empty() || s.eq_ignore_ascii_case("nan") || s.eq_ignore_ascii_case("none")
        }
        _ => false,
    }
}

/// Float column; missing values become NaN.
pub(crate) fn from_float<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let val = Value::deserialize(deserializer)?;
    if is_missing(&val) {
        return Ok(f64::NAN);
    }
    as_number(&val).ok_or_else(|| D::Error::custom(format!("invalid number format: {val}")))
}

/// Nullable float column; NaN is folded into `None`.
pub(crate) fn from_opt_float<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let val = Value::deserialize(deserializer)?;
    if is_missing(&val) {
        return Ok(None);
    }
    let v = as_number(&val).ok_or_else(|| D::Error::custom(format!("invalid number format: {val}")))?;
    Ok(v.is_finite().then_some(v))
}

pub(crate) fn from_number<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let val = Value::deserialize(deserializer)?;
    if let Value::Number(n) = &val {
        if let Some(i) = n.as_i64() {
            return Ok(i);
        }
    }
    match as_number(&val) {
        Some(v) if v.is_finite() && v.fract() == 0.0 => Ok(v as i64),
        _ => Err(D::Error::custom(format!("invalid integer format: {val}"))),
    }
}

pub(crate) fn from_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let val = Value::deserialize(deserializer)?;
    match &val {
        Value::Bool(b) => Ok(*b),
        Value::Null => Ok(false),
        Value::Number(n) => Ok(n.as_f64().is_some_and(|v| v != 0.0)),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" | "" => Ok(false),
            _ => Err(D::Error::custom(format!("invalid boolean format: {val}"))),
        },
        _ => Err(D::Error::custom(format!("invalid boolean format: {val}"))),
    }
}

pub(crate) fn from_str<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let val = Value::deserialize(deserializer)?;
    Ok(match val {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Row {
        #[serde(deserialize_with = "from_float")]
        x: f64,
        #[serde(deserialize_with = "from_opt_float")]
        y: Option<f64>,
        #[serde(deserialize_with = "from_number")]
        n: i64,
        #[serde(deserialize_with = "from_flag")]
        b: bool,
        #[serde(deserialize_with = "from_str")]
        s: Option<String>,
    }

    #[test]
    fn accepts_mixed_spellings() {
        let row: Row =
            serde_json::from_value(json!({"x": "1.5", "y": null, "n": 3.0, "b": "True", "s": 7}))
                .unwrap();
        assert_eq!(row.x, 1.5);
        assert_eq!(row.y, None);
        assert_eq!(row.n, 3);
        assert!(row.b);
        assert_eq!(row.s.as_deref(), Some("7"));

        let row: Row =
            serde_json::from_value(json!({"x": null, "y": 2, "n": 4, "b": 0, "s": null})).unwrap();
        assert!(row.x.is_nan());
        assert_eq!(row.y, Some(2.0));
        assert!(!row.b);
        assert_eq!(row.s, None);
    }

    #[test]
    fn rejects_fractional_integers() {
        let res: Result<Row, _> =
            serde_json::from_value(json!({"x": 1, "y": 1, "n": 1.5, "b": true, "s": "a"}));
        assert!(res.is_err());
    }
}
