//! Lenient field decoding for order documents
//!
//! Orders are written by more than one client. Older writers stored
//! `isFreebie` as `"true"`/`1`, quantities as strings and prices as
//! negative placeholders. Decoding normalises all of that here, once, so
//! the rest of the engine only ever sees well-formed values.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Coerce a price-like value into a non-negative finite amount
pub fn sanitize_amount(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// Coerce a quantity-like value into a non-negative integer (truncating)
pub fn sanitize_quantity(value: f64) -> u32 {
    if !value.is_finite() || value <= 0.0 {
        return 0;
    }
    let truncated = value.trunc();
    if truncated >= u32::MAX as f64 {
        u32::MAX
    } else {
        truncated as u32
    }
}

fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn value_as_flag(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "true" | "1" | "yes" | "y"
        ),
        _ => false,
    }
}

/// `deserialize_with` for monetary amounts
pub fn amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_as_f64(&value).map(sanitize_amount).unwrap_or(0.0))
}

/// `deserialize_with` for quantities
pub fn quantity<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_as_f64(&value).map(sanitize_quantity).unwrap_or(0))
}

/// `deserialize_with` for boolean flags
pub fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_as_flag(&value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Probe {
        #[serde(deserialize_with = "amount")]
        price: f64,
        #[serde(deserialize_with = "quantity")]
        qty: u32,
        #[serde(default, deserialize_with = "flag")]
        free: bool,
    }

    fn probe(json: &str) -> Probe {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_well_formed_values_pass_through() {
        let p = probe(r#"{"price": 12.5, "qty": 3, "free": true}"#);
        assert_eq!(p.price, 12.5);
        assert_eq!(p.qty, 3);
        assert!(p.free);
    }

    #[test]
    fn test_strings_are_parsed() {
        let p = probe(r#"{"price": "4.25", "qty": "2", "free": "TRUE"}"#);
        assert_eq!(p.price, 4.25);
        assert_eq!(p.qty, 2);
        assert!(p.free);
    }

    #[test]
    fn test_negative_and_fractional_values_are_clamped() {
        let p = probe(r#"{"price": -3, "qty": 2.9, "free": 0}"#);
        assert_eq!(p.price, 0.0);
        assert_eq!(p.qty, 2);
        assert!(!p.free);

        let p = probe(r#"{"price": 1, "qty": -4}"#);
        assert_eq!(p.qty, 0);
        assert!(!p.free);
    }

    #[test]
    fn test_garbage_becomes_zero() {
        let p = probe(r#"{"price": "abc", "qty": null, "free": "nope"}"#);
        assert_eq!(p.price, 0.0);
        assert_eq!(p.qty, 0);
        assert!(!p.free);
    }

    #[test]
    fn test_sanitize_helpers() {
        assert_eq!(sanitize_amount(f64::NAN), 0.0);
        assert_eq!(sanitize_amount(f64::INFINITY), 0.0);
        assert_eq!(sanitize_quantity(1e12), u32::MAX);
        assert_eq!(sanitize_quantity(7.0), 7);
    }
}
