// src/services/percent.rs
use serde_json::Value;

/// Reads a percentage into a fraction: `"15.5%"` -> `0.155`, `"1,250%"` -> `12.5`.
///
/// Text is always read as a percentage, with or without the trailing `%`.
/// JSON numbers are taken to be fractions already and pass through unchanged.
/// Anything that does not parse (null, bools, arrays, stray characters) reads as `0.0`.
pub fn parse_percent(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()).unwrap_or(0.0),
        Value::String(s) => parse_percent_text(s).unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Strict variant used for user input, where a bad value has to be reported.
pub fn parse_percent_text(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    let without_sign = trimmed.strip_suffix('%').unwrap_or(trimmed);
    parse_number_text(without_sign).map(|v| v / 100.0)
}

/// Reads a plain number, tolerating thousands separators in text. Defaults to `0.0`.
pub fn parse_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()).unwrap_or(0.0),
        Value::String(s) => parse_number_text(s).unwrap_or(0.0),
        _ => 0.0,
    }
}

pub fn parse_number_text(text: &str) -> Option<f64> {
    let cleaned: String = text.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}
