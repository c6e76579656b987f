//! Utility module, a grab-bag of functionality
//!
//! Every rendered document goes through the helpers in this module. Keeping
//! the numeric formatter in one place is what makes two renderings of the same
//! container byte-identical, whatever variant produced the number.

use chrono::{DateTime, TimeZone};
use serde_json;
use serde_json::Value;
use std::fmt;
use std::fmt::Write;

/// `strftime` pattern of the `@timestamp` field: microsecond precision and a
/// `±hh:mm` offset.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f%:z";

/// Append `value` in fixed-point notation with six fractional digits.
///
/// Non-finite values have no JSON representation and are written as zero.
#[inline]
pub fn push_float(buf: &mut String, value: f64) {
    let value = if value.is_finite() { value } else { 0.0 };
    let _ = write!(buf, "{:.6}", value);
}

/// Append `s` as a quoted, escaped JSON string.
#[inline]
pub fn push_quoted(buf: &mut String, s: &str) {
    match serde_json::to_string(s) {
        Ok(quoted) => buf.push_str(&quoted),
        // unreachable for a str
        Err(_) => buf.push_str("\"\""),
    }
}

/// Leniently read a float out of a JSON node.
///
/// Numbers are taken as-is and strings are parsed after trimming. Anything
/// else, and any non-finite result, is `None`.
pub fn parse_float(value: &Value) -> Option<f64> {
    let parsed = match *value {
        Value::Number(ref n) => n.as_f64(),
        Value::String(ref s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.and_then(|f| if f.is_finite() { Some(f) } else { None })
}

/// Format a timestamp the way the `@timestamp` field expects it.
pub fn format_time<Tz>(time: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    format!("{}", time.format(TIMESTAMP_FORMAT))
}

/// Short name of a JSON node's kind, for log lines.
pub fn kind_of(value: &Value) -> &'static str {
    match *value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
