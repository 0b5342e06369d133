//! Rendering of raw attribute values as CSV cell text

use crate::config::ColumnSchema;
use crate::types::FieldValue;
use chrono::DateTime;

/// Layout used for timestamp columns, always UTC
pub const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S+00";

/// Text some producers emit for a missing value; rendered as an empty cell
const NIL_SENTINEL: &str = "<nil>";

/// Render one attribute as cell text
///
/// `None` means the record has no such field. Missing and null values render as an empty
/// cell for every column. Numeric values in the schema's timestamp columns are treated as
/// epoch milliseconds, with `0` meaning "no date".
pub fn format_value(schema: &ColumnSchema, field: &str, value: Option<&FieldValue>) -> String {
    let Some(value) = value else {
        return String::new();
    };

    if let FieldValue::Number(millis) = value
        && schema.is_timestamp(field)
        && let Some(rendered) = format_timestamp_millis(*millis)
    {
        return rendered;
    }

    let text = match value {
        FieldValue::Null => return String::new(),
        FieldValue::Number(n) => format_number(*n),
        FieldValue::Text(s) => s.clone(),
        FieldValue::Bool(b) => b.to_string(),
    };

    if text == NIL_SENTINEL { String::new() } else { text }
}

/// Render a number with its shortest round-trip digits
///
/// Decimal exponents from -4 through 5 print in plain form (`40205`, `0.0001`, `1250.5`).
/// Anything else prints in exponent form with a signed exponent of at least two digits
/// (`1e-05`, `1.25e+06`). Non-finite values print as `NaN`, `+Inf` and `-Inf`.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "+Inf" } else { "-Inf" }.to_string();
    }

    let scientific = format!("{n:e}");
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return n.to_string();
    };
    let exponent: i32 = exponent.parse().unwrap_or_default();
    if (-4..6).contains(&exponent) {
        return n.to_string();
    }
    let sign = if exponent < 0 { '-' } else { '+' };
    format!("{mantissa}e{sign}{:02}", exponent.unsigned_abs())
}

/// Render epoch milliseconds as `YYYY/MM/DD HH:MM:SS+00`
///
/// Returns `Some("")` for zero, and `None` when the instant is outside chrono's range so the
/// caller can fall back to plain number text. Sub-second precision is truncated toward zero.
pub fn format_timestamp_millis(millis: f64) -> Option<String> {
    if millis == 0.0 {
        return Some(String::new());
    }
    let secs = (millis / 1000.0).trunc();
    if !secs.is_finite() || secs < i64::MIN as f64 || secs > i64::MAX as f64 {
        return None;
    }
    DateTime::from_timestamp(secs as i64, 0).map(|dt| dt.format(TIMESTAMP_FORMAT).to_string())
}
