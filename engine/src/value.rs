//! Value coercion and ordering.
//!
//! Condition filters compare a row's JSON value against a filter value that
//! arrives as text. Both sides are coerced to a common comparable form
//! before comparison:
//!
//! - numeric row value: the filter text is parsed as a number
//! - boolean row value: the filter text is `"true"`/`"false"` or truthiness
//! - textual row value: numbers if both sides parse as numbers, otherwise
//!   timestamps if both sides parse as timestamps, otherwise plain text
//!
//! The last fallback is lexical, so `"10" < "9"` holds when either side is
//! not numeric.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value;
use std::cmp::Ordering;

/// A value coerced for comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Null or missing
    Null,
    Bool(bool),
    Number(f64),
    /// Milliseconds since the Unix epoch, naive times read as UTC
    Time(i64),
    Text(String),
}

impl Operand {
    /// Compare two operands of the same kind. Mixed kinds and NaN are
    /// incomparable.
    pub fn compare(&self, other: &Operand) -> Option<Ordering> {
        match (self, other) {
            (Operand::Bool(a), Operand::Bool(b)) => Some(a.cmp(b)),
            (Operand::Number(a), Operand::Number(b)) => a.partial_cmp(b),
            (Operand::Time(a), Operand::Time(b)) => Some(a.cmp(b)),
            (Operand::Text(a), Operand::Text(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

/// Coerce a row value and a filter value into comparable operands.
pub fn coerce(row_value: Option<&Value>, filter_value: &str) -> (Operand, Operand) {
    match row_value {
        None | Some(Value::Null) => (Operand::Null, Operand::Text(filter_value.to_string())),
        Some(Value::Number(n)) => (
            Operand::Number(n.as_f64().unwrap_or(f64::NAN)),
            Operand::Number(parse_number(filter_value).unwrap_or(f64::NAN)),
        ),
        Some(Value::Bool(b)) => (Operand::Bool(*b), Operand::Bool(parse_bool(filter_value))),
        Some(Value::String(s)) => coerce_text(s, filter_value),
        Some(other) => (
            Operand::Text(other.to_string()),
            Operand::Text(filter_value.to_string()),
        ),
    }
}

fn coerce_text(row: &str, filter: &str) -> (Operand, Operand) {
    if let (Some(a), Some(b)) = (parse_number(row), parse_number(filter)) {
        return (Operand::Number(a), Operand::Number(b));
    }
    if let (Some(a), Some(b)) = (parse_timestamp(row), parse_timestamp(filter)) {
        return (Operand::Time(a), Operand::Time(b));
    }
    (Operand::Text(row.to_string()), Operand::Text(filter.to_string()))
}

/// Parse finite decimal text. Blank text is not a number.
pub fn parse_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// `"true"`/`"false"` literally, otherwise non-empty text is true.
pub fn parse_bool(text: &str) -> bool {
    match text {
        "true" => true,
        "false" => false,
        other => !other.is_empty(),
    }
}

/// Parse a date, datetime or time of day into epoch milliseconds.
pub fn parse_timestamp(text: &str) -> Option<i64> {
    let s = text.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis());
    }
    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M"))
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M"));
    if let Ok(dt) = naive {
        return Some(dt.and_utc().timestamp_millis());
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp_millis());
    }
    let time = NaiveTime::parse_from_str(s, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .ok()?;
    NaiveDate::from_ymd_opt(1970, 1, 1).map(|epoch| epoch.and_time(time).and_utc().timestamp_millis())
}

/// Pad an `HH:MM` time to `HH:MM:00` so it lines up with stored
/// second-granular times.
pub fn pad_time(text: &str) -> String {
    if text.matches(':').count() == 1 {
        format!("{text}:00")
    } else {
        text.to_string()
    }
}

/// Render a value as text for substring operators.
pub fn display(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Null, missing or the empty string.
pub fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        _ => false,
    }
}

/// JavaScript-style falsiness, used to reject unusable row identifiers.
pub fn is_falsy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::Bool(b)) => !b,
        Some(Value::Number(n)) => n.as_f64().map_or(true, |f| f == 0.0 || f.is_nan()),
        Some(Value::String(s)) => s.is_empty(),
        _ => false,
    }
}

/// Total order over JSON values used by the sort engine.
///
/// Values of the same kind compare naturally (numbers numerically, strings
/// lexically, `false < true`). Across kinds the order is
/// missing/null < bool < number < string < array < object.
pub fn natural_cmp(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.total_cmp(&y)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Array(x)), Some(Value::Array(y))) => {
            for (l, r) in x.iter().zip(y) {
                let ord = natural_cmp(Some(l), Some(r));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        _ => kind_rank(a).cmp(&kind_rank(b)),
    }
}

fn kind_rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Bool(_)) => 1,
        Some(Value::Number(_)) => 2,
        Some(Value::String(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Object(_)) => 5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_row_parses_filter_as_number() {
        let (row, filter) = coerce(Some(&json!(5)), "5");
        assert_eq!(row, Operand::Number(5.0));
        assert_eq!(filter, Operand::Number(5.0));

        let (_, filter) = coerce(Some(&json!(5)), "five");
        assert!(matches!(filter, Operand::Number(n) if n.is_nan()));
    }

    #[test]
    fn boolean_row_parses_literal_or_truthiness() {
        assert_eq!(coerce(Some(&json!(true)), "false").1, Operand::Bool(false));
        assert_eq!(coerce(Some(&json!(true)), "true").1, Operand::Bool(true));
        assert_eq!(coerce(Some(&json!(false)), "yes").1, Operand::Bool(true));
        assert_eq!(coerce(Some(&json!(false)), "").1, Operand::Bool(false));
    }

    #[test]
    fn textual_numbers_compare_numerically() {
        let (row, filter) = coerce(Some(&json!("10")), "9");
        assert_eq!(row.compare(&filter), Some(Ordering::Greater));
    }

    #[test]
    fn textual_fallback_is_lexical() {
        // "10 kg" is not numeric, so the comparison is between strings.
        let (row, filter) = coerce(Some(&json!("10 kg")), "9");
        assert_eq!(row, Operand::Text("10 kg".into()));
        assert_eq!(row.compare(&filter), Some(Ordering::Less));
    }

    #[test]
    fn textual_dates_compare_as_time() {
        let (row, filter) = coerce(Some(&json!("2024-03-01")), "2024-02-15T10:00");
        assert!(matches!(row, Operand::Time(_)));
        assert_eq!(row.compare(&filter), Some(Ordering::Greater));
    }

    #[test]
    fn mixed_kinds_are_incomparable() {
        let (row, filter) = coerce(None, "x");
        assert_eq!(row.compare(&filter), None);
        assert_eq!(Operand::Number(f64::NAN).compare(&Operand::Number(1.0)), None);
    }

    #[test]
    fn timestamp_formats() {
        let day = parse_timestamp("2024-01-02").unwrap();
        assert_eq!(parse_timestamp("2024-01-02T00:00:00").unwrap(), day);
        assert_eq!(parse_timestamp("2024-01-02 00:00").unwrap(), day);
        assert_eq!(parse_timestamp("2024-01-02T00:00:00Z").unwrap(), day);
        assert_eq!(parse_timestamp("00:01:00"), Some(60_000));
        assert_eq!(parse_timestamp("00:01"), Some(60_000));
        assert!(parse_timestamp("tomorrow").is_none());
    }

    #[test]
    fn pad_time_only_pads_minutes() {
        assert_eq!(pad_time("12:30"), "12:30:00");
        assert_eq!(pad_time("12:30:15"), "12:30:15");
        assert_eq!(pad_time(""), "");
    }

    #[test]
    fn blank_and_falsy() {
        assert!(is_blank(None));
        assert!(is_blank(Some(&json!(null))));
        assert!(is_blank(Some(&json!(""))));
        assert!(!is_blank(Some(&json!(0))));

        assert!(is_falsy(Some(&json!(0))));
        assert!(is_falsy(Some(&json!(""))));
        assert!(!is_falsy(Some(&json!("a1"))));
        assert!(!is_falsy(Some(&json!(12))));
    }

    #[test]
    fn natural_order() {
        assert_eq!(natural_cmp(Some(&json!(2)), Some(&json!(10))), Ordering::Less);
        assert_eq!(natural_cmp(Some(&json!("b")), Some(&json!("a"))), Ordering::Greater);
        assert_eq!(natural_cmp(None, Some(&json!(0))), Ordering::Less);
        assert_eq!(natural_cmp(Some(&json!(1)), Some(&json!("1"))), Ordering::Less);
        assert_eq!(natural_cmp(Some(&json!(null)), None), Ordering::Equal);
    }

    #[test]
    fn display_values() {
        assert_eq!(display(Some(&json!("abc"))), "abc");
        assert_eq!(display(Some(&json!(12.5))), "12.5");
        assert_eq!(display(None), "");
    }
}
