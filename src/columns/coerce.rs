//! Total conversions from loosely typed values into the shapes the column
//! kinds work with. None of these functions panic.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value;

use crate::value::RawValue;

const BOOLEAN_TRUE_VALUES: [&str; 6] = ["true", "t", "yes", "y", "on", "1"];
const BOOLEAN_FALSE_VALUES: [&str; 6] = ["false", "f", "no", "n", "off", "0"];

/// Outcome of a coercion that distinguishes an explicit missing value from a
/// value that could not be interpreted.
#[derive(Clone, Debug, PartialEq)]
pub enum Coerced<T> {
    Value(T),
    Missing,
    Invalid,
}

impl<T> Coerced<T> {
    pub fn is_invalid(&self) -> bool {
        matches!(self, Self::Invalid)
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    /// The coerced value, treating both missing and invalid as absent.
    pub fn value(self) -> Option<T> {
        match self {
            Self::Value(v) => Some(v),
            Self::Missing | Self::Invalid => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Coerced<U> {
        match self {
            Self::Value(v) => Coerced::Value(f(v)),
            Self::Missing => Coerced::Missing,
            Self::Invalid => Coerced::Invalid,
        }
    }
}

pub fn to_safe_string(value: &RawValue) -> String {
    match value {
        RawValue::Null => "null".to_string(),
        RawValue::Bool(b) => b.to_string(),
        RawValue::Int(i) => i.to_string(),
        RawValue::UInt(u) => u.to_string(),
        RawValue::Float(f) => number_to_string(*f),
        RawValue::BigInt(i) => i.to_string(),
        RawValue::Str(s) => s.clone(),
        RawValue::Date(d) => d.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        RawValue::List(items) => items
            .iter()
            .map(|item| match item {
                RawValue::Null => String::new(),
                other => to_safe_string(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        RawValue::Object(_) => serde_json::to_string(&value.to_json())
            .unwrap_or_else(|_| format!("[{}]", value.type_name())),
    }
}

/// Renders a float the way a browser would print it: integers without a
/// fractional part, everything else in its shortest round-trip form.
pub fn number_to_string(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }
    if value.fract() == 0.0 && value.abs() < 1e21 {
        return format!("{value:.0}");
    }
    value.to_string()
}

/// `None` means missing; `Some(NaN)` means the value is not a number.
pub fn to_safe_number(value: &RawValue) -> Option<f64> {
    match value {
        RawValue::Null => None,
        RawValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        RawValue::Int(i) => Some(*i as f64),
        RawValue::UInt(u) => Some(*u as f64),
        RawValue::Float(f) => Some(*f),
        RawValue::BigInt(i) => Some(*i as f64),
        RawValue::Date(d) => Some(d.timestamp_millis() as f64),
        RawValue::Str(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            Some(unformat_number(trimmed).unwrap_or_else(|| parse_js_number(trimmed)))
        }
        RawValue::List(_) | RawValue::Object(_) => Some(f64::NAN),
    }
}

/// Parses a human formatted number such as `"1,234.5"`, `"$ 12"`, `"45%"`
/// or `"1.5k"`.
pub fn unformat_number(input: &str) -> Option<f64> {
    let mut text = input.trim();
    let mut negative = false;
    if text.starts_with('(') && text.ends_with(')') && text.len() > 2 {
        negative = true;
        text = text[1..text.len() - 1].trim();
    }
    if let Some(rest) = text.strip_prefix('-') {
        negative = !negative;
        text = rest.trim_start();
    } else if let Some(rest) = text.strip_prefix('+') {
        text = rest.trim_start();
    }
    let text = text.trim_start_matches(['$', '€', '£', '¥']).trim();

    let (text, scale) = if let Some(rest) = text.strip_suffix('%') {
        (rest.trim_end(), 0.01)
    } else {
        match text.chars().last().map(|c| c.to_ascii_lowercase()) {
            Some('k') => (&text[..text.len() - 1], 1e3),
            Some('m') => (&text[..text.len() - 1], 1e6),
            Some('b') => (&text[..text.len() - 1], 1e9),
            Some('t') => (&text[..text.len() - 1], 1e12),
            _ => (text, 1.0),
        }
    };

    let cleaned: String = text.chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() || !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    if !cleaned
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '-' | '+'))
    {
        return None;
    }
    let parsed = cleaned.trim().parse::<f64>().ok()? * scale;
    Some(if negative { -parsed } else { parsed })
}

fn parse_js_number(input: &str) -> f64 {
    match input {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    let lower = input.to_ascii_lowercase();
    for (prefix, radix) in [("0x", 16), ("0o", 8), ("0b", 2)] {
        if let Some(digits) = lower.strip_prefix(prefix) {
            return u64::from_str_radix(digits, radix)
                .map(|v| v as f64)
                .unwrap_or(f64::NAN);
        }
    }
    if lower.contains("inf") || lower.contains("nan") {
        return f64::NAN;
    }
    input.parse::<f64>().unwrap_or(f64::NAN)
}

pub fn to_safe_boolean(value: &RawValue) -> Coerced<bool> {
    match value {
        RawValue::Null => Coerced::Missing,
        RawValue::Bool(b) => Coerced::Value(*b),
        other => {
            let cleaned = to_safe_string(other).trim().to_lowercase();
            if cleaned.is_empty() {
                Coerced::Missing
            } else if BOOLEAN_TRUE_VALUES.contains(&cleaned.as_str()) {
                Coerced::Value(true)
            } else if BOOLEAN_FALSE_VALUES.contains(&cleaned.as_str()) {
                Coerced::Value(false)
            } else {
                Coerced::Invalid
            }
        }
    }
}

pub fn to_safe_array(value: &RawValue) -> Vec<RawValue> {
    match value {
        RawValue::Null => Vec::new(),
        RawValue::Bool(_)
        | RawValue::Int(_)
        | RawValue::UInt(_)
        | RawValue::Float(_) => vec![value.clone()],
        RawValue::BigInt(i) => vec![RawValue::Float(*i as f64)],
        RawValue::Str(s) => {
            if s.is_empty() {
                return Vec::new();
            }
            let trimmed = s.trim();
            if trimmed.starts_with('[') && trimmed.ends_with(']') {
                match serde_json::from_str::<Value>(s) {
                    Ok(Value::Array(items)) => items.into_iter().map(RawValue::from).collect(),
                    _ => vec![value.clone()],
                }
            } else {
                s.split(',').map(RawValue::from).collect()
            }
        }
        RawValue::List(items) => items.iter().map(array_element).collect(),
        RawValue::Date(_) | RawValue::Object(_) => vec![RawValue::Str(to_safe_string(value))],
    }
}

fn array_element(value: &RawValue) -> RawValue {
    match value {
        RawValue::Null
        | RawValue::Bool(_)
        | RawValue::Int(_)
        | RawValue::UInt(_)
        | RawValue::Float(_)
        | RawValue::Str(_) => value.clone(),
        RawValue::BigInt(i) => RawValue::Float(*i as f64),
        RawValue::Date(_) | RawValue::List(_) | RawValue::Object(_) => {
            RawValue::Str(to_safe_string(value))
        }
    }
}

pub fn to_safe_date(value: &RawValue) -> Coerced<DateTime<Utc>> {
    match value {
        RawValue::Null => Coerced::Missing,
        RawValue::Date(d) => Coerced::Value(*d),
        RawValue::Int(_) | RawValue::UInt(_) | RawValue::Float(_) | RawValue::BigInt(_) => {
            match to_safe_number(value) {
                Some(n) => date_from_epoch(n),
                None => Coerced::Missing,
            }
        }
        RawValue::Str(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Coerced::Missing;
            }
            if let Ok(n) = trimmed.parse::<f64>() {
                return date_from_epoch(n);
            }
            parse_date_string(trimmed)
                .map(Coerced::Value)
                .unwrap_or(Coerced::Invalid)
        }
        RawValue::Bool(_) | RawValue::List(_) | RawValue::Object(_) => Coerced::Invalid,
    }
}

/// Interprets an epoch number, guessing its unit from its magnitude.
fn date_from_epoch(timestamp: f64) -> Coerced<DateTime<Utc>> {
    if !timestamp.is_finite() {
        return Coerced::Invalid;
    }
    let magnitude = timestamp.abs();
    let seconds = if magnitude >= 1e18 {
        timestamp / 1e9
    } else if magnitude >= 1e15 {
        timestamp / 1e6
    } else if magnitude >= 1e12 {
        timestamp / 1e3
    } else {
        timestamp
    };
    let millis = (seconds * 1000.0).round();
    if millis.abs() > 8.64e15 {
        return Coerced::Invalid;
    }
    DateTime::from_timestamp_millis(millis as i64)
        .map(Coerced::Value)
        .unwrap_or(Coerced::Invalid)
}

const DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d"];

const TIME_FORMATS: [&str; 3] = ["%H:%M:%S%.f", "%H:%M", "%I:%M %p"];

pub fn parse_date_string(input: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(input) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%dT%H:%M:%S%.f%z"] {
        if let Ok(parsed) = DateTime::parse_from_str(input, format) {
            return Some(parsed.with_timezone(&Utc));
        }
    }
    let naive = input.strip_suffix('Z').unwrap_or(input);
    for format in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(naive, format) {
            return Some(parsed.and_utc());
        }
    }
    for format in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(naive, format) {
            return parsed.and_hms_opt(0, 0, 0).map(|d| d.and_utc());
        }
    }
    for format in TIME_FORMATS {
        if let Ok(parsed) = NaiveTime::parse_from_str(naive, format) {
            return NaiveDate::from_ymd_opt(1970, 1, 1).map(|d| d.and_time(parsed).and_utc());
        }
    }
    None
}
