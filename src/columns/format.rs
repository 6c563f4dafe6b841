use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, Utc};
use serde_json::Value;

use crate::columns::coerce::number_to_string;

/// The kind of temporal value a date-like column shows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DateKind {
    Date,
    Time,
    DateTime,
}

impl DateKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Time => "time",
            Self::DateTime => "datetime-local",
        }
    }
}

/// Formats a number for display.
///
/// `format` is either a printf-style pattern (`"%.2f"`, `"$%d"`), one of the
/// named presets, or unset. When unset, `max_precision` fixes the number of
/// decimals; without it, up to four decimals are shown with trailing zeros
/// removed.
pub fn format_number(value: f64, format: Option<&str>, max_precision: Option<usize>) -> String {
    if !value.is_finite() {
        return number_to_string(value);
    }

    let format = format.map(str::trim).filter(|f| !f.is_empty());
    let Some(format) = format else {
        return match max_precision {
            Some(0) => format!("{:.0}", value.round()),
            Some(precision) => format!("{value:.precision$}"),
            None => trim_fraction(&format!("{value:.4}")),
        };
    };

    match format {
        "plain" => number_to_string(value),
        "localized" => {
            let precision = max_precision.unwrap_or(3);
            let text = trim_fraction(&format!("{:.precision$}", value.abs()));
            sign_prefix(value, &group_thousands(&text))
        }
        "percent" => {
            let text = group_thousands(&format!("{:.2}", (value * 100.0).abs()));
            sign_prefix(value * 100.0, &format!("{text}%"))
        }
        "dollar" => currency(value, "$", 2),
        "euro" => currency(value, "€", 2),
        "yen" => currency(value, "¥", 0),
        "accounting" => {
            let text = group_thousands(&format!("{:.2}", value.abs()));
            if value < 0.0 {
                format!("(${text})")
            } else {
                format!("${text}")
            }
        }
        "compact" => format_compact(value),
        "scientific" => format_exponential(value, false),
        "engineering" => format_exponential(value, true),
        _ => {
            if let Some(unit) = format
                .strip_prefix("duration[")
                .and_then(|rest| rest.strip_suffix(']'))
            {
                return format_duration(value * nanos_per_unit(unit));
            }
            if let Some(freq) = format
                .strip_prefix("period[")
                .and_then(|rest| rest.strip_suffix(']'))
            {
                return format_period(value as i64, freq);
            }
            sprintf(format, value)
        }
    }
}

fn nanos_per_unit(unit: &str) -> f64 {
    match unit {
        "s" => 1e9,
        "ms" => 1e6,
        "us" => 1e3,
        _ => 1.0,
    }
}

fn currency(value: f64, symbol: &str, decimals: usize) -> String {
    let text = group_thousands(&format!("{:.decimals$}", value.abs()));
    sign_prefix(value, &format!("{symbol}{text}"))
}

fn sign_prefix(value: f64, text: &str) -> String {
    if value < 0.0 && text.chars().any(|c| c.is_ascii_digit() && c != '0') {
        format!("-{text}")
    } else {
        text.to_string()
    }
}

fn trim_fraction(text: &str) -> String {
    if !text.contains('.') {
        return text.to_string();
    }
    let trimmed = text.trim_end_matches('0').trim_end_matches('.');
    if trimmed == "-0" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Inserts `,` separators into the integer part of a plain decimal string.
pub fn group_thousands(text: &str) -> String {
    let (sign, unsigned) = match text.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", text),
    };
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (unsigned, None),
    };
    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (idx, ch) in int_part.chars().enumerate() {
        if idx > 0 && (int_part.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    match frac_part {
        Some(frac) => format!("{sign}{grouped}.{frac}"),
        None => format!("{sign}{grouped}"),
    }
}

fn format_compact(value: f64) -> String {
    const SUFFIXES: [(f64, &str); 4] = [(1e12, "T"), (1e9, "B"), (1e6, "M"), (1e3, "K")];
    let magnitude = value.abs();
    let (scaled, suffix) = SUFFIXES
        .iter()
        .find(|(threshold, _)| magnitude >= *threshold)
        .map(|(threshold, suffix)| (value / threshold, *suffix))
        .unwrap_or((value, ""));
    let text = if scaled.abs() >= 100.0 {
        format!("{:.0}", scaled)
    } else {
        let digits = if scaled.abs() >= 10.0 {
            0
        } else if scaled.abs() >= 1.0 {
            1
        } else {
            2
        };
        trim_fraction(&format!("{scaled:.digits$}"))
    };
    format!("{text}{suffix}")
}

fn format_exponential(value: f64, engineering: bool) -> String {
    if value == 0.0 {
        return "0E0".to_string();
    }
    let mut exponent = value.abs().log10().floor() as i32;
    if engineering {
        exponent -= exponent.rem_euclid(3);
    }
    let mut mantissa = value / 10f64.powi(exponent);
    let mut text = trim_fraction(&format!("{mantissa:.3}"));
    // Rounding may carry the mantissa over its bound, e.g. 9.9996 -> 10.
    let limit = if engineering { 1000.0 } else { 10.0 };
    if text.trim_start_matches('-').parse::<f64>().unwrap_or(0.0) >= limit {
        exponent += if engineering { 3 } else { 1 };
        mantissa = value / 10f64.powi(exponent);
        text = trim_fraction(&format!("{mantissa:.3}"));
    }
    format!("{text}E{exponent}")
}

/// A small printf implementation covering `%d %i %u %f %F %e %E %g %G %x %X %o
/// %s %%` with the `-`, `+`, ` ` and `0` flags, width and precision.
pub fn sprintf(format: &str, value: f64) -> String {
    let mut out = String::with_capacity(format.len() + 8);
    let mut chars = format.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '%' {
            out.push(ch);
            continue;
        }
        if chars.peek() == Some(&'%') {
            chars.next();
            out.push('%');
            continue;
        }

        let mut left_align = false;
        let mut plus_sign = false;
        let mut space_sign = false;
        let mut pad_char = ' ';
        while let Some(&flag) = chars.peek() {
            match flag {
                '-' => left_align = true,
                '+' => plus_sign = true,
                ' ' => space_sign = true,
                '0' => pad_char = '0',
                _ => break,
            }
            chars.next();
        }

        let mut width = 0usize;
        while let Some(digit) = chars.peek().and_then(|c| c.to_digit(10)) {
            width = width * 10 + digit as usize;
            chars.next();
        }

        let mut precision = None;
        if chars.peek() == Some(&'.') {
            chars.next();
            let mut p = 0usize;
            while let Some(digit) = chars.peek().and_then(|c| c.to_digit(10)) {
                p = p * 10 + digit as usize;
                chars.next();
            }
            precision = Some(p);
        }

        let Some(conversion) = chars.next() else {
            out.push('%');
            break;
        };

        let (body, numeric) = match conversion {
            'd' | 'i' => (format!("{:.0}", value.trunc().abs()), true),
            'u' => (format!("{:.0}", value.trunc().abs()), false),
            'f' | 'F' => {
                let p = precision.unwrap_or(6);
                (format!("{:.p$}", value.abs()), true)
            }
            'e' | 'E' => {
                let text = js_exponential(value.abs(), precision.unwrap_or(6));
                let text = if conversion == 'E' { text.to_uppercase() } else { text };
                (text, true)
            }
            'g' | 'G' => {
                let text = js_precision(value.abs(), precision.unwrap_or(6));
                let text = if conversion == 'G' { text.to_uppercase() } else { text };
                (text, true)
            }
            'x' => (format!("{:x}", value.trunc().abs() as u64), false),
            'X' => (format!("{:X}", value.trunc().abs() as u64), false),
            'o' => (format!("{:o}", value.trunc().abs() as u64), false),
            's' => {
                let mut text = number_to_string(value);
                if let Some(p) = precision {
                    text = text.chars().take(p).collect();
                }
                (text, false)
            }
            other => {
                // Unknown conversions are echoed back unchanged.
                out.push('%');
                out.push(other);
                continue;
            }
        };

        let sign = if numeric && value < 0.0 && body.chars().any(|c| c.is_ascii_digit() && c != '0') {
            "-"
        } else if numeric && plus_sign {
            "+"
        } else if numeric && space_sign {
            " "
        } else {
            ""
        };

        let len = sign.chars().count() + body.chars().count();
        let padding = width.saturating_sub(len);
        if left_align {
            out.push_str(sign);
            out.push_str(&body);
            out.extend(std::iter::repeat(' ').take(padding));
        } else if pad_char == '0' && numeric {
            out.push_str(sign);
            out.extend(std::iter::repeat('0').take(padding));
            out.push_str(&body);
        } else {
            out.extend(std::iter::repeat(' ').take(padding));
            out.push_str(sign);
            out.push_str(&body);
        }
    }

    out
}

/// `Number.prototype.toExponential`: `1.5e+3`.
fn js_exponential(value: f64, precision: usize) -> String {
    let text = format!("{value:.precision$e}");
    match text.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            format!("{mantissa}e+{exponent}")
        }
        _ => text,
    }
}

/// `Number.prototype.toPrecision`.
fn js_precision(value: f64, precision: usize) -> String {
    let precision = precision.max(1);
    if value == 0.0 {
        return format!("{:.prec$}", 0.0, prec = precision - 1);
    }
    let exponent = value.abs().log10().floor() as i32;
    if exponent < -6 || exponent >= precision as i32 {
        js_exponential(value, precision - 1)
    } else {
        let decimals = (precision as i32 - 1 - exponent).max(0) as usize;
        format!("{value:.decimals$}")
    }
}

/// Renders a duration the way humans describe it: "a few seconds",
/// "3 hours", "a month".
pub fn format_duration(nanoseconds: f64) -> String {
    let seconds = (nanoseconds / 1e9).abs();
    let minutes = seconds / 60.0;
    let hours = minutes / 60.0;
    let days = hours / 24.0;
    let months = days / 30.436875;
    let years = days / 365.25;

    if seconds.round() < 45.0 {
        "a few seconds".to_string()
    } else if seconds.round() < 90.0 {
        "a minute".to_string()
    } else if minutes.round() < 45.0 {
        format!("{} minutes", minutes.round())
    } else if minutes.round() < 90.0 {
        "an hour".to_string()
    } else if hours.round() < 22.0 {
        format!("{} hours", hours.round())
    } else if hours.round() < 36.0 {
        "a day".to_string()
    } else if days.round() < 26.0 {
        format!("{} days", days.round())
    } else if days.round() < 45.0 {
        "a month".to_string()
    } else if months.round() < 11.0 {
        format!("{} months", months.round().max(2.0))
    } else if years.round() <= 1.0 {
        "a year".to_string()
    } else {
        format!("{} years", years.round())
    }
}

/// Renders a pandas period ordinal for the given frequency, e.g.
/// `format_period(1, "M")` is `"1970-02"`.
pub fn format_period(ordinal: i64, freq: &str) -> String {
    let (freq_name, anchor) = match freq.split_once('-') {
        Some((name, anchor)) => (name, Some(anchor)),
        None => (freq, None),
    };
    let Some(epoch) = NaiveDate::from_ymd_opt(1970, 1, 1).and_then(|d| d.and_hms_opt(0, 0, 0))
    else {
        return ordinal.to_string();
    };

    let shifted = |delta: Option<Duration>, pattern: &str| {
        delta
            .and_then(|d| epoch.checked_add_signed(d))
            .map(|d| d.format(pattern).to_string())
            .unwrap_or_else(|| ordinal.to_string())
    };

    match freq_name {
        "A" | "Y" => 1970i64.saturating_add(ordinal).to_string(),
        "Q" => {
            let year = 1970 + ordinal.div_euclid(4);
            let quarter = ordinal.rem_euclid(4) + 1;
            format!("{year}Q{quarter}")
        }
        "M" => {
            let year = 1970 + ordinal.div_euclid(12);
            let month = ordinal.rem_euclid(12) + 1;
            format!("{year}-{month:02}")
        }
        "W" => {
            let anchor_day = anchor.and_then(weekday_from_abbrev).unwrap_or(chrono::Weekday::Sun);
            let first_end = (0..7)
                .filter_map(|offset| epoch.date().checked_add_signed(Duration::days(offset)))
                .find(|d| d.weekday() == anchor_day);
            let end = first_end.and_then(|d| {
                ordinal
                    .checked_mul(7)
                    .and_then(Duration::try_days)
                    .and_then(|delta| d.checked_add_signed(delta))
            });
            match end.and_then(|e| e.checked_sub_signed(Duration::days(6)).map(|s| (s, e))) {
                Some((start, end)) => format!("{}/{}", start.format("%Y-%m-%d"), end.format("%Y-%m-%d")),
                None => ordinal.to_string(),
            }
        }
        "D" => shifted(Duration::try_days(ordinal), "%Y-%m-%d"),
        "H" | "h" => shifted(Duration::try_hours(ordinal), "%Y-%m-%d %H:00"),
        "T" | "min" => shifted(Duration::try_minutes(ordinal), "%Y-%m-%d %H:%M"),
        "S" | "s" => shifted(Duration::try_seconds(ordinal), "%Y-%m-%d %H:%M:%S"),
        "L" | "ms" => shifted(Duration::try_milliseconds(ordinal), "%Y-%m-%d %H:%M:%S%.3f"),
        "U" | "us" => shifted(Some(Duration::microseconds(ordinal)), "%Y-%m-%d %H:%M:%S%.6f"),
        "N" | "ns" => shifted(Some(Duration::nanoseconds(ordinal)), "%Y-%m-%d %H:%M:%S%.9f"),
        _ => ordinal.to_string(),
    }
}

fn weekday_from_abbrev(anchor: &str) -> Option<chrono::Weekday> {
    use chrono::Weekday::*;
    match anchor.to_ascii_uppercase().as_str() {
        "MON" => Some(Mon),
        "TUE" => Some(Tue),
        "WED" => Some(Wed),
        "THU" => Some(Thu),
        "FRI" => Some(Fri),
        "SAT" => Some(Sat),
        "SUN" => Some(Sun),
        _ => None,
    }
}

/// Formats a date-like value. `format` is a strftime pattern or one of
/// `"iso8601"` and `"localized"`; invalid patterns fall back to the default
/// for `kind`.
pub fn format_datetime(
    date: &DateTime<FixedOffset>,
    format: Option<&str>,
    kind: DateKind,
    step: Option<f64>,
) -> String {
    let pattern = match format.map(str::trim).filter(|f| !f.is_empty()) {
        Some("iso8601") => match kind {
            DateKind::Date => "%Y-%m-%d".to_string(),
            DateKind::Time => "%H:%M:%S%.3f".to_string(),
            DateKind::DateTime => "%Y-%m-%dT%H:%M:%S%.3f%:z".to_string(),
        },
        Some("localized") => match kind {
            DateKind::Date => "%b %-d, %Y".to_string(),
            DateKind::Time => "%-I:%M:%S %p".to_string(),
            DateKind::DateTime => "%b %-d, %Y %-I:%M:%S %p".to_string(),
        },
        Some(custom) if is_valid_strftime(custom) => custom.to_string(),
        Some(custom) => {
            tracing::warn!("Invalid date format pattern '{}', using the default", custom);
            default_date_pattern(kind, step)
        }
        None => default_date_pattern(kind, step),
    };
    date.format(&pattern).to_string()
}

fn default_date_pattern(kind: DateKind, step: Option<f64>) -> String {
    let time = match step {
        Some(step) if step < 1.0 && step > 0.0 => "%H:%M:%S%.3f",
        Some(step) if step >= 60.0 && step.rem_euclid(60.0) == 0.0 => "%H:%M",
        _ => "%H:%M:%S",
    };
    match kind {
        DateKind::Date => "%Y-%m-%d".to_string(),
        DateKind::Time => time.to_string(),
        DateKind::DateTime => format!("%Y-%m-%d {time}"),
    }
}

pub fn is_valid_strftime(pattern: &str) -> bool {
    !StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error))
}

/// Parses a timezone designator: `UTC`, `Z`, `+05:30`, `-0800`.
pub fn parse_timezone_offset(timezone: &str) -> Option<FixedOffset> {
    let tz = timezone.trim();
    if tz.eq_ignore_ascii_case("utc") || tz == "Z" || tz.eq_ignore_ascii_case("gmt") {
        return FixedOffset::east_opt(0);
    }
    let (sign, rest) = match tz.chars().next()? {
        '+' => (1, &tz[1..]),
        '-' => (-1, &tz[1..]),
        _ => return None,
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

pub fn utc_offset(date: &DateTime<Utc>, offset: Option<FixedOffset>) -> DateTime<FixedOffset> {
    match offset {
        Some(offset) => date.with_timezone(&offset),
        None => date.fixed_offset(),
    }
}

/// Number of digits after the decimal point.
pub fn count_decimals(value: f64) -> usize {
    if value == 0.0 || !value.is_finite() || value.floor() == value {
        return 0;
    }
    let text = format!("{}", value);
    text.split_once('.').map(|(_, frac)| frac.len()).unwrap_or(0)
}

/// Drops (does not round) the digits beyond `decimals`.
pub fn truncate_decimals(value: f64, decimals: usize) -> f64 {
    if decimals == 0 {
        return value.trunc();
    }
    let factor = 10f64.powi(decimals as i32);
    (value * factor).trunc() / factor
}

pub fn remove_line_breaks(text: &str) -> String {
    text.replace(['\n', '\r'], " ")
}

/// Serializes any JSON value into a string, keeping strings unquoted.
pub fn to_json_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => serde_json::to_string(other).unwrap_or_else(|_| other.to_string()),
    }
}
