use chrono::{DateTime, FixedOffset, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::columns::cell::{error_cell, Cell, CellContent};
use crate::columns::coerce::{to_safe_date, to_safe_string, Coerced};
use crate::columns::format::{format_datetime, parse_timezone_offset, utc_offset, DateKind};
use crate::columns::{column_parameters, lenient_f64, BaseColumnProps, ColumnType, Validation};
use crate::value::RawValue;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct DateTimeParameters {
    pub format: Option<String>,
    pub min_value: Option<Value>,
    pub max_value: Option<Value>,
    #[serde(deserialize_with = "lenient_f64")]
    pub step: Option<f64>,
    pub timezone: Option<String>,
}

/// Shared implementation of the date, time and datetime columns.
#[derive(Clone, Debug)]
pub struct DateTimeColumn {
    kind: DateKind,
    format: Option<String>,
    step: Option<f64>,
    min: Option<DateTime<Utc>>,
    max: Option<DateTime<Utc>>,
    /// Offset used for display and serialization of datetimes. `None` keeps
    /// values naive, and is always `None` for dates and times.
    offset: Option<FixedOffset>,
}

impl DateTimeColumn {
    pub fn new(props: &BaseColumnProps, kind: DateKind) -> Self {
        let params: DateTimeParameters = column_parameters(json!({}), props);

        // Dates and times are naive; only datetimes carry a timezone.
        let timezone = params
            .timezone
            .clone()
            .or_else(|| props.arrow_type.timezone.clone())
            .filter(|tz| kind == DateKind::DateTime && !tz.trim().is_empty());
        let offset = timezone.as_deref().and_then(|tz| {
            let parsed = parse_timezone_offset(tz);
            if parsed.is_none() {
                tracing::warn!(
                    "Unsupported timezone '{}' for column '{}', using UTC",
                    tz,
                    props.name
                );
            }
            parsed
        });

        let bound = |value: &Option<Value>, which: &str| -> Option<DateTime<Utc>> {
            let value = value.as_ref().filter(|v| !v.is_null())?;
            match to_safe_date(&RawValue::from(value)) {
                Coerced::Value(date) => Some(date),
                _ => {
                    tracing::warn!("Ignoring invalid {} for column '{}'", which, props.name);
                    None
                }
            }
        };

        Self {
            kind,
            format: params.format.clone(),
            step: params.step.filter(|s| s.is_finite() && *s > 0.0),
            min: bound(&params.min_value, "min_value"),
            max: bound(&params.max_value, "max_value"),
            offset: offset.or_else(|| timezone.as_ref().and_then(|_| FixedOffset::east_opt(0))),
        }
    }

    pub fn kind(&self) -> DateKind {
        self.kind
    }

    fn format(&self, date: &DateTime<Utc>) -> String {
        format_datetime(
            &utc_offset(date, self.offset),
            self.format.as_deref(),
            self.kind,
            self.step,
        )
    }

    fn check_range(&self, date: &DateTime<Utc>) -> Result<(), String> {
        if let Some(min) = &self.min {
            if date < min {
                return Err(format!(
                    "The value is smaller than the minimum allowed value of {}.",
                    self.format(min)
                ));
            }
        }
        if let Some(max) = &self.max {
            if date > max {
                return Err(format!(
                    "The value is larger than the maximum allowed value of {}.",
                    self.format(max)
                ));
            }
        }
        Ok(())
    }

    fn content(&self, date: Option<DateTime<Utc>>, display_date: String) -> CellContent {
        CellContent::DatePicker {
            date,
            display_date,
            kind: self.kind,
            step: self.step,
            min: self.min,
            max: self.max,
        }
    }

    /// Serialized form sent to the backend.
    pub fn serialize(&self, date: &DateTime<Utc>) -> String {
        match self.kind {
            DateKind::Date => date.format("%Y-%m-%d").to_string(),
            DateKind::Time => date.format("%H:%M:%S%.3f").to_string(),
            DateKind::DateTime => match self.offset {
                Some(offset) => date
                    .with_timezone(&offset)
                    .format("%Y-%m-%dT%H:%M:%S%.3f%:z")
                    .to_string(),
                None => date.format("%Y-%m-%dT%H:%M:%S%.3f").to_string(),
            },
        }
    }
}

impl ColumnType for DateTimeColumn {
    fn get_cell(&self, props: &BaseColumnProps, value: &RawValue, validate: bool) -> Cell {
        let date = match to_safe_date(value) {
            Coerced::Value(date) => date,
            Coerced::Missing => {
                return props
                    .cell(self.content(None, String::new()))
                    .with_missing(true)
            }
            Coerced::Invalid => {
                return error_cell(
                    &to_safe_string(value),
                    "The value cannot be interpreted as a datetime object.",
                )
            }
        };

        if validate {
            if let Err(message) = self.check_range(&date) {
                return error_cell(&self.format(&date), &message);
            }
        }

        let display = self.format(&date);
        props
            .cell(self.content(Some(date), display.clone()))
            .with_copy_data(display)
    }

    fn get_cell_value(&self, cell: &Cell) -> RawValue {
        match &cell.content {
            CellContent::DatePicker { date: Some(date), .. } if !cell.is_missing_value => {
                RawValue::Str(self.serialize(date))
            }
            _ => RawValue::Null,
        }
    }

    fn validate_input(&self, props: &BaseColumnProps, value: &RawValue) -> Validation {
        match to_safe_date(value) {
            Coerced::Value(date) if self.check_range(&date).is_ok() => Validation::Valid,
            Coerced::Missing if !props.is_required => Validation::Valid,
            _ => Validation::Invalid,
        }
    }
}
