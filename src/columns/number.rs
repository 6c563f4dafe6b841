use serde::Deserialize;
use serde_json::{Map, Value};

use crate::columns::cell::{error_cell, Cell, CellContent, ContentAlign};
use crate::columns::coerce::{number_to_string, to_safe_number, to_safe_string};
use crate::columns::format::{count_decimals, format_number, truncate_decimals};
use crate::columns::{
    column_parameters, is_integer_type, is_unsigned_type, lenient_f64, BaseColumnProps,
    ColumnType, Validation,
};
use crate::value::RawValue;

/// Largest integer a double represents exactly (2^53 - 1).
pub const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct NumberParameters {
    #[serde(deserialize_with = "lenient_f64")]
    pub min_value: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub max_value: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub step: Option<f64>,
    pub format: Option<String>,
}

#[derive(Clone, Debug)]
pub struct NumberColumn {
    params: NumberParameters,
    fixed_decimals: Option<usize>,
    allow_negative: bool,
}

impl NumberColumn {
    pub fn new(props: &BaseColumnProps) -> Self {
        let type_name = props.arrow_type.type_name();
        let mut defaults = Map::new();
        if is_integer_type(&type_name) {
            defaults.insert("step".to_string(), Value::from(1));
        }
        if is_unsigned_type(&type_name) {
            defaults.insert("min_value".to_string(), Value::from(0));
        }
        let params: NumberParameters = column_parameters(Value::Object(defaults), props);

        let fixed_decimals = params
            .step
            .filter(|step| step.is_finite())
            .map(count_decimals);
        let allow_negative = params.min_value.map(|min| min < 0.0).unwrap_or(true);
        Self {
            params,
            fixed_decimals,
            allow_negative,
        }
    }

    pub fn parameters(&self) -> &NumberParameters {
        &self.params
    }

    fn missing_cell(&self, props: &BaseColumnProps) -> Cell {
        props
            .cell(self.content(None, String::new()))
            .with_align(props.content_alignment.or(Some(ContentAlign::Right)))
            .with_missing(true)
    }

    fn content(&self, data: Option<f64>, display_data: String) -> CellContent {
        CellContent::Number {
            data,
            display_data,
            fixed_decimals: self.fixed_decimals,
            allow_negative: self.allow_negative,
        }
    }

    /// Applies min/max: values above the maximum are clamped, values below
    /// the minimum are rejected.
    fn check_range(&self, value: f64) -> Result<f64, String> {
        if let Some(min) = self.params.min_value {
            if value < min {
                return Err(format!(
                    "The value is smaller than the minimum allowed value of {}.",
                    number_to_string(min)
                ));
            }
        }
        if let Some(max) = self.params.max_value {
            if value > max {
                return Ok(max);
            }
        }
        Ok(value)
    }
}

impl ColumnType for NumberColumn {
    fn get_cell(&self, props: &BaseColumnProps, value: &RawValue, validate: bool) -> Cell {
        let Some(mut number) = to_safe_number(value) else {
            return self.missing_cell(props);
        };
        if number.is_nan() {
            return error_cell(
                &to_safe_string(value),
                "The value cannot be interpreted as a number.",
            );
        }

        if validate {
            match self.check_range(number) {
                Ok(checked) => number = checked,
                Err(message) => return error_cell(&to_safe_string(value), &message),
            }
        }

        if number.is_finite() && number.fract() == 0.0 && number.abs() > MAX_SAFE_INTEGER {
            return error_cell(
                &to_safe_string(value),
                "The value is larger than the maximum supported integer values in number columns (2^53).",
            );
        }

        if let Some(decimals) = self.fixed_decimals {
            number = truncate_decimals(number, decimals);
        }
        let display = format_number(number, self.params.format.as_deref(), self.fixed_decimals);

        props
            .cell(self.content(Some(number), display))
            .with_align(props.content_alignment.or(Some(ContentAlign::Right)))
    }

    fn get_cell_value(&self, cell: &Cell) -> RawValue {
        match &cell.content {
            CellContent::Number { data: Some(n), .. } if !cell.is_missing_value => {
                RawValue::Float(*n)
            }
            _ => RawValue::Null,
        }
    }

    fn validate_input(&self, props: &BaseColumnProps, value: &RawValue) -> Validation {
        let Some(number) = to_safe_number(value) else {
            return if props.is_required {
                Validation::Invalid
            } else {
                Validation::Valid
            };
        };
        if number.is_nan() {
            return Validation::Invalid;
        }
        match self.check_range(number) {
            Ok(checked) if checked != number => Validation::Corrected(RawValue::Float(checked)),
            Ok(_) => Validation::Valid,
            Err(_) => Validation::Invalid,
        }
    }
}
