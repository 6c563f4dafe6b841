use serde::Deserialize;
use serde_json::json;

use crate::columns::cell::{error_cell, Cell, CellContent};
use crate::columns::coerce::{number_to_string, to_safe_number, to_safe_string};
use crate::columns::format::{count_decimals, format_number, truncate_decimals};
use crate::columns::{column_parameters, is_integer_type, lenient_f64, BaseColumnProps, ColumnType};
use crate::value::RawValue;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProgressParameters {
    #[serde(deserialize_with = "lenient_f64")]
    pub min_value: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub max_value: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub step: Option<f64>,
    pub format: Option<String>,
}

/// A read-only progress bar.
#[derive(Clone, Debug)]
pub struct ProgressColumn {
    params: ProgressParameters,
}

impl ProgressColumn {
    pub fn new(props: &BaseColumnProps) -> Self {
        let integer = is_integer_type(&props.arrow_type.type_name());
        let defaults = if integer {
            json!({ "min_value": 0, "max_value": 100, "step": 1, "format": "%3d%%" })
        } else {
            json!({ "min_value": 0, "max_value": 1, "step": 0.01, "format": "percent" })
        };
        Self {
            params: column_parameters::<ProgressParameters>(defaults, props),
        }
    }

    fn label(&self, value: f64, decimals: usize) -> String {
        format_number(value, self.params.format.as_deref(), Some(decimals))
    }
}

impl ColumnType for ProgressColumn {
    fn get_cell(&self, props: &BaseColumnProps, value: &RawValue, _validate: bool) -> Cell {
        let (min, max) = match (self.params.min_value, self.params.max_value) {
            (Some(min), Some(max)) if min.is_finite() && max.is_finite() && min < max => (min, max),
            (min, max) => {
                let show = |v: Option<f64>| v.map(number_to_string).unwrap_or_else(|| "null".into());
                return error_cell(
                    "Invalid min/max parameters",
                    &format!(
                        "The min_value ({}) and max_value ({}) parameters must be valid numbers and min_value must be smaller than max_value.",
                        show(min),
                        show(max)
                    ),
                );
            }
        };
        let step = match self.params.step {
            Some(step) if step.is_finite() && step > 0.0 => step,
            step => {
                return error_cell(
                    "Invalid step parameter",
                    &format!(
                        "The step parameter ({}) must be a valid positive number.",
                        step.map(number_to_string).unwrap_or_else(|| "null".into())
                    ),
                )
            }
        };

        let range = |value: Option<f64>, label: String| CellContent::Range {
            value,
            min,
            max,
            step,
            label,
            measure_label: self.label(max, count_decimals(step)),
        };

        let Some(number) = to_safe_number(value) else {
            return props
                .cell(range(None, String::new()))
                .with_readonly(true)
                .with_missing(true);
        };
        if number.is_nan() {
            return error_cell(
                &to_safe_string(value),
                "The value cannot be interpreted as a number.",
            );
        }

        let decimals = count_decimals(step);
        let clamped = truncate_decimals(number.clamp(min, max), decimals);
        // The label shows the unclamped value.
        let label = self.label(number, decimals);
        props
            .cell(range(Some(clamped), label))
            .with_readonly(true)
            .with_copy_data(number_to_string(number))
    }

    fn get_cell_value(&self, cell: &Cell) -> RawValue {
        match &cell.content {
            CellContent::Range { value: Some(v), .. } if !cell.is_missing_value => {
                RawValue::Float(*v)
            }
            _ => RawValue::Null,
        }
    }
}
