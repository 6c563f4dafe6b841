use serde::Deserialize;
use serde_json::json;

use crate::columns::cell::{error_cell, Cell, CellContent, ChartKind};
use crate::columns::coerce::{number_to_string, to_safe_array, to_safe_number, to_safe_string};
use crate::columns::format::format_number;
use crate::columns::{column_parameters, lenient_f64, BaseColumnProps, ColumnType};
use crate::value::RawValue;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ChartParameters {
    #[serde(deserialize_with = "lenient_f64")]
    pub y_min: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub y_max: Option<f64>,
}

/// Line, bar and area charts of a numeric array. Never editable.
#[derive(Clone, Debug)]
pub struct ChartColumn {
    graph_kind: ChartKind,
    params: ChartParameters,
}

impl ChartColumn {
    pub fn new(props: &BaseColumnProps, graph_kind: ChartKind) -> Self {
        Self {
            graph_kind,
            params: column_parameters(json!({ "y_min": 0, "y_max": 1 }), props),
        }
    }

    fn y_axis(&self) -> Option<(f64, f64)> {
        match (self.params.y_min, self.params.y_max) {
            (Some(min), Some(max)) if !min.is_nan() && !max.is_nan() && min < max => {
                Some((min, max))
            }
            _ => None,
        }
    }
}

/// Rescales `values` into `[y_min, y_max]` when any of them falls outside.
/// A constant series is pinned to the nearest bound instead.
pub fn normalize_chart_values(values: &[f64], y_min: f64, y_max: f64) -> Vec<f64> {
    let Some(max) = values.iter().copied().reduce(f64::max) else {
        return Vec::new();
    };
    let min = values.iter().copied().fold(max, f64::min);
    if max <= y_max && min >= y_min {
        return values.to_vec();
    }
    values
        .iter()
        .map(|value| {
            if max == min {
                if max > y_max {
                    y_max
                } else {
                    y_min
                }
            } else {
                (y_max - y_min) * (value - min) / (max - min) + y_min
            }
        })
        .collect()
}

impl ColumnType for ChartColumn {
    fn get_cell(&self, props: &BaseColumnProps, value: &RawValue, _validate: bool) -> Cell {
        let Some((y_min, y_max)) = self.y_axis() else {
            let show = |bound: Option<f64>| bound.map(number_to_string).unwrap_or_else(|| "null".into());
            return error_cell(
                "Invalid min/max y-axis configuration",
                &format!(
                    "The y_min ({}) and y_max ({}) configuration options must be valid numbers and y_min must be smaller than y_max.",
                    show(self.params.y_min),
                    show(self.params.y_max)
                ),
            );
        };

        let mut numbers = Vec::new();
        for item in to_safe_array(value) {
            match to_safe_number(&item) {
                None => continue,
                Some(n) if n.is_nan() => {
                    return error_cell(
                        &to_safe_string(value),
                        "The value cannot be interpreted as a numeric array.",
                    )
                }
                Some(n) => numbers.push(n),
            }
        }

        let display_values = numbers
            .iter()
            .map(|n| format_number(*n, None, None))
            .collect();
        let missing = value.is_null();
        props
            .cell(CellContent::Sparkline {
                values: normalize_chart_values(&numbers, y_min, y_max),
                display_values,
                graph_kind: self.graph_kind,
                y_axis: (y_min, y_max),
            })
            .with_readonly(true)
            .with_missing(missing)
    }

    fn get_cell_value(&self, cell: &Cell) -> RawValue {
        match &cell.content {
            CellContent::Sparkline { values, .. } if !cell.is_missing_value => {
                RawValue::List(values.iter().copied().map(RawValue::Float).collect())
            }
            _ => RawValue::Null,
        }
    }
}
