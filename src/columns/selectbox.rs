use serde::Deserialize;
use serde_json::{json, Value};

use crate::columns::cell::{error_cell, Cell, CellContent};
use crate::columns::coerce::{number_to_string, to_safe_boolean, to_safe_number, to_safe_string};
use crate::columns::format::to_json_string;
use crate::columns::{column_parameters, BaseColumnProps, ColumnType, Validation};
use crate::value::RawValue;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct SelectboxParameters {
    pub options: Vec<Value>,
}

/// The type all options share, used to restore typed values from the
/// string the dropdown holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OptionType {
    Number,
    Boolean,
    String,
}

#[derive(Clone, Debug)]
pub struct SelectboxColumn {
    allowed_values: Vec<Option<String>>,
    option_type: OptionType,
}

impl SelectboxColumn {
    pub fn new(props: &BaseColumnProps) -> Self {
        let default_options: Vec<Value> = if props.arrow_type.type_name() == "bool" {
            vec![Value::Bool(true), Value::Bool(false)]
        } else {
            props
                .arrow_type
                .categories
                .clone()
                .unwrap_or_default()
                .into_iter()
                .map(Value::String)
                .collect()
        };
        let params: SelectboxParameters =
            column_parameters(json!({ "options": default_options }), props);

        let option_type = OptionType::infer(&params.options);

        let mut allowed_values = Vec::with_capacity(params.options.len() + 1);
        if !props.is_required {
            allowed_values.push(None);
        }
        allowed_values.extend(
            params
                .options
                .iter()
                .filter(|opt| !opt.is_null() && opt.as_str() != Some(""))
                .map(|opt| Some(option_text(opt))),
        );

        Self {
            allowed_values,
            option_type,
        }
    }

    pub fn allowed_values(&self) -> &[Option<String>] {
        &self.allowed_values
    }

    pub fn option_type(&self) -> OptionType {
        self.option_type
    }

    fn is_allowed(&self, value: &str) -> bool {
        self.allowed_values
            .iter()
            .any(|allowed| allowed.as_deref() == Some(value))
    }
}

impl OptionType {
    /// The shared type of `options`, or `String` when they are mixed.
    pub(crate) fn infer<'a>(options: impl IntoIterator<Item = &'a Value>) -> Self {
        let mut kinds = options
            .into_iter()
            .filter(|opt| !opt.is_null())
            .map(|opt| match opt {
                Value::Number(_) => Self::Number,
                Value::Bool(_) => Self::Boolean,
                _ => Self::String,
            });
        let Some(first) = kinds.next() else {
            return Self::String;
        };
        if kinds.all(|kind| kind == first) {
            first
        } else {
            Self::String
        }
    }

    /// Turns option text back into a value of this type. Typed values and
    /// text that does not parse are returned as they are.
    pub(crate) fn restore(self, value: RawValue) -> RawValue {
        if !matches!(value, RawValue::Str(_)) {
            return value;
        }
        let restored = match self {
            Self::Number => to_safe_number(&value)
                .filter(|n| !n.is_nan())
                .map(RawValue::Float),
            Self::Boolean => to_safe_boolean(&value).value().map(RawValue::Bool),
            Self::String => None,
        };
        restored.unwrap_or(value)
    }
}

/// Text form of a configured option. Numbers print without a trailing `.0`
/// so they match the text of integer cell values.
pub(crate) fn option_text(option: &Value) -> String {
    match option.as_f64() {
        Some(number) if option.is_number() => number_to_string(number),
        _ => to_json_string(option),
    }
}

impl ColumnType for SelectboxColumn {
    fn get_cell(&self, props: &BaseColumnProps, value: &RawValue, validate: bool) -> Cell {
        let selected = match value {
            RawValue::Null => None,
            other => Some(to_safe_string(other)).filter(|s| !s.is_empty()),
        };

        if validate {
            if let Some(selected) = &selected {
                if !self.is_allowed(selected) {
                    return error_cell(selected, "The value is not part of the allowed options.");
                }
            }
        }

        let copy_data = selected.clone().unwrap_or_default();
        props
            .cell(CellContent::Dropdown {
                value: selected.clone(),
                allowed_values: self.allowed_values.clone(),
            })
            .with_copy_data(copy_data)
            .with_missing(selected.is_none())
    }

    fn get_cell_value(&self, cell: &Cell) -> RawValue {
        let CellContent::Dropdown {
            value: Some(value), ..
        } = &cell.content
        else {
            return RawValue::Null;
        };
        if value.is_empty() {
            return RawValue::Null;
        }
        self.option_type.restore(RawValue::Str(value.clone()))
    }

    fn validate_input(&self, props: &BaseColumnProps, value: &RawValue) -> Validation {
        match value {
            RawValue::Null => {
                if props.is_required {
                    Validation::Invalid
                } else {
                    Validation::Valid
                }
            }
            other if self.is_allowed(&to_safe_string(other)) => Validation::Valid,
            _ => Validation::Invalid,
        }
    }
}
