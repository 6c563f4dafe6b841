use crate::columns::cell::{error_cell, Cell, CellContent};
use crate::columns::coerce::{to_safe_boolean, to_safe_string, Coerced};
use crate::columns::{BaseColumnProps, ColumnType, Validation};
use crate::value::RawValue;

#[derive(Clone, Debug, Default)]
pub struct CheckboxColumn;

impl ColumnType for CheckboxColumn {
    fn get_cell(&self, props: &BaseColumnProps, value: &RawValue, _validate: bool) -> Cell {
        let data = match to_safe_boolean(value) {
            Coerced::Value(b) => Some(b),
            Coerced::Missing => None,
            Coerced::Invalid => {
                return error_cell(
                    &to_safe_string(value),
                    "The value cannot be interpreted as boolean.",
                )
            }
        };
        props
            .cell(CellContent::Boolean { data })
            .with_overlay(false)
            .with_missing(data.is_none())
    }

    fn get_cell_value(&self, cell: &Cell) -> RawValue {
        match &cell.content {
            CellContent::Boolean { data: Some(b) } => RawValue::Bool(*b),
            _ => RawValue::Null,
        }
    }

    fn validate_input(&self, props: &BaseColumnProps, value: &RawValue) -> Validation {
        match to_safe_boolean(value) {
            Coerced::Value(_) => Validation::Valid,
            Coerced::Missing if !props.is_required => Validation::Valid,
            Coerced::Missing | Coerced::Invalid => Validation::Invalid,
        }
    }
}
