use serde_json::json;

use crate::columns::cell::{error_cell, Cell, CellContent};
use crate::columns::coerce::to_safe_string;
use crate::columns::text::{TextParameters, TextValidator};
use crate::columns::{column_parameters, BaseColumnProps, ColumnType, Validation};
use crate::value::RawValue;

#[derive(Clone, Debug)]
pub struct MarkdownColumn {
    validator: TextValidator,
}

impl MarkdownColumn {
    pub fn new(props: &BaseColumnProps) -> Self {
        let params: TextParameters = column_parameters(json!({}), props);
        Self {
            validator: TextValidator::new(params.max_chars, params.validate.as_deref(), &props.name),
        }
    }
}

impl ColumnType for MarkdownColumn {
    fn get_cell(&self, props: &BaseColumnProps, value: &RawValue, validate: bool) -> Cell {
        if let Some(message) = self.validator.config_error() {
            return error_cell(&to_safe_string(value), message);
        }
        if value.is_null() {
            return props
                .cell(CellContent::Markdown { data: None })
                .with_missing(true);
        }
        match self.validator.checked_text(props, to_safe_string(value), validate) {
            Ok(text) => props.cell(CellContent::Markdown { data: Some(text) }),
            Err(cell) => cell,
        }
    }

    fn get_cell_value(&self, cell: &Cell) -> RawValue {
        match &cell.content {
            CellContent::Markdown { data: Some(data) } if !cell.is_missing_value => {
                RawValue::Str(data.clone())
            }
            _ => RawValue::Null,
        }
    }

    fn validate_input(&self, props: &BaseColumnProps, value: &RawValue) -> Validation {
        self.validator.validate(props, value)
    }
}
