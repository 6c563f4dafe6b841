use regex::Regex;
use serde::Deserialize;
use serde_json::json;

use crate::columns::cell::{error_cell, Cell, CellContent};
use crate::columns::coerce::to_safe_string;
use crate::columns::{column_parameters, BaseColumnProps, ColumnType, Validation};
use crate::value::RawValue;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct TextParameters {
    pub max_chars: Option<usize>,
    pub validate: Option<String>,
}

#[derive(Clone, Debug)]
enum Pattern {
    Unset,
    Compiled(Regex),
    /// The configured pattern did not compile; holds the message shown in
    /// every cell of the column.
    Broken(String),
}

/// Character limit and regex check shared by the text-like columns.
#[derive(Clone, Debug)]
pub(crate) struct TextValidator {
    max_chars: Option<usize>,
    pattern: Pattern,
}

impl TextValidator {
    pub(crate) fn new(max_chars: Option<usize>, validate: Option<&str>, column: &str) -> Self {
        let pattern = match validate.filter(|p| !p.is_empty()) {
            None => Pattern::Unset,
            Some(source) => match Regex::new(source) {
                Ok(regex) => Pattern::Compiled(regex),
                Err(err) => {
                    tracing::warn!(
                        "Invalid validate regex '{}' configured for column '{}': {}",
                        source,
                        column,
                        err
                    );
                    Pattern::Broken(format!(
                        "Invalid validate regex: {source}.\nIgnoring validation. Error: {err}"
                    ))
                }
            },
        };
        Self {
            max_chars: max_chars.filter(|m| *m > 0),
            pattern,
        }
    }

    pub(crate) fn config_error(&self) -> Option<&str> {
        match &self.pattern {
            Pattern::Broken(message) => Some(message),
            _ => None,
        }
    }

    pub(crate) fn validate(&self, props: &BaseColumnProps, value: &RawValue) -> Validation {
        let text = match value {
            RawValue::Null => String::new(),
            other => to_safe_string(other),
        };
        if text.is_empty() {
            return if props.is_required {
                Validation::Invalid
            } else {
                Validation::Valid
            };
        }

        let mut corrected = None;
        if let Some(max_chars) = self.max_chars {
            if text.chars().count() > max_chars {
                corrected = Some(text.chars().take(max_chars).collect::<String>());
            }
        }

        let checked = corrected.as_deref().unwrap_or(&text);
        if let Pattern::Compiled(regex) = &self.pattern {
            if !regex.is_match(checked) {
                return Validation::Invalid;
            }
        }

        match corrected {
            Some(text) => Validation::Corrected(RawValue::Str(text)),
            None => Validation::Valid,
        }
    }

    /// Runs the checks for `get_cell`: returns the text to show, or the error
    /// cell when the value is rejected.
    pub(crate) fn checked_text(
        &self,
        props: &BaseColumnProps,
        text: String,
        validate: bool,
    ) -> Result<String, Cell> {
        if !validate {
            return Ok(text);
        }
        match self.validate(props, &RawValue::Str(text.clone())) {
            Validation::Valid => Ok(text),
            Validation::Corrected(value) => Ok(to_safe_string(&value)),
            Validation::Invalid => Err(error_cell(&text, "Invalid input.")),
        }
    }
}

#[derive(Clone, Debug)]
pub struct TextColumn {
    validator: TextValidator,
}

impl TextColumn {
    pub fn new(props: &BaseColumnProps) -> Self {
        let params: TextParameters = column_parameters(json!({}), props);
        Self {
            validator: TextValidator::new(params.max_chars, params.validate.as_deref(), &props.name),
        }
    }
}

impl ColumnType for TextColumn {
    fn get_cell(&self, props: &BaseColumnProps, value: &RawValue, validate: bool) -> Cell {
        if let Some(message) = self.validator.config_error() {
            return error_cell(&to_safe_string(value), message);
        }
        if value.is_null() {
            return props
                .cell(CellContent::Text {
                    data: None,
                    display_data: String::new(),
                })
                .with_missing(true);
        }

        let text = match self.validator.checked_text(props, to_safe_string(value), validate) {
            Ok(text) => text,
            Err(cell) => return cell,
        };
        props.cell(CellContent::Text {
            data: Some(text.clone()),
            display_data: text,
        })
    }

    fn get_cell_value(&self, cell: &Cell) -> RawValue {
        match &cell.content {
            CellContent::Text { data: Some(data), .. } if !cell.is_missing_value => {
                RawValue::Str(data.clone())
            }
            _ => RawValue::Null,
        }
    }

    fn validate_input(&self, props: &BaseColumnProps, value: &RawValue) -> Validation {
        self.validator.validate(props, value)
    }
}
