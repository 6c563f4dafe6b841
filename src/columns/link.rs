use regex::Regex;
use serde::Deserialize;
use serde_json::json;

use crate::columns::cell::{error_cell, Cell, CellContent};
use crate::columns::coerce::to_safe_string;
use crate::columns::text::TextValidator;
use crate::columns::{column_parameters, BaseColumnProps, ColumnType, Validation};
use crate::value::RawValue;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct LinkParameters {
    pub max_chars: Option<usize>,
    pub validate: Option<String>,
    pub display_text: Option<String>,
}

#[derive(Clone, Debug)]
enum DisplayText {
    Href,
    Literal(String),
    /// First capture group of the pattern applied to the href.
    Extract(Regex),
}

#[derive(Clone, Debug)]
pub struct LinkColumn {
    validator: TextValidator,
    display: DisplayText,
}

impl LinkColumn {
    pub fn new(props: &BaseColumnProps) -> Self {
        let params: LinkParameters = column_parameters(json!({}), props);
        let display = match params.display_text.filter(|t| !t.is_empty()) {
            None => DisplayText::Href,
            Some(text) if text.contains('(') && text.contains(')') => match Regex::new(&text) {
                Ok(regex) => DisplayText::Extract(regex),
                Err(err) => {
                    tracing::debug!("display_text '{}' is not a pattern: {}", text, err);
                    DisplayText::Literal(text)
                }
            },
            Some(text) => DisplayText::Literal(text),
        };
        Self {
            validator: TextValidator::new(params.max_chars, params.validate.as_deref(), &props.name),
            display,
        }
    }

    /// Text shown for `href`.
    pub fn display_text(&self, href: &str) -> String {
        match &self.display {
            DisplayText::Href => href.to_string(),
            DisplayText::Literal(text) => text.clone(),
            DisplayText::Extract(regex) => regex
                .captures(href)
                .and_then(|caps| caps.get(1))
                .map(|group| decode_uri(group.as_str()))
                .unwrap_or_else(|| href.to_string()),
        }
    }
}

impl ColumnType for LinkColumn {
    fn get_cell(&self, props: &BaseColumnProps, value: &RawValue, validate: bool) -> Cell {
        if let Some(message) = self.validator.config_error() {
            return error_cell(&to_safe_string(value), message);
        }
        if value.is_null() {
            return props
                .cell(CellContent::Uri {
                    data: None,
                    display_data: String::new(),
                })
                .with_missing(true);
        }

        let href = match self.validator.checked_text(props, to_safe_string(value), validate) {
            Ok(href) => href,
            Err(cell) => return cell,
        };
        let display_data = self.display_text(&href);
        props.cell(CellContent::Uri {
            data: Some(href),
            display_data,
        })
    }

    fn get_cell_value(&self, cell: &Cell) -> RawValue {
        match &cell.content {
            CellContent::Uri { data: Some(data), .. } if !cell.is_missing_value => {
                RawValue::Str(data.clone())
            }
            _ => RawValue::Null,
        }
    }

    fn validate_input(&self, props: &BaseColumnProps, value: &RawValue) -> Validation {
        self.validator.validate(props, value)
    }
}

/// Decodes percent escapes the way `decodeURI` does: reserved characters
/// stay escaped, and malformed input is returned unchanged.
pub fn decode_uri(input: &str) -> String {
    const RESERVED: &[u8] = b";/?:@&=+$,#";

    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let decoded = bytes
                .get(i + 1..i + 3)
                .and_then(|hex| std::str::from_utf8(hex).ok())
                .and_then(|hex| u8::from_str_radix(hex, 16).ok());
            match decoded {
                Some(byte) if RESERVED.contains(&byte) => out.extend_from_slice(&bytes[i..i + 3]),
                Some(byte) => out.push(byte),
                None => return input.to_string(),
            }
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).unwrap_or_else(|_| input.to_string())
}
