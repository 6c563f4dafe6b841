use serde::Deserialize;
use serde_json::{json, Value};

use crate::columns::cell::{Cell, CellContent, SelectOption};
use crate::columns::coerce::to_safe_array;
use crate::columns::list::{list_copy_data, list_item_text};
use crate::columns::selectbox::{option_text, OptionType};
use crate::columns::{column_parameters, BaseColumnProps, ColumnType, Validation};
use crate::value::RawValue;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct MultiSelectParameters {
    pub options: Vec<Value>,
    pub accept_new_options: bool,
}

#[derive(Clone, Debug)]
pub struct MultiSelectColumn {
    options: Vec<SelectOption>,
    option_type: OptionType,
    accept_new_options: bool,
}

impl MultiSelectColumn {
    pub fn new(props: &BaseColumnProps) -> Self {
        let params: MultiSelectParameters =
            column_parameters(json!({ "options": [], "accept_new_options": false }), props);
        let option_type = OptionType::infer(params.options.iter().map(|opt| match opt {
            Value::Object(map) => map.get("value").unwrap_or(&Value::Null),
            other => other,
        }));
        let options = params
            .options
            .iter()
            .filter(|opt| !opt.is_null())
            .map(|opt| match opt {
                Value::Object(map) => SelectOption {
                    value: map.get("value").map(option_text).unwrap_or_default(),
                    label: map.get("label").and_then(Value::as_str).map(str::to_string),
                    color: map.get("color").and_then(Value::as_str).map(str::to_string),
                },
                other => SelectOption {
                    value: option_text(other),
                    label: None,
                    color: None,
                },
            })
            .filter(|opt| !opt.value.is_empty())
            .collect();
        Self {
            options,
            option_type,
            accept_new_options: params.accept_new_options,
        }
    }

    pub fn options(&self) -> &[SelectOption] {
        &self.options
    }

    fn is_option(&self, item: &RawValue) -> bool {
        let text = list_item_text(item);
        self.options.iter().any(|opt| opt.value == text)
    }

    /// Selected items, with option text turned back into the options' type.
    fn selected_items(&self, value: &RawValue, only_options: bool) -> Vec<RawValue> {
        let mut items = to_safe_array(value);
        if only_options {
            items.retain(|item| self.is_option(item));
        }
        items
            .into_iter()
            .map(|item| self.option_type.restore(item))
            .collect()
    }
}

impl ColumnType for MultiSelectColumn {
    fn get_cell(&self, props: &BaseColumnProps, value: &RawValue, validate: bool) -> Cell {
        let content = |values: Option<Vec<String>>, items: Vec<RawValue>| CellContent::MultiSelect {
            values,
            items,
            options: self.options.clone(),
            allow_creation: self.accept_new_options,
        };
        if value.is_null() {
            return props
                .cell(content(None, Vec::new()))
                .with_copy_data("")
                .with_missing(true);
        }

        let items = self.selected_items(value, validate && !self.accept_new_options);
        let values: Vec<String> = items.iter().map(list_item_text).collect();
        let copy_data = list_copy_data(&values);
        props
            .cell(content(Some(values), items))
            .with_copy_data(copy_data)
    }

    fn get_cell_value(&self, cell: &Cell) -> RawValue {
        match &cell.content {
            CellContent::MultiSelect {
                values: Some(_),
                items,
                ..
            } if !cell.is_missing_value => RawValue::List(items.clone()),
            _ => RawValue::Null,
        }
    }

    fn validate_input(&self, props: &BaseColumnProps, value: &RawValue) -> Validation {
        if value.is_null() {
            return if props.is_required {
                Validation::Invalid
            } else {
                Validation::Valid
            };
        }
        if self.accept_new_options {
            return Validation::Valid;
        }
        let total = to_safe_array(value).len();
        let kept = self.selected_items(value, true);
        if kept.len() == total {
            Validation::Valid
        } else {
            Validation::Corrected(RawValue::List(kept))
        }
    }
}
