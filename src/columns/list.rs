use crate::columns::cell::{Cell, CellContent};
use crate::columns::coerce::{to_safe_array, to_safe_string};
use crate::columns::{BaseColumnProps, ColumnType};
use crate::value::RawValue;

/// Flattened clipboard form of a list: elements joined with `,`, with commas
/// inside elements replaced by spaces. Values containing commas therefore do
/// not survive a copy and paste unchanged.
pub fn list_copy_data(items: &[String]) -> String {
    items
        .iter()
        .map(|item| item.replace(',', " "))
        .collect::<Vec<_>>()
        .join(",")
}

/// Text shown for one list item. Missing items show as empty.
pub(crate) fn list_item_text(item: &RawValue) -> String {
    match item {
        RawValue::Null => String::new(),
        other => to_safe_string(other),
    }
}

#[derive(Clone, Debug, Default)]
pub struct ListColumn;

impl ColumnType for ListColumn {
    fn get_cell(&self, props: &BaseColumnProps, value: &RawValue, _validate: bool) -> Cell {
        if value.is_null() {
            return props
                .cell(CellContent::Bubble {
                    data: Vec::new(),
                    values: Vec::new(),
                })
                .with_copy_data("")
                .with_missing(true);
        }
        let values = to_safe_array(value);
        let data: Vec<String> = values.iter().map(list_item_text).collect();
        let copy_data = list_copy_data(&data);
        props
            .cell(CellContent::Bubble { data, values })
            .with_copy_data(copy_data)
    }

    fn get_cell_value(&self, cell: &Cell) -> RawValue {
        match &cell.content {
            CellContent::Bubble { values, .. } if !cell.is_missing_value => {
                RawValue::List(values.clone())
            }
            _ => RawValue::Null,
        }
    }
}
