use crate::columns::cell::{Cell, CellContent};
use crate::columns::coerce::to_safe_string;
use crate::columns::{BaseColumnProps, ColumnType};
use crate::value::RawValue;

/// Fallback for types without a dedicated column: shows the value as text.
#[derive(Clone, Debug, Default)]
pub struct ObjectColumn;

impl ColumnType for ObjectColumn {
    fn get_cell(&self, props: &BaseColumnProps, value: &RawValue, _validate: bool) -> Cell {
        let data = match value {
            RawValue::Null => None,
            other => Some(to_safe_string(other)),
        };
        let display_data = data.clone().unwrap_or_default();
        let missing = data.is_none();
        props
            .cell(CellContent::Text { data, display_data })
            .with_readonly(true)
            .with_missing(missing)
    }

    fn get_cell_value(&self, cell: &Cell) -> RawValue {
        match &cell.content {
            CellContent::Text { data: Some(data), .. } if !cell.is_missing_value => {
                RawValue::Str(data.clone())
            }
            _ => RawValue::Null,
        }
    }
}
