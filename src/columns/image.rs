use crate::columns::cell::{Cell, CellContent};
use crate::columns::coerce::to_safe_string;
use crate::columns::{BaseColumnProps, ColumnType};
use crate::value::RawValue;

/// Shows a URL or data URI as an image. Never editable.
#[derive(Clone, Debug, Default)]
pub struct ImageColumn;

impl ColumnType for ImageColumn {
    fn get_cell(&self, props: &BaseColumnProps, value: &RawValue, _validate: bool) -> Cell {
        let data = match value {
            RawValue::Null => Vec::new(),
            other => vec![to_safe_string(other)],
        };
        let missing = data.is_empty();
        props
            .cell(CellContent::Image { data })
            .with_readonly(true)
            .with_missing(missing)
    }

    fn get_cell_value(&self, cell: &Cell) -> RawValue {
        match &cell.content {
            CellContent::Image { data } => data
                .first()
                .cloned()
                .map(RawValue::Str)
                .unwrap_or(RawValue::Null),
            _ => RawValue::Null,
        }
    }
}
