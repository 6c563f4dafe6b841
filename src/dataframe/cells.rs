use arrow::datatypes::{DataType, TimeUnit};
use chrono::{DateTime, Utc};
use regex::Regex;

use crate::columns::cell::Cell;
use crate::columns::{is_decimal_type, ArrowType, BaseColumn, BaseColumnProps, ColumnKind};
use crate::dataframe::table::{ArrowTable, DataFrameCell, TableColumn};
use crate::value::RawValue;

pub use crate::columns::column_kind_from_arrow;

/// Id of the placeholder column from [`empty_index_column`].
pub const EMPTY_INDEX_ID: &str = "empty-index";

/// Foreground forced onto cells whose styler background is plain yellow.
pub const YELLOW_BACKGROUND_TEXT_COLOR: &str = "#31333F";

/// Builds the display cell for a value read from the table.
pub fn cell_from_arrow(
    column: &BaseColumn,
    arrow_cell: &DataFrameCell,
    css_styles: Option<&str>,
) -> Cell {
    let value = match column.kind() {
        ColumnKind::Object => match &arrow_cell.content {
            RawValue::Null => RawValue::Null,
            _ => RawValue::Str(arrow_cell.formatted.clone()),
        },
        ColumnKind::Date | ColumnKind::Time | ColumnKind::DateTime
            if arrow_cell.content.is_numeric() =>
        {
            date_from_arrow(arrow_cell)
                .map(RawValue::Date)
                .unwrap_or_else(|| arrow_cell.content.clone())
        }
        _ if is_decimal_type(&arrow_cell.content_type.type_name())
            && !arrow_cell.content.is_null() =>
        {
            RawValue::Str(arrow_cell.formatted.clone())
        }
        _ => arrow_cell.content.clone(),
    };

    let mut cell = column.get_cell(&value, false);
    if cell.is_error {
        return cell;
    }

    if !column.is_editable() {
        if let Some(display) = &arrow_cell.display_content {
            cell.set_display_text(display.clone());
        }
        if let (Some(css), Some(css_id)) = (css_styles, arrow_cell.css_id.as_deref()) {
            cell = apply_pandas_styler_css(cell, css_id, css);
        }
    }
    cell
}

fn date_from_arrow(arrow_cell: &DataFrameCell) -> Option<DateTime<Utc>> {
    let raw = match arrow_cell.content {
        RawValue::Int(v) => v as f64,
        RawValue::UInt(v) => v as f64,
        RawValue::Float(v) => v,
        RawValue::BigInt(v) => v as f64,
        _ => return None,
    };
    let millis = match arrow_cell.field.as_ref().map(|f| f.data_type()) {
        Some(DataType::Time32(unit)) | Some(DataType::Time64(unit)) => match unit {
            TimeUnit::Second => raw * 1000.0,
            TimeUnit::Millisecond => raw,
            TimeUnit::Microsecond => raw / 1000.0,
            TimeUnit::Nanosecond => raw / 1_000_000.0,
        },
        _ => raw,
    };
    if !millis.is_finite() {
        return None;
    }
    DateTime::from_timestamp_millis(millis.round() as i64)
}

/// Patches the theme of `cell` with the background and text color the
/// stylesheet assigns to `css_id`.
pub fn apply_pandas_styler_css(mut cell: Cell, css_id: &str, css_styles: &str) -> Cell {
    let background = extract_css_property(css_id, "background-color", css_styles);
    let color = extract_css_property(css_id, "color", css_styles);
    if background.is_none() && color.is_none() {
        return cell;
    }

    let mut theme = cell.theme_override.take().unwrap_or_default();
    let text_dark = match (&background, color) {
        (Some(bg), None) if bg == "yellow" => Some(YELLOW_BACKGROUND_TEXT_COLOR.to_string()),
        (_, color) => color,
    };
    if let Some(bg) = background {
        theme.bg_cell = Some(bg);
    }
    if let Some(text) = text_dark {
        theme.text_dark = Some(text);
    }
    cell.theme_override = (!theme.is_empty()).then_some(theme);
    cell
}

/// Value of `property` in the last rule targeting `#css_id`.
pub fn extract_css_property(css_id: &str, property: &str, css_styles: &str) -> Option<String> {
    let pattern = format!(
        r"#{}\s*(?:,[^{{]*)?\{{(?:[^}}]*[\s;])?{}:\s*([^;}}]+)",
        regex::escape(css_id),
        regex::escape(property)
    );
    let regex = Regex::new(&pattern).ok()?;
    regex
        .captures_iter(css_styles)
        .filter_map(|caps| caps.get(1))
        .last()
        .map(|value| value.as_str().trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Properties of the data column at `data_position`.
pub fn column_props_from_arrow(table: &ArrowTable, data_position: usize) -> Option<BaseColumnProps> {
    let column = table.data_columns().get(data_position)?;
    Some(BaseColumnProps {
        id: format!("column-{}-{}", column.name, data_position),
        name: column.name.clone(),
        title: column.name.clone(),
        index_number: data_position + table.num_index_columns(),
        arrow_type: column.arrow_type.clone(),
        is_editable: true,
        ..BaseColumnProps::default()
    })
}

/// Properties of the index column at `index_position`. A range index is
/// generated rather than stored, so it cannot be edited.
pub fn index_props_from_arrow(table: &ArrowTable, index_position: usize) -> Option<BaseColumnProps> {
    let column: &TableColumn = table.index_columns().get(index_position)?;
    Some(BaseColumnProps {
        id: format!("index-{index_position}"),
        name: column.name.clone(),
        title: column.name.clone(),
        index_number: index_position,
        arrow_type: column.arrow_type.clone(),
        is_editable: !column.is_range_index(),
        is_index: true,
        is_pinned: true,
        ..BaseColumnProps::default()
    })
}

/// The placeholder shown when no column survives configuration.
pub fn empty_index_column() -> BaseColumn {
    BaseColumn::new(
        ColumnKind::Object,
        BaseColumnProps {
            id: EMPTY_INDEX_ID.to_string(),
            title: String::new(),
            index_number: 0,
            arrow_type: ArrowType::new("empty", "object"),
            is_editable: false,
            is_index: true,
            is_pinned: true,
            ..BaseColumnProps::default()
        },
    )
}
