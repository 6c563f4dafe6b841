use std::collections::HashMap;
use std::sync::Arc;

use arrow::array::{
    ArrayRef, BooleanArray, Date32Array, Decimal128Array, DictionaryArray, DurationSecondArray,
    Float64Array, Int64Array, ListArray, StringArray, Time64MicrosecondArray,
    TimestampMillisecondArray,
};
use arrow::datatypes::{DataType, Field, Int32Type, Int8Type, Schema};
use arrow::record_batch::RecordBatch;

use editgrid::columns::cell::{CellContent, ThemeOverride};
use editgrid::dataframe::cells::{
    apply_pandas_styler_css, cell_from_arrow, column_kind_from_arrow, column_props_from_arrow,
    empty_index_column, extract_css_property, index_props_from_arrow, EMPTY_INDEX_ID,
    YELLOW_BACKGROUND_TEXT_COLOR,
};
use editgrid::{ArrowTable, BaseColumn, ColumnKind, RawValue, Styler};

const PANDAS_METADATA: &str = r#"{
    "index_columns": [{"kind": "range", "name": null, "start": 10, "stop": 13, "step": 1}],
    "columns": [
        {"name": "name", "field_name": "name", "pandas_type": "unicode", "numpy_type": "object", "metadata": null},
        {"name": "price", "field_name": "price", "pandas_type": "float64", "numpy_type": "float64", "metadata": null}
    ]
}"#;

fn pandas_table() -> ArrowTable {
    let schema = Schema::new(vec![
        Field::new("name", DataType::Utf8, true),
        Field::new("price", DataType::Float64, true),
    ])
    .with_metadata(HashMap::from([(
        "pandas".to_string(),
        PANDAS_METADATA.to_string(),
    )]));
    let batch = RecordBatch::try_new(
        Arc::new(schema),
        vec![
            Arc::new(StringArray::from(vec![Some("apple"), None, Some("cherry")])) as ArrayRef,
            Arc::new(Float64Array::from(vec![1.0, 2.5, 3.25])) as ArrayRef,
        ],
    )
    .unwrap();
    ArrowTable::from_batch(batch).unwrap()
}

fn single_column_table(name: &str, array: ArrayRef) -> ArrowTable {
    let batch = RecordBatch::try_from_iter(vec![(name, array)]).unwrap();
    ArrowTable::from_batch(batch).unwrap()
}

fn data_column(table: &ArrowTable, position: usize) -> BaseColumn {
    let props = column_props_from_arrow(table, position).unwrap();
    BaseColumn::new(column_kind_from_arrow(&props.arrow_type), props)
}

fn display(table: &ArrowTable, row: usize, position: usize) -> String {
    let column = data_column(table, position - table.num_index_columns());
    let cell = table.get_cell(row, position).unwrap();
    cell_from_arrow(&column, &cell, table.css_styles()).display_text()
}

#[test]
fn test_pandas_metadata_splits_index_and_data() {
    let table = pandas_table();
    assert_eq!(table.num_rows(), 3);
    assert_eq!(table.num_index_columns(), 1);
    assert_eq!(table.num_data_columns(), 2);
    assert_eq!(table.num_columns(), 3);
    assert!(table.column(0).unwrap().is_range_index());
    assert_eq!(table.column(1).unwrap().name, "name");
    assert_eq!(table.column(2).unwrap().arrow_type.type_name(), "float64");
    assert!(table.column(3).is_none());
}

#[test]
fn test_range_index_values_are_generated() {
    let table = pandas_table();
    let cell = table.get_cell(2, 0).unwrap();
    assert_eq!(cell.content, RawValue::Int(12));
    assert!(cell.field.is_none());
    assert_eq!(cell.formatted, "12");

    let props = index_props_from_arrow(&table, 0).unwrap();
    assert!(props.is_index);
    assert!(props.is_pinned);
    assert!(!props.is_editable);
    assert_eq!(props.id, "index-0");
}

#[test]
fn test_data_cells_and_nulls() {
    let table = pandas_table();
    assert_eq!(
        table.get_cell(0, 1).unwrap().content,
        RawValue::Str("apple".to_string())
    );
    assert_eq!(table.get_cell(1, 1).unwrap().content, RawValue::Null);
    assert_eq!(table.get_cell(2, 2).unwrap().content, RawValue::Float(3.25));

    let props = column_props_from_arrow(&table, 1).unwrap();
    assert_eq!(props.id, "column-price-1");
    assert_eq!(props.index_number, 2);
}

#[test]
fn test_out_of_bounds_cells_are_errors() {
    let table = pandas_table();
    assert!(table.get_cell(3, 1).is_err());
    assert!(table.get_cell(0, 7).is_err());
}

#[test]
fn test_named_index_field() {
    let metadata = r#"{
        "index_columns": ["__index_level_0__"],
        "columns": [
            {"name": "value", "field_name": "value", "pandas_type": "int64", "numpy_type": "int64"},
            {"name": null, "field_name": "__index_level_0__", "pandas_type": "unicode", "numpy_type": "object"}
        ]
    }"#;
    let schema = Schema::new(vec![
        Field::new("value", DataType::Int64, true),
        Field::new("__index_level_0__", DataType::Utf8, true),
    ])
    .with_metadata(HashMap::from([("pandas".to_string(), metadata.to_string())]));
    let batch = RecordBatch::try_new(
        Arc::new(schema),
        vec![
            Arc::new(Int64Array::from(vec![5, 6])) as ArrayRef,
            Arc::new(StringArray::from(vec!["a", "b"])) as ArrayRef,
        ],
    )
    .unwrap();
    let table = ArrowTable::from_batch(batch).unwrap();

    assert_eq!(table.num_index_columns(), 1);
    assert_eq!(table.index_columns()[0].name, "");
    assert!(!table.index_columns()[0].is_range_index());
    assert_eq!(table.get_cell(1, 0).unwrap().content, RawValue::Str("b".to_string()));
    assert_eq!(table.get_cell(1, 1).unwrap().content, RawValue::Int(6));
    assert!(index_props_from_arrow(&table, 0).unwrap().is_editable);
}

#[test]
fn test_table_without_metadata_infers_types() {
    let batch = RecordBatch::try_from_iter(vec![
        ("flag", Arc::new(BooleanArray::from(vec![true])) as ArrayRef),
        ("label", Arc::new(StringArray::from(vec!["x"])) as ArrayRef),
    ])
    .unwrap();
    let table = ArrowTable::from_batch(batch).unwrap();
    assert_eq!(table.num_index_columns(), 0);
    assert_eq!(data_column(&table, 0).kind(), ColumnKind::Checkbox);
    assert_eq!(data_column(&table, 1).kind(), ColumnKind::Text);
}

#[test]
fn test_date32_cell() {
    let table = single_column_table("day", Arc::new(Date32Array::from(vec![19737])));
    assert_eq!(
        table.get_cell(0, 0).unwrap().content,
        RawValue::Int(19737 * 86_400_000)
    );
    assert_eq!(data_column(&table, 0).kind(), ColumnKind::Date);
    assert_eq!(display(&table, 0, 0), "2024-01-15");
}

#[test]
fn test_time_cell_uses_field_unit() {
    let table = single_column_table(
        "at",
        Arc::new(Time64MicrosecondArray::from(vec![34_200_000_000])),
    );
    assert_eq!(data_column(&table, 0).kind(), ColumnKind::Time);
    assert_eq!(display(&table, 0, 0), "09:30:00");
}

#[test]
fn test_timestamp_with_timezone() {
    let array = TimestampMillisecondArray::from(vec![1_705_312_800_000]).with_timezone("+02:00");
    let table = single_column_table("at", Arc::new(array));
    let column = data_column(&table, 0);
    assert_eq!(column.kind(), ColumnKind::DateTime);
    assert_eq!(column.arrow_type().timezone.as_deref(), Some("+02:00"));
    assert_eq!(display(&table, 0, 0), "2024-01-15 12:00:00");
}

#[test]
fn test_decimal_cell_uses_formatted_value() {
    let array = Decimal128Array::from(vec![12345])
        .with_precision_and_scale(10, 2)
        .unwrap();
    let table = single_column_table("amount", Arc::new(array));
    let cell = table.get_cell(0, 0).unwrap();
    assert_eq!(cell.content, RawValue::BigInt(12345));
    assert_eq!(cell.formatted, "123.45");
    assert_eq!(cell.content_type.decimal, Some((10, 2)));

    let column = data_column(&table, 0);
    assert_eq!(column.kind(), ColumnKind::Number);
    let cell = cell_from_arrow(&column, &cell, None);
    assert_eq!(column.get_cell_value(&cell), RawValue::Float(123.45));
    assert_eq!(cell.display_text(), "123.45");
}

#[test]
fn test_categorical_cell() {
    let array: DictionaryArray<Int8Type> = vec!["low", "high", "low"].into_iter().collect();
    let table = single_column_table("level", Arc::new(array));
    let column = data_column(&table, 0);
    assert_eq!(column.kind(), ColumnKind::Selectbox);
    assert_eq!(
        column.arrow_type().categories,
        Some(vec!["low".to_string(), "high".to_string()])
    );
    assert_eq!(
        table.get_cell(1, 0).unwrap().content,
        RawValue::Str("high".to_string())
    );
    assert_eq!(display(&table, 2, 0), "low");
}

#[test]
fn test_list_cell() {
    let array = ListArray::from_iter_primitive::<Int32Type, _, _>(vec![
        Some(vec![Some(1), Some(2)]),
        None,
    ]);
    let table = single_column_table("tags", Arc::new(array));
    let column = data_column(&table, 0);
    assert_eq!(column.arrow_type().type_name(), "list[int32]");
    assert_eq!(column.kind(), ColumnKind::List);
    assert_eq!(
        table.get_cell(0, 0).unwrap().content,
        RawValue::List(vec![RawValue::Int(1), RawValue::Int(2)])
    );
    assert_eq!(display(&table, 0, 0), "1,2");
    assert_eq!(table.get_cell(1, 0).unwrap().content, RawValue::Null);
}

#[test]
fn test_duration_is_humanized() {
    let table = single_column_table("elapsed", Arc::new(DurationSecondArray::from(vec![10_800])));
    let column = data_column(&table, 0);
    assert_eq!(column.kind(), ColumnKind::Object);
    assert_eq!(display(&table, 0, 0), "3 hours");
}

#[test]
fn test_period_column_from_metadata() {
    let metadata = r#"{
        "index_columns": [],
        "columns": [{"name": "month", "field_name": "month", "pandas_type": "object", "numpy_type": "period[M]"}]
    }"#;
    let schema = Schema::new(vec![Field::new("month", DataType::Int64, true)])
        .with_metadata(HashMap::from([("pandas".to_string(), metadata.to_string())]));
    let batch = RecordBatch::try_new(
        Arc::new(schema),
        vec![Arc::new(Int64Array::from(vec![648])) as ArrayRef],
    )
    .unwrap();
    let table = ArrowTable::from_batch(batch).unwrap();
    assert_eq!(table.get_cell(0, 0).unwrap().formatted, "2024-01");
    assert_eq!(display(&table, 0, 0), "2024-01");
}

const CSS: &str = "#T_abcrow0_col1 { background-color: yellow; }\n\
    #T_abcrow1_col1, #T_abcrow2_col1 { color: red; background-color: #fff }\n\
    #T_abcrow1_col1 { color: blue }";

#[test]
fn test_extract_css_property() {
    assert_eq!(
        extract_css_property("T_abcrow0_col1", "background-color", CSS).as_deref(),
        Some("yellow")
    );
    assert_eq!(extract_css_property("T_abcrow0_col1", "color", CSS), None);
    assert_eq!(
        extract_css_property("T_abcrow2_col1", "color", CSS).as_deref(),
        Some("red")
    );
    assert_eq!(
        extract_css_property("T_abcrow2_col1", "background-color", CSS).as_deref(),
        Some("#fff")
    );
    // The last matching rule wins.
    assert_eq!(
        extract_css_property("T_abcrow1_col1", "color", CSS).as_deref(),
        Some("blue")
    );
    assert_eq!(extract_css_property("T_abcrow9_col1", "color", CSS), None);
}

#[test]
fn test_yellow_background_forces_dark_text() {
    let column = data_column(&pandas_table(), 1);
    let cell = column.get_cell(&RawValue::Float(1.0), false);
    let styled = apply_pandas_styler_css(cell.clone(), "T_abcrow0_col1", CSS);
    assert_eq!(
        styled.theme_override,
        Some(ThemeOverride {
            bg_cell: Some("yellow".to_string()),
            text_dark: Some(YELLOW_BACKGROUND_TEXT_COLOR.to_string()),
        })
    );

    let untouched = apply_pandas_styler_css(cell, "T_abcrow9_col1", CSS);
    assert_eq!(untouched.theme_override, None);
}

#[test]
fn test_styler_applies_to_readonly_columns_only() {
    let styler = Styler::new("abc")
        .with_css(CSS)
        .with_display_value(0, 1, "$1.00");
    let table = pandas_table().with_styler(styler);
    let arrow_cell = table.get_cell(0, 2).unwrap();
    assert_eq!(arrow_cell.css_id.as_deref(), Some("T_abcrow0_col1"));
    assert_eq!(arrow_cell.css_class.as_deref(), Some("data row0 col1"));
    assert_eq!(arrow_cell.display_content.as_deref(), Some("$1.00"));

    let editable = data_column(&table, 1);
    let cell = cell_from_arrow(&editable, &arrow_cell, table.css_styles());
    assert_eq!(cell.display_text(), "1");
    assert!(cell.theme_override.is_none());

    let mut props = column_props_from_arrow(&table, 1).unwrap();
    props.is_editable = false;
    let readonly = BaseColumn::new(ColumnKind::Number, props);
    let cell = cell_from_arrow(&readonly, &arrow_cell, table.css_styles());
    assert_eq!(cell.display_text(), "$1.00");
    assert_eq!(readonly.get_cell_value(&cell), RawValue::Float(1.0));
    assert_eq!(
        cell.theme_override.and_then(|theme| theme.bg_cell).as_deref(),
        Some("yellow")
    );
}

#[test]
fn test_index_cells_get_level_css_ids() {
    let table = pandas_table().with_styler(Styler::new("abc"));
    let cell = table.get_cell(1, 0).unwrap();
    assert_eq!(cell.css_id.as_deref(), Some("T_abclevel0_row1"));
    assert_eq!(cell.display_content, None);
}

#[test]
fn test_object_column_shows_formatted_value() {
    let column = BaseColumn::new(
        ColumnKind::Object,
        column_props_from_arrow(&pandas_table(), 1).unwrap(),
    );
    let table = pandas_table();
    let cell = cell_from_arrow(&column, &table.get_cell(1, 2).unwrap(), None);
    assert!(cell.readonly);
    assert!(matches!(
        cell.content,
        CellContent::Text { ref display_data, .. } if display_data == "2.5"
    ));
}

#[test]
fn test_empty_index_column() {
    let column = empty_index_column();
    assert_eq!(column.props.id, EMPTY_INDEX_ID);
    assert!(column.is_index());
    assert!(!column.is_editable());
}
