use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use serde_json::json;

use editgrid::state::debounce::Debouncer;
use editgrid::{
    ArrowTable, ColumnConfigMapping, EditingMode, EditorOptions, EditorSession, RawValue,
};

const NAME: usize = 1;
const PRICE: usize = 2;
const QTY: usize = 3;

fn table() -> ArrowTable {
    let metadata = r#"{
        "index_columns": [{"kind": "range", "name": null, "start": 0, "stop": 2, "step": 1}],
        "columns": [
            {"name": "name", "field_name": "name", "pandas_type": "unicode", "numpy_type": "object"},
            {"name": "price", "field_name": "price", "pandas_type": "float64", "numpy_type": "float64"},
            {"name": "qty", "field_name": "qty", "pandas_type": "int64", "numpy_type": "int64"}
        ]
    }"#;
    let schema = Schema::new(vec![
        Field::new("name", DataType::Utf8, true),
        Field::new("price", DataType::Float64, true),
        Field::new("qty", DataType::Int64, true),
    ])
    .with_metadata(HashMap::from([("pandas".to_string(), metadata.to_string())]));
    let batch = RecordBatch::try_new(
        Arc::new(schema),
        vec![
            Arc::new(StringArray::from(vec!["pen", "ink"])) as ArrayRef,
            Arc::new(Float64Array::from(vec![1.5, 3.0])) as ArrayRef,
            Arc::new(Int64Array::from(vec![2, 7])) as ArrayRef,
        ],
    )
    .unwrap();
    ArrowTable::from_batch(batch).unwrap()
}

type Reports = Arc<Mutex<Vec<String>>>;

fn session(editing_mode: EditingMode, config: ColumnConfigMapping) -> (EditorSession, Reports) {
    init_tracing();
    let reports: Reports = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&reports);
    let options = EditorOptions {
        editing_mode,
        ..EditorOptions::default()
    };
    let session = EditorSession::new(table(), &config, options, move |json| {
        sink.lock().unwrap().push(json)
    });
    (session, reports)
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("editgrid=debug")
        .with_test_writer()
        .try_init();
}

fn reported(reports: &Reports) -> Vec<String> {
    reports.lock().unwrap().clone()
}

#[test]
fn test_cells_come_from_table() {
    let (session, _) = session(EditingMode::Fixed, ColumnConfigMapping::new());
    assert_eq!(session.num_rows(), 2);
    assert_eq!(session.columns().len(), 4);
    assert_eq!(session.cell_content(0, 1).display_text(), "1");
    assert_eq!(session.cell_content(NAME, 1).display_text(), "ink");
    assert_eq!(session.cell_content(PRICE, 0).display_text(), "1.5");
    assert!(session.cell_content(9, 0).is_error);
    assert!(session.cell_content(NAME, 10).is_error);
}

#[test]
fn test_edit_without_runtime_reports_immediately() {
    let (mut session, reports) = session(EditingMode::Fixed, ColumnConfigMapping::new());
    assert!(session.edit_cell(NAME, 0, &RawValue::from("pencil")));
    assert_eq!(session.cell_content(NAME, 0).display_text(), "pencil");
    assert_eq!(
        reported(&reports),
        vec![r#"{"edited_rows":{"0":{"name":"pencil"}},"added_rows":[],"deleted_rows":[]}"#]
    );
}

#[test]
fn test_rejected_edits() {
    let (mut session, reports) = session(EditingMode::Fixed, ColumnConfigMapping::new());
    // Unchanged value.
    assert!(!session.edit_cell(NAME, 0, &RawValue::from("pen")));
    // Range index is not editable.
    assert!(!session.edit_cell(0, 0, &RawValue::Int(5)));
    assert!(!session.edit_cell(PRICE, 0, &RawValue::from("abc")));
    assert!(!session.edit_cell(NAME, 2, &RawValue::from("x")));
    assert!(reported(&reports).is_empty());
    assert!(session.state().is_empty());
}

#[test]
fn test_read_only_session_ignores_edits() {
    let (mut session, reports) = session(EditingMode::ReadOnly, ColumnConfigMapping::new());
    assert!(!session.edit_cell(NAME, 0, &RawValue::from("pencil")));
    assert!(!session.append_row());
    assert!(reported(&reports).is_empty());
}

#[test]
fn test_edit_is_validated() {
    let config = ColumnConfigMapping::from_json(
        &json!({"qty": {"type_config": {"max_value": 10}}}).to_string(),
    )
    .unwrap();
    let (mut session, _) = session(EditingMode::Fixed, config);
    assert!(session.edit_cell(QTY, 0, &RawValue::Int(50)));
    assert_eq!(session.cell_content(QTY, 0).display_text(), "10");
}

#[test]
fn test_append_row_uses_defaults() {
    let config =
        ColumnConfigMapping::from_json(&json!({"qty": {"default": 5}}).to_string()).unwrap();
    let (mut session, reports) = session(EditingMode::Dynamic, config);
    assert!(session.append_row());
    assert_eq!(session.num_rows(), 3);
    assert_eq!(session.cell_content(QTY, 2).display_text(), "5");
    assert!(session.cell_content(NAME, 2).is_missing_value);
    assert_eq!(
        reported(&reports),
        vec![r#"{"edited_rows":{},"added_rows":[{"qty":5}],"deleted_rows":[]}"#]
    );

    assert!(session.edit_cell(NAME, 2, &RawValue::from("cap")));
    assert_eq!(session.cell_content(NAME, 2).display_text(), "cap");
}

#[test]
fn test_append_row_needs_dynamic_mode() {
    let (mut session, _) = session(EditingMode::Fixed, ColumnConfigMapping::new());
    assert!(!session.append_row());
    assert!(!session.delete_rows(&[0]));
    assert_eq!(session.num_rows(), 2);
}

#[test]
fn test_delete_rows_uses_displayed_indices() {
    let (mut session, reports) = session(EditingMode::Dynamic, ColumnConfigMapping::new());
    assert!(session.delete_rows(&[0]));
    assert_eq!(session.num_rows(), 1);
    assert_eq!(session.cell_content(NAME, 0).display_text(), "ink");

    assert!(session.delete_rows(&[0]));
    assert_eq!(session.num_rows(), 0);
    assert!(!session.delete_rows(&[0]));
    assert_eq!(
        reported(&reports).last().map(String::as_str),
        Some(r#"{"edited_rows":{},"added_rows":[],"deleted_rows":[0,1]}"#)
    );
}

#[test]
fn test_edit_after_delete_targets_original_row() {
    let (mut session, _) = session(EditingMode::Dynamic, ColumnConfigMapping::new());
    session.delete_rows(&[0]);
    assert!(session.edit_cell(NAME, 0, &RawValue::from("quill")));
    assert_eq!(
        session.to_json().unwrap(),
        r#"{"edited_rows":{"1":{"name":"quill"}},"added_rows":[],"deleted_rows":[0]}"#
    );
}

#[test]
fn test_clear_cells() {
    let (mut session, _) = session(EditingMode::Fixed, ColumnConfigMapping::new());
    assert!(session.clear_cells(&[(NAME, 0), (0, 0), (NAME, 5)]));
    assert!(session.cell_content(NAME, 0).is_missing_value);
    assert_eq!(
        session.to_json().unwrap(),
        r#"{"edited_rows":{"0":{"name":null}},"added_rows":[],"deleted_rows":[]}"#
    );
    assert!(!session.clear_cells(&[(0, 0)]));
}

#[test]
fn test_paste_stops_at_last_row_in_fixed_mode() {
    let (mut session, _) = session(EditingMode::Fixed, ColumnConfigMapping::new());
    let block = vec![
        vec!["a".to_string(), "2".to_string()],
        vec!["b".to_string(), "3".to_string()],
    ];
    assert!(session.paste(NAME, 1, &block));
    assert_eq!(session.num_rows(), 2);
    assert_eq!(
        session.to_json().unwrap(),
        r#"{"edited_rows":{"1":{"name":"a","price":2}},"added_rows":[],"deleted_rows":[]}"#
    );
}

#[test]
fn test_paste_appends_rows_in_dynamic_mode() {
    let (mut session, _) = session(EditingMode::Dynamic, ColumnConfigMapping::new());
    let block = vec![
        vec!["a".to_string(), "oops".to_string()],
        vec!["b".to_string(), "3".to_string()],
    ];
    assert!(session.paste(NAME, 1, &block));
    assert_eq!(session.num_rows(), 3);
    assert_eq!(
        session.to_json().unwrap(),
        r#"{"edited_rows":{"1":{"name":"a"}},"added_rows":[{"name":"b","price":3}],"deleted_rows":[]}"#
    );
}

#[test]
fn test_clear_drops_all_edits() {
    let (mut session, reports) = session(EditingMode::Dynamic, ColumnConfigMapping::new());
    session.edit_cell(NAME, 0, &RawValue::from("pencil"));
    session.append_row();
    session.clear();
    assert!(session.state().is_empty());
    assert_eq!(session.num_rows(), 2);
    assert_eq!(
        reported(&reports).last().map(String::as_str),
        Some(r#"{"edited_rows":{},"added_rows":[],"deleted_rows":[]}"#)
    );
}

#[test]
fn test_unchanged_state_is_not_reported_twice() {
    let (mut session, reports) = session(EditingMode::Fixed, ColumnConfigMapping::new());
    session.edit_cell(NAME, 0, &RawValue::from("pencil"));
    session.sync_table();
    session.sync_table();
    assert_eq!(reported(&reports).len(), 1);
}

#[test]
fn test_restore_does_not_report() {
    let (mut session, reports) = session(EditingMode::Dynamic, ColumnConfigMapping::new());
    let json = r#"{"edited_rows":{"0":{"price":9.5}},"added_rows":[{"name":"new"}],"deleted_rows":[1]}"#;
    session.restore(json).unwrap();
    assert_eq!(session.num_rows(), 2);
    assert_eq!(session.cell_content(PRICE, 0).display_text(), "9.5");
    assert_eq!(session.cell_content(NAME, 1).display_text(), "new");
    session.sync_table();
    assert!(reported(&reports).is_empty());
    assert!(session.restore("not json").is_err());
}

fn shorter_table() -> ArrowTable {
    let batch = RecordBatch::try_from_iter(vec![
        ("name", Arc::new(StringArray::from(vec!["pen"])) as ArrayRef),
        ("price", Arc::new(Float64Array::from(vec![1.5])) as ArrayRef),
        ("qty", Arc::new(Int64Array::from(vec![2])) as ArrayRef),
    ])
    .unwrap();
    ArrowTable::from_batch(batch).unwrap()
}

#[test]
fn test_replace_table_keeps_edits_for_same_row_count() {
    let (mut session, _) = session(EditingMode::Fixed, ColumnConfigMapping::new());
    session.edit_cell(NAME, 0, &RawValue::from("pencil"));
    session.replace_table(table(), &ColumnConfigMapping::new());
    assert_eq!(session.cell_content(NAME, 0).display_text(), "pencil");

    session.replace_table(shorter_table(), &ColumnConfigMapping::new());
    assert!(session.state().is_empty());
    assert_eq!(session.num_rows(), 1);
    assert_eq!(session.columns().len(), 3);
    assert_eq!(session.cell_content(0, 0).display_text(), "pen");
}

#[tokio::test(start_paused = true)]
async fn test_debounced_edits_are_coalesced() {
    let (mut session, reports) = session(EditingMode::Fixed, ColumnConfigMapping::new());
    assert!(session.edit_cell(NAME, 0, &RawValue::from("pencil")));
    assert!(session.edit_cell(PRICE, 1, &RawValue::Float(4.5)));
    assert!(session.has_pending_sync());
    assert!(reported(&reports).is_empty());

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(
        reported(&reports),
        vec![
            r#"{"edited_rows":{"0":{"name":"pencil"},"1":{"price":4.5}},"added_rows":[],"deleted_rows":[]}"#
        ]
    );
    assert!(!session.has_pending_sync());
}

#[tokio::test(start_paused = true)]
async fn test_debouncer_waits_for_quiet_period() {
    let calls: Reports = Arc::new(Mutex::new(Vec::new()));
    let mut debouncer = Debouncer::new(Duration::from_millis(100));

    for label in ["first", "second"] {
        let sink = Arc::clone(&calls);
        debouncer.call(move || sink.lock().unwrap().push(label.to_string()));
        tokio::time::sleep(Duration::from_millis(60)).await;
    }
    assert!(reported(&calls).is_empty());

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(reported(&calls), vec!["second"]);
}

#[tokio::test(start_paused = true)]
async fn test_debouncer_cancel() {
    let calls: Reports = Arc::new(Mutex::new(Vec::new()));
    let mut debouncer = Debouncer::new(Duration::from_millis(100));
    let sink = Arc::clone(&calls);
    debouncer.call(move || sink.lock().unwrap().push("dropped".to_string()));
    debouncer.cancel();
    assert!(!debouncer.is_pending());

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(reported(&calls).is_empty());
}

#[test]
fn test_zero_delay_runs_immediately() {
    let calls: Reports = Arc::new(Mutex::new(Vec::new()));
    let mut debouncer = Debouncer::new(Duration::ZERO);
    let sink = Arc::clone(&calls);
    debouncer.call(move || sink.lock().unwrap().push("now".to_string()));
    assert_eq!(reported(&calls), vec!["now"]);
    assert!(!debouncer.is_pending());
}
