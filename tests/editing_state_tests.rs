use std::collections::BTreeMap;

use proptest::prelude::*;
use serde_json::{json, Value};

use editgrid::columns::ArrowType;
use editgrid::state::editing_state::RowCells;
use editgrid::{BaseColumn, BaseColumnProps, ColumnKind, EditingState, EditorError, RawValue};

fn text_column(name: &str, index_number: usize) -> BaseColumn {
    BaseColumn::new(
        ColumnKind::Text,
        BaseColumnProps {
            id: format!("column-{name}-{index_number}"),
            name: name.to_string(),
            title: name.to_string(),
            index_number,
            arrow_type: ArrowType::new("unicode", "object"),
            is_editable: true,
            ..BaseColumnProps::default()
        },
    )
}

fn number_column(name: &str, index_number: usize) -> BaseColumn {
    BaseColumn::new(
        ColumnKind::Number,
        BaseColumnProps {
            id: format!("column-{name}-{index_number}"),
            name: name.to_string(),
            title: name.to_string(),
            index_number,
            arrow_type: ArrowType::new("float64", "float64"),
            is_editable: true,
            ..BaseColumnProps::default()
        },
    )
}

fn typed_column(kind: ColumnKind, type_name: &str, options: Value) -> BaseColumn {
    BaseColumn::new(
        kind,
        BaseColumnProps {
            id: "column-v-0".to_string(),
            name: "v".to_string(),
            title: "v".to_string(),
            arrow_type: ArrowType::new(type_name, type_name),
            is_editable: true,
            column_type_options: options.as_object().cloned().unwrap_or_default(),
            ..BaseColumnProps::default()
        },
    )
}

fn row(cells: Vec<(&BaseColumn, RawValue)>) -> RowCells {
    cells
        .into_iter()
        .map(|(column, value)| (column.index_number(), column.get_cell(&value, false)))
        .collect()
}

#[test]
fn test_to_json_example_state() {
    let a = text_column("col_a", 0);
    let b = text_column("col_b", 1);
    let columns = vec![a.clone(), b.clone()];

    let mut state = EditingState::new(3);
    state.set_cell(0, 0, a.get_cell(&RawValue::from("foo"), false));
    state.add_row(row(vec![(&a, RawValue::from("foo")), (&b, RawValue::from("foo"))]));
    state.delete_row(1);

    assert_eq!(
        state.to_json(&columns).unwrap(),
        r#"{"edited_rows":{"0":{"col_a":"foo"}},"added_rows":[{"col_a":"foo","col_b":"foo"}],"deleted_rows":[1]}"#
    );
}

#[test]
fn test_empty_state_json() {
    let state = EditingState::new(2);
    assert!(state.is_empty());
    assert_eq!(
        state.to_json(&[text_column("a", 0)]).unwrap(),
        r#"{"edited_rows":{},"added_rows":[],"deleted_rows":[]}"#
    );
}

#[test]
fn test_get_cell_reads_edits_and_added_rows() {
    let a = text_column("a", 0);
    let mut state = EditingState::new(2);
    assert!(state.get_cell(0, 0).is_none());

    state.set_cell(0, 1, a.get_cell(&RawValue::from("x"), false));
    assert_eq!(
        a.get_cell_value(state.get_cell(0, 1).unwrap()),
        RawValue::from("x")
    );

    state.add_row(row(vec![(&a, RawValue::from("new"))]));
    assert!(state.is_added_row(2));
    assert_eq!(
        a.get_cell_value(state.get_cell(0, 2).unwrap()),
        RawValue::from("new")
    );

    state.set_cell(0, 2, a.get_cell(&RawValue::from("changed"), false));
    assert_eq!(
        a.get_cell_value(state.get_cell(0, 2).unwrap()),
        RawValue::from("changed")
    );
}

#[test]
fn test_set_cell_on_removed_added_row_is_noop() {
    let a = text_column("a", 0);
    let mut state = EditingState::new(1);
    state.set_cell(0, 5, a.get_cell(&RawValue::from("ghost"), false));
    assert!(state.added_rows().is_empty());
    assert!(state.edited_cells().is_empty());
}

#[test]
fn test_delete_row_is_idempotent_and_drops_edits() {
    let a = text_column("a", 0);
    let mut state = EditingState::new(4);
    state.set_cell(0, 2, a.get_cell(&RawValue::from("x"), false));
    state.delete_row(2);
    state.delete_row(2);
    assert_eq!(state.deleted_rows(), &[2]);
    assert!(state.get_cell(0, 2).is_none());
    assert_eq!(state.num_rows(), 3);
}

#[test]
fn test_deleted_rows_stay_sorted() {
    let mut state = EditingState::new(10);
    state.delete_row(7);
    state.delete_row(2);
    state.delete_row(5);
    assert_eq!(state.deleted_rows(), &[2, 5, 7]);
}

#[test]
fn test_deleting_added_row_shifts_later_added_rows() {
    let a = text_column("a", 0);
    let mut state = EditingState::new(2);
    state.add_row(row(vec![(&a, RawValue::from("first"))]));
    state.add_row(row(vec![(&a, RawValue::from("second"))]));
    state.delete_row(2);
    assert_eq!(state.added_rows().len(), 1);
    assert_eq!(
        a.get_cell_value(state.get_cell(0, 2).unwrap()),
        RawValue::from("second")
    );
    assert!(state.deleted_rows().is_empty());
}

#[test]
fn test_delete_rows_handles_mixed_batch() {
    let a = text_column("a", 0);
    let mut state = EditingState::new(3);
    state.add_row(row(vec![(&a, RawValue::from("x"))]));
    state.add_row(row(vec![(&a, RawValue::from("y"))]));
    state.delete_rows(&[0, 3, 4, 1]);
    assert_eq!(state.deleted_rows(), &[0, 1]);
    assert!(state.added_rows().is_empty());
    assert_eq!(state.num_rows(), 1);
}

#[test]
fn test_original_row_index_after_deleting_first_row() {
    let mut state = EditingState::new(5);
    state.delete_row(0);
    assert_eq!(state.original_row_index(0), 1);
}

#[test]
fn test_original_row_index_skips_deleted_rows() {
    let mut state = EditingState::new(6);
    state.delete_rows(&[1, 3]);
    assert_eq!(state.original_row_index(0), 0);
    assert_eq!(state.original_row_index(1), 2);
    assert_eq!(state.original_row_index(2), 4);
    assert_eq!(state.original_row_index(3), 5);
    // Past the original rows the index lands in added-row space.
    assert_eq!(state.original_row_index(4), 6);
}

#[test]
fn test_added_row_missing_required_value_is_omitted() {
    let mut required = text_column("name", 0);
    required.props.is_required = true;
    let score = number_column("score", 1);
    let columns = vec![required.clone(), score.clone()];

    let mut state = EditingState::new(0);
    state.add_row(row(vec![(&required, RawValue::Null), (&score, RawValue::Int(3))]));
    state.add_row(row(vec![(&required, RawValue::from("ok"))]));

    assert_eq!(
        state.to_json(&columns).unwrap(),
        r#"{"edited_rows":{},"added_rows":[{"name":"ok"}],"deleted_rows":[]}"#
    );
}

#[test]
fn test_error_cells_are_never_serialized() {
    let score = number_column("score", 0);
    let mut state = EditingState::new(2);
    state.set_cell(0, 0, score.get_cell(&RawValue::from("not a number"), false));
    assert_eq!(
        state.to_json(&[score]).unwrap(),
        r#"{"edited_rows":{},"added_rows":[],"deleted_rows":[]}"#
    );
}

#[test]
fn test_edits_of_unknown_columns_are_skipped() {
    let a = text_column("a", 0);
    let mut state = EditingState::new(2);
    state.set_cell(9, 0, a.get_cell(&RawValue::from("x"), false));
    state.set_cell(0, 1, a.get_cell(&RawValue::from("y"), false));
    assert_eq!(
        state.to_json(&[a]).unwrap(),
        r#"{"edited_rows":{"1":{"a":"y"}},"added_rows":[],"deleted_rows":[]}"#
    );
}

#[test]
fn test_from_json_restores_state() {
    let a = text_column("a", 0);
    let score = number_column("score", 1);
    let columns = vec![a.clone(), score.clone()];
    let json = r#"{"edited_rows":{"0":{"a":"x","score":2.5},"10":{"score":1}},"added_rows":[{"score":4}],"deleted_rows":[3]}"#;

    let state = EditingState::from_json(json, 12, &columns).unwrap();
    assert_eq!(state.deleted_rows(), &[3]);
    assert_eq!(state.added_rows().len(), 1);
    assert_eq!(
        score.get_cell_value(state.get_cell(1, 0).unwrap()),
        RawValue::Float(2.5)
    );
    assert!(state.get_cell(0, 12).unwrap().is_missing_value);
    assert_eq!(state.to_json(&columns).unwrap(), json);
}

#[test]
fn test_from_json_index_column_uses_reserved_name() {
    let mut index = text_column("", 0);
    index.props.is_index = true;
    let json = r#"{"edited_rows":{"0":{"_index":"row-a"}},"added_rows":[],"deleted_rows":[]}"#;

    let state = EditingState::from_json(json, 1, &[index.clone()]).unwrap();
    assert_eq!(state.to_json(&[index]).unwrap(), json);
}

#[test]
fn test_from_json_errors() {
    let columns = vec![text_column("a", 0)];
    assert!(matches!(
        EditingState::from_json("{not json", 1, &columns),
        Err(EditorError::Json(_))
    ));
    assert!(matches!(
        EditingState::from_json(r#"{"edited_rows":{"x":{"a":"1"}}}"#, 1, &columns),
        Err(EditorError::InvalidState(_))
    ));
}

#[derive(Clone, Debug)]
enum Op {
    SetText(usize, String),
    SetNumber(usize, f64),
    AddRow(Option<String>, Option<f64>),
    DeleteRow(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0usize..10, "[a-z ]{0,6}").prop_map(|(row, text)| Op::SetText(row, text)),
        (0usize..10, -400_000i32..400_000)
            .prop_map(|(row, n)| Op::SetNumber(row, f64::from(n) / 4.0)),
        (
            prop::option::of("[a-z]{1,4}"),
            prop::option::of(-1000i32..1000)
        )
            .prop_map(|(text, n)| Op::AddRow(text, n.map(f64::from))),
        (0usize..10).prop_map(Op::DeleteRow),
    ]
}

fn apply(state: &mut EditingState, columns: &[BaseColumn], op: &Op) {
    let (text, score) = (&columns[0], &columns[1]);
    match op {
        Op::SetText(row, value) => {
            state.set_cell(0, *row, text.get_cell(&RawValue::from(value.as_str()), false))
        }
        Op::SetNumber(row, value) => {
            state.set_cell(1, *row, score.get_cell(&RawValue::Float(*value), false))
        }
        Op::AddRow(value, number) => {
            let mut cells = BTreeMap::new();
            if let Some(value) = value {
                cells.insert(0, text.get_cell(&RawValue::from(value.as_str()), false));
            }
            if let Some(number) = number {
                cells.insert(1, score.get_cell(&RawValue::Float(*number), false));
            }
            state.add_row(cells);
        }
        Op::DeleteRow(row) => state.delete_row(*row),
    }
}

#[test]
fn test_json_round_trip_per_column_kind() {
    let cases = vec![
        (
            typed_column(ColumnKind::List, "list[int64]", json!({})),
            RawValue::from(vec![1, 2]),
            "[1,2]",
        ),
        (
            typed_column(ColumnKind::List, "list[unicode]", json!({})),
            RawValue::from(vec!["a", "b"]),
            r#"["a","b"]"#,
        ),
        (
            typed_column(ColumnKind::MultiSelect, "list[int64]", json!({"options": [1, 2, 3]})),
            RawValue::from("1,3"),
            "[1,3]",
        ),
        (
            typed_column(ColumnKind::MultiSelect, "list[unicode]", json!({"options": ["x", "y"]})),
            RawValue::from(vec!["y"]),
            r#"["y"]"#,
        ),
        (
            typed_column(ColumnKind::Selectbox, "int64", json!({"options": [1.0, 2.0]})),
            RawValue::Int(2),
            "2",
        ),
        (
            typed_column(ColumnKind::Selectbox, "unicode", json!({"options": ["low", "high"]})),
            RawValue::from("high"),
            r#""high""#,
        ),
        (
            typed_column(ColumnKind::Checkbox, "bool", json!({})),
            RawValue::Bool(true),
            "true",
        ),
        (
            typed_column(ColumnKind::Date, "date", json!({"timezone": "+05:30"})),
            RawValue::from("2024-01-01T22:00:00Z"),
            r#""2024-01-01""#,
        ),
        (
            typed_column(ColumnKind::Time, "time", json!({})),
            RawValue::from("09:30:15"),
            r#""09:30:15.000""#,
        ),
        (
            typed_column(ColumnKind::DateTime, "datetime", json!({"timezone": "-05:00"})),
            RawValue::from("2024-01-15T10:00:00Z"),
            r#""2024-01-15T05:00:00.000-05:00""#,
        ),
    ];

    for (column, value, fragment) in cases {
        let columns = vec![column.clone()];
        let cell = column.get_cell(&value, true);
        assert!(!cell.is_error, "{:?} rejected {value:?}", column.kind());

        let mut state = EditingState::new(1);
        state.set_cell(0, 0, cell.clone());
        state.add_row(row(vec![(&column, value.clone())]));
        let json = state.to_json(&columns).unwrap();
        assert_eq!(
            json,
            format!(
                r#"{{"edited_rows":{{"0":{{"v":{fragment}}}}},"added_rows":[{{"v":{fragment}}}],"deleted_rows":[]}}"#
            ),
            "{:?}",
            column.kind()
        );

        let restored = EditingState::from_json(&json, 1, &columns).unwrap();
        assert_eq!(restored.to_json(&columns).unwrap(), json, "{:?}", column.kind());
        let restored_cell = restored.get_cell(0, 0).unwrap();
        assert_eq!(
            column.get_cell_value(restored_cell).to_json(),
            column.get_cell_value(&cell).to_json(),
            "{:?}",
            column.kind()
        );
    }
}

proptest! {
    #[test]
    fn prop_json_round_trip(ops in prop::collection::vec(op_strategy(), 0..24)) {
        let columns = vec![text_column("name", 0), number_column("score", 1)];
        let mut state = EditingState::new(5);
        for op in &ops {
            apply(&mut state, &columns, op);
        }
        let json = state.to_json(&columns).unwrap();
        let restored = EditingState::from_json(&json, 5, &columns).unwrap();
        prop_assert_eq!(restored.to_json(&columns).unwrap(), json);
    }

    #[test]
    fn prop_row_count_invariant(ops in prop::collection::vec(op_strategy(), 0..24)) {
        let columns = vec![text_column("name", 0), number_column("score", 1)];
        let mut state = EditingState::new(5);
        for op in &ops {
            apply(&mut state, &columns, op);
            prop_assert_eq!(
                state.num_rows(),
                5 + state.added_rows().len() - state.deleted_rows().len()
            );
            let mut sorted = state.deleted_rows().to_vec();
            sorted.dedup();
            prop_assert_eq!(sorted.as_slice(), state.deleted_rows());
        }
    }
}
