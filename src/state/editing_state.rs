use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::columns::cell::Cell;
use crate::columns::{column_name, BaseColumn};
use crate::error::{EditorError, Result};
use crate::value::RawValue;

/// Cells of one row keyed by column index number.
pub type RowCells = BTreeMap<usize, Cell>;

#[derive(Debug, Deserialize)]
struct SerializedState {
    #[serde(default)]
    edited_rows: BTreeMap<String, Map<String, Value>>,
    #[serde(default)]
    added_rows: Vec<Map<String, Value>>,
    #[serde(default)]
    deleted_rows: Vec<usize>,
}

/// Log of the edits made on top of an immutable table: edited cells of
/// original rows, appended rows and deleted original rows.
///
/// Row indices below the original row count address original rows, larger
/// ones address added rows in the order they were appended.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct EditingState {
    num_rows: usize,
    edited_cells: BTreeMap<usize, RowCells>,
    added_rows: Vec<RowCells>,
    deleted_rows: Vec<usize>,
}

impl EditingState {
    pub fn new(num_rows: usize) -> Self {
        Self {
            num_rows,
            ..Self::default()
        }
    }

    /// Rebuilds a state from its serialized form.
    pub fn from_json(json: &str, num_rows: usize, columns: &[BaseColumn]) -> Result<Self> {
        let mut state = Self::new(num_rows);
        state.load_json(json, columns)?;
        Ok(state)
    }

    pub fn original_num_rows(&self) -> usize {
        self.num_rows
    }

    /// Rows currently shown: original rows minus deletions plus added rows.
    pub fn num_rows(&self) -> usize {
        self.num_rows + self.added_rows.len() - self.deleted_rows.len()
    }

    pub fn edited_cells(&self) -> &BTreeMap<usize, RowCells> {
        &self.edited_cells
    }

    pub fn added_rows(&self) -> &[RowCells] {
        &self.added_rows
    }

    pub fn deleted_rows(&self) -> &[usize] {
        &self.deleted_rows
    }

    pub fn is_added_row(&self, row: usize) -> bool {
        row >= self.num_rows
    }

    pub fn is_empty(&self) -> bool {
        self.edited_cells.is_empty() && self.added_rows.is_empty() && self.deleted_rows.is_empty()
    }

    pub fn get_cell(&self, column: usize, row: usize) -> Option<&Cell> {
        if self.is_added_row(row) {
            return self
                .added_rows
                .get(row - self.num_rows)
                .and_then(|cells| cells.get(&column));
        }
        self.edited_cells.get(&row).and_then(|cells| cells.get(&column))
    }

    pub fn set_cell(&mut self, column: usize, row: usize, cell: Cell) {
        if self.is_added_row(row) {
            match self.added_rows.get_mut(row - self.num_rows) {
                Some(cells) => {
                    cells.insert(column, cell);
                }
                None => tracing::debug!("Ignoring edit of removed added row {}", row),
            }
            return;
        }
        self.edited_cells.entry(row).or_default().insert(column, cell);
    }

    pub fn add_row(&mut self, cells: RowCells) {
        self.added_rows.push(cells);
    }

    pub fn delete_row(&mut self, row: usize) {
        if self.is_added_row(row) {
            let added = row - self.num_rows;
            if added < self.added_rows.len() {
                self.added_rows.remove(added);
            }
            return;
        }
        if let Err(position) = self.deleted_rows.binary_search(&row) {
            self.deleted_rows.insert(position, row);
        }
        self.edited_cells.remove(&row);
    }

    /// Deletes `rows`, highest first, so earlier deletions do not shift the
    /// indices of later ones.
    pub fn delete_rows(&mut self, rows: &[usize]) {
        let mut rows = rows.to_vec();
        rows.sort_unstable_by(|a, b| b.cmp(a));
        for row in rows {
            self.delete_row(row);
        }
    }

    /// Maps a displayed row to its row number in the unedited table.
    pub fn original_row_index(&self, row: usize) -> usize {
        let mut original = row;
        for deleted in &self.deleted_rows {
            if *deleted > original {
                break;
            }
            original += 1;
        }
        original
    }

    /// Serializes the log for the backend. Cells are keyed by column name;
    /// added rows missing a required value are left out.
    pub fn to_json(&self, columns: &[BaseColumn]) -> Result<String> {
        let by_index: HashMap<usize, &BaseColumn> =
            columns.iter().map(|c| (c.index_number(), c)).collect();

        let mut edited_rows = Map::new();
        for (row, cells) in &self.edited_cells {
            let mut edited = Map::new();
            for (index, cell) in cells {
                let Some(column) = by_index.get(index) else {
                    continue;
                };
                if cell.is_error {
                    continue;
                }
                edited.insert(column_name(column).to_string(), column.get_cell_value(cell).to_json());
            }
            if !edited.is_empty() {
                edited_rows.insert(row.to_string(), Value::Object(edited));
            }
        }

        let added_rows: Vec<Value> = self
            .added_rows
            .iter()
            .filter_map(|cells| added_row_json(cells, columns))
            .map(Value::Object)
            .collect();

        let state = serde_json::json!({
            "edited_rows": edited_rows,
            "added_rows": added_rows,
            "deleted_rows": self.deleted_rows,
        });
        Ok(serde_json::to_string(&state)?)
    }

    /// Replaces the log with the serialized state `json`.
    pub fn load_json(&mut self, json: &str, columns: &[BaseColumn]) -> Result<()> {
        let serialized: SerializedState = serde_json::from_str(json)?;
        let by_name: HashMap<&str, &BaseColumn> =
            columns.iter().map(|c| (column_name(c), c)).collect();

        let mut edited_cells: BTreeMap<usize, RowCells> = BTreeMap::new();
        for (key, values) in serialized.edited_rows {
            let row: usize = key.parse().map_err(|_| {
                EditorError::InvalidState(format!("Invalid row index '{key}' in edited_rows"))
            })?;
            for (name, value) in values {
                let Some(column) = by_name.get(name.as_str()) else {
                    tracing::debug!("Skipping edit of unknown column '{}'", name);
                    continue;
                };
                let cell = column.get_cell(&RawValue::from(value), false);
                if cell.is_error {
                    continue;
                }
                edited_cells
                    .entry(row)
                    .or_default()
                    .insert(column.index_number(), cell);
            }
        }

        let added_rows = serialized
            .added_rows
            .into_iter()
            .map(|values| {
                let mut cells: RowCells = columns
                    .iter()
                    .map(|c| (c.index_number(), c.get_cell(&RawValue::Null, false)))
                    .collect();
                for (name, value) in values {
                    if let Some(column) = by_name.get(name.as_str()) {
                        cells.insert(column.index_number(), column.get_cell(&RawValue::from(value), false));
                    }
                }
                cells
            })
            .collect();

        let mut deleted_rows = serialized.deleted_rows;
        deleted_rows.sort_unstable();
        deleted_rows.dedup();
        if let Some(position) = deleted_rows.iter().position(|row| *row >= self.num_rows) {
            tracing::warn!(
                "Dropping {} deleted rows beyond the {} original rows",
                deleted_rows.len() - position,
                self.num_rows
            );
            deleted_rows.truncate(position);
        }

        self.edited_cells = edited_cells;
        self.added_rows = added_rows;
        self.deleted_rows = deleted_rows;
        Ok(())
    }
}

fn added_row_json(cells: &RowCells, columns: &[BaseColumn]) -> Option<Map<String, Value>> {
    let mut row = Map::new();
    for column in columns {
        let cell = cells.get(&column.index_number());
        let value = cell
            .filter(|c| !c.is_error)
            .map(|c| column.get_cell_value(c))
            .unwrap_or_default();
        let missing = cell.map_or(true, |c| c.is_missing_value) || value.is_null();
        if column.is_required() && column.is_editable() && missing {
            return None;
        }
        if !value.is_null() {
            row.insert(column_name(column).to_string(), value.to_json());
        }
    }
    Some(row)
}
