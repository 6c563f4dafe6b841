use std::fmt;
use std::sync::Arc;

use crate::columns::cell::{error_cell, text_cell, Cell};
use crate::columns::{BaseColumn, Validation};
use crate::dataframe::cells::{cell_from_arrow, EMPTY_INDEX_ID};
use crate::dataframe::table::ArrowTable;
use crate::error::Result;
use crate::loader::config::{ColumnConfigMapping, EditorOptions};
use crate::loader::load_columns;
use crate::state::debounce::Debouncer;
use crate::state::editing_state::{EditingState, RowCells};
use crate::value::RawValue;

/// Receives the serialized editing state after changes settle.
pub type ChangeCallback = Arc<dyn Fn(String) + Send + Sync>;

/// An editable view over one table: resolves cells, applies user edits to
/// the editing log and reports the log after each burst of changes.
///
/// Grid coordinates are `(column position among the loaded columns, displayed
/// row)`.
pub struct EditorSession {
    table: ArrowTable,
    columns: Vec<BaseColumn>,
    options: EditorOptions,
    state: EditingState,
    debouncer: Debouncer,
    on_change: ChangeCallback,
    last_sync: Option<String>,
}

impl fmt::Debug for EditorSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditorSession")
            .field("columns", &self.columns.len())
            .field("options", &self.options)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl EditorSession {
    pub fn new<F>(
        table: ArrowTable,
        config: &ColumnConfigMapping,
        options: EditorOptions,
        on_change: F,
    ) -> Self
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        let columns = load_columns(&table, config, &options);
        let state = EditingState::new(table.num_rows());
        Self {
            debouncer: Debouncer::new(options.debounce()),
            table,
            columns,
            options,
            state,
            on_change: Arc::new(on_change),
            last_sync: None,
        }
    }

    /// Replaces the editing log with a previously reported state without
    /// reporting it again.
    pub fn restore(&mut self, json: &str) -> Result<()> {
        self.state = EditingState::from_json(json, self.table.num_rows(), &self.columns)?;
        self.last_sync = Some(self.state.to_json(&self.columns)?);
        Ok(())
    }

    /// Swaps in fresh data from the backend. The editing log is kept only
    /// while the original row count stays the same.
    pub fn replace_table(&mut self, table: ArrowTable, config: &ColumnConfigMapping) {
        self.columns = load_columns(&table, config, &self.options);
        if table.num_rows() != self.state.original_num_rows() {
            tracing::debug!(
                "Row count changed from {} to {}, resetting the editing state",
                self.state.original_num_rows(),
                table.num_rows()
            );
            self.debouncer.cancel();
            self.state = EditingState::new(table.num_rows());
            self.last_sync = None;
        }
        self.table = table;
    }

    pub fn table(&self) -> &ArrowTable {
        &self.table
    }

    pub fn columns(&self) -> &[BaseColumn] {
        &self.columns
    }

    pub fn options(&self) -> &EditorOptions {
        &self.options
    }

    pub fn state(&self) -> &EditingState {
        &self.state
    }

    pub fn num_rows(&self) -> usize {
        self.state.num_rows()
    }

    pub fn to_json(&self) -> Result<String> {
        self.state.to_json(&self.columns)
    }

    pub fn cell_content(&self, col: usize, row: usize) -> Cell {
        let Some(column) = self.columns.get(col) else {
            return error_cell(
                "Column index out of bounds.",
                "This error should never happen. Please report this bug.",
            );
        };
        if column.props.id == EMPTY_INDEX_ID {
            return text_cell(true, false);
        }

        let original_row = self.state.original_row_index(row);
        if let Some(cell) = self.state.get_cell(column.index_number(), original_row) {
            return cell.clone();
        }
        if self.state.is_added_row(original_row) {
            if original_row - self.state.original_num_rows() < self.state.added_rows().len() {
                return text_cell(true, true);
            }
            return error_cell(
                "Row index out of bounds.",
                "This error should never happen. Please report this bug.",
            );
        }

        match self.table.get_cell(original_row, column.index_number()) {
            Ok(arrow_cell) => cell_from_arrow(column, &arrow_cell, self.table.css_styles()),
            Err(err) => error_cell("Error during cell creation.", &err.to_string()),
        }
    }

    /// Applies a user edit. Returns `false` when the edit was rejected or
    /// did not change anything.
    pub fn edit_cell(&mut self, col: usize, row: usize, value: &RawValue) -> bool {
        let Some(column) = self.columns.get(col) else {
            return false;
        };
        if !column.is_editable() || row >= self.num_rows() {
            return false;
        }

        let cell = column.get_cell(value, true);
        if cell.is_error {
            tracing::warn!(
                "Not applying the cell edit since it causes this error: {}",
                cell.display_text()
            );
            return false;
        }
        let current = column.get_cell_value(&self.cell_content(col, row));
        if column.get_cell_value(&cell) == current {
            return false;
        }

        let original_row = self.state.original_row_index(row);
        self.state.set_cell(column.index_number(), original_row, cell);
        self.sync_table();
        true
    }

    /// Appends a row filled with the column defaults.
    pub fn append_row(&mut self) -> bool {
        if !self.options.allows_row_changes() {
            return false;
        }
        self.push_default_row();
        self.sync_table();
        true
    }

    fn push_default_row(&mut self) {
        let cells: RowCells = self
            .columns
            .iter()
            .map(|column| (column.index_number(), default_cell(column)))
            .collect();
        self.state.add_row(cells);
    }

    /// Deletes displayed rows.
    pub fn delete_rows(&mut self, rows: &[usize]) -> bool {
        if !self.options.allows_row_changes() {
            return false;
        }
        let num_rows = self.num_rows();
        let originals: Vec<usize> = rows
            .iter()
            .filter(|row| **row < num_rows)
            .map(|row| self.state.original_row_index(*row))
            .collect();
        if originals.is_empty() {
            return false;
        }
        self.state.delete_rows(&originals);
        self.sync_table();
        true
    }

    /// Empties the given `(col, row)` cells of editable columns.
    pub fn clear_cells(&mut self, cells: &[(usize, usize)]) -> bool {
        let mut changed = false;
        for (col, row) in cells {
            let Some(column) = self.columns.get(*col) else {
                continue;
            };
            if !column.is_editable() || *row >= self.num_rows() {
                continue;
            }
            let original_row = self.state.original_row_index(*row);
            self.state
                .set_cell(column.index_number(), original_row, column.get_cell(&RawValue::Null, false));
            changed = true;
        }
        if changed {
            self.sync_table();
        }
        changed
    }

    /// Pastes a block of text values with its top-left corner at
    /// (`col`, `row`). Rows past the end are appended when rows may be added.
    pub fn paste(&mut self, col: usize, row: usize, values: &[Vec<String>]) -> bool {
        let mut changed = false;
        for (row_offset, row_values) in values.iter().enumerate() {
            let target_row = row + row_offset;
            if target_row >= self.num_rows() {
                if !self.options.allows_row_changes() {
                    break;
                }
                self.push_default_row();
                changed = true;
            }
            let original_row = self.state.original_row_index(target_row);
            for (col_offset, text) in row_values.iter().enumerate() {
                let Some(column) = self.columns.get(col + col_offset) else {
                    break;
                };
                if !column.is_editable() {
                    continue;
                }
                let cell = column.get_cell(&RawValue::Str(text.clone()), true);
                if cell.is_error {
                    tracing::warn!(
                        "Skipping pasted value for column '{}': {}",
                        column.name(),
                        cell.display_text()
                    );
                    continue;
                }
                self.state.set_cell(column.index_number(), original_row, cell);
                changed = true;
            }
        }
        if changed {
            self.sync_table();
        }
        changed
    }

    /// Drops every edit.
    pub fn clear(&mut self) {
        self.state = EditingState::new(self.table.num_rows());
        self.sync_table();
    }

    /// Schedules a report of the current state unless it matches the last
    /// one.
    pub fn sync_table(&mut self) {
        let json = match self.state.to_json(&self.columns) {
            Ok(json) => json,
            Err(err) => {
                tracing::warn!("Failed to serialize the editing state: {}", err);
                return;
            }
        };
        if self.last_sync.as_deref() == Some(json.as_str()) {
            return;
        }
        tracing::debug!("Editing state changed: {}", json);
        self.last_sync = Some(json.clone());
        let on_change = Arc::clone(&self.on_change);
        self.debouncer.call(move || on_change(json));
    }

    pub fn has_pending_sync(&self) -> bool {
        self.debouncer.is_pending()
    }
}

fn default_cell(column: &BaseColumn) -> Cell {
    let default = column.props.default_value.clone().unwrap_or_default();
    let value = match column.validate_input(&default) {
        Validation::Valid => default,
        Validation::Corrected(corrected) => corrected,
        Validation::Invalid => RawValue::Null,
    };
    let cell = column.get_cell(&value, false);
    if cell.is_error {
        tracing::warn!(
            "Ignoring invalid default value for column '{}': {}",
            column.name(),
            cell.display_text()
        );
        return column.get_cell(&RawValue::Null, false);
    }
    cell
}
