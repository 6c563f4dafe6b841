pub mod columns;
pub mod dataframe;
pub mod error;
pub mod loader;
pub mod state;
pub mod value;

pub use columns::cell::{Cell, CellContent, CellKind};
pub use columns::{BaseColumn, BaseColumnProps, ColumnKind};
pub use dataframe::table::{ArrowTable, DataFrameCell, Styler};
pub use error::{EditorError, Result};
pub use loader::config::{ColumnConfig, ColumnConfigMapping, EditingMode, EditorOptions};
pub use state::editing_state::EditingState;
pub use state::session::EditorSession;
pub use value::RawValue;
