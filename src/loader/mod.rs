pub mod config;

use crate::columns::{column_kind_from_arrow, column_name, BaseColumn, BaseColumnProps, ColumnKind};
use crate::dataframe::cells::{column_props_from_arrow, empty_index_column, index_props_from_arrow};
use crate::dataframe::table::ArrowTable;

use config::{ColumnConfigMapping, EditingMode, EditorOptions};

/// Icon shown in the header of editable columns.
pub const EDITABLE_ICON: &str = "editable";

/// Resolves the columns to show for `table`: index columns first, then data
/// columns, each merged with its configuration and turned into a typed
/// column. Hidden columns are dropped and the rest ordered for display.
pub fn load_columns(
    table: &ArrowTable,
    config: &ColumnConfigMapping,
    options: &EditorOptions,
) -> Vec<BaseColumn> {
    let index_props = (0..table.num_index_columns()).filter_map(|i| index_props_from_arrow(table, i));
    let data_props = (0..table.num_data_columns()).filter_map(|i| column_props_from_arrow(table, i));

    let columns: Vec<BaseColumn> = index_props
        .chain(data_props)
        .map(|props| resolve_column(props, config, options))
        .filter(|column| !column.is_hidden())
        .collect();

    let ordered = order_columns(columns, options.column_order.as_deref());
    if ordered.is_empty() {
        tracing::debug!("No visible columns, using an empty index column");
        return vec![empty_index_column()];
    }
    ordered
}

fn resolve_column(
    mut props: BaseColumnProps,
    config: &ColumnConfigMapping,
    options: &EditorOptions,
) -> BaseColumn {
    let column_config = config.lookup(&props);
    if let Some(column_config) = column_config {
        column_config.apply_to(&mut props);
    }
    props.is_stretched = options.use_container_width;

    let kind = resolve_kind(&props, column_config.and_then(|c| c.type_name()));

    if options.is_read_only() || options.disabled || !kind.is_editable_type() {
        props.is_editable = false;
    }
    if props.is_editable {
        props.icon = Some(EDITABLE_ICON.to_string());
    }
    if props.is_required && options.editing_mode == EditingMode::Dynamic {
        props.is_hidden = false;
    }

    BaseColumn::new(kind, props)
}

fn resolve_kind(props: &BaseColumnProps, type_name: Option<&str>) -> ColumnKind {
    let inferred = column_kind_from_arrow(&props.arrow_type);
    let Some(type_name) = type_name else {
        return inferred;
    };
    ColumnKind::from_type_name(type_name).unwrap_or_else(|| {
        tracing::warn!(
            "Unknown column type '{}' configured for column '{}', using {}",
            type_name,
            props.name,
            inferred.as_str()
        );
        inferred
    })
}

/// Pinned columns first in their original order, then either the explicit
/// order (columns it does not mention are dropped) or the remaining columns
/// as they came.
fn order_columns(columns: Vec<BaseColumn>, column_order: Option<&[String]>) -> Vec<BaseColumn> {
    let (mut ordered, unpinned): (Vec<BaseColumn>, Vec<BaseColumn>) =
        columns.into_iter().partition(BaseColumn::is_pinned);

    match column_order.filter(|order| !order.is_empty()) {
        Some(order) => {
            let mut remaining: Vec<Option<BaseColumn>> = unpinned.into_iter().map(Some).collect();
            for name in order {
                if let Some(slot) = remaining
                    .iter_mut()
                    .find(|slot| slot.as_ref().is_some_and(|c| column_name(c) == name))
                {
                    ordered.extend(slot.take());
                }
            }
        }
        None => ordered.extend(unpinned),
    }
    ordered
}
