pub mod cell;
pub mod chart;
pub mod checkbox;
pub mod coerce;
pub mod datetime;
pub mod format;
pub mod image;
pub mod link;
pub mod list;
pub mod markdown;
pub mod multiselect;
pub mod number;
pub mod object;
pub mod progress;
pub mod selectbox;
pub mod text;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::columns::cell::{Cell, CellContent, ContentAlign, ThemeOverride};
use crate::columns::format::DateKind;
use crate::value::RawValue;

use chart::ChartColumn;
use checkbox::CheckboxColumn;
use datetime::DateTimeColumn;
use image::ImageColumn;
use link::LinkColumn;
use list::ListColumn;
use markdown::MarkdownColumn;
use multiselect::MultiSelectColumn;
use number::NumberColumn;
use object::ObjectColumn;
use progress::ProgressColumn;
use selectbox::SelectboxColumn;
use text::TextColumn;

/// Name under which index columns are addressed in configuration and in the
/// serialized editing state.
pub const INDEX_IDENTIFIER: &str = "_index";

/// Prefix of configuration keys that address a column by position.
pub const COLUMN_POSITION_PREFIX: &str = "_pos:";

/// Logical type of a column as reported by the table reader.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ArrowType {
    pub pandas_type: String,
    pub numpy_type: String,
    /// Options of a categorical column.
    pub categories: Option<Vec<String>>,
    pub timezone: Option<String>,
    /// `(precision, scale)` of a decimal column.
    pub decimal: Option<(u8, i8)>,
}

impl ArrowType {
    pub fn new(pandas_type: impl Into<String>, numpy_type: impl Into<String>) -> Self {
        Self {
            pandas_type: pandas_type.into(),
            numpy_type: numpy_type.into(),
            ..Self::default()
        }
    }

    /// Normalized type name. Period and interval types keep their name in
    /// the numpy type, everything else in the pandas type.
    pub fn type_name(&self) -> String {
        let name = if self.pandas_type == "object" {
            &self.numpy_type
        } else {
            &self.pandas_type
        };
        name.trim().to_lowercase()
    }
}

pub fn is_integer_type(type_name: &str) -> bool {
    matches!(
        type_name,
        "int8" | "int16" | "int32" | "int64" | "uint8" | "uint16" | "uint32" | "uint64" | "range"
    )
}

pub fn is_unsigned_type(type_name: &str) -> bool {
    type_name.starts_with("uint")
}

pub fn is_float_type(type_name: &str) -> bool {
    matches!(
        type_name,
        "float16" | "float32" | "float64" | "float96" | "float128"
    )
}

pub fn is_decimal_type(type_name: &str) -> bool {
    type_name == "decimal"
}

pub fn is_numeric_type(type_name: &str) -> bool {
    is_integer_type(type_name) || is_float_type(type_name) || is_decimal_type(type_name)
}

pub fn is_boolean_type(type_name: &str) -> bool {
    type_name == "bool"
}

pub fn is_string_type(type_name: &str) -> bool {
    matches!(type_name, "unicode" | "empty")
}

pub fn is_date_type(type_name: &str) -> bool {
    type_name == "date"
}

pub fn is_time_type(type_name: &str) -> bool {
    type_name == "time"
}

pub fn is_datetime_type(type_name: &str) -> bool {
    matches!(type_name, "datetime" | "datetimetz")
}

pub fn is_list_type(type_name: &str) -> bool {
    type_name.starts_with("list")
}

pub fn is_categorical_type(type_name: &str) -> bool {
    type_name == "categorical"
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortMode {
    Default,
    Raw,
    Smart,
}

impl SortMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Raw => "raw",
            Self::Smart => "smart",
        }
    }
}

/// The backend-recognized column types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    Text,
    Number,
    Checkbox,
    Selectbox,
    List,
    MultiSelect,
    Link,
    Markdown,
    Date,
    Time,
    DateTime,
    LineChart,
    BarChart,
    AreaChart,
    Image,
    Progress,
    Object,
}

impl ColumnKind {
    pub const ALL: [ColumnKind; 17] = [
        Self::Text,
        Self::Number,
        Self::Checkbox,
        Self::Selectbox,
        Self::List,
        Self::MultiSelect,
        Self::Link,
        Self::Markdown,
        Self::Date,
        Self::Time,
        Self::DateTime,
        Self::LineChart,
        Self::BarChart,
        Self::AreaChart,
        Self::Image,
        Self::Progress,
        Self::Object,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Checkbox => "checkbox",
            Self::Selectbox => "selectbox",
            Self::List => "list",
            Self::MultiSelect => "multiselect",
            Self::Link => "link",
            Self::Markdown => "markdown",
            Self::Date => "date",
            Self::Time => "time",
            Self::DateTime => "datetime",
            Self::LineChart => "line_chart",
            Self::BarChart => "bar_chart",
            Self::AreaChart => "area_chart",
            Self::Image => "image",
            Self::Progress => "progress",
            Self::Object => "object",
        }
    }

    /// Looks up a column kind by the name used in `type_config.type`.
    pub fn from_type_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }

    /// Columns of these kinds are never editable, whatever the configuration says.
    pub fn is_editable_type(self) -> bool {
        !matches!(
            self,
            Self::LineChart
                | Self::BarChart
                | Self::AreaChart
                | Self::Image
                | Self::Progress
                | Self::Object
        )
    }

    pub fn sort_mode(self) -> SortMode {
        match self {
            Self::Number
            | Self::Checkbox
            | Self::Date
            | Self::Time
            | Self::DateTime
            | Self::Progress => SortMode::Raw,
            Self::Text | Self::Selectbox | Self::Link | Self::Markdown | Self::Object => {
                SortMode::Smart
            }
            Self::List
            | Self::MultiSelect
            | Self::LineChart
            | Self::BarChart
            | Self::AreaChart
            | Self::Image => SortMode::Default,
        }
    }
}

/// Maps a logical Arrow type to the column kind that displays it. Anything
/// unrecognized is shown as an object column.
pub fn column_kind_from_arrow(arrow_type: &ArrowType) -> ColumnKind {
    let type_name = arrow_type.type_name();
    match type_name.as_str() {
        "" => ColumnKind::Object,
        "unicode" | "empty" => ColumnKind::Text,
        "datetime" | "datetimetz" => ColumnKind::DateTime,
        "time" => ColumnKind::Time,
        "date" => ColumnKind::Date,
        "object" | "bytes" => ColumnKind::Object,
        "bool" => ColumnKind::Checkbox,
        "categorical" => ColumnKind::Selectbox,
        name if is_numeric_type(name) => ColumnKind::Number,
        name if is_list_type(name) => ColumnKind::List,
        _ => ColumnKind::Object,
    }
}

/// Column properties computed from the table and the user configuration.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BaseColumnProps {
    pub id: String,
    pub name: String,
    pub title: String,
    /// Position among all columns, index columns first.
    pub index_number: usize,
    pub arrow_type: ArrowType,
    pub is_editable: bool,
    pub is_hidden: bool,
    pub is_index: bool,
    pub is_pinned: bool,
    pub is_stretched: bool,
    pub is_required: bool,
    pub width: Option<u32>,
    pub help: Option<String>,
    pub icon: Option<String>,
    pub content_alignment: Option<ContentAlign>,
    pub default_value: Option<RawValue>,
    /// The user `type_config`, including its `type` tag.
    pub column_type_options: Map<String, Value>,
    pub theme_override: Option<ThemeOverride>,
}

impl BaseColumnProps {
    /// A cell carrying the flags shared by every cell of this column.
    pub(crate) fn cell(&self, content: CellContent) -> Cell {
        let mut cell = Cell::new(content)
            .with_readonly(!self.is_editable)
            .with_align(self.content_alignment);
        cell.theme_override = self.theme_override.clone();
        cell
    }

    pub(crate) fn option(&self, key: &str) -> Option<&Value> {
        self.column_type_options.get(key).filter(|v| !v.is_null())
    }
}

/// Result of checking a proposed value against a column's constraints.
#[derive(Clone, Debug, PartialEq)]
pub enum Validation {
    Valid,
    Invalid,
    /// The value violates a constraint that is fixed up rather than rejected.
    Corrected(RawValue),
}

/// Behavior every column kind provides.
pub trait ColumnType {
    /// Builds the cell for `value`. With `validate`, the value is also
    /// checked against the column constraints and may be corrected.
    fn get_cell(&self, props: &BaseColumnProps, value: &RawValue, validate: bool) -> Cell;

    /// Recovers the raw value from a cell created by `get_cell`.
    fn get_cell_value(&self, cell: &Cell) -> RawValue;

    fn validate_input(&self, _props: &BaseColumnProps, _value: &RawValue) -> Validation {
        Validation::Valid
    }
}

#[derive(Clone, Debug)]
enum ColumnImpl {
    Text(TextColumn),
    Number(NumberColumn),
    Checkbox(CheckboxColumn),
    Selectbox(SelectboxColumn),
    List(ListColumn),
    MultiSelect(MultiSelectColumn),
    Link(LinkColumn),
    Markdown(MarkdownColumn),
    DateTime(DateTimeColumn),
    Chart(ChartColumn),
    Image(ImageColumn),
    Progress(ProgressColumn),
    Object(ObjectColumn),
}

impl ColumnImpl {
    fn new(kind: ColumnKind, props: &BaseColumnProps) -> Self {
        match kind {
            ColumnKind::Text => Self::Text(TextColumn::new(props)),
            ColumnKind::Number => Self::Number(NumberColumn::new(props)),
            ColumnKind::Checkbox => Self::Checkbox(CheckboxColumn),
            ColumnKind::Selectbox => Self::Selectbox(SelectboxColumn::new(props)),
            ColumnKind::List => Self::List(ListColumn),
            ColumnKind::MultiSelect => Self::MultiSelect(MultiSelectColumn::new(props)),
            ColumnKind::Link => Self::Link(LinkColumn::new(props)),
            ColumnKind::Markdown => Self::Markdown(MarkdownColumn::new(props)),
            ColumnKind::Date => Self::DateTime(DateTimeColumn::new(props, DateKind::Date)),
            ColumnKind::Time => Self::DateTime(DateTimeColumn::new(props, DateKind::Time)),
            ColumnKind::DateTime => {
                Self::DateTime(DateTimeColumn::new(props, DateKind::DateTime))
            }
            ColumnKind::LineChart => Self::Chart(ChartColumn::new(props, cell::ChartKind::Line)),
            ColumnKind::BarChart => Self::Chart(ChartColumn::new(props, cell::ChartKind::Bar)),
            ColumnKind::AreaChart => Self::Chart(ChartColumn::new(props, cell::ChartKind::Area)),
            ColumnKind::Image => Self::Image(ImageColumn),
            ColumnKind::Progress => Self::Progress(ProgressColumn::new(props)),
            ColumnKind::Object => Self::Object(ObjectColumn),
        }
    }

    fn as_column_type(&self) -> &dyn ColumnType {
        match self {
            Self::Text(c) => c,
            Self::Number(c) => c,
            Self::Checkbox(c) => c,
            Self::Selectbox(c) => c,
            Self::List(c) => c,
            Self::MultiSelect(c) => c,
            Self::Link(c) => c,
            Self::Markdown(c) => c,
            Self::DateTime(c) => c,
            Self::Chart(c) => c,
            Self::Image(c) => c,
            Self::Progress(c) => c,
            Self::Object(c) => c,
        }
    }
}

/// A fully resolved column: its properties plus the behavior of its kind.
#[derive(Clone, Debug)]
pub struct BaseColumn {
    pub props: BaseColumnProps,
    kind: ColumnKind,
    imp: ColumnImpl,
}

impl BaseColumn {
    pub fn new(kind: ColumnKind, mut props: BaseColumnProps) -> Self {
        if !kind.is_editable_type() {
            props.is_editable = false;
        }
        let imp = ColumnImpl::new(kind, &props);
        Self { props, kind, imp }
    }

    pub fn kind(&self) -> ColumnKind {
        self.kind
    }

    pub fn sort_mode(&self) -> SortMode {
        self.kind.sort_mode()
    }

    pub fn name(&self) -> &str {
        &self.props.name
    }

    pub fn title(&self) -> &str {
        &self.props.title
    }

    pub fn index_number(&self) -> usize {
        self.props.index_number
    }

    pub fn arrow_type(&self) -> &ArrowType {
        &self.props.arrow_type
    }

    pub fn is_editable(&self) -> bool {
        self.props.is_editable
    }

    pub fn is_index(&self) -> bool {
        self.props.is_index
    }

    pub fn is_hidden(&self) -> bool {
        self.props.is_hidden
    }

    pub fn is_pinned(&self) -> bool {
        self.props.is_pinned
    }

    pub fn is_required(&self) -> bool {
        self.props.is_required
    }

    pub fn get_cell(&self, value: &RawValue, validate: bool) -> Cell {
        self.imp.as_column_type().get_cell(&self.props, value, validate)
    }

    pub fn get_cell_value(&self, cell: &Cell) -> RawValue {
        if cell.is_error {
            return RawValue::Null;
        }
        self.imp.as_column_type().get_cell_value(cell)
    }

    pub fn validate_input(&self, value: &RawValue) -> Validation {
        self.imp.as_column_type().validate_input(&self.props, value)
    }
}

/// Name used for a column in the serialized editing state.
pub fn column_name(column: &BaseColumn) -> &str {
    if column.is_index() {
        INDEX_IDENTIFIER
    } else {
        column.name()
    }
}

/// Deep-merges user parameters over the defaults of a column kind. `null`
/// user values leave the default in place.
pub fn merge_column_parameters(defaults: Value, user: &Map<String, Value>) -> Value {
    let mut merged = match defaults {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    for (key, value) in user {
        if value.is_null() {
            continue;
        }
        match (merged.get_mut(key), value) {
            (Some(existing @ Value::Object(_)), Value::Object(user_inner)) => {
                let current = std::mem::take(existing);
                *existing = merge_column_parameters(current, user_inner);
            }
            _ => {
                merged.insert(key.clone(), value.clone());
            }
        }
    }
    Value::Object(merged)
}

/// Merges and deserializes the type-specific parameters of a column.
pub(crate) fn column_parameters<T>(defaults: Value, props: &BaseColumnProps) -> T
where
    T: DeserializeOwned + Default,
{
    let merged = merge_column_parameters(defaults.clone(), &props.column_type_options);
    serde_json::from_value(merged).unwrap_or_else(|err| {
        tracing::warn!(
            "Invalid parameters configured for column '{}': {}",
            props.name,
            err
        );
        serde_json::from_value(defaults).unwrap_or_default()
    })
}

/// Deserializes a JSON number that may also arrive as a numeric string.
pub(crate) fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }))
}
