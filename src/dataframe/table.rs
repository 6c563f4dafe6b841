use std::collections::HashMap;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{
    DataType, Date32Type, Date64Type, Decimal128Type, DurationMicrosecondType,
    DurationMillisecondType, DurationNanosecondType, DurationSecondType, FieldRef, Float16Type,
    Float32Type, Float64Type, Int16Type, Int32Type, Int64Type, Int8Type, Time32MillisecondType,
    Time32SecondType, Time64MicrosecondType, Time64NanosecondType, TimeUnit,
    TimestampMicrosecondType, TimestampMillisecondType, TimestampNanosecondType,
    TimestampSecondType, UInt16Type, UInt32Type, UInt64Type, UInt8Type,
};
use arrow::record_batch::RecordBatch;
use arrow::util::display::{ArrayFormatter, FormatOptions};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::columns::format::{format_duration, format_period};
use crate::columns::ArrowType;
use crate::error::{EditorError, Result};
use crate::value::RawValue;

const PANDAS_METADATA_KEY: &str = "pandas";
const MS_PER_DAY: i64 = 86_400_000;

/// Pandas Styler output attached to a table: the generated stylesheet and
/// the formatted value of each styled data cell.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Styler {
    pub uuid: String,
    pub css_styles: Option<String>,
    display_values: HashMap<(usize, usize), String>,
}

impl Styler {
    pub fn new(uuid: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            ..Self::default()
        }
    }

    pub fn with_css(mut self, css_styles: impl Into<String>) -> Self {
        self.css_styles = Some(css_styles.into());
        self
    }

    /// Display string for the data cell at (`row`, `data_column`).
    pub fn with_display_value(
        mut self,
        row: usize,
        data_column: usize,
        text: impl Into<String>,
    ) -> Self {
        self.display_values.insert((row, data_column), text.into());
        self
    }

    pub fn display_value(&self, row: usize, data_column: usize) -> Option<&str> {
        self.display_values
            .get(&(row, data_column))
            .map(String::as_str)
    }
}

/// One cell as read from the table, before any column logic is applied.
#[derive(Clone, Debug, PartialEq)]
pub struct DataFrameCell {
    pub content: RawValue,
    pub content_type: ArrowType,
    /// Physical field backing the cell. `None` for a range index.
    pub field: Option<FieldRef>,
    /// Styler-provided display string.
    pub display_content: Option<String>,
    pub css_id: Option<String>,
    pub css_class: Option<String>,
    /// The value formatted by Arrow's own display rules.
    pub formatted: String,
}

#[derive(Clone, Debug, PartialEq)]
enum Source {
    Field(usize),
    Range { start: i64, step: i64 },
}

#[derive(Clone, Debug, PartialEq)]
pub struct TableColumn {
    pub name: String,
    pub arrow_type: ArrowType,
    source: Source,
}

impl TableColumn {
    pub fn is_range_index(&self) -> bool {
        matches!(self.source, Source::Range { .. })
    }
}

#[derive(Debug, Deserialize)]
struct PandasMetadata {
    #[serde(default)]
    index_columns: Vec<PandasIndex>,
    #[serde(default)]
    columns: Vec<PandasColumn>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PandasIndex {
    Field(String),
    Range {
        name: Option<String>,
        start: i64,
        step: i64,
    },
}

#[derive(Debug, Deserialize)]
struct PandasColumn {
    name: Option<Value>,
    field_name: Option<String>,
    pandas_type: String,
    numpy_type: String,
    #[serde(default)]
    metadata: Option<Map<String, Value>>,
}

/// Read-only view over a record batch, split into index and data columns
/// according to the pandas schema metadata when present.
#[derive(Clone, Debug)]
pub struct ArrowTable {
    batch: RecordBatch,
    index: Vec<TableColumn>,
    data: Vec<TableColumn>,
    styler: Option<Styler>,
}

impl ArrowTable {
    pub fn from_batch(batch: RecordBatch) -> Result<Self> {
        let schema = batch.schema();
        let pandas: Option<PandasMetadata> = schema
            .metadata()
            .get(PANDAS_METADATA_KEY)
            .map(|raw| serde_json::from_str(raw))
            .transpose()?;

        let pandas_columns: HashMap<String, &PandasColumn> = pandas
            .iter()
            .flat_map(|meta| meta.columns.iter())
            .filter_map(|col| {
                let key = col
                    .field_name
                    .clone()
                    .or_else(|| col.name.as_ref().and_then(Value::as_str).map(str::to_string))?;
                Some((key, col))
            })
            .collect();

        let describe = |position: usize| -> TableColumn {
            let field = schema.field(position);
            let column = batch.column(position);
            let pandas = pandas_columns.get(field.name()).copied();
            let name = match pandas.and_then(|p| p.name.as_ref()) {
                Some(Value::String(name)) => name.clone(),
                Some(Value::Null) | None if field.name().starts_with("__index_level_") => {
                    String::new()
                }
                Some(other) if !other.is_null() => other.to_string(),
                _ => field.name().clone(),
            };
            TableColumn {
                name,
                arrow_type: resolve_arrow_type(column, pandas),
                source: Source::Field(position),
            }
        };

        let mut index = Vec::new();
        let mut index_fields = Vec::new();
        for entry in pandas.iter().flat_map(|meta| meta.index_columns.iter()) {
            match entry {
                PandasIndex::Field(field_name) => {
                    let position = schema.index_of(field_name).map_err(|_| {
                        EditorError::InvalidState(format!(
                            "Index column '{field_name}' is not part of the table"
                        ))
                    })?;
                    index_fields.push(position);
                    index.push(describe(position));
                }
                PandasIndex::Range {
                    name, start, step, ..
                } => index.push(TableColumn {
                    name: name.clone().unwrap_or_default(),
                    arrow_type: ArrowType::new("range", "range"),
                    source: Source::Range {
                        start: *start,
                        step: *step,
                    },
                }),
            }
        }

        let data = (0..schema.fields().len())
            .filter(|position| !index_fields.contains(position))
            .map(describe)
            .collect();

        tracing::debug!(
            "Loaded table with {} rows, {} index and {} data columns",
            batch.num_rows(),
            index.len(),
            schema.fields().len() - index_fields.len()
        );

        Ok(Self {
            batch,
            index,
            data,
            styler: None,
        })
    }

    pub fn with_styler(mut self, styler: Styler) -> Self {
        self.styler = Some(styler);
        self
    }

    pub fn styler(&self) -> Option<&Styler> {
        self.styler.as_ref()
    }

    pub fn css_styles(&self) -> Option<&str> {
        self.styler.as_ref().and_then(|s| s.css_styles.as_deref())
    }

    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    pub fn num_index_columns(&self) -> usize {
        self.index.len()
    }

    pub fn num_data_columns(&self) -> usize {
        self.data.len()
    }

    pub fn num_columns(&self) -> usize {
        self.index.len() + self.data.len()
    }

    pub fn index_columns(&self) -> &[TableColumn] {
        &self.index
    }

    pub fn data_columns(&self) -> &[TableColumn] {
        &self.data
    }

    /// Column at `position`, counting index columns first.
    pub fn column(&self, position: usize) -> Option<&TableColumn> {
        self.index
            .get(position)
            .or_else(|| self.data.get(position.checked_sub(self.index.len())?))
    }

    pub fn get_cell(&self, row: usize, position: usize) -> Result<DataFrameCell> {
        let column = self.column(position).ok_or_else(|| {
            EditorError::InvalidState(format!("Column {position} is out of bounds"))
        })?;
        if row >= self.num_rows() {
            return Err(EditorError::InvalidState(format!(
                "Row {row} is out of bounds"
            )));
        }

        let is_index = position < self.index.len();
        let (css_id, css_class, display_content) = match &self.styler {
            Some(styler) if is_index => (
                Some(format!("T_{}level{}_row{}", styler.uuid, position, row)),
                Some(format!("row_heading level{position} row{row}")),
                None,
            ),
            Some(styler) => {
                let data_column = position - self.index.len();
                (
                    Some(format!("T_{}row{}_col{}", styler.uuid, row, data_column)),
                    Some(format!("data row{row} col{data_column}")),
                    styler.display_value(row, data_column).map(str::to_string),
                )
            }
            None => (None, None, None),
        };

        let (content, field, formatted) = match &column.source {
            Source::Range { start, step } => {
                let value = start + step * row as i64;
                (RawValue::Int(value), None, value.to_string())
            }
            Source::Field(field_position) => {
                let array = self.batch.column(*field_position);
                let content = extract_value(array, row)?;
                let formatted = format_cell(array, row, &content, &column.arrow_type)?;
                let field = Arc::clone(&self.batch.schema_ref().fields()[*field_position]);
                (content, Some(field), formatted)
            }
        };

        Ok(DataFrameCell {
            content,
            content_type: column.arrow_type.clone(),
            field,
            display_content,
            css_id,
            css_class,
            formatted,
        })
    }
}

fn resolve_arrow_type(array: &ArrayRef, pandas: Option<&PandasColumn>) -> ArrowType {
    let mut arrow_type = match pandas {
        Some(p) => ArrowType::new(p.pandas_type.clone(), p.numpy_type.clone()),
        None => infer_arrow_type(array.data_type()),
    };

    match array.data_type() {
        DataType::Dictionary(_, _) => {
            arrow_type.categories = dictionary_categories(array);
        }
        DataType::Timestamp(_, Some(tz)) => {
            arrow_type.timezone = Some(tz.to_string());
        }
        DataType::Decimal128(precision, scale) | DataType::Decimal256(precision, scale) => {
            arrow_type.decimal = Some((*precision, *scale));
        }
        _ => {}
    }
    if let Some(tz) = pandas
        .and_then(|p| p.metadata.as_ref())
        .and_then(|m| m.get("timezone"))
        .and_then(Value::as_str)
    {
        arrow_type.timezone = Some(tz.to_string());
    }
    arrow_type
}

/// Pandas-style type for a field without pandas metadata.
fn infer_arrow_type(data_type: &DataType) -> ArrowType {
    let simple = |name: &str| ArrowType::new(name, name);
    match data_type {
        DataType::Null => ArrowType::new("empty", "object"),
        DataType::Boolean => simple("bool"),
        DataType::Int8 => simple("int8"),
        DataType::Int16 => simple("int16"),
        DataType::Int32 => simple("int32"),
        DataType::Int64 => simple("int64"),
        DataType::UInt8 => simple("uint8"),
        DataType::UInt16 => simple("uint16"),
        DataType::UInt32 => simple("uint32"),
        DataType::UInt64 => simple("uint64"),
        DataType::Float16 => simple("float16"),
        DataType::Float32 => simple("float32"),
        DataType::Float64 => simple("float64"),
        DataType::Decimal128(_, _) | DataType::Decimal256(_, _) => {
            ArrowType::new("decimal", "object")
        }
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => {
            ArrowType::new("unicode", "object")
        }
        DataType::Binary | DataType::LargeBinary | DataType::BinaryView => {
            ArrowType::new("bytes", "object")
        }
        DataType::Date32 | DataType::Date64 => ArrowType::new("date", "object"),
        DataType::Time32(_) | DataType::Time64(_) => ArrowType::new("time", "object"),
        DataType::Timestamp(_, None) => ArrowType::new("datetime", "datetime64[ns]"),
        DataType::Timestamp(_, Some(_)) => ArrowType::new("datetimetz", "datetime64[ns]"),
        DataType::Duration(_) => ArrowType::new("object", "timedelta64[ns]"),
        DataType::Dictionary(_, _) => ArrowType::new("categorical", "int8"),
        DataType::List(field)
        | DataType::LargeList(field)
        | DataType::FixedSizeList(field, _) => {
            let inner = infer_arrow_type(field.data_type()).type_name();
            ArrowType::new(format!("list[{inner}]"), "object")
        }
        _ => ArrowType::new("object", "object"),
    }
}

fn dictionary_categories(array: &ArrayRef) -> Option<Vec<String>> {
    let values = array.as_any_dictionary_opt()?.values();
    let strings = cast(values, &DataType::Utf8).ok()?;
    let strings = strings.as_string::<i32>();
    Some(
        (0..strings.len())
            .filter(|i| strings.is_valid(*i))
            .map(|i| strings.value(i).to_string())
            .collect(),
    )
}

/// Reads the raw value at `row`. Dates and timestamps come out as epoch
/// milliseconds, times and durations as integers in the field's unit.
pub fn extract_value(array: &ArrayRef, row: usize) -> Result<RawValue> {
    if array.is_null(row) {
        return Ok(RawValue::Null);
    }
    let value = match array.data_type() {
        DataType::Null => RawValue::Null,
        DataType::Boolean => RawValue::Bool(array.as_boolean().value(row)),
        DataType::Int8 => RawValue::Int(array.as_primitive::<Int8Type>().value(row).into()),
        DataType::Int16 => RawValue::Int(array.as_primitive::<Int16Type>().value(row).into()),
        DataType::Int32 => RawValue::Int(array.as_primitive::<Int32Type>().value(row).into()),
        DataType::Int64 => RawValue::Int(array.as_primitive::<Int64Type>().value(row)),
        DataType::UInt8 => RawValue::UInt(array.as_primitive::<UInt8Type>().value(row).into()),
        DataType::UInt16 => RawValue::UInt(array.as_primitive::<UInt16Type>().value(row).into()),
        DataType::UInt32 => RawValue::UInt(array.as_primitive::<UInt32Type>().value(row).into()),
        DataType::UInt64 => RawValue::UInt(array.as_primitive::<UInt64Type>().value(row)),
        DataType::Float16 => {
            RawValue::Float(array.as_primitive::<Float16Type>().value(row).to_f64())
        }
        DataType::Float32 => {
            RawValue::Float(array.as_primitive::<Float32Type>().value(row).into())
        }
        DataType::Float64 => RawValue::Float(array.as_primitive::<Float64Type>().value(row)),
        DataType::Decimal128(_, _) => {
            RawValue::BigInt(array.as_primitive::<Decimal128Type>().value(row))
        }
        DataType::Utf8 => RawValue::Str(array.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => RawValue::Str(array.as_string::<i64>().value(row).to_string()),
        DataType::Utf8View => RawValue::Str(array.as_string_view().value(row).to_string()),
        DataType::Binary => RawValue::Str(
            String::from_utf8_lossy(array.as_binary::<i32>().value(row)).into_owned(),
        ),
        DataType::LargeBinary => RawValue::Str(
            String::from_utf8_lossy(array.as_binary::<i64>().value(row)).into_owned(),
        ),
        DataType::Date32 => RawValue::Int(
            i64::from(array.as_primitive::<Date32Type>().value(row)) * MS_PER_DAY,
        ),
        DataType::Date64 => RawValue::Int(array.as_primitive::<Date64Type>().value(row)),
        DataType::Timestamp(unit, _) => RawValue::Int(timestamp_millis(array, row, unit)),
        DataType::Time32(TimeUnit::Second) => {
            RawValue::Int(array.as_primitive::<Time32SecondType>().value(row).into())
        }
        DataType::Time32(_) => {
            RawValue::Int(array.as_primitive::<Time32MillisecondType>().value(row).into())
        }
        DataType::Time64(TimeUnit::Microsecond) => {
            RawValue::Int(array.as_primitive::<Time64MicrosecondType>().value(row))
        }
        DataType::Time64(_) => {
            RawValue::Int(array.as_primitive::<Time64NanosecondType>().value(row))
        }
        DataType::Duration(unit) => RawValue::Int(match unit {
            TimeUnit::Second => array.as_primitive::<DurationSecondType>().value(row),
            TimeUnit::Millisecond => array.as_primitive::<DurationMillisecondType>().value(row),
            TimeUnit::Microsecond => array.as_primitive::<DurationMicrosecondType>().value(row),
            TimeUnit::Nanosecond => array.as_primitive::<DurationNanosecondType>().value(row),
        }),
        DataType::List(_) => list_values(&array.as_list::<i32>().value(row))?,
        DataType::LargeList(_) => list_values(&array.as_list::<i64>().value(row))?,
        DataType::FixedSizeList(_, _) => list_values(&array.as_fixed_size_list().value(row))?,
        DataType::Struct(fields) => {
            let structs = array.as_struct();
            let mut object = Map::new();
            for (field, child) in fields.iter().zip(structs.columns()) {
                object.insert(field.name().clone(), extract_value(child, row)?.to_json());
            }
            RawValue::Object(object)
        }
        DataType::Dictionary(_, _) => {
            let single = cast(&array.slice(row, 1), &DataType::Utf8)?;
            RawValue::Str(single.as_string::<i32>().value(0).to_string())
        }
        _ => RawValue::Str(arrow_formatted(array, row)?),
    };
    Ok(value)
}

fn list_values(values: &ArrayRef) -> Result<RawValue> {
    (0..values.len())
        .map(|i| extract_value(values, i))
        .collect::<Result<Vec<_>>>()
        .map(RawValue::List)
}

fn timestamp_millis(array: &ArrayRef, row: usize, unit: &TimeUnit) -> i64 {
    match unit {
        TimeUnit::Second => array
            .as_primitive::<TimestampSecondType>()
            .value(row)
            .saturating_mul(1000),
        TimeUnit::Millisecond => array.as_primitive::<TimestampMillisecondType>().value(row),
        TimeUnit::Microsecond => array
            .as_primitive::<TimestampMicrosecondType>()
            .value(row)
            .div_euclid(1000),
        TimeUnit::Nanosecond => array
            .as_primitive::<TimestampNanosecondType>()
            .value(row)
            .div_euclid(1_000_000),
    }
}

fn arrow_formatted(array: &ArrayRef, row: usize) -> Result<String> {
    let formatter = ArrayFormatter::try_new(array.as_ref(), &FormatOptions::default())?;
    Ok(formatter.value(row).to_string())
}

/// Display string of a cell: periods and timedeltas get their pandas
/// rendering, everything else Arrow's.
fn format_cell(
    array: &ArrayRef,
    row: usize,
    content: &RawValue,
    arrow_type: &ArrowType,
) -> Result<String> {
    if content.is_null() {
        return Ok(String::new());
    }
    // Period frequencies are case sensitive ("M" is months, "min" minutes).
    if let (Some(freq), RawValue::Int(ordinal)) = (
        arrow_type
            .numpy_type
            .trim()
            .strip_prefix("period[")
            .and_then(|rest| rest.strip_suffix(']')),
        content,
    ) {
        return Ok(format_period(*ordinal, freq));
    }
    if arrow_type.type_name().starts_with("timedelta64") {
        if let (DataType::Duration(unit), RawValue::Int(value)) = (array.data_type(), content) {
            let nanos = match unit {
                TimeUnit::Second => *value as f64 * 1e9,
                TimeUnit::Millisecond => *value as f64 * 1e6,
                TimeUnit::Microsecond => *value as f64 * 1e3,
                TimeUnit::Nanosecond => *value as f64,
            };
            return Ok(format_duration(nanos));
        }
    }
    arrow_formatted(array, row)
}
