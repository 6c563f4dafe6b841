use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::columns::cell::ContentAlign;
use crate::columns::{
    merge_column_parameters, BaseColumnProps, COLUMN_POSITION_PREFIX, INDEX_IDENTIFIER,
};
use crate::error::{EditorError, Result};
use crate::value::RawValue;

pub const DEFAULT_DEBOUNCE_MS: u64 = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditingMode {
    #[default]
    ReadOnly,
    Fixed,
    Dynamic,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnWidth {
    Named(String),
    Pixels(u32),
}

impl ColumnWidth {
    /// Width in pixels. Unknown names resolve to `None`.
    pub fn pixels(&self) -> Option<u32> {
        match self {
            Self::Pixels(px) => Some(*px),
            Self::Named(name) => match name.as_str() {
                "small" => Some(75),
                "medium" => Some(200),
                "large" => Some(400),
                other => {
                    tracing::warn!("Unknown column width '{}'", other);
                    None
                }
            },
        }
    }
}

/// User configuration of one column.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct ColumnConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<ColumnWidth>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment: Option<ContentAlign>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pinned: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_config: Option<Map<String, Value>>,
}

impl ColumnConfig {
    /// The column type named in `type_config.type`.
    pub fn type_name(&self) -> Option<&str> {
        self.type_config
            .as_ref()
            .and_then(|config| config.get("type"))
            .and_then(Value::as_str)
    }

    /// Writes every field set in this configuration onto `props`. Unset
    /// fields leave the computed value alone.
    pub fn apply_to(&self, props: &mut BaseColumnProps) {
        if let Some(label) = &self.label {
            props.title = label.clone();
        }
        if let Some(width) = self.width.as_ref().and_then(ColumnWidth::pixels) {
            props.width = Some(width);
        }
        if let Some(help) = &self.help {
            props.help = Some(help.clone());
        }
        if let Some(hidden) = self.hidden {
            props.is_hidden = hidden;
        }
        if let Some(disabled) = self.disabled {
            props.is_editable = !disabled;
        }
        if let Some(required) = self.required {
            props.is_required = required;
        }
        if let Some(default) = self.default.as_ref().filter(|v| !v.is_null()) {
            props.default_value = Some(RawValue::from(default));
        }
        if let Some(alignment) = self.alignment {
            props.content_alignment = Some(alignment);
        }
        if let Some(pinned) = self.pinned {
            props.is_pinned = pinned;
        }
        if let Some(type_config) = &self.type_config {
            let existing = std::mem::take(&mut props.column_type_options);
            if let Value::Object(merged) =
                merge_column_parameters(Value::Object(existing), type_config)
            {
                props.column_type_options = merged;
            }
        }
    }
}

/// Column configurations keyed by column name, `_index` or `_pos:<n>`.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnConfigMapping(BTreeMap<String, ColumnConfig>);

impl ColumnConfigMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(json).map_err(|err| EditorError::InvalidConfig(err.to_string()))
    }

    pub fn insert(&mut self, key: impl Into<String>, config: ColumnConfig) {
        self.0.insert(key.into(), config);
    }

    pub fn get(&self, key: &str) -> Option<&ColumnConfig> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The configuration that applies to a column: by name, then by
    /// position, then `_index` for index columns.
    pub fn lookup(&self, props: &BaseColumnProps) -> Option<&ColumnConfig> {
        if !props.name.is_empty() {
            if let Some(config) = self.get(&props.name) {
                return Some(config);
            }
        }
        let position_key = format!("{COLUMN_POSITION_PREFIX}{}", props.index_number);
        if let Some(config) = self.get(&position_key) {
            return Some(config);
        }
        if props.is_index {
            return self.get(INDEX_IDENTIFIER);
        }
        None
    }
}

/// Widget-level settings of the editor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorOptions {
    pub editing_mode: EditingMode,
    pub disabled: bool,
    pub use_container_width: bool,
    pub column_order: Option<Vec<String>>,
    pub debounce_ms: u64,
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self {
            editing_mode: EditingMode::default(),
            disabled: false,
            use_container_width: false,
            column_order: None,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

impl EditorOptions {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn is_read_only(&self) -> bool {
        self.editing_mode == EditingMode::ReadOnly
    }

    pub fn allows_row_changes(&self) -> bool {
        self.editing_mode == EditingMode::Dynamic && !self.disabled
    }
}
