use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::columns::format::DateKind;
use crate::value::RawValue;

/// Prefix of the visible text of every error cell.
pub const ERROR_GLYPH: &str = "⚠️";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentAlign {
    Left,
    Center,
    Right,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ThemeOverride {
    pub bg_cell: Option<String>,
    pub text_dark: Option<String>,
}

impl ThemeOverride {
    pub fn is_empty(&self) -> bool {
        self.bg_cell.is_none() && self.text_dark.is_none()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChartKind {
    Line,
    Bar,
    Area,
}

impl ChartKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Line => "line",
            Self::Bar => "bar",
            Self::Area => "area",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SelectOption {
    pub value: String,
    pub label: Option<String>,
    pub color: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CellKind {
    Text,
    Number,
    Boolean,
    Uri,
    Markdown,
    Image,
    Bubble,
    Loading,
    Dropdown,
    MultiSelect,
    DatePicker,
    Sparkline,
    Range,
}

impl CellKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Uri => "uri",
            Self::Markdown => "markdown",
            Self::Image => "image",
            Self::Bubble => "bubble",
            Self::Loading => "loading",
            Self::Dropdown => "custom-dropdown",
            Self::MultiSelect => "custom-multiselect",
            Self::DatePicker => "custom-date-picker",
            Self::Sparkline => "custom-sparkline",
            Self::Range => "custom-range",
        }
    }

    pub fn is_custom(self) -> bool {
        self.as_str().starts_with("custom-")
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum CellContent {
    Text {
        data: Option<String>,
        display_data: String,
    },
    Number {
        data: Option<f64>,
        display_data: String,
        fixed_decimals: Option<usize>,
        allow_negative: bool,
    },
    Boolean {
        data: Option<bool>,
    },
    Uri {
        data: Option<String>,
        display_data: String,
    },
    Markdown {
        data: Option<String>,
    },
    Image {
        data: Vec<String>,
    },
    Bubble {
        data: Vec<String>,
        /// The list items as they were given, returned on read back.
        values: Vec<RawValue>,
    },
    Loading,
    Dropdown {
        value: Option<String>,
        allowed_values: Vec<Option<String>>,
    },
    MultiSelect {
        values: Option<Vec<String>>,
        items: Vec<RawValue>,
        options: Vec<SelectOption>,
        allow_creation: bool,
    },
    DatePicker {
        date: Option<DateTime<Utc>>,
        display_date: String,
        kind: DateKind,
        step: Option<f64>,
        min: Option<DateTime<Utc>>,
        max: Option<DateTime<Utc>>,
    },
    Sparkline {
        values: Vec<f64>,
        display_values: Vec<String>,
        graph_kind: ChartKind,
        y_axis: (f64, f64),
    },
    Range {
        value: Option<f64>,
        min: f64,
        max: f64,
        step: f64,
        label: String,
        measure_label: String,
    },
}

/// One (row, column) intersection of the grid, ready for display or edit.
#[derive(Clone, Debug, PartialEq)]
pub struct Cell {
    pub content: CellContent,
    pub readonly: bool,
    pub allow_overlay: bool,
    pub is_missing_value: bool,
    pub is_error: bool,
    pub copy_data: Option<String>,
    pub content_align: Option<ContentAlign>,
    pub theme_override: Option<ThemeOverride>,
}

impl Cell {
    pub fn new(content: CellContent) -> Self {
        Self {
            content,
            readonly: true,
            allow_overlay: true,
            is_missing_value: false,
            is_error: false,
            copy_data: None,
            content_align: None,
            theme_override: None,
        }
    }

    pub fn kind(&self) -> CellKind {
        match &self.content {
            CellContent::Text { .. } => CellKind::Text,
            CellContent::Number { .. } => CellKind::Number,
            CellContent::Boolean { .. } => CellKind::Boolean,
            CellContent::Uri { .. } => CellKind::Uri,
            CellContent::Markdown { .. } => CellKind::Markdown,
            CellContent::Image { .. } => CellKind::Image,
            CellContent::Bubble { .. } => CellKind::Bubble,
            CellContent::Loading => CellKind::Loading,
            CellContent::Dropdown { .. } => CellKind::Dropdown,
            CellContent::MultiSelect { .. } => CellKind::MultiSelect,
            CellContent::DatePicker { .. } => CellKind::DatePicker,
            CellContent::Sparkline { .. } => CellKind::Sparkline,
            CellContent::Range { .. } => CellKind::Range,
        }
    }

    /// The string a grid would paint for this cell.
    pub fn display_text(&self) -> String {
        match &self.content {
            CellContent::Text { display_data, .. }
            | CellContent::Number { display_data, .. }
            | CellContent::Uri { display_data, .. } => display_data.clone(),
            CellContent::Boolean { data } => data.map(|b| b.to_string()).unwrap_or_default(),
            CellContent::Markdown { data } => data.clone().unwrap_or_default(),
            CellContent::Image { data } | CellContent::Bubble { data, .. } => data.join(","),
            CellContent::Loading => String::new(),
            CellContent::Dropdown { value, .. } => value.clone().unwrap_or_default(),
            CellContent::MultiSelect { values, .. } => {
                values.as_ref().map(|v| v.join(",")).unwrap_or_default()
            }
            CellContent::DatePicker { display_date, .. } => display_date.clone(),
            CellContent::Sparkline { display_values, .. } => display_values.join(","),
            CellContent::Range { label, .. } => label.clone(),
        }
    }

    /// Replaces the display string of text, number and uri cells and the
    /// display date of date cells. Other kinds are left untouched.
    pub fn set_display_text(&mut self, text: String) {
        match &mut self.content {
            CellContent::Text { display_data, .. }
            | CellContent::Number { display_data, .. }
            | CellContent::Uri { display_data, .. } => *display_data = text,
            CellContent::DatePicker { display_date, .. } => *display_date = text,
            _ => {}
        }
    }

    pub fn with_readonly(mut self, readonly: bool) -> Self {
        self.readonly = readonly;
        self
    }

    pub fn with_overlay(mut self, allow_overlay: bool) -> Self {
        self.allow_overlay = allow_overlay;
        self
    }

    pub fn with_missing(mut self, is_missing_value: bool) -> Self {
        self.is_missing_value = is_missing_value;
        self
    }

    pub fn with_copy_data(mut self, copy_data: impl Into<String>) -> Self {
        self.copy_data = Some(copy_data.into());
        self
    }

    pub fn with_align(mut self, align: Option<ContentAlign>) -> Self {
        self.content_align = align;
        self
    }
}

/// A readonly text cell flagged as an error. The visible text is the warning
/// glyph plus `message`; the full data adds `details` for the overlay.
pub fn error_cell(message: &str, details: &str) -> Cell {
    let display = format!("{ERROR_GLYPH} {message}");
    let data = if details.is_empty() {
        display.clone()
    } else {
        format!("{display}\n\n{details}\n")
    };
    let mut cell = Cell::new(CellContent::Text {
        data: Some(data),
        display_data: display,
    });
    cell.is_error = true;
    cell
}

pub fn text_cell(readonly: bool, is_missing_value: bool) -> Cell {
    Cell::new(CellContent::Text {
        data: None,
        display_data: String::new(),
    })
    .with_readonly(readonly)
    .with_missing(is_missing_value)
}

pub fn loading_cell() -> Cell {
    Cell::new(CellContent::Loading).with_overlay(false)
}

pub fn is_error_cell(cell: &Cell) -> bool {
    cell.is_error
}

pub fn is_missing_value_cell(cell: &Cell) -> bool {
    cell.is_missing_value
}
