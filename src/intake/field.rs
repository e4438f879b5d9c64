//! Field definitions, values, and the per-step field store.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// The input control a field is answered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    SingleSelect,
    MultiSelect,
    FreeText,
    Boolean,
    Date,
}

impl FieldKind {
    /// Whether answers must be picked from the field's option list.
    pub fn is_select(&self) -> bool {
        matches!(self, Self::SingleSelect | Self::MultiSelect)
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::SingleSelect => "single_select",
            Self::MultiSelect => "multi_select",
            Self::FreeText => "free_text",
            Self::Boolean => "boolean",
            Self::Date => "date",
        };
        write!(f, "{s}")
    }
}

/// A single answer.
///
/// Serialized untagged so JSON clients send plain strings, booleans, and
/// string arrays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Flag(bool),
    MultiChoice(Vec<String>),
}

impl FieldValue {
    /// The value an unset field of `kind` reads as.
    pub fn empty_for(kind: FieldKind) -> Self {
        match kind {
            FieldKind::SingleSelect | FieldKind::FreeText | FieldKind::Date => {
                Self::Text(String::new())
            }
            FieldKind::MultiSelect => Self::MultiChoice(Vec::new()),
            FieldKind::Boolean => Self::Flag(false),
        }
    }

    /// Empty string, empty list, or `false`.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(s) => s.is_empty(),
            Self::Flag(b) => !b,
            Self::MultiChoice(items) => items.is_empty(),
        }
    }

    /// Whether this variant is the one `kind` stores.
    pub fn matches_kind(&self, kind: FieldKind) -> bool {
        matches!(
            (self, kind),
            (
                Self::Text(_),
                FieldKind::SingleSelect | FieldKind::FreeText | FieldKind::Date
            ) | (Self::Flag(_), FieldKind::Boolean)
                | (Self::MultiChoice(_), FieldKind::MultiSelect)
        )
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        Self::Flag(b)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(items: Vec<String>) -> Self {
        Self::MultiChoice(items)
    }
}

impl From<&[&str]> for FieldValue {
    fn from(items: &[&str]) -> Self {
        Self::MultiChoice(items.iter().map(|s| s.to_string()).collect())
    }
}

/// One question on a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub label: String,
    pub kind: FieldKind,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

impl FieldDef {
    fn new(name: &str, label: &str, kind: FieldKind, options: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            kind,
            required: false,
            options: options.iter().map(|o| o.to_string()).collect(),
        }
    }

    pub fn single_select(name: &str, label: &str, options: &[&str]) -> Self {
        Self::new(name, label, FieldKind::SingleSelect, options)
    }

    pub fn multi_select(name: &str, label: &str, options: &[&str]) -> Self {
        Self::new(name, label, FieldKind::MultiSelect, options)
    }

    pub fn text(name: &str, label: &str) -> Self {
        Self::new(name, label, FieldKind::FreeText, &[])
    }

    pub fn boolean(name: &str, label: &str) -> Self {
        Self::new(name, label, FieldKind::Boolean, &[])
    }

    pub fn date(name: &str, label: &str) -> Self {
        Self::new(name, label, FieldKind::Date, &[])
    }

    /// Mark the field as required. For boolean fields this means the box
    /// must be ticked.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn has_option(&self, option: &str) -> bool {
        self.options.iter().any(|o| o == option)
    }
}

/// In-progress answers for the active step.
///
/// Typing and selecting only touch this store; nothing here validates.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FieldStore {
    #[serde(skip)]
    kinds: IndexMap<String, FieldKind>,
    values: IndexMap<String, FieldValue>,
}

impl FieldStore {
    /// An empty store for the given field definitions.
    pub fn for_fields(fields: &[FieldDef]) -> Self {
        Self {
            kinds: fields.iter().map(|f| (f.name.clone(), f.kind)).collect(),
            values: IndexMap::new(),
        }
    }

    /// Current value, or the kind's empty value when unset. `None` for
    /// names this store does not know.
    pub fn get(&self, name: &str) -> Option<FieldValue> {
        let kind = self.kinds.get(name)?;
        Some(
            self.values
                .get(name)
                .cloned()
                .unwrap_or_else(|| FieldValue::empty_for(*kind)),
        )
    }

    pub fn set(&mut self, name: &str, value: FieldValue) {
        self.values.insert(name.to_string(), value);
    }

    /// Add `option` to a multi-select answer, or remove it if present.
    pub fn toggle(&mut self, name: &str, option: &str) {
        let entry = self
            .values
            .entry(name.to_string())
            .or_insert_with(|| FieldValue::MultiChoice(Vec::new()));

        match entry {
            FieldValue::MultiChoice(items) => {
                if let Some(pos) = items.iter().position(|i| i == option) {
                    items.remove(pos);
                } else {
                    items.push(option.to_string());
                }
            }
            other => *other = FieldValue::MultiChoice(vec![option.to_string()]),
        }
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Explicitly set values, in the order they were first set.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
