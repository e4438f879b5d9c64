//! Accumulated answers for one flow traversal.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::field::{FieldStore, FieldValue};

/// Field name → value, in the order fields were first answered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerSet {
    values: IndexMap<String, FieldValue>,
}

impl AnswerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name)
    }

    /// Text answer for `name`, if it is a text value.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(FieldValue::as_text)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) {
        self.values.insert(name.into(), value);
    }

    /// Copy every explicitly set value of `store` in. Values the store
    /// never touched are left alone.
    pub fn merge(&mut self, store: &FieldStore) {
        for (name, value) in store.iter() {
            self.values.insert(name.to_string(), value.clone());
        }
    }

    /// A copy holding only the named fields.
    pub fn restricted_to(&self, fields: &HashSet<&str>) -> AnswerSet {
        AnswerSet {
            values: self
                .values
                .iter()
                .filter(|(k, _)| fields.contains(k.as_str()))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
