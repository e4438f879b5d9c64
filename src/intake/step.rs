//! Step definitions: one screen of questions and where it leads.

use serde::{Deserialize, Serialize};

use super::field::FieldDef;

/// Identifier of a step within a flow, e.g. `general-info` or `wrap-up`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepId(String);

impl StepId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StepId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StepId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for StepId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl PartialEq<str> for StepId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for StepId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Where a step leads once its answers pass validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Next {
    /// Fixed successor.
    Step { id: StepId },
    /// Successor chosen by the role router from the answer to `field`.
    Branch { field: String },
    /// Terminal step: hand the answers to the submission sink.
    Submit,
}

/// One screen's worth of questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormStep {
    pub id: StepId,
    pub title: String,
    pub fields: Vec<FieldDef>,
    pub next: Next,
}

impl FormStep {
    pub fn new(id: &str, title: &str) -> Self {
        Self {
            id: StepId::from(id),
            title: title.to_string(),
            fields: Vec::new(),
            next: Next::Submit,
        }
    }

    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    pub fn then(mut self, id: &str) -> Self {
        self.next = Next::Step { id: StepId::from(id) };
        self
    }

    pub fn branch_on(mut self, field: &str) -> Self {
        self.next = Next::Branch {
            field: field.to_string(),
        };
        self
    }

    pub fn submit(mut self) -> Self {
        self.next = Next::Submit;
        self
    }

    pub fn find_field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.next, Next::Submit)
    }
}
