//! Role router: maps a role/industry label to the first step of its branch.

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::RouterError;

use super::step::StepId;

/// Static label → branch entry table.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct RoleRouter {
    routes: IndexMap<String, StepId>,
}

impl RoleRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a route. A later route for the same label replaces the
    /// earlier one.
    pub fn route(mut self, label: &str, step: &str) -> Self {
        self.routes.insert(label.to_string(), StepId::from(step));
        self
    }

    pub fn resolve(&self, label: &str) -> Result<StepId, RouterError> {
        self.routes
            .get(label)
            .cloned()
            .ok_or_else(|| RouterError::UnknownRole(label.to_string()))
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
