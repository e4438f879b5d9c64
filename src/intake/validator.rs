//! Step validator: decides whether a step may be left.

use crate::error::ValidationError;

use super::field::{FieldKind, FieldStore};
use super::step::FormStep;

/// Check the step's required fields against `values`, failing on the first
/// field (in declaration order) that is empty.
pub fn validate(step: &FormStep, values: &FieldStore) -> Result<(), ValidationError> {
    match violations(step, values).into_iter().next() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Every failing required field of the step, in declaration order.
pub fn violations(step: &FormStep, values: &FieldStore) -> Vec<ValidationError> {
    step.fields
        .iter()
        .filter(|def| def.required)
        .filter(|def| values.get(&def.name).is_none_or(|v| v.is_empty()))
        .map(|def| match def.kind {
            FieldKind::Boolean => ValidationError::AgreementNotAccepted(def.name.clone()),
            _ => ValidationError::MissingField(def.name.clone()),
        })
        .collect()
}
