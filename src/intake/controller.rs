//! FlowController: drives a session through a step graph.
//!
//! Everything except [`FlowController::submit`] is synchronous. `advance` and
//! `retreat` take the session by reference and return the next session, so a
//! failed attempt can never leave a half-updated session behind.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::error::FlowError;
use crate::sink::{Receipt, Submission, SubmissionSink};

use super::answers::AnswerSet;
use super::field::{FieldDef, FieldKind, FieldStore, FieldValue};
use super::graph::StepGraph;
use super::session::{FlowSession, FlowStatus, Progress};
use super::step::{FormStep, StepId};
use super::validator;

#[derive(Debug, Clone)]
pub struct FlowController {
    graph: Arc<StepGraph>,
}

impl FlowController {
    pub fn new(graph: StepGraph) -> Self {
        Self {
            graph: Arc::new(graph),
        }
    }

    pub fn graph(&self) -> &StepGraph {
        &self.graph
    }

    /// A fresh session at the graph's entry step.
    pub fn start(&self) -> FlowSession {
        let entry = self.graph.entry().clone();
        let draft = self.draft_for(&entry, &AnswerSet::new());
        let session = FlowSession::new(self.graph.flow(), entry, draft);
        info!(session_id = %session.id, flow = %session.flow, "Intake session started");
        session
    }

    /// A fresh session positioned at `step`.
    pub fn start_at(&self, step: &StepId) -> Result<FlowSession, FlowError> {
        if self.graph.step(step).is_none() {
            return Err(FlowError::UnknownStep(step.clone()));
        }
        let draft = self.draft_for(step, &AnswerSet::new());
        Ok(FlowSession::new(self.graph.flow(), step.clone(), draft))
    }

    /// A fresh session of the same flow; everything entered so far is dropped.
    pub fn restart(&self, session: &FlowSession) -> FlowSession {
        info!(session_id = %session.id, flow = %session.flow, "Intake session restarted");
        let mut fresh = self.start();
        fresh.id = session.id;
        fresh
    }

    pub fn current_step<'a>(&'a self, session: &FlowSession) -> Result<&'a FormStep, FlowError> {
        self.graph
            .step(&session.current)
            .ok_or_else(|| FlowError::UnknownStep(session.current.clone()))
    }

    /// Current value of a field on the current step (empty value if unset).
    pub fn field_value(&self, session: &FlowSession, name: &str) -> Result<FieldValue, FlowError> {
        session
            .draft
            .get(name)
            .ok_or_else(|| FlowError::UnknownField {
                step: session.current.clone(),
                field: name.to_string(),
            })
    }

    pub fn set_field(
        &self,
        session: &mut FlowSession,
        name: &str,
        value: FieldValue,
    ) -> Result<(), FlowError> {
        let def = self.editable_field(session, name)?;
        check_value(def, &value)?;

        session.draft.set(name, value);
        self.after_edit(session, name);
        Ok(())
    }

    /// Add or remove one option of a multi-select field.
    pub fn toggle_field(
        &self,
        session: &mut FlowSession,
        name: &str,
        option: &str,
    ) -> Result<(), FlowError> {
        let def = self.editable_field(session, name)?;
        if def.kind != FieldKind::MultiSelect {
            return Err(FlowError::KindMismatch {
                field: name.to_string(),
                expected: def.kind,
            });
        }
        if !def.has_option(option) {
            return Err(FlowError::UnknownOption {
                field: name.to_string(),
                option: option.to_string(),
            });
        }

        session.draft.toggle(name, option);
        self.after_edit(session, name);
        Ok(())
    }

    /// Validate the current step and move past it.
    ///
    /// On a terminal step the session stays put and becomes
    /// [`FlowStatus::AwaitingSubmission`]; the sink is only called by
    /// [`submit`](Self::submit).
    pub fn advance(&self, session: &FlowSession) -> Result<FlowSession, FlowError> {
        if session.status == FlowStatus::Submitted {
            return Err(FlowError::AlreadySubmitted);
        }

        let step = self.current_step(session)?;
        if let Err(e) = validator::validate(step, &session.draft) {
            warn!(
                session_id = %session.id,
                step = %step.id,
                field = %e.field(),
                "Step validation failed"
            );
            return Err(e.into());
        }

        let mut next = session.clone();
        next.answers.merge(&session.draft);

        match self.graph.next_step(step, &next.answers)? {
            Some(target) => {
                next.history.push(next.current.clone());
                next.draft = self.draft_for(&target, &next.answers);
                next.current = target;
                next.status = FlowStatus::InProgress;
                info!(
                    session_id = %next.id,
                    from = %step.id,
                    to = %next.current,
                    "Intake step advanced"
                );
            }
            None => {
                next.status = FlowStatus::AwaitingSubmission;
                info!(session_id = %next.id, step = %step.id, "Intake ready to submit");
            }
        }
        next.touch();
        Ok(next)
    }

    /// Step back to the previous step.
    ///
    /// Edits made on the step being left are kept in the answers. With no
    /// history, or after submission, the session comes back unchanged.
    pub fn retreat(&self, session: &FlowSession) -> FlowSession {
        let mut prev = session.clone();
        if prev.status == FlowStatus::Submitted {
            return prev;
        }
        let Some(target) = prev.history.pop() else {
            return prev;
        };

        prev.answers.merge(&session.draft);
        prev.draft = self.draft_for(&target, &prev.answers);
        debug!(session_id = %prev.id, from = %prev.current, to = %target, "Intake step retreated");
        prev.current = target;
        prev.status = FlowStatus::InProgress;
        prev.touch();
        prev
    }

    /// Hand the completed answers to `sink`.
    ///
    /// Only answers belonging to steps on the walked path are sent. On sink
    /// failure the session is left as it was so the caller can retry.
    pub async fn submit(
        &self,
        session: &mut FlowSession,
        sink: &dyn SubmissionSink,
    ) -> Result<Receipt, FlowError> {
        match session.status {
            FlowStatus::Submitted => return Err(FlowError::AlreadySubmitted),
            FlowStatus::InProgress => return Err(FlowError::NotReadyToSubmit),
            FlowStatus::AwaitingSubmission => {}
        }

        let submission = self.package(session);
        match sink.submit(&submission).await {
            Ok(receipt) => {
                info!(
                    session_id = %session.id,
                    sink = %receipt.sink,
                    reference = %receipt.reference,
                    "Intake submission accepted"
                );
                session.status = FlowStatus::Submitted;
                session.receipt = Some(receipt.clone());
                session.touch();
                Ok(receipt)
            }
            Err(e) => {
                warn!(session_id = %session.id, sink = sink.name(), error = %e, "Intake submission failed");
                Err(e.into())
            }
        }
    }

    pub fn progress(&self, session: &FlowSession) -> Progress {
        let step = session.history.len() + 1;
        let remaining = self
            .graph
            .remaining_after(&session.current, &session.effective_answers());
        Progress::new(step, step + remaining)
    }

    fn package(&self, session: &FlowSession) -> Submission {
        let path: Vec<StepId> = session.path().cloned().collect();
        let fields = self.graph.fields_of(&path);
        Submission {
            session_id: session.id,
            flow: session.flow.clone(),
            answers: session.answers.restricted_to(&fields),
            path,
            confirmation_path: self.graph.confirmation_path().to_string(),
            submitted_at: chrono::Utc::now(),
        }
    }

    fn editable_field<'a>(&'a self, session: &FlowSession, name: &str) -> Result<&'a FieldDef, FlowError> {
        if session.status == FlowStatus::Submitted {
            return Err(FlowError::AlreadySubmitted);
        }
        self.current_step(session)?
            .find_field(name)
            .ok_or_else(|| FlowError::UnknownField {
                step: session.current.clone(),
                field: name.to_string(),
            })
    }

    fn after_edit(&self, session: &mut FlowSession, name: &str) {
        if session.status == FlowStatus::AwaitingSubmission {
            session.status = FlowStatus::InProgress;
        }
        session.touch();
        debug!(session_id = %session.id, step = %session.current, field = %name, "Field updated");
    }

    /// Draft for `step`, pre-filled with anything already answered there.
    /// A same-named answer from another branch is only carried over if this
    /// step's field accepts it.
    fn draft_for(&self, step: &StepId, answers: &AnswerSet) -> FieldStore {
        let Some(step) = self.graph.step(step) else {
            return FieldStore::default();
        };
        let mut draft = FieldStore::for_fields(&step.fields);
        for def in &step.fields {
            let carried = answers
                .get(&def.name)
                .filter(|value| check_value(def, value).is_ok());
            if let Some(value) = carried {
                draft.set(&def.name, value.clone());
            }
        }
        draft
    }
}

fn check_value(def: &FieldDef, value: &FieldValue) -> Result<(), FlowError> {
    if !value.matches_kind(def.kind) {
        return Err(FlowError::KindMismatch {
            field: def.name.clone(),
            expected: def.kind,
        });
    }

    match (def.kind, value) {
        (FieldKind::SingleSelect, FieldValue::Text(choice)) if !choice.is_empty() => {
            if !def.has_option(choice) {
                return Err(FlowError::UnknownOption {
                    field: def.name.clone(),
                    option: choice.clone(),
                });
            }
        }
        (FieldKind::MultiSelect, FieldValue::MultiChoice(choices)) => {
            if let Some(bad) = choices.iter().find(|c| !def.has_option(c)) {
                return Err(FlowError::UnknownOption {
                    field: def.name.clone(),
                    option: bad.clone(),
                });
            }
        }
        (FieldKind::Date, FieldValue::Text(date)) if !date.is_empty() => {
            if NaiveDate::parse_from_str(date, "%Y-%m-%d").is_err() {
                return Err(FlowError::InvalidDate {
                    field: def.name.clone(),
                    value: date.clone(),
                });
            }
        }
        _ => {}
    }
    Ok(())
}
