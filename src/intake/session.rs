//! Flow session: one user's position and answers in a flow.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::sink::Receipt;

use super::answers::AnswerSet;
use super::field::FieldStore;
use super::step::StepId;

/// Lifecycle of a session.
///
/// `InProgress` → `AwaitingSubmission` (terminal step validated) →
/// `Submitted`. Editing a field while awaiting submission drops back to
/// `InProgress`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowStatus {
    #[default]
    InProgress,
    AwaitingSubmission,
    Submitted,
}

impl FlowStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Submitted)
    }
}

impl std::fmt::Display for FlowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::InProgress => "in_progress",
            Self::AwaitingSubmission => "awaiting_submission",
            Self::Submitted => "submitted",
        };
        write!(f, "{s}")
    }
}

/// Serialize-only: the draft's field kinds come from the graph and are not
/// part of the JSON form.
#[derive(Debug, Clone, Serialize)]
pub struct FlowSession {
    pub id: Uuid,
    pub flow: String,
    /// Always a step of the flow's graph.
    pub current: StepId,
    /// Answers merged from every step left so far.
    pub answers: AnswerSet,
    /// In-progress edits on `current`.
    pub draft: FieldStore,
    /// Visited steps, oldest first; `current` is not included.
    pub history: Vec<StepId>,
    pub status: FlowStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt: Option<Receipt>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FlowSession {
    pub(crate) fn new(flow: &str, current: StepId, draft: FieldStore) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            flow: flow.to_string(),
            current,
            answers: AnswerSet::new(),
            draft,
            history: Vec::new(),
            status: FlowStatus::InProgress,
            receipt: None,
            started_at: now,
            updated_at: now,
        }
    }

    /// Steps visited so far, including the current one.
    pub fn path(&self) -> impl Iterator<Item = &StepId> {
        self.history.iter().chain(std::iter::once(&self.current))
    }

    /// Accumulated answers with the current draft laid over them.
    pub fn effective_answers(&self) -> AnswerSet {
        let mut answers = self.answers.clone();
        answers.merge(&self.draft);
        answers
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Position within the flow, for progress bars ("Step 2 of 3").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub step: usize,
    pub total: usize,
    pub percent: u8,
}

impl Progress {
    pub fn new(step: usize, total: usize) -> Self {
        let percent = if total == 0 {
            100
        } else {
            ((step.min(total) * 100) / total) as u8
        };
        Self {
            step,
            total,
            percent,
        }
    }
}
