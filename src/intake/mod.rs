//! Guided intake: multi-step lead questionnaires.
//!
//! A flow is a [`StepGraph`] of [`FormStep`]s. The [`FlowController`] moves a
//! [`FlowSession`] through it one validated step at a time, branching on the
//! prospect's role, and hands the collected answers to a submission sink once
//! the last step passes.

pub mod answers;
pub mod catalog;
pub mod controller;
pub mod field;
pub mod graph;
pub mod router;
pub mod session;
pub mod step;
pub mod validator;

pub use answers::AnswerSet;
pub use catalog::FlowCatalog;
pub use controller::FlowController;
pub use field::{FieldDef, FieldKind, FieldStore, FieldValue};
pub use graph::StepGraph;
pub use router::RoleRouter;
pub use session::{FlowSession, FlowStatus, Progress};
pub use step::{FormStep, Next, StepId};
