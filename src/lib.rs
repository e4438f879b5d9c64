//! Guided Intake: multi-step lead questionnaires with role branching.

pub mod api;
pub mod config;
pub mod error;
pub mod intake;
pub mod sink;
