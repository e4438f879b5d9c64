//! Submission sinks: where completed answer sets go.
//!
//! The engine hands each completed flow to a [`SubmissionSink`] exactly once
//! per attempt and makes no assumption about what the sink does with it.

pub mod file;
pub mod log;
pub mod webhook;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::SinkConfig;
use crate::error::SubmissionError;
use crate::intake::answers::AnswerSet;
use crate::intake::step::StepId;

pub use file::JsonlFileSink;
pub use log::LogSink;
pub use webhook::{DEFAULT_TIMEOUT as DEFAULT_WEBHOOK_TIMEOUT, WebhookSink};

/// A completed flow, packaged for hand-off.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub session_id: Uuid,
    pub flow: String,
    /// Steps the user walked through, entry first.
    pub path: Vec<StepId>,
    pub answers: AnswerSet,
    pub confirmation_path: String,
    pub submitted_at: DateTime<Utc>,
}

/// Acknowledgement from a sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    /// Sink-assigned reference for the stored record.
    pub reference: String,
    pub sink: String,
    /// Page the client should navigate to.
    pub confirmation_path: String,
    pub accepted_at: DateTime<Utc>,
}

impl Receipt {
    pub fn for_submission(submission: &Submission, sink: &str, reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            sink: sink.to_string(),
            confirmation_path: submission.confirmation_path.clone(),
            accepted_at: Utc::now(),
        }
    }
}

#[async_trait]
pub trait SubmissionSink: Send + Sync {
    /// Short identifier used in receipts and logs.
    fn name(&self) -> &str;

    async fn submit(&self, submission: &Submission) -> Result<Receipt, SubmissionError>;
}

/// Build the sink selected by configuration.
pub fn from_config(config: &SinkConfig) -> Arc<dyn SubmissionSink> {
    match config {
        SinkConfig::Log => Arc::new(LogSink::new()),
        SinkConfig::File { path } => Arc::new(JsonlFileSink::new(path.clone())),
        SinkConfig::Webhook { url, token, timeout } => {
            Arc::new(WebhookSink::new(url.clone(), token.clone(), *timeout))
        }
    }
}
