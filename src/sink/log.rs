//! Log sink: records submissions as structured tracing events.

use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use super::{Receipt, Submission, SubmissionSink};
use crate::error::SubmissionError;

pub struct LogSink;

impl LogSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SubmissionSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    async fn submit(&self, submission: &Submission) -> Result<Receipt, SubmissionError> {
        let answers = serde_json::to_string(&submission.answers)?;
        let reference = Uuid::new_v4().to_string();
        info!(
            session_id = %submission.session_id,
            flow = %submission.flow,
            reference = %reference,
            fields = submission.answers.len(),
            answers = %answers,
            "Intake submitted"
        );
        Ok(Receipt::for_submission(submission, self.name(), reference))
    }
}
