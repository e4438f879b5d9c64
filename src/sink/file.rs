//! JSON-lines file sink: appends one record per submission.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use super::{Receipt, Submission, SubmissionSink};
use crate::error::SubmissionError;

pub struct JsonlFileSink {
    path: PathBuf,
    // Serializes appends so concurrent submissions never interleave lines.
    write_lock: Mutex<()>,
}

impl JsonlFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SubmissionSink for JsonlFileSink {
    fn name(&self) -> &str {
        "file"
    }

    async fn submit(&self, submission: &Submission) -> Result<Receipt, SubmissionError> {
        let reference = Uuid::new_v4().to_string();
        let record = serde_json::json!({
            "reference": reference,
            "submission": submission,
        });
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        debug!(path = %self.path.display(), reference = %reference, "Submission appended");
        Ok(Receipt::for_submission(submission, self.name(), reference))
    }
}
