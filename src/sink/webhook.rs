//! Webhook sink: POSTs each submission as JSON to an HTTP endpoint.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tracing::{info, warn};
use uuid::Uuid;

use super::{Receipt, Submission, SubmissionSink};
use crate::error::SubmissionError;

/// Default bound on one webhook exchange (request plus response body).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct WebhookSink {
    client: reqwest::Client,
    url: String,
    token: Option<SecretString>,
    timeout: Duration,
}

impl WebhookSink {
    pub fn new(url: String, token: Option<SecretString>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
            token,
            timeout,
        }
    }

    fn unavailable(&self, reason: impl std::fmt::Display) -> SubmissionError {
        SubmissionError::Unavailable {
            sink: self.name().to_string(),
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl SubmissionSink for WebhookSink {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn submit(&self, submission: &Submission) -> Result<Receipt, SubmissionError> {
        let mut request = self.client.post(&self.url).json(submission);
        if let Some(ref token) = self.token {
            request = request.bearer_auth(token.expose_secret());
        }

        // Bounds the request and the response body together.
        let result = tokio::time::timeout(self.timeout, async {
            let resp = request.send().await?;
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            Ok::<_, reqwest::Error>((status, body))
        })
        .await;

        let (status, body) = match result {
            Ok(Ok(exchange)) => exchange,
            Ok(Err(e)) => return Err(self.unavailable(e)),
            Err(_) => {
                warn!(
                    session_id = %submission.session_id,
                    timeout_secs = self.timeout.as_secs_f64(),
                    "Webhook timed out"
                );
                return Err(self.unavailable(format!(
                    "no response within {:?}",
                    self.timeout
                )));
            }
        };

        if !status.is_success() {
            warn!(
                session_id = %submission.session_id,
                status = %status,
                "Webhook rejected submission"
            );
            return Err(SubmissionError::Rejected {
                sink: self.name().to_string(),
                reason: format!("HTTP {status}: {body}"),
            });
        }

        // The endpoint may answer with its own reference; fall back to ours.
        let body: serde_json::Value = serde_json::from_str(&body).unwrap_or(serde_json::Value::Null);
        let reference = body
            .get("reference")
            .or_else(|| body.get("id"))
            .and_then(|v| v.as_str())
            .map(String::from)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        info!(session_id = %submission.session_id, reference = %reference, "Webhook accepted submission");
        Ok(Receipt::for_submission(submission, self.name(), reference))
    }
}
