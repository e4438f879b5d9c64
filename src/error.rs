//! Error types for the guided intake engine.

use crate::intake::field::FieldKind;
use crate::intake::step::StepId;

/// Configuration errors: environment settings and step graph definitions.
///
/// Graph errors are raised when a flow is built, so a bad definition stops
/// the process at startup rather than surfacing mid-flow.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Flow {flow}: entry step {entry} is not defined")]
    UnknownEntry { flow: String, entry: StepId },

    #[error("Flow {flow}: step {step} is defined twice")]
    DuplicateStep { flow: String, step: StepId },

    #[error("Flow {flow}: field {field} is defined twice in step {step}")]
    DuplicateField {
        flow: String,
        step: StepId,
        field: String,
    },

    #[error("Flow {flow}: select field {field} in step {step} has no options")]
    MissingOptions {
        flow: String,
        step: StepId,
        field: String,
    },

    #[error("Flow {flow}: step {step} points to unknown step {target}")]
    UnknownNextStep {
        flow: String,
        step: StepId,
        target: StepId,
    },

    #[error("Flow {flow}: branch field {field} in step {step} is invalid: {reason}")]
    InvalidBranchField {
        flow: String,
        step: StepId,
        field: String,
        reason: String,
    },

    #[error("Flow {flow}: step {step} is unreachable from the entry step")]
    UnreachableStep { flow: String, step: StepId },

    #[error("Flow {flow}: cycle detected through step {step}")]
    CycleDetected { flow: String, step: StepId },

    #[error("Flow {0} is registered twice")]
    DuplicateFlow(String),

    #[error("Routing error: {0}")]
    Router(#[from] RouterError),
}

/// A step cannot be left yet. Recoverable: the session stays where it is.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Agreement not accepted: {0}")]
    AgreementNotAccepted(String),
}

impl ValidationError {
    /// Name of the offending field.
    pub fn field(&self) -> &str {
        match self {
            Self::MissingField(name) | Self::AgreementNotAccepted(name) => name,
        }
    }

    /// Message shown to the person filling in the form.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::MissingField(_) => "Please fill in all required fields",
            Self::AgreementNotAccepted(_) => "Please agree to the terms and contact preferences",
        }
    }
}

/// Role routing errors. Reaching one at runtime means the routing table and
/// the selectable role labels are out of sync.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouterError {
    #[error("Unknown role: {0}")]
    UnknownRole(String),
}

/// Errors raised by the multi-step controller.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Routing error: {0}")]
    Router(#[from] RouterError),

    #[error("Unknown step: {0}")]
    UnknownStep(StepId),

    #[error("Step {step} has no field named {field}")]
    UnknownField { step: StepId, field: String },

    #[error("Field {field} expects a {expected} value")]
    KindMismatch { field: String, expected: FieldKind },

    #[error("Field {field} does not offer option {option:?}")]
    UnknownOption { field: String, option: String },

    #[error("Field {field} expects a YYYY-MM-DD date, got {value:?}")]
    InvalidDate { field: String, value: String },

    #[error("Flow is not ready to submit")]
    NotReadyToSubmit,

    #[error("Flow has already been submitted")]
    AlreadySubmitted,

    #[error("Submission failed: {0}")]
    Submission(#[from] SubmissionError),
}

/// Errors reported by a submission sink. Recoverable: the session keeps its
/// answers so the submission can be retried.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("Sink {sink} rejected the submission: {reason}")]
    Rejected { sink: String, reason: String },

    #[error("Sink {sink} is unavailable: {reason}")]
    Unavailable { sink: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_reports_field_and_message() {
        let missing = ValidationError::MissingField("homeType".into());
        assert_eq!(missing.field(), "homeType");
        assert_eq!(missing.user_message(), "Please fill in all required fields");
        assert_eq!(missing.to_string(), "Missing required field: homeType");

        let agreement = ValidationError::AgreementNotAccepted("agreeToTerms".into());
        assert_eq!(agreement.field(), "agreeToTerms");
        assert!(agreement.user_message().contains("agree to the terms"));
    }

    #[test]
    fn flow_error_wraps_validation_transparently() {
        let err: FlowError = ValidationError::MissingField("email".into()).into();
        assert_eq!(err.to_string(), "Missing required field: email");
    }

    #[test]
    fn router_error_converts_into_config_error() {
        let err: ConfigError = RouterError::UnknownRole("Pirates".into()).into();
        assert!(matches!(err, ConfigError::Router(RouterError::UnknownRole(ref l)) if l == "Pirates"));
        assert_eq!(err.to_string(), "Routing error: Unknown role: Pirates");
    }
}
