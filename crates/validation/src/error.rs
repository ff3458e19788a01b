//! Pipeline error types.
//!
//! None of these escape [`ValidationPipeline::validate`](crate::ValidationPipeline::validate):
//! stage-level problems are captured into the result instead.

use thiserror::Error;

use crate::stage::{StageName, StageStatus};

/// Errors raised while configuring a pipeline or tracking stage state.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A stage status transition is not valid.
    #[error("invalid transition for stage {stage} from {from} to {to}")]
    InvalidTransition {
        /// Stage being updated.
        stage: StageName,
        /// Current status.
        from: StageStatus,
        /// Attempted target status.
        to: StageStatus,
    },

    /// A stage result was recorded under the wrong stage.
    #[error("stage mismatch: expected {expected}, got {actual}")]
    StageMismatch {
        /// Stage slot being written.
        expected: StageName,
        /// Stage named by the result.
        actual: StageName,
    },

    /// A string did not name a catalog stage.
    #[error("unknown stage: {0}")]
    UnknownStage(String),

    /// A string did not name a risk level.
    #[error("unknown risk level: {0}")]
    UnknownRiskLevel(String),

    /// A custom risk table failed validation.
    #[error("invalid risk table: {0}")]
    InvalidRiskTable(String),

    /// A field rules document could not be loaded.
    #[error("field rules: {0}")]
    Rules(String),

    /// A serialization or deserialization error.
    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failure of the validator call itself.
///
/// Its display text becomes the message of the synthesized
/// `VALIDATION_ERROR` issue on every stage that was in flight.
#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    /// The request never produced a response.
    #[error("{0}")]
    Transport(String),

    /// The service answered with a non-success status.
    #[error("validation service returned {status}: {body}")]
    Status {
        /// HTTP-like status code.
        status: u16,
        /// Response body, possibly truncated.
        body: String,
    },

    /// The response body could not be decoded.
    #[error("invalid validation response: {0}")]
    Decode(String),

    /// No validator is reachable.
    #[error("Validation service unavailable")]
    Unavailable,
}

impl ServiceError {
    /// Create a transport error from any displayable cause.
    pub fn transport(cause: impl std::fmt::Display) -> Self {
        Self::Transport(cause.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_transition_display() {
        let err = PipelineError::InvalidTransition {
            stage: StageName::Network,
            from: StageStatus::Passed,
            to: StageStatus::Running,
        };
        assert_eq!(
            err.to_string(),
            "invalid transition for stage network from passed to running"
        );
    }

    #[test]
    fn from_serde_error() {
        let serde_err = serde_json::from_str::<String>("not valid json").unwrap_err();
        let err = PipelineError::from(serde_err);
        assert!(err.to_string().starts_with("serialization:"));
    }

    #[test]
    fn service_error_messages() {
        assert_eq!(
            ServiceError::Unavailable.to_string(),
            "Validation service unavailable"
        );
        assert_eq!(
            ServiceError::transport("connection refused").to_string(),
            "connection refused"
        );
        let err = ServiceError::Status {
            status: 503,
            body: "down".into(),
        };
        assert_eq!(err.to_string(), "validation service returned 503: down");
    }
}
