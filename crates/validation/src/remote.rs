//! The remote stages: one batched call to the validator, reported stage by stage.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::ServiceError;
use crate::event::Notifier;
use crate::issue::ValidationError;
use crate::result::StageResult;
use crate::run::RunState;
use crate::stage::StageName;

/// Request sent to the validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRequest {
    /// Kind of router resource, e.g. `vpn-wireguard-client`.
    pub resource_type: String,
    /// Existing resource being edited, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    /// The form data.
    pub data: serde_json::Value,
    /// Stages to run remotely, in catalog order.
    pub stages: Vec<StageName>,
    /// Target router, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub router_id: Option<String>,
}

/// Response returned by the validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResponse {
    /// Per-stage results, in the order the service produced them.
    pub stages: Vec<StageResult>,
    /// The service's own verdict.
    pub is_valid: bool,
}

impl ValidationResponse {
    /// Build a response whose verdict follows from `stages`.
    #[must_use]
    pub fn from_stages(stages: Vec<StageResult>) -> Self {
        let is_valid = !stages.iter().any(StageResult::is_failed);
        Self { stages, is_valid }
    }
}

/// The remote validation service boundary.
///
/// Any failure is opaque to the pipeline: it ends up as a
/// `VALIDATION_ERROR` finding on every in-flight stage.
#[async_trait]
pub trait Validator: Send + Sync {
    /// Run `request.stages` against `request.data`.
    async fn validate(
        &self,
        request: ValidationRequest,
    ) -> Result<ValidationResponse, ServiceError>;
}

/// A validator that always fails; used when no service is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableValidator;

#[async_trait]
impl Validator for UnavailableValidator {
    async fn validate(
        &self,
        _request: ValidationRequest,
    ) -> Result<ValidationResponse, ServiceError> {
        Err(ServiceError::Unavailable)
    }
}

/// Drives the remote stages of one run.
pub(crate) struct RemoteExecutor<'a> {
    pub(crate) validator: &'a dyn Validator,
    pub(crate) notifier: &'a Notifier,
    pub(crate) cancellation: &'a CancellationToken,
    pub(crate) stop_on_error: bool,
}

impl RemoteExecutor<'_> {
    /// Dispatch `request.stages` in one call and fold the response into `state`.
    pub(crate) async fn run(&self, state: &mut RunState, request: ValidationRequest) {
        if self.cancellation.is_cancelled() {
            tracing::info!("validation aborted before remote dispatch");
            return;
        }

        let stages = request.stages.clone();
        for &stage in &stages {
            if let Err(e) = state.start(stage) {
                tracing::warn!(error = %e, "cannot dispatch stage");
                continue;
            }
            self.notifier.stage_started(stage);
        }

        tracing::debug!(stages = ?stages, "calling validator");
        match self.validator.validate(request).await {
            Ok(response) => self.apply_response(state, &stages, response),
            Err(err) => self.fail_in_flight(state, &stages, &err),
        }
    }

    fn apply_response(
        &self,
        state: &mut RunState,
        stages: &[StageName],
        response: ValidationResponse,
    ) {
        let reported_valid = response.is_valid;

        for entry in response.stages {
            if self.cancellation.is_cancelled() {
                tracing::info!("validation aborted, ignoring remaining stage results");
                return;
            }

            let stage = entry.stage;
            if !stages.contains(&stage) {
                tracing::warn!(%stage, "validator returned a stage that was not dispatched");
                continue;
            }

            let failed = entry.is_failed();
            if let Err(e) = state.complete(entry) {
                tracing::warn!(error = %e, "ignoring stage result");
                continue;
            }
            self.notifier.stage_completed(state.result(stage));
            let (completed, total) = state.record_progress();
            self.notifier.progress(completed, total);

            if self.stop_on_error && failed {
                for &rest in stages {
                    if state.status(rest).is_active() {
                        let _ = state.skip(rest, "stop-on-error");
                    }
                }
                tracing::debug!(%stage, "stopping after failed stage");
                return;
            }
        }

        tracing::debug!(reported_valid, "validator response applied");
    }

    fn fail_in_flight(&self, state: &mut RunState, stages: &[StageName], err: &ServiceError) {
        tracing::warn!(error = %err, "validator call failed");
        let message = err.to_string();

        for &stage in stages {
            if !state.status(stage).is_active() {
                continue;
            }
            let failed = StageResult::from_issues(
                stage,
                vec![ValidationError::service_failure(stage, message.as_str())],
            );
            if state.complete(failed).is_ok() {
                self.notifier.stage_completed(state.result(stage));
                let (completed, total) = state.record_progress();
                self.notifier.progress(completed, total);
            }
        }
    }
}
