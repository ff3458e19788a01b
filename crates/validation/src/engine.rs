//! An in-process [`Validator`]: per-stage checks run without a network hop.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use crate::error::ServiceError;
use crate::issue::ValidationError;
use crate::remote::{ValidationRequest, ValidationResponse, Validator};
use crate::result::StageResult;
use crate::stage::{STAGE_COUNT, StageName, StageStatus};

/// One check belonging to a stage.
///
/// Returned issues are re-tagged with the stage the check is registered
/// under, so implementors need not set [`ValidationError::stage`] themselves.
#[async_trait]
pub trait StageCheck: Send + Sync {
    /// Inspect `request` and report findings.
    async fn check(&self, request: &ValidationRequest) -> Vec<ValidationError>;
}

#[async_trait]
impl<F> StageCheck for F
where
    F: Fn(&ValidationRequest) -> Vec<ValidationError> + Send + Sync,
{
    async fn check(&self, request: &ValidationRequest) -> Vec<ValidationError> {
        self(request)
    }
}

/// Runs registered [`StageCheck`]s for the stages a request names.
///
/// By default the first failed stage stops the run and later stages come
/// back `skipped`; [`with_continue_on_error`](Self::with_continue_on_error)
/// runs them all.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use nasnet_validation::{
///     StageEngine, StageName, StageStatus, ValidationError, ValidationRequest, Validator,
/// };
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let mut engine = StageEngine::new();
/// engine.register(
///     StageName::Network,
///     Arc::new(|request: &ValidationRequest| {
///         if request.data["vlan-id"] == 1 {
///             let issue = ValidationError::warning(
///                 StageName::Network,
///                 "VLAN_DEFAULT_ID",
///                 "VLAN 1 is the default VLAN",
///             );
///             vec![issue.with_field("vlan-id")]
///         } else {
///             Vec::new()
///         }
///     }),
/// );
///
/// let request = ValidationRequest {
///     resource_type: "vlan".into(),
///     resource_id: None,
///     data: serde_json::json!({ "vlan-id": 1 }),
///     stages: vec![StageName::Network],
///     router_id: None,
/// };
/// let response = engine.validate(request).await.unwrap();
/// assert!(response.is_valid);
/// assert_eq!(response.stages[0].status, StageStatus::Passed);
/// assert_eq!(response.stages[0].warnings.len(), 1);
/// # }
/// ```
pub struct StageEngine {
    checks: [Vec<Arc<dyn StageCheck>>; STAGE_COUNT],
    continue_on_error: bool,
}

impl StageEngine {
    /// An engine with no checks.
    #[must_use]
    pub fn new() -> Self {
        Self {
            checks: std::array::from_fn(|_| Vec::new()),
            continue_on_error: false,
        }
    }

    /// Keep running stages after one fails.
    #[must_use]
    pub fn with_continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = continue_on_error;
        self
    }

    /// Add a check to `stage`. Checks of one stage run in registration order.
    pub fn register(&mut self, stage: StageName, check: Arc<dyn StageCheck>) -> &mut Self {
        self.checks[stage.index()].push(check);
        self
    }

    /// Number of checks registered for `stage`.
    #[must_use]
    pub fn check_count(&self, stage: StageName) -> usize {
        self.checks[stage.index()].len()
    }

    /// Validate a single field: the same run, reporting only issues on `field_path`.
    pub async fn validate_field(
        &self,
        request: &ValidationRequest,
        field_path: &str,
    ) -> ValidationResponse {
        self.run(request, Some(field_path)).await
    }

    async fn run(&self, request: &ValidationRequest, field: Option<&str>) -> ValidationResponse {
        let mut results = Vec::with_capacity(request.stages.len());
        let mut failed = false;

        for &stage in &request.stages {
            if failed && !self.continue_on_error {
                results.push(
                    StageResult::skipped(stage)
                        .with_metadata("reason", "earlier-stage-failed".into()),
                );
                continue;
            }

            let checks = &self.checks[stage.index()];
            if checks.is_empty() {
                results.push(
                    StageResult::new(stage, StageStatus::Passed)
                        .with_metadata("checked", false.into()),
                );
                continue;
            }

            let started = Instant::now();
            let mut issues = Vec::new();
            for check in checks {
                issues.extend(check.check(request).await.into_iter().map(|mut issue| {
                    issue.stage = stage;
                    issue
                }));
            }
            if let Some(path) = field {
                issues.retain(|issue| issue.field_path.as_deref() == Some(path));
            }

            let result = StageResult::from_issues(stage, issues).with_duration(started.elapsed());
            if result.is_failed() {
                tracing::debug!(%stage, errors = result.errors.len(), "engine stage failed");
                failed = true;
            }
            results.push(result);
        }

        ValidationResponse::from_stages(results)
    }
}

impl Default for StageEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StageEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: Vec<(StageName, usize)> = StageName::ALL
            .iter()
            .map(|&stage| (stage, self.check_count(stage)))
            .filter(|&(_, count)| count > 0)
            .collect();
        f.debug_struct("StageEngine")
            .field("checks", &counts)
            .field("continue_on_error", &self.continue_on_error)
            .finish()
    }
}

#[async_trait]
impl Validator for StageEngine {
    async fn validate(
        &self,
        request: ValidationRequest,
    ) -> Result<ValidationResponse, ServiceError> {
        Ok(self.run(&request, None).await)
    }
}
