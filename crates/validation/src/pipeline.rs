//! The orchestrator: selection, local stages, remote stages, aggregation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::event::{Callbacks, Notifier, PipelineObserver};
use crate::local::{AcceptAll, SchemaValidator, run_local};
use crate::remote::{RemoteExecutor, ValidationRequest, Validator};
use crate::result::{PipelineResult, StageResult};
use crate::risk::RiskTable;
use crate::run::RunState;
use crate::selector::select_stages;
use crate::stage::{StageName, StageStatus};

/// What to validate.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationInput {
    /// Kind of router resource.
    pub resource_type: String,
    /// The form data.
    pub data: serde_json::Value,
    /// Existing resource being edited.
    pub resource_id: Option<String>,
    /// Target router.
    pub router_id: Option<String>,
}

impl ValidationInput {
    /// Input for a new resource.
    pub fn new(resource_type: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            resource_type: resource_type.into(),
            data,
            resource_id: None,
            router_id: None,
        }
    }

    /// Set the resource being edited.
    #[must_use]
    pub fn with_resource_id(mut self, id: impl Into<String>) -> Self {
        self.resource_id = Some(id.into());
        self
    }

    /// Set the target router.
    #[must_use]
    pub fn with_router_id(mut self, id: impl Into<String>) -> Self {
        self.router_id = Some(id.into());
        self
    }
}

/// Risk-based multi-stage validation pipeline.
///
/// Every [`validate`](Self::validate) call works on its own run state, so a
/// single pipeline can serve overlapping validations.
/// [`abort`](Self::abort) cancels the runs in flight at the time of the
/// call and nothing after them.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use nasnet_validation::{
///     PipelineConfig, RiskLevel, UnavailableValidator, ValidationInput, ValidationPipeline,
/// };
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let pipeline = ValidationPipeline::builder(Arc::new(UnavailableValidator))
///     .config(PipelineConfig::new(RiskLevel::Low))
///     .build();
///
/// let result = pipeline
///     .validate(ValidationInput::new("bridge", serde_json::json!({ "name": "br0" })))
///     .await;
/// assert!(result.is_valid);
/// # }
/// ```
pub struct ValidationPipeline {
    config: PipelineConfig,
    table: RiskTable,
    validator: Arc<dyn Validator>,
    schema: Arc<dyn SchemaValidator>,
    notifier: Notifier,
    active: Mutex<HashMap<Uuid, CancellationToken>>,
}

impl ValidationPipeline {
    /// Pipeline with `config`, the default risk table and no local schema rules.
    #[must_use]
    pub fn new(config: PipelineConfig, validator: Arc<dyn Validator>) -> Self {
        Self::builder(validator).config(config).build()
    }

    /// Start building a pipeline around `validator`.
    #[must_use]
    pub fn builder(validator: Arc<dyn Validator>) -> PipelineBuilder {
        PipelineBuilder {
            config: PipelineConfig::default(),
            table: RiskTable::default(),
            validator,
            schema: Arc::new(AcceptAll),
            notifier: Notifier::default(),
        }
    }

    /// The configuration this pipeline was built with.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The risk-level table in use.
    #[must_use]
    pub fn risk_table(&self) -> &RiskTable {
        &self.table
    }

    /// Stages a run will select, in catalog order.
    #[must_use]
    pub fn selected_stages(&self) -> Vec<StageName> {
        select_stages(&self.table, &self.config)
    }

    /// Number of runs currently in flight.
    #[must_use]
    pub fn active_runs(&self) -> usize {
        self.active.lock().len()
    }

    /// Run the pipeline over `input`.
    ///
    /// Never fails: validator failures become `VALIDATION_ERROR` findings
    /// and an abort yields a result whose unfinished stages are `skipped`.
    pub async fn validate(&self, input: ValidationInput) -> PipelineResult {
        self.validate_with_cancellation(input, &CancellationToken::new())
            .await
    }

    /// Like [`validate`](Self::validate), also stopping when `parent` is cancelled.
    pub async fn validate_with_cancellation(
        &self,
        input: ValidationInput,
        parent: &CancellationToken,
    ) -> PipelineResult {
        let run_id = Uuid::new_v4();
        let token = parent.child_token();
        let _registration = ActiveRun::register(&self.active, run_id, token.clone());

        let span = tracing::info_span!(
            "validation",
            %run_id,
            resource_type = %input.resource_type,
            risk_level = %self.config.risk_level,
        );
        self.run(input, &token).instrument(span).await
    }

    /// Cancel every run currently in flight.
    ///
    /// Cancellation is cooperative. A validator call already issued is not
    /// interrupted; its response is ignored and no further stage starts.
    /// Later calls to [`validate`](Self::validate) are unaffected.
    pub fn abort(&self) {
        let active = self.active.lock();
        for token in active.values() {
            token.cancel();
        }
        tracing::info!(runs = active.len(), "validation aborted");
    }

    async fn run(
        &self,
        input: ValidationInput,
        cancellation: &CancellationToken,
    ) -> PipelineResult {
        let started = Instant::now();
        let selected = self.selected_stages();
        let mut state = RunState::new(&selected);

        let (local, remote): (Vec<StageName>, Vec<StageName>) =
            selected.iter().copied().partition(|stage| stage.is_local());

        tracing::debug!(?local, ?remote, "stages selected");

        let local_failed = self.run_local_stages(&mut state, &local, &input.data);

        if local_failed && self.config.stop_on_error {
            state.skip_pending("stop-on-error");
        } else if !remote.is_empty() {
            let request = ValidationRequest {
                resource_type: input.resource_type,
                resource_id: input.resource_id,
                data: input.data,
                stages: remote,
                router_id: input.router_id,
            };
            let executor = RemoteExecutor {
                validator: self.validator.as_ref(),
                notifier: &self.notifier,
                cancellation,
                stop_on_error: self.config.stop_on_error,
            };
            executor.run(&mut state, request).await;
        }

        let reason = if cancellation.is_cancelled() {
            "aborted"
        } else {
            "incomplete"
        };
        let result = state.build_result(started, reason);

        if result.is_valid {
            tracing::info!(
                warnings = result.warning_count(),
                duration_ms = result.total_duration_ms,
                "validation passed"
            );
        } else {
            tracing::info!(
                errors = result.error_count(),
                warnings = result.warning_count(),
                duration_ms = result.total_duration_ms,
                "validation failed"
            );
        }
        result
    }

    /// Run the selected local stages; returns `true` if one failed.
    ///
    /// The first local stage runs the schema validator. A later one covers
    /// the same checks, so it passes or is skipped along with the first.
    fn run_local_stages(
        &self,
        state: &mut RunState,
        local: &[StageName],
        data: &serde_json::Value,
    ) -> bool {
        let Some((&first, rest)) = local.split_first() else {
            return false;
        };

        self.finish_local(state, first, |stage| {
            run_local(stage, self.schema.as_ref(), data)
        });
        let first_passed = state.status(first) == StageStatus::Passed;
        if !first_passed {
            tracing::warn!(
                stage = %first,
                errors = state.result(first).errors.len(),
                "local stage failed"
            );
        }

        for &stage in rest {
            if first_passed {
                self.finish_local(state, stage, |stage| {
                    StageResult::new(stage, StageStatus::Passed)
                        .with_metadata("coveredBy", first.as_str().into())
                });
            } else if state.skip(stage, "covered-by-failed-stage").is_ok() {
                self.report(state, stage);
            }
        }

        !first_passed
    }

    fn finish_local(
        &self,
        state: &mut RunState,
        stage: StageName,
        produce: impl FnOnce(StageName) -> StageResult,
    ) {
        if let Err(e) = state.start(stage) {
            tracing::warn!(error = %e, "cannot start local stage");
            return;
        }
        self.notifier.stage_started(stage);

        if let Err(e) = state.complete(produce(stage)) {
            tracing::warn!(error = %e, "cannot record local stage");
            return;
        }
        self.report(state, stage);
    }

    fn report(&self, state: &mut RunState, stage: StageName) {
        self.notifier.stage_completed(state.result(stage));
        let (completed, total) = state.record_progress();
        self.notifier.progress(completed, total);
    }
}

impl std::fmt::Debug for ValidationPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationPipeline")
            .field("config", &self.config)
            .field("table", &self.table)
            .field("observers", &self.notifier.len())
            .field("active_runs", &self.active_runs())
            .finish_non_exhaustive()
    }
}

/// Builder for [`ValidationPipeline`].
pub struct PipelineBuilder {
    config: PipelineConfig,
    table: RiskTable,
    validator: Arc<dyn Validator>,
    schema: Arc<dyn SchemaValidator>,
    notifier: Notifier,
}

impl PipelineBuilder {
    /// Set the configuration.
    #[must_use]
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the default risk-level table.
    #[must_use]
    pub fn risk_table(mut self, table: RiskTable) -> Self {
        self.table = table;
        self
    }

    /// Set the local schema validator.
    #[must_use]
    pub fn schema(mut self, schema: Arc<dyn SchemaValidator>) -> Self {
        self.schema = schema;
        self
    }

    /// Register an observer. Observers are called in registration order.
    #[must_use]
    pub fn observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.notifier.push(observer);
        self
    }

    /// Register a set of closures as an observer.
    #[must_use]
    pub fn callbacks(self, callbacks: Callbacks) -> Self {
        self.observer(Arc::new(callbacks))
    }

    /// Build the pipeline.
    #[must_use]
    pub fn build(self) -> ValidationPipeline {
        ValidationPipeline {
            config: self.config,
            table: self.table,
            validator: self.validator,
            schema: self.schema,
            notifier: self.notifier,
            active: Mutex::new(HashMap::new()),
        }
    }
}

impl std::fmt::Debug for PipelineBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field("config", &self.config)
            .field("table", &self.table)
            .field("observers", &self.notifier.len())
            .finish_non_exhaustive()
    }
}

/// Keeps a run's token registered for [`ValidationPipeline::abort`] until dropped.
struct ActiveRun<'a> {
    runs: &'a Mutex<HashMap<Uuid, CancellationToken>>,
    id: Uuid,
}

impl<'a> ActiveRun<'a> {
    fn register(
        runs: &'a Mutex<HashMap<Uuid, CancellationToken>>,
        id: Uuid,
        token: CancellationToken,
    ) -> Self {
        runs.lock().insert(id, token);
        Self { runs, id }
    }
}

impl Drop for ActiveRun<'_> {
    fn drop(&mut self) {
        self.runs.lock().remove(&self.id);
    }
}
