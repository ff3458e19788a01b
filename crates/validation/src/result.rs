//! Stage and pipeline results, and the aggregation that folds one into the other.

use std::time::Duration;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::issue::{Severity, ValidationError};
use crate::stage::{StageName, StageStatus};

/// Outcome of one stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageResult {
    /// The stage this result belongs to.
    pub stage: StageName,
    /// Current status.
    pub status: StageStatus,
    /// Error-severity findings.
    #[serde(default)]
    pub errors: Vec<ValidationError>,
    /// Warning-severity findings.
    #[serde(default)]
    pub warnings: Vec<ValidationError>,
    /// Wall-clock time the stage took, if measured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// Opaque extra data from the producer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

impl StageResult {
    /// A result with the given status and no findings.
    #[must_use]
    pub fn new(stage: StageName, status: StageStatus) -> Self {
        Self {
            stage,
            status,
            errors: Vec::new(),
            warnings: Vec::new(),
            duration_ms: None,
            metadata: None,
        }
    }

    /// Shorthand for a `pending` placeholder.
    #[must_use]
    pub fn pending(stage: StageName) -> Self {
        Self::new(stage, StageStatus::Pending)
    }

    /// Shorthand for a `skipped` result.
    #[must_use]
    pub fn skipped(stage: StageName) -> Self {
        Self::new(stage, StageStatus::Skipped)
    }

    /// Build a finished result from findings, splitting them by severity.
    ///
    /// The status is `failed` iff any finding has error severity.
    #[must_use]
    pub fn from_issues(stage: StageName, issues: Vec<ValidationError>) -> Self {
        let (errors, warnings): (Vec<_>, Vec<_>) =
            issues.into_iter().partition(ValidationError::is_error);
        let status = if errors.is_empty() {
            StageStatus::Passed
        } else {
            StageStatus::Failed
        };
        Self {
            errors,
            warnings,
            ..Self::new(stage, status)
        }
    }

    /// Set the measured duration.
    #[must_use]
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration_ms = Some(duration.as_millis() as u64);
        self
    }

    /// Insert a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata
            .get_or_insert_with(serde_json::Map::new)
            .insert(key.into(), value);
        self
    }

    /// Returns `true` if this stage failed.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.status == StageStatus::Failed
    }
}

/// Caller-visible output of one `validate()` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResult {
    /// `true` iff no stage failed.
    pub is_valid: bool,
    /// One entry per catalog stage, in catalog order.
    pub stages: Vec<StageResult>,
    /// Every error, in stage order.
    pub errors: Vec<ValidationError>,
    /// Every warning, in stage order.
    pub warnings: Vec<ValidationError>,
    /// Elapsed time of the whole run.
    pub total_duration_ms: u64,
    /// Findings grouped by field path, in stage order.
    pub field_errors: IndexMap<String, Vec<ValidationError>>,
}

impl PipelineResult {
    /// Fold per-stage results into a pipeline result.
    ///
    /// `stages` must already be in catalog order. Errors and warnings are
    /// concatenated stage by stage; `field_errors` takes each stage's errors
    /// then its warnings, skipping findings without a field path.
    #[must_use]
    pub fn from_stages(stages: Vec<StageResult>, total_duration: Duration) -> Self {
        let is_valid = !stages.iter().any(StageResult::is_failed);

        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let mut field_errors: IndexMap<String, Vec<ValidationError>> = IndexMap::new();

        for stage in &stages {
            errors.extend(stage.errors.iter().cloned());
            warnings.extend(stage.warnings.iter().cloned());

            for issue in stage.errors.iter().chain(&stage.warnings) {
                if let Some(path) = &issue.field_path {
                    field_errors
                        .entry(path.clone())
                        .or_default()
                        .push(issue.clone());
                }
            }
        }

        Self {
            is_valid,
            stages,
            errors,
            warnings,
            total_duration_ms: total_duration.as_millis() as u64,
            field_errors,
        }
    }

    /// Look up the result for one stage.
    #[must_use]
    pub fn stage(&self, name: StageName) -> Option<&StageResult> {
        self.stages.iter().find(|result| result.stage == name)
    }

    /// Number of error-severity findings.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Number of warning-severity findings.
    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// Number of stages that actually ran.
    #[must_use]
    pub fn stages_run(&self) -> usize {
        self.stages
            .iter()
            .filter(|result| result.status != StageStatus::Skipped)
            .count()
    }

    /// Stages that ended `failed`, in catalog order.
    #[must_use]
    pub fn failed_stages(&self) -> Vec<StageName> {
        self.stages
            .iter()
            .filter(|result| result.is_failed())
            .map(|result| result.stage)
            .collect()
    }

    /// Total elapsed time as a [`Duration`].
    #[must_use]
    pub fn total_duration(&self) -> Duration {
        Duration::from_millis(self.total_duration_ms)
    }

    /// One-line human-readable summary.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.is_valid {
            format!(
                "validation passed: {} run, {}",
                plural(self.stages_run(), "stage"),
                plural(self.warning_count(), "warning"),
            )
        } else {
            let failed = self
                .failed_stages()
                .iter()
                .map(|stage| stage.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "validation failed: {}, {} in {failed}",
                plural(self.error_count(), "error"),
                plural(self.warning_count(), "warning"),
            )
        }
    }

    /// Findings of the given severity for one field path.
    pub fn field_issues(
        &self,
        path: &str,
        severity: Severity,
    ) -> impl Iterator<Item = &ValidationError> {
        self.field_errors
            .get(path)
            .into_iter()
            .flatten()
            .filter(move |issue| issue.severity == severity)
    }
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}
