//! State machine transition validation for stage statuses.

use crate::error::PipelineError;
use crate::stage::{StageName, StageStatus};

/// Returns `true` if the stage-level transition from `from` to `to` is valid.
///
/// Terminal statuses have no outgoing transitions, which is what keeps a
/// stored result immutable once it leaves `running`.
#[must_use]
pub fn can_transition_stage(from: StageStatus, to: StageStatus) -> bool {
    matches!(
        (from, to),
        (StageStatus::Pending, StageStatus::Running)
            | (StageStatus::Pending, StageStatus::Skipped)
            | (StageStatus::Running, StageStatus::Passed)
            | (StageStatus::Running, StageStatus::Failed)
            | (StageStatus::Running, StageStatus::Skipped)
    )
}

/// Validate a stage-level transition, returning an error if invalid.
pub fn validate_stage_transition(
    stage: StageName,
    from: StageStatus,
    to: StageStatus,
) -> Result<(), PipelineError> {
    if can_transition_stage(from, to) {
        Ok(())
    } else {
        Err(PipelineError::InvalidTransition { stage, from, to })
    }
}
