//! Call-scoped state of one validation run.
//!
//! A fresh [`RunState`] is created per `validate()` call, so overlapping
//! calls on one pipeline never share stage slots.

use std::time::Instant;

use crate::error::PipelineError;
use crate::result::{PipelineResult, StageResult};
use crate::stage::{STAGE_COUNT, StageName, StageStatus};
use crate::transition::validate_stage_transition;

/// Stage slots indexed by catalog position, plus the progress counter.
#[derive(Debug, Clone)]
pub(crate) struct RunState {
    slots: [StageResult; STAGE_COUNT],
    completed: usize,
    total: usize,
}

impl RunState {
    /// Selected stages start `pending`, everything else `skipped`.
    pub(crate) fn new(selected: &[StageName]) -> Self {
        Self {
            slots: StageName::ALL.map(|stage| {
                if selected.contains(&stage) {
                    StageResult::pending(stage)
                } else {
                    StageResult::skipped(stage)
                }
            }),
            completed: 0,
            total: selected.len(),
        }
    }

    pub(crate) fn status(&self, stage: StageName) -> StageStatus {
        self.slots[stage.index()].status
    }

    pub(crate) fn result(&self, stage: StageName) -> &StageResult {
        &self.slots[stage.index()]
    }

    /// `pending` → `running`.
    pub(crate) fn start(&mut self, stage: StageName) -> Result<(), PipelineError> {
        let slot = &mut self.slots[stage.index()];
        validate_stage_transition(stage, slot.status, StageStatus::Running)?;
        slot.status = StageStatus::Running;
        tracing::debug!(%stage, "stage running");
        Ok(())
    }

    /// Replace a `running` placeholder with a finished result.
    pub(crate) fn complete(&mut self, result: StageResult) -> Result<(), PipelineError> {
        let stage = result.stage;
        let slot = &mut self.slots[stage.index()];
        if slot.stage != stage {
            return Err(PipelineError::StageMismatch {
                expected: slot.stage,
                actual: stage,
            });
        }
        validate_stage_transition(stage, slot.status, result.status)?;
        tracing::debug!(%stage, status = %result.status, "stage finished");
        *slot = result;
        Ok(())
    }

    /// Mark a `pending` or `running` stage as `skipped`, recording why.
    pub(crate) fn skip(&mut self, stage: StageName, reason: &str) -> Result<(), PipelineError> {
        let slot = &mut self.slots[stage.index()];
        validate_stage_transition(stage, slot.status, StageStatus::Skipped)?;
        *slot = StageResult::skipped(stage).with_metadata("reason", reason.into());
        tracing::debug!(%stage, reason, "stage skipped");
        Ok(())
    }

    /// Skip every stage that never left `pending`.
    pub(crate) fn skip_pending(&mut self, reason: &str) {
        for stage in StageName::ALL {
            if self.status(stage) == StageStatus::Pending {
                // pending → skipped is always valid
                let _ = self.skip(stage, reason);
            }
        }
    }

    /// Count one more reported stage; returns `(completed, total)`.
    pub(crate) fn record_progress(&mut self) -> (usize, usize) {
        self.completed += 1;
        (self.completed, self.total)
    }

    /// Finalise and aggregate.
    ///
    /// Any stage still `pending` or `running` is reported as `skipped` with
    /// `reason`, so a returned result only ever holds terminal statuses.
    pub(crate) fn build_result(mut self, started: Instant, reason: &str) -> PipelineResult {
        for stage in StageName::ALL {
            if !self.status(stage).is_terminal() {
                let _ = self.skip(stage, reason);
            }
        }
        PipelineResult::from_stages(self.slots.into(), started.elapsed())
    }
}
