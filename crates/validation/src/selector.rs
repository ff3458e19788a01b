//! Stage selection for one validation run.

use crate::config::PipelineConfig;
use crate::risk::RiskTable;
use crate::stage::StageName;

/// Compute the ordered stage list to execute for `config`.
///
/// Starts from the table's list for the risk level, drops `dry-run` unless
/// it was asked for, then drops every skipped stage. The table guarantees
/// catalog order and uniqueness, so the output does too.
#[must_use]
pub fn select_stages(table: &RiskTable, config: &PipelineConfig) -> Vec<StageName> {
    table
        .stages(config.risk_level)
        .iter()
        .copied()
        .filter(|stage| config.include_dry_run || *stage != StageName::DryRun)
        .filter(|stage| !config.skip_stages.contains(stage))
        .collect()
}
