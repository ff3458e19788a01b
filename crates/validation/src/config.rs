//! Pipeline configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::risk::RiskLevel;
use crate::stage::StageName;

/// Configuration fixed for the lifetime of one pipeline.
///
/// Keys use camelCase so the same document can be shared with the form
/// layer; `stageTimeout` is in milliseconds.
///
/// # Examples
///
/// ```
/// use nasnet_validation::{PipelineConfig, RiskLevel, StageName};
///
/// let config = PipelineConfig::new(RiskLevel::High)
///     .with_stop_on_error(true)
///     .with_dry_run(true)
///     .skip(StageName::Platform);
///
/// assert!(config.include_dry_run);
/// assert_eq!(config.skip_stages, vec![StageName::Platform]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineConfig {
    /// Decides the base stage list.
    pub risk_level: RiskLevel,
    /// Skip every not-yet-run stage once one fails.
    pub stop_on_error: bool,
    /// Stages removed from the selection.
    pub skip_stages: Vec<StageName>,
    /// Per-stage time budget, enforced by the validator transport.
    #[serde(with = "crate::serde_duration_opt", skip_serializing_if = "Option::is_none")]
    pub stage_timeout: Option<Duration>,
    /// Keep `dry-run` when the risk level maps it.
    pub include_dry_run: bool,
}

impl PipelineConfig {
    /// Create a configuration for `risk_level` with defaults elsewhere.
    #[must_use]
    pub fn new(risk_level: RiskLevel) -> Self {
        Self {
            risk_level,
            ..Self::default()
        }
    }

    /// Set stop-on-error.
    #[must_use]
    pub fn with_stop_on_error(mut self, stop: bool) -> Self {
        self.stop_on_error = stop;
        self
    }

    /// Set dry-run inclusion.
    #[must_use]
    pub fn with_dry_run(mut self, include: bool) -> Self {
        self.include_dry_run = include;
        self
    }

    /// Set the stage timeout.
    #[must_use]
    pub fn with_stage_timeout(mut self, timeout: Duration) -> Self {
        self.stage_timeout = Some(timeout);
        self
    }

    /// Add a stage to the skip list.
    #[must_use]
    pub fn skip(mut self, stage: StageName) -> Self {
        if !self.skip_stages.contains(&stage) {
            self.skip_stages.push(stage);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.risk_level, RiskLevel::Medium);
        assert!(!config.stop_on_error);
        assert!(!config.include_dry_run);
        assert!(config.skip_stages.is_empty());
        assert_eq!(config.stage_timeout, None);
    }

    #[test]
    fn skip_is_idempotent() {
        let config = PipelineConfig::new(RiskLevel::Low)
            .skip(StageName::Syntax)
            .skip(StageName::Syntax);
        assert_eq!(config.skip_stages, vec![StageName::Syntax]);
    }

    #[test]
    fn deserialize_camel_case_with_millis() {
        let config: PipelineConfig = serde_json::from_value(serde_json::json!({
            "riskLevel": "high",
            "stopOnError": true,
            "skipStages": ["cross-resource"],
            "stageTimeout": 1500,
            "includeDryRun": true,
        }))
        .unwrap();

        assert_eq!(
            config,
            PipelineConfig::new(RiskLevel::High)
                .with_stop_on_error(true)
                .with_dry_run(true)
                .with_stage_timeout(Duration::from_millis(1500))
                .skip(StageName::CrossResource)
        );
    }

    #[test]
    fn missing_keys_use_defaults() {
        let config: PipelineConfig =
            serde_json::from_value(serde_json::json!({ "riskLevel": "low" })).unwrap();
        assert_eq!(config, PipelineConfig::new(RiskLevel::Low));
    }

    #[test]
    fn timeout_serializes_as_millis() {
        let config = PipelineConfig::new(RiskLevel::Low).with_stage_timeout(Duration::from_secs(2));
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["stageTimeout"], serde_json::json!(2000));
    }
}
