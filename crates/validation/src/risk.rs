//! Risk levels and the risk-level → stage table.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::stage::StageName;

/// How consequential a change is; decides which stages run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    /// Local checks only.
    Low,
    /// Adds conflict and dependency checks.
    #[default]
    Medium,
    /// Adds network, platform and (optionally) dry-run checks.
    High,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

impl FromStr for RiskLevel {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(PipelineError::UnknownRiskLevel(other.to_owned())),
        }
    }
}

/// The static mapping from risk level to the stages that apply.
///
/// The default table is the shipped behaviour; a replacement can be loaded
/// from configuration and is checked by [`RiskTable::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRiskTable", into = "RawRiskTable")]
pub struct RiskTable {
    low: Vec<StageName>,
    medium: Vec<StageName>,
    high: Vec<StageName>,
}

#[derive(Serialize, Deserialize)]
struct RawRiskTable {
    low: Vec<StageName>,
    medium: Vec<StageName>,
    high: Vec<StageName>,
}

impl RiskTable {
    /// Build a custom table.
    ///
    /// Every level must be non-empty, in catalog order without duplicates,
    /// and each level must contain the one below it.
    pub fn new(
        low: Vec<StageName>,
        medium: Vec<StageName>,
        high: Vec<StageName>,
    ) -> Result<Self, PipelineError> {
        for (level, stages) in [("low", &low), ("medium", &medium), ("high", &high)] {
            if stages.is_empty() {
                return Err(PipelineError::InvalidRiskTable(format!(
                    "{level} has no stages"
                )));
            }
            if !stages.windows(2).all(|pair| pair[0] < pair[1]) {
                return Err(PipelineError::InvalidRiskTable(format!(
                    "{level} must list stages once each, in catalog order"
                )));
            }
        }
        if !low.iter().all(|stage| medium.contains(stage)) {
            return Err(PipelineError::InvalidRiskTable(
                "medium must include every low stage".into(),
            ));
        }
        if !medium.iter().all(|stage| high.contains(stage)) {
            return Err(PipelineError::InvalidRiskTable(
                "high must include every medium stage".into(),
            ));
        }
        Ok(Self { low, medium, high })
    }

    /// Stages mapped to `level`, in catalog order.
    #[must_use]
    pub fn stages(&self, level: RiskLevel) -> &[StageName] {
        match level {
            RiskLevel::Low => &self.low,
            RiskLevel::Medium => &self.medium,
            RiskLevel::High => &self.high,
        }
    }
}

impl Default for RiskTable {
    fn default() -> Self {
        use StageName::*;

        Self {
            low: vec![Schema, Syntax],
            medium: vec![Schema, Syntax, CrossResource, Dependencies],
            high: StageName::ALL.to_vec(),
        }
    }
}

impl TryFrom<RawRiskTable> for RiskTable {
    type Error = PipelineError;

    fn try_from(raw: RawRiskTable) -> Result<Self, Self::Error> {
        Self::new(raw.low, raw.medium, raw.high)
    }
}

impl From<RiskTable> for RawRiskTable {
    fn from(table: RiskTable) -> Self {
        Self {
            low: table.low,
            medium: table.medium,
            high: table.high,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use StageName::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_table_levels_nest() {
        let table = RiskTable::default();
        assert_eq!(table.stages(RiskLevel::Low), &[Schema, Syntax]);
        assert_eq!(
            table.stages(RiskLevel::Medium),
            &[Schema, Syntax, CrossResource, Dependencies]
        );
        assert_eq!(table.stages(RiskLevel::High), &StageName::ALL);
        assert!(RiskTable::new(
            table.low.clone(),
            table.medium.clone(),
            table.high.clone()
        )
        .is_ok());
    }

    #[test]
    fn rejects_empty_level() {
        let err = RiskTable::new(vec![], vec![Schema], vec![Schema]).unwrap_err();
        assert!(err.to_string().contains("low has no stages"));
    }

    #[test]
    fn rejects_out_of_order_or_duplicate() {
        assert!(
            RiskTable::new(vec![Syntax, Schema], vec![Schema, Syntax], vec![Schema, Syntax])
                .is_err()
        );
        assert!(RiskTable::new(vec![Schema, Schema], vec![Schema], vec![Schema]).is_err());
    }

    #[test]
    fn rejects_non_nested_levels() {
        let err =
            RiskTable::new(vec![Schema, Syntax], vec![Schema], vec![Schema, Syntax]).unwrap_err();
        assert!(err.to_string().contains("medium must include"));
    }

    #[test]
    fn deserialize_validates() {
        let table: RiskTable = serde_json::from_value(serde_json::json!({
            "low": ["schema"],
            "medium": ["schema", "cross-resource"],
            "high": ["schema", "cross-resource", "platform"],
        }))
        .unwrap();
        assert_eq!(table.stages(RiskLevel::High), &[Schema, CrossResource, Platform]);

        let bad = serde_json::from_value::<RiskTable>(serde_json::json!({
            "low": ["schema"],
            "medium": [],
            "high": ["schema"],
        }));
        assert!(bad.is_err());
    }

    #[test]
    fn risk_level_parse_and_display() {
        for level in [RiskLevel::Low, RiskLevel::Medium, RiskLevel::High] {
            assert_eq!(level.to_string().parse::<RiskLevel>().unwrap(), level);
        }
        assert!("critical".parse::<RiskLevel>().is_err());
    }
}
