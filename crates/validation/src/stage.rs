//! The stage catalog and per-stage status tracking.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Number of stages in the catalog.
pub const STAGE_COUNT: usize = 7;

/// One named step of the validation sequence.
///
/// Declaration order is both execution order and display order; everything
/// that iterates stages goes through [`StageName::ALL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageName {
    /// Structural and type checks against the submitted data.
    Schema,
    /// Value format checks (addresses, ports, names).
    Syntax,
    /// Conflicts with other existing resources (duplicate IP, port, VLAN).
    CrossResource,
    /// Referenced resources exist and are compatible.
    Dependencies,
    /// Requested network resources are available.
    Network,
    /// The target router supports the requested capability.
    Platform,
    /// Simulated application of the change against the router.
    DryRun,
}

impl StageName {
    /// The full catalog in execution order.
    pub const ALL: [StageName; STAGE_COUNT] = [
        Self::Schema,
        Self::Syntax,
        Self::CrossResource,
        Self::Dependencies,
        Self::Network,
        Self::Platform,
        Self::DryRun,
    ];

    /// Position of this stage in the catalog.
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Returns `true` for stages evaluated in-process, without a validator round trip.
    #[must_use]
    pub fn is_local(self) -> bool {
        matches!(self, Self::Schema | Self::Syntax)
    }

    /// The wire name of the stage.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Schema => "schema",
            Self::Syntax => "syntax",
            Self::CrossResource => "cross-resource",
            Self::Dependencies => "dependencies",
            Self::Network => "network",
            Self::Platform => "platform",
            Self::DryRun => "dry-run",
        }
    }
}

impl std::fmt::Display for StageName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StageName {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| PipelineError::UnknownStage(s.to_owned()))
    }
}

/// Status of a single stage within one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    /// Selected but not yet dispatched.
    #[default]
    Pending,
    /// Dispatched, waiting for a result.
    Running,
    /// Completed without errors.
    Passed,
    /// Completed with at least one error.
    Failed,
    /// Not selected, or not run because of stop-on-error or abort.
    Skipped,
}

impl StageStatus {
    /// Returns `true` if the stage has reached a final state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Passed | Self::Failed | Self::Skipped)
    }

    /// Returns `true` if the stage is waiting on the validator.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Running)
    }
}

impl std::fmt::Display for StageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Passed => write!(f, "passed"),
            Self::Failed => write!(f, "failed"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}
