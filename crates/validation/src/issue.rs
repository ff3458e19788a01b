//! Individual validation findings.

use serde::{Deserialize, Serialize};

use crate::stage::StageName;

/// Code of the issue synthesized when the validator call itself fails.
pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";

/// Fallback message when a service failure carries no text.
pub const SERVICE_UNAVAILABLE_MESSAGE: &str = "Validation service unavailable";

/// Severity of a validation finding.
///
/// Only [`Severity::Error`] makes a stage fail; warnings never flip validity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Must be fixed before the change can be applied.
    #[default]
    Error,
    /// Worth surfacing, does not block.
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// A single finding produced by a stage.
///
/// Field names follow the validator wire contract (camelCase).
///
/// # Examples
///
/// ```
/// use nasnet_validation::{Severity, StageName, ValidationError};
///
/// let issue = ValidationError::new(
///     StageName::CrossResource,
///     "IP_CONFLICT",
///     "address already in use",
/// )
///     .with_field("address")
///     .with_suggestion("Pick an unused address")
///     .with_related_resource("ip-address/*3");
///
/// assert_eq!(issue.severity, Severity::Error);
/// assert_eq!(issue.field_path.as_deref(), Some("address"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationError {
    /// Machine-readable code, e.g. `IP_CONFLICT`.
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Dotted path into the validated data, e.g. `peers.0.endpoint`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_path: Option<String>,
    /// Whether this blocks the change.
    pub severity: Severity,
    /// Stage that produced the finding.
    pub stage: StageName,
    /// Suggested fixes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
    /// Identifiers of resources involved in the finding.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_resources: Vec<String>,
}

impl ValidationError {
    /// Create an error-severity finding.
    pub fn new(stage: StageName, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            field_path: None,
            severity: Severity::Error,
            stage,
            suggestions: Vec::new(),
            related_resources: Vec::new(),
        }
    }

    /// Create a warning-severity finding.
    pub fn warning(stage: StageName, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(stage, code, message).with_severity(Severity::Warning)
    }

    /// The finding recorded when the validator call fails.
    ///
    /// An empty `message` is replaced by [`SERVICE_UNAVAILABLE_MESSAGE`].
    pub fn service_failure(stage: StageName, message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if message.trim().is_empty() {
            SERVICE_UNAVAILABLE_MESSAGE.to_owned()
        } else {
            message
        };
        Self::new(stage, VALIDATION_ERROR, message)
    }

    /// Set the field path.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_field(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    /// Set the severity.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Add a suggestion.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Add a related resource id.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_related_resource(mut self, id: impl Into<String>) -> Self {
        self.related_resources.push(id.into());
        self
    }

    /// Returns `true` if this finding blocks the change.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.field_path {
            Some(path) => write!(f, "[{}] {}: {} ({})", self.stage, path, self.message, self.code),
            None => write!(f, "[{}] {} ({})", self.stage, self.message, self.code),
        }
    }
}
