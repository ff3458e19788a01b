//! The in-process stage: shape and type checks on the submitted data.

use std::time::Instant;

use crate::issue::ValidationError;
use crate::result::StageResult;
use crate::stage::StageName;

/// Code used for violations that do not carry their own.
pub const SCHEMA_VIOLATION: &str = "SCHEMA_VIOLATION";

/// A single violation reported by a [`SchemaValidator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    /// Dotted path of the offending field, if the validator knows it.
    pub path: Option<String>,
    /// Human-readable message.
    pub message: String,
    /// Machine-readable code; [`SCHEMA_VIOLATION`] when absent.
    pub code: Option<String>,
}

impl FieldViolation {
    /// A violation tied to a field path.
    pub fn at(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            message: message.into(),
            code: None,
        }
    }

    /// A violation of the document as a whole.
    pub fn root(message: impl Into<String>) -> Self {
        Self {
            path: None,
            message: message.into(),
            code: None,
        }
    }

    /// Attach a code.
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

/// Local shape/type validation of form data.
///
/// The rule language behind it is the implementor's business; the
/// pipeline only needs "ok, or these violations".
pub trait SchemaValidator: Send + Sync {
    /// Validate `data`.
    fn validate(&self, data: &serde_json::Value) -> Result<(), Vec<FieldViolation>>;
}

impl<F> SchemaValidator for F
where
    F: Fn(&serde_json::Value) -> Result<(), Vec<FieldViolation>> + Send + Sync,
{
    fn validate(&self, data: &serde_json::Value) -> Result<(), Vec<FieldViolation>> {
        self(data)
    }
}

/// A schema validator that accepts everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl SchemaValidator for AcceptAll {
    fn validate(&self, _data: &serde_json::Value) -> Result<(), Vec<FieldViolation>> {
        Ok(())
    }
}

/// Run the schema validator for `stage` and build its result.
///
/// Completes without suspending. Every violation becomes one error-severity
/// finding tagged with `stage`.
pub fn run_local(
    stage: StageName,
    validator: &dyn SchemaValidator,
    data: &serde_json::Value,
) -> StageResult {
    let started = Instant::now();
    let issues = match validator.validate(data) {
        Ok(()) => Vec::new(),
        Err(violations) => violations
            .into_iter()
            .map(|violation| {
                let code = violation
                    .code
                    .unwrap_or_else(|| SCHEMA_VIOLATION.to_owned());
                let issue = ValidationError::new(stage, code, violation.message);
                match violation.path {
                    Some(path) => issue.with_field(path),
                    None => issue,
                }
            })
            .collect(),
    };

    StageResult::from_issues(stage, issues).with_duration(started.elapsed())
}
