//! Logger errors.

use thiserror::Error;

/// Errors from logger setup.
#[derive(Debug, Error)]
pub enum LogError {
    /// The filter directives did not parse.
    #[error("invalid log filter: {0}")]
    Filter(String),

    /// A global subscriber could not be installed.
    #[error("logger initialization failed: {0}")]
    Init(String),
}

/// Result alias for logger setup.
pub type LogResult<T> = Result<T, LogError>;
