//! Logger builder implementation

use tracing_subscriber::fmt;
use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Config, Format};
use crate::error::{LogError, LogResult};

/// Logger builder
#[derive(Debug)]
pub struct LoggerBuilder {
    config: Config,
}

/// Guard that keeps the logger's root span entered.
///
/// Hold it for the lifetime of the program.
#[derive(Debug)]
#[must_use = "dropping the guard exits the root span"]
pub struct LoggerGuard {
    _root_span: Option<tracing::span::EnteredSpan>,
}

/// Install a subscriber with the given filter and fmt layer, honouring `display.time`.
macro_rules! install {
    ($filter:expr, $layer:expr, $display:expr) => {{
        if $display.time {
            Registry::default().with($filter).with($layer).try_init()
        } else {
            Registry::default()
                .with($filter)
                .with($layer.without_time())
                .try_init()
        }
    }};
}

impl LoggerBuilder {
    /// Create builder from config
    #[must_use]
    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    /// Build and install the global subscriber.
    ///
    /// Logs go to stderr so stdout stays free for program output. A
    /// non-empty `RUST_LOG` replaces the configured level.
    ///
    /// # Errors
    ///
    /// [`LogError::Filter`] if the level does not parse, [`LogError::Init`]
    /// if a global subscriber is already installed.
    pub fn build(self) -> LogResult<LoggerGuard> {
        let rust_log = std::env::var("RUST_LOG").ok();
        let filter = build_filter(effective_level(&self.config.level, rust_log.as_deref()))?;
        let display = &self.config.display;

        let installed = match self.config.format {
            Format::Pretty => install!(
                filter,
                fmt::layer()
                    .pretty()
                    .with_writer(std::io::stderr)
                    .with_ansi(display.colors)
                    .with_target(display.target)
                    .with_file(display.source)
                    .with_line_number(display.source),
                display
            ),
            Format::Compact => install!(
                filter,
                fmt::layer()
                    .compact()
                    .with_writer(std::io::stderr)
                    .with_ansi(display.colors)
                    .with_target(display.target)
                    .with_file(display.source)
                    .with_line_number(display.source),
                display
            ),
            Format::Json => install!(
                filter,
                fmt::layer()
                    .json()
                    .flatten_event(display.flatten)
                    .with_current_span(true)
                    .with_writer(std::io::stderr)
                    .with_target(display.target)
                    .with_file(display.source)
                    .with_line_number(display.source),
                display
            ),
        };
        installed.map_err(|e| LogError::Init(e.to_string()))?;

        let root = self
            .config
            .service
            .as_deref()
            .map(|service| tracing::info_span!("app", service).entered());

        Ok(LoggerGuard { _root_span: root })
    }
}

/// `RUST_LOG` when set and non-empty, the configured level otherwise.
fn effective_level<'a>(configured: &'a str, rust_log: Option<&'a str>) -> &'a str {
    rust_log
        .map(str::trim)
        .filter(|directives| !directives.is_empty())
        .unwrap_or(configured)
}

/// Parse `level` into an [`EnvFilter`].
///
/// # Errors
///
/// [`LogError::Filter`] naming the offending directives.
pub fn build_filter(level: &str) -> LogResult<EnvFilter> {
    EnvFilter::try_new(level).map_err(|e| LogError::Filter(format!("{level}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_accepts_directives() {
        assert!(build_filter("info").is_ok());
        assert!(build_filter("nasnet_validation=debug,warn").is_ok());
    }

    #[test]
    fn rust_log_overrides_configured_level() {
        assert_eq!(effective_level("warn", None), "warn");
        assert_eq!(effective_level("warn", Some("")), "warn");
        assert_eq!(effective_level("warn", Some("  ")), "warn");
        assert_eq!(effective_level("warn", Some("nasnet_validate=debug")), "nasnet_validate=debug");
    }

    #[test]
    fn filter_rejects_garbage() {
        let err = build_filter("nasnet_validation=loud").unwrap_err();
        assert!(matches!(err, LogError::Filter(_)));
        assert!(err.to_string().contains("nasnet_validation=loud"));
    }
}
