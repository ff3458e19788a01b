#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # NasNet Log
//!
//! One place to install the `tracing` subscriber for NasNet binaries.
//!
//! ```no_run
//! let _guard = nasnet_log::init().expect("logger");
//! tracing::info!("ready");
//! ```

mod builder;
mod config;
mod error;

pub use builder::{LoggerBuilder, LoggerGuard, build_filter};
pub use config::{Config, DisplayConfig, Format};
pub use error::{LogError, LogResult};

/// Install a logger configured from the environment.
///
/// # Errors
///
/// See [`LoggerBuilder::build`].
pub fn init() -> LogResult<LoggerGuard> {
    LoggerBuilder::from_config(Config::from_env()).build()
}

/// Install a logger from an explicit configuration.
///
/// # Errors
///
/// See [`LoggerBuilder::build`].
pub fn init_with(config: Config) -> LogResult<LoggerGuard> {
    LoggerBuilder::from_config(config).build()
}
