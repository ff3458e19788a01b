//! Layered configuration: defaults, then `nasnet.toml`, then `NASNET_*`
//! environment variables, then command-line flags.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, bail};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use nasnet_validation::{PipelineConfig, RiskTable};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::args::Args;

/// Config file read when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "nasnet.toml";

/// Everything the binary can be configured with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    pub pipeline: PipelineConfig,
    pub validator: ValidatorConfig,
    pub log: nasnet_log::Config,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_table: Option<RiskTable>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            pipeline: PipelineConfig::default(),
            validator: ValidatorConfig::default(),
            log: nasnet_log::Config::default().with_level("warn"),
            risk_table: None,
        }
    }
}

/// The `[validator]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidatorConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<Url>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl ValidatorConfig {
    /// The request timeout, falling back to the pipeline's stage timeout.
    pub fn timeout(&self, pipeline: &PipelineConfig) -> Option<Duration> {
        self.timeout_ms
            .map(Duration::from_millis)
            .or(pipeline.stage_timeout)
    }
}

impl AppConfig {
    /// Resolve the configuration for one invocation.
    pub fn load(args: &Args) -> anyhow::Result<Self> {
        let file = match &args.config {
            Some(path) if !path.exists() => {
                bail!("config file {} does not exist", path.display())
            }
            Some(path) => path.clone(),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        let mut config = Self::from_layers(&file)?;
        config.apply_flags(args);
        Ok(config)
    }

    /// Defaults, then `file` if it exists, then the environment.
    pub fn from_layers(file: &Path) -> anyhow::Result<Self> {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(file))
            .merge(
                Env::prefixed("NASNET_")
                    .ignore(&["config", "log"])
                    .lowercase(false)
                    .map(|key| env_key_path(key.as_str()).into()),
            )
            .extract()
            .with_context(|| format!("loading configuration (file {})", file.display()))
    }

    fn apply_flags(&mut self, args: &Args) {
        if let Some(risk) = args.risk {
            self.pipeline.risk_level = risk;
        }
        for &stage in &args.skip {
            self.pipeline = std::mem::take(&mut self.pipeline).skip(stage);
        }
        if args.dry_run {
            self.pipeline.include_dry_run = true;
        }
        if args.stop_on_error {
            self.pipeline.stop_on_error = true;
        }
        if let Some(endpoint) = &args.endpoint {
            self.validator.endpoint = Some(endpoint.clone());
        }
    }
}

/// `PIPELINE__RISK_LEVEL` → `pipeline.riskLevel`.
fn env_key_path(key: &str) -> String {
    key.split("__")
        .map(|segment| {
            let mut out = String::with_capacity(segment.len());
            let mut upper = false;
            for c in segment.chars() {
                if c == '_' {
                    upper = true;
                } else if upper {
                    out.push(c.to_ascii_uppercase());
                    upper = false;
                } else {
                    out.push(c.to_ascii_lowercase());
                }
            }
            out
        })
        .collect::<Vec<_>>()
        .join(".")
}
