use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use nasnet_validation::{RiskLevel, StageName};
use url::Url;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "nasnet-validate",
    version,
    about = "Validate a router configuration change before applying it"
)]
pub struct Args {
    /// Kind of resource, e.g. `vlan` or `vpn-wireguard-client`.
    #[arg(long)]
    pub resource_type: String,

    /// JSON file with the form data (`-` reads stdin).
    #[arg(long)]
    pub data: PathBuf,

    /// Existing resource being edited.
    #[arg(long)]
    pub resource_id: Option<String>,

    /// Target router.
    #[arg(long)]
    pub router_id: Option<String>,

    /// Risk level: low, medium or high.
    #[arg(long)]
    pub risk: Option<RiskLevel>,

    /// Skip a stage (repeatable).
    #[arg(long = "skip", value_name = "STAGE")]
    pub skip: Vec<StageName>,

    /// Include the dry-run stage when the risk level maps it.
    #[arg(long)]
    pub dry_run: bool,

    /// Skip remaining stages after the first failure.
    #[arg(long)]
    pub stop_on_error: bool,

    /// Validation service endpoint.
    #[arg(long)]
    pub endpoint: Option<Url>,

    /// Field rules file (TOML, or JSON with a `.json` extension).
    #[arg(long)]
    pub rules: Option<PathBuf>,

    /// Configuration file (default: `nasnet.toml` if present).
    #[arg(long, env = "NASNET_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Stage table and summary.
    Text,
    /// The full result as JSON.
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn parses_repeated_skip_and_risk() {
        let args = Args::try_parse_from([
            "nasnet-validate",
            "--resource-type",
            "vlan",
            "--data",
            "vlan.json",
            "--risk",
            "high",
            "--skip",
            "platform",
            "--skip",
            "network",
            "--output",
            "json",
        ])
        .unwrap();
        assert_eq!(args.risk, Some(RiskLevel::High));
        assert_eq!(args.skip, vec![StageName::Platform, StageName::Network]);
        assert_eq!(args.output, OutputFormat::Json);
    }

    #[test]
    fn unknown_stage_is_rejected() {
        let err = Args::try_parse_from([
            "nasnet-validate",
            "--resource-type",
            "vlan",
            "--data",
            "vlan.json",
            "--skip",
            "semantic",
        ])
        .unwrap_err();
        assert!(err.to_string().contains("unknown stage"));
    }
}
