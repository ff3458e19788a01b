//! `nasnet-validate`: run the validation pipeline over one configuration change.
//!
//! Exit codes: `0` valid, `1` invalid, `2` usage or setup failure.

mod args;
mod config;
mod output;

use std::io::{self, Read};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use nasnet_validation::{
    AcceptAll, FieldRules, SchemaValidator, UnavailableValidator, ValidationInput,
    ValidationPipeline, Validator,
};
use nasnet_validation_http::HttpValidator;

use crate::args::Args;
use crate::config::AppConfig;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}

async fn run(args: Args) -> anyhow::Result<bool> {
    let config = AppConfig::load(&args)?;
    let _log = nasnet_log::init_with(config.log.clone()).context("installing logger")?;

    let data = read_data(&args.data)?;

    let schema: Arc<dyn SchemaValidator> = match &args.rules {
        Some(path) => Arc::new(FieldRules::from_file(path)?),
        None => Arc::new(AcceptAll),
    };

    let validator: Arc<dyn Validator> = match &config.validator.endpoint {
        Some(endpoint) => {
            let mut http = HttpValidator::new(endpoint.clone());
            if let Some(timeout) = config.validator.timeout(&config.pipeline) {
                http = http.with_timeout(timeout);
            }
            if let Some(token) = &config.validator.token {
                http = http.with_bearer_token(token.clone());
            }
            Arc::new(http)
        }
        None => {
            tracing::debug!("no validator endpoint configured");
            Arc::new(UnavailableValidator)
        }
    };

    let mut builder = ValidationPipeline::builder(validator)
        .config(config.pipeline.clone())
        .schema(schema);
    if let Some(table) = config.risk_table.clone() {
        builder = builder.risk_table(table);
    }
    let pipeline = Arc::new(builder.build());
    tracing::debug!(stages = ?pipeline.selected_stages(), "pipeline ready");

    let mut input = ValidationInput::new(args.resource_type.clone(), data);
    if let Some(id) = &args.resource_id {
        input = input.with_resource_id(id.clone());
    }
    if let Some(id) = &args.router_id {
        input = input.with_router_id(id.clone());
    }

    let interrupt = {
        let pipeline = Arc::clone(&pipeline);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                pipeline.abort();
            }
        })
    };
    let result = pipeline.validate(input).await;
    interrupt.abort();

    let stdout = io::stdout();
    output::render(&result, args.output, &mut stdout.lock()).context("writing result")?;
    Ok(result.is_valid)
}

fn read_data(path: &Path) -> anyhow::Result<serde_json::Value> {
    let raw = if path == Path::new("-") {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("reading data from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("reading data file {}", path.display()))?
    };
    serde_json::from_str(&raw).context("data is not valid JSON")
}
