//! CLI command implementations
//!
//! `serve` boots the HTTP server, `check` validates a configuration file,
//! and `parse` is a one-shot development aid that runs the template binder
//! against ad-hoc parameters and prints the result.

use std::path::Path;
use std::sync::Arc;

use serde_json::json;

use crate::config::AppConfig;
use crate::engine::{ParameterSource, ParsedTemplate};
use crate::observability::Logger;
use crate::provider::MemoryProvider;
use crate::server::EndpointServer;

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};

/// Parse arguments and run the selected command
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(cli.command)
}

/// Run a single command
pub fn run_command(command: Command) -> CliResult<()> {
    match command {
        Command::Serve { config, port } => serve(&config, port),
        Command::Check { config } => check(&config),
        Command::Parse { template, params } => parse(&template, &params),
    }
}

/// Boot the endpoint server from a configuration file.
///
/// The shipped connection provider is the in-memory adapter; a deployment
/// against a real database swaps in an adapter for its driver.
pub fn serve(config_path: &Path, port: Option<u16>) -> CliResult<()> {
    let mut config = AppConfig::load(config_path)?;
    if let Some(port) = port {
        config.server.port = port;
    }

    for endpoint in &config.endpoints {
        Logger::info(
            "ENDPOINT_REGISTERED",
            &[
                ("path", endpoint.path.as_str()),
                ("connection", endpoint.connection_name.as_str()),
            ],
        );
    }

    let provider = Arc::new(MemoryProvider::from_connection_names(&config.connections));
    let server = EndpointServer::from_config(config, provider);

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::boot_failed(format!("Failed to create tokio runtime: {}", e)))?;

    rt.block_on(async {
        server
            .start()
            .await
            .map_err(|e| CliError::boot_failed(format!("HTTP server failed: {}", e)))
    })?;

    Ok(())
}

/// Validate a configuration file and report what it declares
pub fn check(config_path: &Path) -> CliResult<()> {
    let config = AppConfig::load(config_path)?;

    Logger::info(
        "CONFIG_OK",
        &[
            ("endpoints", &config.endpoints.len().to_string()),
            ("connections", &config.connections.len().to_string()),
        ],
    );
    for endpoint in &config.endpoints {
        Logger::info(
            "ENDPOINT_REGISTERED",
            &[
                ("path", endpoint.path.as_str()),
                ("connection", endpoint.connection_name.as_str()),
                ("disabled", if endpoint.is_disabled { "true" } else { "false" }),
            ],
        );
    }
    Ok(())
}

/// One-shot template parse against name=value parameters
pub fn parse(template: &str, params: &[String]) -> CliResult<()> {
    let mut source = ParameterSource::new();
    for pair in params {
        let Some((name, value)) = pair.split_once('=') else {
            return Err(CliError::invalid_argument(format!(
                "expected NAME=VALUE, got [{}]",
                pair
            )));
        };
        source.insert(name, Some(value.to_string()));
    }

    let parsed = ParsedTemplate::parse(template, &mut source);
    let report = json!({
        "statement": parsed.statement(),
        "callable": parsed.is_callable(),
        "parameters": parsed
            .params()
            .iter()
            .map(|p| json!({"name": p.name, "value": p.value.to_json()}))
            .collect::<Vec<_>>(),
        "errors": parsed
            .errors()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>(),
    });

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
