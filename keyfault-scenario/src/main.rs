mod cli;
mod logging;

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use keyfault_core::config::KeyfaultConfig;
use keyfault_core::error::{ConfigError, KeyfaultError};
use keyfault_scenario::{Driver, ProcessBackend, ScenarioReport};

use crate::cli::ScenarioCli;

/// Config file used when `--config` is not given.
const DEFAULT_CONFIG_PATH: &str = "keyfault.toml";

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = ScenarioCli::parse();

    let mut config = load_config(cli.config.as_deref()).await?;
    if let Some(level) = cli.log_level {
        config.general.log_level = level;
    }
    if let Some(format) = cli.log_format {
        config.general.log_format = format;
    }
    config.validate().context("config validation failed")?;

    if cli.validate {
        println!("configuration OK");
        return Ok(ExitCode::SUCCESS);
    }

    logging::init_tracing(&config.general)?;
    keyfault_core::metrics::describe_all();
    tracing::info!(
        scratch = %config.paths.scratch_dir.display(),
        admin_url = config.conductor.admin_url.as_str(),
        "keyfault-scenario starting"
    );

    let driver = Driver::new(config, ProcessBackend);
    let report = driver.run().await;

    if let Some(path) = cli.report.as_deref() {
        write_report(path, &report).await?;
        tracing::info!(path = %path.display(), "report written");
    }

    if report.completed {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

/// Loads `path`, or `keyfault.toml` if present, or the built-in defaults.
///
/// A missing file is an error only when it was named explicitly.
async fn load_config(path: Option<&Path>) -> Result<KeyfaultConfig> {
    let mut config = match path {
        Some(path) => KeyfaultConfig::from_file(path)
            .await
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => match KeyfaultConfig::from_file(DEFAULT_CONFIG_PATH).await {
            Ok(config) => config,
            Err(KeyfaultError::Config(ConfigError::FileNotFound { .. })) => {
                KeyfaultConfig::default()
            }
            Err(e) => {
                return Err(e).context(format!("failed to load config from {DEFAULT_CONFIG_PATH}"));
            }
        },
    };
    config.apply_env_overrides();
    Ok(config)
}

async fn write_report(path: &Path, report: &ScenarioReport) -> Result<()> {
    let json = report.to_json_pretty().context("failed to serialize report")?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("failed to write report to {}", path.display()))
}
