//! CLI argument definitions for keyfault-scenario.

use std::path::PathBuf;

use clap::Parser;

/// Keystore fault-injection scenario against a conductor.
///
/// Starts a keystore, a signing proxy in front of it and a conductor, then
/// disables signing for one agent and records how the conductor copes.
#[derive(Parser, Debug)]
#[command(name = "keyfault-scenario")]
#[command(version, about, long_about = None)]
pub struct ScenarioCli {
    /// Path to keyfault.toml.
    ///
    /// When omitted, `./keyfault.toml` is used if present and built-in
    /// defaults otherwise.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    #[arg(long)]
    pub log_format: Option<String>,

    /// Validate the configuration and exit without running the scenario.
    #[arg(long)]
    pub validate: bool,

    /// Write the run report as JSON to this path.
    #[arg(long)]
    pub report: Option<PathBuf>,
}
