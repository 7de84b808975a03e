//! CLI argument definitions for shoal-daemon.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// Default configuration file location.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/shoal/shoal.json";

/// shoal rule pipeline daemon.
///
/// Reads messages from the configured input, classifies them, runs every
/// loaded rule against each event and writes rule results to the configured
/// output.
#[derive(Parser, Debug)]
#[command(name = "shoal-daemon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to the JSON configuration file.
    #[arg(short, long, conflicts_with = "config_file")]
    pub config: Option<PathBuf>,

    /// Configuration file given as a positional argument.
    #[arg(value_name = "CONFIG")]
    pub config_file: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_format: Option<String>,

    /// Validate configuration file and exit without running the pipeline.
    #[arg(long)]
    pub validate: bool,
}

impl DaemonCli {
    /// Resolve the configuration path (`--config`, positional, then default).
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .or_else(|| self.config_file.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
    }
}
