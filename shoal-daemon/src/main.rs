use anyhow::Result;
use clap::Parser;

use shoal_core::config::ShoalConfig;
use shoal_daemon::cli::DaemonCli;
use shoal_daemon::logging;
use shoal_daemon::orchestrator::Orchestrator;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DaemonCli::parse();
    let config_path = cli.config_path();

    let mut config = ShoalConfig::load(&config_path)
        .await
        .map_err(|e| anyhow::anyhow!("failed to load config {}: {}", config_path.display(), e))?;

    // CLI flags win over file and environment
    if let Some(level) = cli.log_level {
        config.general.log_level = level;
    }
    if let Some(format) = cli.log_format {
        config.general.log_format = format;
    }

    if cli.validate {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;
        println!("configuration {} is valid", config_path.display());
        return Ok(());
    }

    logging::init_tracing(&config.general)?;
    tracing::info!(config = %config_path.display(), "shoal-daemon starting");

    let orchestrator = Orchestrator::build_from_config(config).await.inspect_err(|e| {
        tracing::error!(error = %e, "startup failed");
    })?;

    match orchestrator.run().await {
        Ok(summary) => {
            tracing::info!(records = summary.records_written, "shoal-daemon finished");
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %e, "shoal-daemon failed");
            Err(e)
        }
    }
}
