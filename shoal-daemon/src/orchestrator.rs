//! Pipeline orchestration -- adapter assembly, signal handling and run lifecycle.
//!
//! The [`Orchestrator`] turns a validated [`ShoalConfig`] into a ready
//! [`RulePipeline`]: it opens the configured output, builds the input,
//! loads event types from `EventTypeFolder` and points the pipeline at
//! `RuleFolder`.
//!
//! # Run
//!
//! 1. The pipeline initializes its input and rules (fatal errors abort here)
//! 2. Messages flow until the input is exhausted or a shutdown signal arrives
//! 3. Rules drain, the output is flushed and a [`RunSummary`] is returned

use std::path::Path;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use shoal_core::config::{InputKind, OutputKind, ShoalConfig};
use shoal_core::{Input, Output};
use shoal_pipeline::{
    EventClassifier, EventTypeRegistry, FileInput, FileOutput, PipelineConfig, RulePipeline,
    RulePipelineBuilder, RuleRegistry, RunSummary, StdinInput, StdoutOutput,
};

use crate::metrics_server;

/// The main daemon orchestrator.
pub struct Orchestrator {
    /// Loaded and validated configuration.
    config: ShoalConfig,
    /// The assembled rule pipeline.
    pipeline: RulePipeline,
    /// Cancelled on SIGINT/SIGTERM.
    shutdown: CancellationToken,
}

impl Orchestrator {
    /// Load configuration and build the orchestrator.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be read, parsed or
    /// validated, or if any adapter fails to build.
    pub async fn build(config_path: &Path) -> Result<Self> {
        let config = ShoalConfig::load(config_path)
            .await
            .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;
        Self::build_from_config(config).await
    }

    /// Build from an already-loaded configuration.
    pub async fn build_from_config(config: ShoalConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

        if config.metrics.enabled {
            metrics_server::install_metrics_recorder(&config.metrics)?;
            record_daemon_metrics();
        }

        let input = build_input(&config)?;
        let output = build_output(&config).await?;
        let classifier = build_classifier(&config).await?;

        let shutdown = CancellationToken::new();
        let (pipeline, _) = RulePipelineBuilder::new()
            .config(PipelineConfig::from_core(&config))
            .registry(RuleRegistry::with_builtins())
            .classifier(classifier)
            .input(input)
            .output(output)
            .shutdown_token(shutdown.clone())
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build rule pipeline: {}", e))?;

        tracing::info!(
            input = ?config.input,
            output = ?config.output,
            rule_folder = ?config.rule_folder,
            "orchestrator initialized"
        );

        Ok(Self {
            config,
            pipeline,
            shutdown,
        })
    }

    /// Token that stops ingestion when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Run the pipeline until the input is exhausted or a shutdown signal
    /// (`SIGTERM`, `SIGINT`) is received.
    ///
    /// # Errors
    ///
    /// Fatal startup errors (input initialization, unreadable rule folder)
    /// and output failures.
    pub async fn run(mut self) -> Result<RunSummary> {
        let signal_task = spawn_signal_watcher(self.shutdown.clone());

        let result = self.pipeline.run().await;
        signal_task.abort();

        let summary = result.map_err(|e| anyhow::anyhow!("rule pipeline failed: {}", e))?;

        tracing::info!(
            messages = summary.messages_received,
            classify_errors = summary.classify_errors,
            rules = summary.rules.len(),
            rules_skipped = summary.rules_skipped,
            records = summary.records_written,
            "pipeline run complete"
        );

        if let Some(reason) = &summary.output_error {
            return Err(anyhow::anyhow!("output failed: {}", reason));
        }
        Ok(summary)
    }

    /// Get a reference to the loaded configuration.
    pub fn config(&self) -> &ShoalConfig {
        &self.config
    }
}

fn build_input(config: &ShoalConfig) -> Result<Box<dyn Input>> {
    match config.input {
        Some(InputKind::File) => {
            let path = config
                .file_config
                .input_file
                .as_deref()
                .context("fileConfig.inputFile is required for file input")?;
            Ok(Box::new(FileInput::new(path)))
        }
        Some(InputKind::Stdin) => Ok(Box::new(StdinInput::new())),
        None => Err(anyhow::anyhow!("no input selected")),
    }
}

async fn build_output(config: &ShoalConfig) -> Result<Box<dyn Output>> {
    match config.output {
        Some(OutputKind::File) => {
            let path = config
                .file_config
                .output_file
                .as_deref()
                .context("fileConfig.outputFile is required for file output")?;
            let output = FileOutput::create(path)
                .await
                .map_err(|e| anyhow::anyhow!("failed to open output: {}", e))?;
            Ok(Box::new(output))
        }
        Some(OutputKind::Stdout) => Ok(Box::new(StdoutOutput::new())),
        None => Err(anyhow::anyhow!("no output selected")),
    }
}

async fn build_classifier(config: &ShoalConfig) -> Result<EventClassifier> {
    match &config.event_type_folder {
        Some(dir) => EventClassifier::load_directory(dir, &EventTypeRegistry::with_builtins())
            .await
            .map_err(|e| anyhow::anyhow!("failed to load event types: {}", e)),
        None => {
            tracing::info!("no EventTypeFolder configured, using default event types");
            Ok(EventClassifier::with_defaults())
        }
    }
}

/// Cancel `shutdown` on the first SIGTERM or SIGINT.
fn spawn_signal_watcher(shutdown: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        match wait_for_shutdown_signal().await {
            Ok(signal) => {
                tracing::info!(signal = signal, "shutdown signal received");
                shutdown.cancel();
            }
            Err(e) => tracing::error!(error = %e, "signal handling unavailable"),
        }
    })
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
///
/// Returns the name of the signal that triggered the shutdown.
#[cfg(unix)]
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("ctrl-c")
}

/// Record daemon-level metrics (build info).
fn record_daemon_metrics() {
    use shoal_core::metrics as m;

    metrics::gauge!(m::DAEMON_BUILD_INFO, "version" => env!("CARGO_PKG_VERSION")).set(1.0);
    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "daemon metrics recorded");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(json: &str) -> ShoalConfig {
        ShoalConfig::parse(json).expect("test config should parse")
    }

    #[test]
    fn test_build_input_requires_selection() {
        // Given: A config without an input selection
        let cfg = config(r#"{"output": "stdout"}"#);

        // Then: No input can be built
        assert!(build_input(&cfg).is_err());
    }

    #[test]
    fn test_build_stdin_input() {
        let cfg = config(r#"{"input": "stdin", "output": "stdout"}"#);
        let input = build_input(&cfg).expect("stdin input should build");
        assert_eq!(input.name(), "stdin");
    }

    #[tokio::test]
    async fn test_build_output_fails_for_unwritable_path() {
        // Given: A file output under a directory that does not exist
        let cfg = config(
            r#"{"input": "stdin", "output": "file",
                "fileConfig": {"outputFile": "/nonexistent/shoal/out.jsonl"}}"#,
        );

        // When: Building the output
        let result = build_output(&cfg).await;

        // Then: The open failure is reported at build time
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_build_classifier_defaults_without_folder() {
        let cfg = config(r#"{"input": "stdin", "output": "stdout"}"#);
        let classifier = build_classifier(&cfg).await.unwrap();
        assert_eq!(classifier.matcher_names(), vec!["json", "example"]);
    }
}
