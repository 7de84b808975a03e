//! Orchestrator integration tests.
//!
//! Tests the full flow: config -> adapter assembly -> run -> summary.

use std::fs;
use std::path::Path;

use shoal_core::config::ShoalConfig;
use shoal_daemon::orchestrator::Orchestrator;

/// Lay out input, rule and event-type folders under `root` and return the config.
fn file_config(root: &Path, input: &str) -> ShoalConfig {
    let rules = root.join("rules");
    let event_types = root.join("event-types");
    fs::create_dir_all(&rules).unwrap();
    fs::create_dir_all(&event_types).unwrap();
    fs::write(rules.join("length.yml"), "rule: length\n").unwrap();
    fs::write(event_types.join("example.yml"), "event_type: example\n").unwrap();
    fs::write(root.join("input.log"), input).unwrap();

    let json = serde_json::json!({
        "general": { "log_level": "info", "log_format": "json" },
        "input": "file",
        "output": "file",
        "fileConfig": {
            "inputFile": root.join("input.log"),
            "outputFile": root.join("output.jsonl"),
        },
        "RuleFolder": rules,
        "EventTypeFolder": event_types,
    });
    ShoalConfig::parse(&json.to_string()).expect("test config should parse")
}

#[tokio::test]
async fn test_file_to_file_run() {
    // Given: An input file with messages of different lengths
    let dir = tempfile::tempdir().unwrap();
    let config = file_config(dir.path(), "a\nbb\nc\n");

    // When: Building and running the orchestrator
    let orchestrator = Orchestrator::build_from_config(config).await.unwrap();
    let summary = orchestrator.run().await.unwrap();

    // Then: Only single-character messages are written
    assert_eq!(summary.messages_received, 3);
    assert_eq!(summary.records_written, 2);
    let output = fs::read_to_string(dir.path().join("output.jsonl")).unwrap();
    let texts: Vec<String> = output
        .lines()
        .map(|l| {
            let v: serde_json::Value = serde_json::from_str(l).unwrap();
            v["payload"]["Str"].as_str().unwrap().to_owned()
        })
        .collect();
    assert_eq!(texts, vec!["a", "c"]);
}

#[tokio::test]
async fn test_missing_input_file_is_fatal() {
    // Given: A config pointing at an input file that does not exist
    let dir = tempfile::tempdir().unwrap();
    let mut config = file_config(dir.path(), "");
    config.file_config.input_file = Some(dir.path().join("missing.log").display().to_string());

    // When: Running
    let orchestrator = Orchestrator::build_from_config(config).await.unwrap();
    let result = orchestrator.run().await;

    // Then: Input initialization failure aborts the run
    let err = result.unwrap_err().to_string();
    assert!(err.contains("init failed"), "unexpected error: {err}");
}

#[tokio::test]
async fn test_missing_rule_folder_is_fatal() {
    // Given: A rule folder that does not exist
    let dir = tempfile::tempdir().unwrap();
    let mut config = file_config(dir.path(), "a\n");
    config.rule_folder = Some(dir.path().join("no-rules").display().to_string());

    // When: Running
    let orchestrator = Orchestrator::build_from_config(config).await.unwrap();

    // Then: The run fails before processing anything
    assert!(orchestrator.run().await.is_err());
}

#[tokio::test]
async fn test_missing_event_type_folder_fails_build() {
    // Given: An event type folder that does not exist
    let dir = tempfile::tempdir().unwrap();
    let mut config = file_config(dir.path(), "a\n");
    config.event_type_folder = Some(dir.path().join("no-types").display().to_string());

    // Then: Building the orchestrator fails
    assert!(Orchestrator::build_from_config(config).await.is_err());
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    // Given: A config without input/output selection
    let config = ShoalConfig::parse("{}").unwrap();

    // Then: Validation rejects it before any adapter is built
    let err = Orchestrator::build_from_config(config).await.err().unwrap();
    assert!(err.to_string().contains("config validation failed"));
}

#[tokio::test]
async fn test_build_from_path() {
    // Given: A config file on disk
    let dir = tempfile::tempdir().unwrap();
    let config = file_config(dir.path(), "a\n");
    let path = dir.path().join("shoal.json");
    fs::write(&path, serde_json::to_string(&config).unwrap()).unwrap();

    // When: Building from the path
    let orchestrator = Orchestrator::build(&path).await.unwrap();

    // Then: The loaded config matches
    assert_eq!(orchestrator.config().rule_folder, config.rule_folder);
}

#[tokio::test]
async fn test_shutdown_token_stops_run() {
    // Given: Shutdown requested before the run starts
    let dir = tempfile::tempdir().unwrap();
    let config = file_config(dir.path(), "a\nb\n");
    let orchestrator = Orchestrator::build_from_config(config).await.unwrap();
    orchestrator.shutdown_token().cancel();

    // When: Running with shutdown already requested
    let summary = orchestrator.run().await.unwrap();

    // Then: No messages are ingested
    assert_eq!(summary.messages_received, 0);
}
