//! Configuration tests from the daemon's point of view.
//!
//! Tests file loading, environment overrides and validation paths that the
//! daemon relies on before any adapter is built.

use std::env;
use std::fs;

use serial_test::serial;

use shoal_core::config::{InputKind, OutputKind, ShoalConfig};

const EXAMPLE: &str = include_str!("../../shoal.json.example");

#[tokio::test]
#[serial]
async fn test_env_overrides_select_adapters() {
    // Given: A file-based config on disk and env overrides switching to stdio
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shoal.json");
    fs::write(&path, EXAMPLE).unwrap();

    // SAFETY: serialized test, no other thread reads the environment
    unsafe {
        env::set_var("SHOAL_INPUT", "stdin");
        env::set_var("SHOAL_OUTPUT", "stdout");
    }

    // When: Loading
    let result = ShoalConfig::load(&path).await;

    unsafe {
        env::remove_var("SHOAL_INPUT");
        env::remove_var("SHOAL_OUTPUT");
    }

    // Then: Environment wins over the file
    let config = result.expect("config should load");
    assert_eq!(config.input, Some(InputKind::Stdin));
    assert_eq!(config.output, Some(OutputKind::Stdout));
}

#[tokio::test]
#[serial]
async fn test_invalid_capacity_from_env_is_rejected() {
    // Given: A queue capacity override above the maximum
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shoal.json");
    fs::write(&path, EXAMPLE).unwrap();

    unsafe {
        env::set_var("SHOAL_PIPELINE_RULE_QUEUE_CAPACITY", "1000000");
    }
    let result = ShoalConfig::load(&path).await;
    unsafe {
        env::remove_var("SHOAL_PIPELINE_RULE_QUEUE_CAPACITY");
    }

    // Then: Loading fails validation
    assert!(result.is_err());
}

#[tokio::test]
async fn test_missing_config_file() {
    // When: Loading a path that does not exist
    let result = ShoalConfig::load("/nonexistent/shoal/shoal.json").await;

    // Then: A config error is returned
    assert!(result.is_err());
}
