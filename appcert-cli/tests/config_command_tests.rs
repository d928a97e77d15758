//! Integration tests for `appcert config`.
//!
//! Loads real TOML files the way `config validate` and `config show` do.
//! Every test is serial because loading applies `APPCERT_*` overrides.

use std::fs;

use serial_test::serial;
use tempfile::TempDir;

use appcert_core::config::AppcertConfig;
use appcert_poller::{FaultPolicy, PollConfig};

const FULL_CONFIG: &str = r#"
[general]
log_level = "debug"
log_format = "json"

[target]
host = "10.0.0.5"
user = "root"
port = 2222
connect_timeout_secs = 5
command_timeout_secs = 30
ssh_options = ["ServerAliveInterval=5"]

[poll]
timeout_secs = 300
interval_secs = 10
fault_policy = "retry"

[suites]
dir = "suites"
fail_fast = true

[params]
ONEAPP_RABBITMQ_PORT = "5672"
"#;

fn write_config(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).expect("should write config");
    path
}

#[tokio::test]
#[serial]
async fn test_config_validate_valid_toml() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = write_config(&temp_dir, "appcert.toml", FULL_CONFIG);

    let config = AppcertConfig::load(&path)
        .await
        .expect("valid config should load");

    assert_eq!(config.general.log_format, "json");
    assert_eq!(config.target.port, 2222);
    assert!(config.suites.fail_fast);
    assert_eq!(config.params["ONEAPP_RABBITMQ_PORT"], "5672");
}

#[tokio::test]
#[serial]
async fn test_config_empty_file_uses_defaults() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = write_config(&temp_dir, "empty.toml", "");

    let config = AppcertConfig::load(&path)
        .await
        .expect("empty config should load");

    assert_eq!(config.general.log_format, "pretty");
    assert_eq!(config.poll.timeout_secs, 60);
    assert_eq!(config.poll.interval_secs, 5);
    assert_eq!(config.suites.dir, "suites");
}

#[tokio::test]
#[serial]
async fn test_config_validate_malformed_toml() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = write_config(&temp_dir, "bad.toml", "[poll\ntimeout_secs = 5\n");

    let err = AppcertConfig::load(&path).await.unwrap_err();
    assert!(err.to_string().contains("failed to parse config"));
}

#[tokio::test]
#[serial]
async fn test_config_validate_missing_file() {
    let err = AppcertConfig::load("/nonexistent/appcert.toml")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("not found"));
}

#[tokio::test]
#[serial]
async fn test_config_zero_interval_rejected() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = write_config(&temp_dir, "appcert.toml", "[poll]\ninterval_secs = 0\n");

    let err = AppcertConfig::load(&path).await.unwrap_err();
    assert!(err.to_string().contains("poll.interval_secs"));
}

#[tokio::test]
#[serial]
async fn test_config_unknown_fault_policy_rejected() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = write_config(&temp_dir, "appcert.toml", "[poll]\nfault_policy = \"ignore\"\n");

    let err = AppcertConfig::load(&path).await.unwrap_err();
    assert!(err.to_string().contains("poll.fault_policy"));
}

#[tokio::test]
#[serial]
async fn test_config_invalid_param_name_rejected() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = write_config(
        &temp_dir,
        "appcert.toml",
        "[params]\n\"ONEAPP-PORT\" = \"1\"\n",
    );

    let err = AppcertConfig::load(&path).await.unwrap_err();
    assert!(err.to_string().contains("ONEAPP-PORT"));
}

#[tokio::test]
#[serial]
async fn test_env_overrides_file_values() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = write_config(&temp_dir, "appcert.toml", FULL_CONFIG);

    // SAFETY: serial tests do not touch the environment concurrently.
    unsafe {
        std::env::set_var("APPCERT_TARGET_HOST", "192.168.150.100");
        std::env::set_var("APPCERT_PARAM_ONEAPP_RABBITMQ_PORT", "5673");
    }
    let result = AppcertConfig::load(&path).await;
    unsafe {
        std::env::remove_var("APPCERT_TARGET_HOST");
        std::env::remove_var("APPCERT_PARAM_ONEAPP_RABBITMQ_PORT");
    }

    let config = result.expect("config should load");
    assert_eq!(config.target.host, "192.168.150.100");
    assert_eq!(config.params["ONEAPP_RABBITMQ_PORT"], "5673");
}

#[tokio::test]
#[serial]
async fn test_poll_section_feeds_poller() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = write_config(&temp_dir, "appcert.toml", FULL_CONFIG);

    let config = AppcertConfig::load(&path).await.expect("config should load");
    let poll = PollConfig::from_core(&config.poll).expect("poll section should convert");

    assert_eq!(poll.timeout.as_secs(), 300);
    assert_eq!(poll.interval.as_secs(), 10);
    assert_eq!(poll.fault_policy, FaultPolicy::Retry);
}

#[tokio::test]
#[serial]
async fn test_effective_config_round_trips_through_toml() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = write_config(&temp_dir, "appcert.toml", FULL_CONFIG);

    let config = AppcertConfig::load(&path).await.expect("config should load");
    let shown = toml::to_string_pretty(&config).expect("config should serialize");
    let reparsed = AppcertConfig::parse(&shown).expect("shown config should parse");

    assert_eq!(reparsed.target.host, config.target.host);
    assert_eq!(reparsed.poll.timeout_secs, config.poll.timeout_secs);
    assert_eq!(reparsed.params, config.params);
}
