//! Unit tests for bootstrap configuration and graceful degradation
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate DUNYA_REDIS_HOST are marked with #[serial].

use dunya_common::config::{
    load_or_default, load_toml_config, resolve_redis_host, TomlConfig, REDIS_HOST_ENV,
};
use serial_test::serial;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_missing_config_file_uses_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("does-not-exist.toml");

    let config = load_or_default(Some(&missing)).unwrap();

    assert!(config.redis_host.is_none());
    assert_eq!(config.logging.level, "info");
    assert!(config.settings.is_empty());
    assert!(config.modules.is_empty());
}

#[test]
fn test_full_config_parses() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("extractors.toml");
    std::fs::write(
        &path,
        r#"
redis_host = "cache.local"

[logging]
level = "debug"
file = "/tmp/dunya/extract.log"

[settings]
verbose = true

[modules.checksum]
block_size = 65536
"#,
    )
    .unwrap();

    let config = load_toml_config(&path).unwrap();

    assert_eq!(config.redis_host.as_deref(), Some("cache.local"));
    assert_eq!(config.logging.level, "debug");
    assert_eq!(
        config.logging.file,
        Some(PathBuf::from("/tmp/dunya/extract.log"))
    );

    let settings = config.module_settings("checksum").unwrap();
    assert_eq!(settings["verbose"], serde_json::json!(true));
    assert_eq!(settings["block_size"], serde_json::json!(65536));
}

#[test]
fn test_malformed_config_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("broken.toml");
    std::fs::write(&path, "redis_host = [unterminated").unwrap();

    let result = load_or_default(Some(&path));
    assert!(result.is_err(), "Malformed TOML should not be silently ignored");
}

#[test]
#[serial]
fn test_redis_host_cli_has_priority() {
    env::set_var(REDIS_HOST_ENV, "env-host");
    let config = TomlConfig {
        redis_host: Some("toml-host".to_string()),
        ..Default::default()
    };

    let host = resolve_redis_host(Some("cli-host"), REDIS_HOST_ENV, &config);
    assert_eq!(host.as_deref(), Some("cli-host"));

    env::remove_var(REDIS_HOST_ENV);
}

#[test]
#[serial]
fn test_redis_host_env_before_toml() {
    env::set_var(REDIS_HOST_ENV, "env-host");
    let config = TomlConfig {
        redis_host: Some("toml-host".to_string()),
        ..Default::default()
    };

    let host = resolve_redis_host(None, REDIS_HOST_ENV, &config);
    assert_eq!(host.as_deref(), Some("env-host"));

    env::remove_var(REDIS_HOST_ENV);
}

#[test]
#[serial]
fn test_redis_host_blank_values_ignored() {
    env::set_var(REDIS_HOST_ENV, "   ");
    let config = TomlConfig {
        redis_host: Some("toml-host".to_string()),
        ..Default::default()
    };

    let host = resolve_redis_host(Some(""), REDIS_HOST_ENV, &config);
    assert_eq!(host.as_deref(), Some("toml-host"));

    env::remove_var(REDIS_HOST_ENV);
}

#[test]
#[serial]
fn test_no_redis_host_anywhere() {
    env::remove_var(REDIS_HOST_ENV);

    let host = resolve_redis_host(None, REDIS_HOST_ENV, &TomlConfig::default());
    assert!(host.is_none());
}
