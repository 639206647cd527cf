// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Config Integration Tests
//!
//! - `test_load_*`: Loading from files in every supported format
//! - `test_validate_*`: Validation rules
//! - `test_env_*`: Environment placeholders and overrides
//!
//! Tests that set environment variables use their own prefix so they can run
//! in parallel.

use std::io::Write;
use std::time::Duration;

use bridge_config::{
    load_config, load_config_str, ConfigError, ConfigFormat, ConfigLoader, LogLevel,
};
use bridge_core::{AddressSpaceError, ClientKind};
use bridge_tests::prelude::*;

fn write_temp(content: &str, suffix: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("Failed to create temp file");
    file.write_all(content.as_bytes()).unwrap();
    file
}

// =============================================================================
// Load
// =============================================================================

#[test]
fn test_load_yaml_file() {
    init_test_logging();
    let file = write_temp(ConfigFixtures::plant_yaml(), ".yaml");

    let config = load_config(file.path()).unwrap();

    assert!(!config.server.enabled);
    assert_eq!(config.sources.len(), 2);
    assert_eq!(config.variable_count(), 2);
    assert_eq!(config.logging.level, LogLevel::Debug);

    let sources = config.resolve_sources().unwrap();
    assert_eq!(sources[0].kind(), ClientKind::Classic);
    assert_eq!(sources[1].kind(), ClientKind::Unified);
    assert_eq!(sources[0], SourceFixtures::classic());

    let simulated = config.get_source(SourceFixtures::CLASSIC_URL).unwrap();
    assert!(simulated.simulated);
    assert_eq!(simulated.initial_values.len(), 2);
}

#[test]
fn test_load_toml_matches_yaml() {
    let yaml = load_config(write_temp(ConfigFixtures::plant_yaml(), ".yaml").path()).unwrap();
    let toml = load_config(write_temp(ConfigFixtures::plant_toml(), ".toml").path()).unwrap();

    assert_eq!(toml.sources, yaml.sources);
    assert_eq!(toml.groups, yaml.groups);
    assert_eq!(toml.supervisor, yaml.supervisor);
}

#[test]
fn test_load_json_file() {
    let json = r#"{
        "sources": [{ "url": "opc.tcp://192.168.0.20:4840" }],
        "groups": [{ "name": "Cooling", "variables": [{ "name": "Switch" }] }]
    }"#;
    let config = load_config(write_temp(json, ".json").path()).unwrap();

    assert_eq!(config.sources.len(), 1);
    assert_eq!(config.groups[0].name, "Cooling");
}

#[test]
fn test_load_defaults_match_supervision_timing() {
    let config = load_config_str("sources: []\n", ConfigFormat::Yaml).unwrap();
    let timing = config.supervisor.to_supervisor_config();

    assert_eq!(timing.interval, Duration::from_secs(10));
    assert_eq!(timing.connect_timeout, Duration::from_secs(5));
    assert_eq!(timing.dispose_timeout, Duration::from_secs(2));
    assert_eq!(timing.shutdown_grace, Duration::from_secs(5));
    assert_eq!(config.server.port, 4840);
}

#[test]
fn test_load_missing_file() {
    let err = load_config("/nonexistent/bridge.yaml").unwrap_err();
    assert!(matches!(err, ConfigError::FileNotFound { .. }));
}

#[test]
fn test_load_unsupported_extension() {
    let file = write_temp("sources: []", ".ini");
    let err = load_config(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::UnsupportedFormat { .. }));
}

#[test]
fn test_load_yaml_syntax_error_reports_line() {
    let file = write_temp("server:\n  enabled: false\nsources: [\n", ".yaml");
    let err = load_config(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { line: Some(_), .. }));
}

#[test]
fn test_load_rejects_unknown_fields() {
    let err = load_config_str("sourcez: []\n", ConfigFormat::Yaml).unwrap_err();
    assert!(err.is_content_error());
}

// =============================================================================
// Validate
// =============================================================================

#[test]
fn test_validate_duplicate_source() {
    let yaml = r#"
sources:
  - url: "opc.tcp://plc:4840"
  - url: "opc.tcp://plc:4840"
"#;
    let err = load_config_str(yaml, ConfigFormat::Yaml).unwrap_err();
    assert!(matches!(err, ConfigError::Validation { field, .. } if field == "sources[1].url"));
}

#[test]
fn test_validate_unknown_family() {
    let yaml = r#"
sources:
  - url: "tcp://plc:502"
    family: modbus
"#;
    let err = load_config_str(yaml, ConfigFormat::Yaml).unwrap_err();
    assert!(matches!(err, ConfigError::Source { .. }));
}

#[test]
fn test_validate_explicit_family_overrides_scheme() {
    let yaml = r#"
sources:
  - url: "opc.tcp://gateway:4840"
    family: ua
"#;
    let config = load_config_str(yaml, ConfigFormat::Yaml).unwrap();
    assert_eq!(config.resolve_sources().unwrap()[0].kind(), ClientKind::Unified);
}

#[test]
fn test_validate_initial_values_require_simulation() {
    let yaml = r#"
sources:
  - url: "opc.tcp://plc:4840"
    initial_values:
      Line.Speed: 3
"#;
    let err = load_config_str(yaml, ConfigFormat::Yaml).unwrap_err();
    assert!(matches!(err, ConfigError::Validation { field, .. } if field == "sources[0].initial_values"));
}

#[test]
fn test_validate_dotted_group_name() {
    let yaml = r#"
groups:
  - name: "Line.1"
"#;
    let err = load_config_str(yaml, ConfigFormat::Yaml).unwrap_err();
    assert!(matches!(err, ConfigError::Validation { field, .. } if field == "groups[0].name"));
}

#[test]
fn test_validate_duplicate_variable() {
    let yaml = r#"
groups:
  - name: Cooling
    variables:
      - name: Switch
      - name: Switch
"#;
    let err = load_config_str(yaml, ConfigFormat::Yaml).unwrap_err();
    assert!(matches!(
        err,
        ConfigError::AddressSpace(AddressSpaceError::DuplicateNode { node_id }) if node_id == "Cooling.Switch"
    ));
}

#[test]
fn test_validate_zero_interval() {
    let yaml = "supervisor:\n  interval_ms: 0\n";
    let err = load_config_str(yaml, ConfigFormat::Yaml).unwrap_err();
    assert!(matches!(err, ConfigError::Validation { .. }));
}

// =============================================================================
// Environment
// =============================================================================

#[test]
fn test_env_placeholders_with_default() {
    std::env::set_var("ITEST_PLACEHOLDER_HOST", "192.168.0.99");
    let yaml = r#"
sources:
  - url: "opc.tcp://${ITEST_PLACEHOLDER_HOST}:${ITEST_PLACEHOLDER_PORT:4841}"
"#;
    let config = ConfigLoader::new()
        .with_env_prefix("ITEST_PLACEHOLDER")
        .load_from_str(yaml, ConfigFormat::Yaml)
        .unwrap();
    std::env::remove_var("ITEST_PLACEHOLDER_HOST");

    assert_eq!(config.sources[0].url, "opc.tcp://192.168.0.99:4841");
}

#[test]
fn test_env_overrides_apply_after_parsing() {
    std::env::set_var("ITEST_OVR_SUPERVISOR_INTERVAL_MS", "2500");
    std::env::set_var("ITEST_OVR_SOURCES_0_SIMULATED", "true");
    std::env::set_var("ITEST_OVR_LOG_LEVEL", "warning");

    let file = write_temp("sources:\n  - url: \"opc.tcp://plc:4840\"\n", ".yaml");
    let config = ConfigLoader::builder()
        .env_prefix("ITEST_OVR")
        .build()
        .load(file.path());

    std::env::remove_var("ITEST_OVR_SUPERVISOR_INTERVAL_MS");
    std::env::remove_var("ITEST_OVR_SOURCES_0_SIMULATED");
    std::env::remove_var("ITEST_OVR_LOG_LEVEL");

    let config = config.unwrap();
    assert_eq!(config.supervisor.interval_ms, 2500);
    assert!(config.sources[0].simulated);
    assert_eq!(config.logging.level, LogLevel::Warn);
}

#[test]
fn test_env_invalid_override_is_reported() {
    std::env::set_var("ITEST_BAD_SERVER_PORT", "not-a-port");
    let result = ConfigLoader::new()
        .with_env_prefix("ITEST_BAD")
        .load_from_str("sources: []\n", ConfigFormat::Yaml);
    std::env::remove_var("ITEST_BAD_SERVER_PORT");

    assert!(matches!(result, Err(ConfigError::InvalidEnvVar { .. })));
}

#[test]
fn test_env_resolution_can_be_disabled() {
    std::env::set_var("ITEST_OFF_SUPERVISOR_INTERVAL_MS", "1");
    let config = ConfigLoader::new()
        .with_env_prefix("ITEST_OFF")
        .with_env_vars(false)
        .load_from_str("sources: []\n", ConfigFormat::Yaml);
    std::env::remove_var("ITEST_OFF_SUPERVISOR_INTERVAL_MS");

    assert_eq!(config.unwrap().supervisor.interval_ms, 10_000);
}
