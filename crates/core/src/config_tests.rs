// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn defaults_match_spec() {
    let cfg = EngineConfig::default();
    assert_eq!(cfg.concurrency, 3);
    assert_eq!(cfg.per_task_timeout_ms, 600_000);
    assert_eq!(cfg.event_bus_buffer, 256);
    assert_eq!(cfg.max_artifact_bytes, 16 * 1024 * 1024);
    assert_eq!(cfg.max_workflow_artifact_bytes, 256 * 1024 * 1024);
    assert_eq!(cfg.context_max_files, 10);
    assert_eq!(cfg.context_max_dependencies, 5);
}

#[test]
fn load_applies_partial_overrides() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("engine.toml");
    std::fs::write(&path, "concurrency = 8\nmax_artifact_bytes = 1024\n").expect("write");

    let cfg = EngineConfig::load(&path).expect("load");
    assert_eq!(cfg.concurrency, 8);
    assert_eq!(cfg.max_artifact_bytes, 1024);
    assert_eq!(cfg.per_task_timeout_ms, EngineConfig::default().per_task_timeout_ms);
}

#[test]
fn load_missing_file_is_an_error() {
    let err = EngineConfig::load("/nonexistent/path/engine.toml").unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
}

#[test]
fn load_malformed_toml_is_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("engine.toml");
    std::fs::write(&path, "concurrency = [this is not valid").expect("write");

    let err = EngineConfig::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
}

#[test]
fn round_trips_through_toml() {
    let cfg = EngineConfig { concurrency: 7, ..EngineConfig::default() };
    let text = toml::to_string(&cfg).expect("serialize");
    let back: EngineConfig = toml::from_str(&text).expect("deserialize");
    assert_eq!(cfg, back);
}
