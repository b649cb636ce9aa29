// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine configuration, loadable from TOML.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Tunables that a workflow submission may override (§4.7, §5), with
/// process-wide defaults loaded from a TOML config file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EngineConfig {
    /// Default concurrent task cap when a workflow doesn't override it.
    pub concurrency: usize,
    /// Per-task timeout bounding a worker+QC call pair (§5).
    pub per_task_timeout_ms: u64,
    /// Bounded per-subscriber event buffer (§4.1).
    pub event_bus_buffer: usize,
    /// Per-artifact content size cap in bytes (§4.4).
    pub max_artifact_bytes: u64,
    /// Total per-workflow artifact byte cap (§4.4).
    pub max_workflow_artifact_bytes: u64,
    /// Default cap on `files` retained in a worker context view (§4.3).
    pub context_max_files: usize,
    /// Default cap on `dependencies` retained in a worker context view (§4.3).
    pub context_max_dependencies: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            concurrency: 3,
            per_task_timeout_ms: 10 * 60 * 1000,
            event_bus_buffer: 256,
            max_artifact_bytes: 16 * 1024 * 1024,
            max_workflow_artifact_bytes: 256 * 1024 * 1024,
            context_max_files: 10,
            context_max_dependencies: 5,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read { path: String, #[source] source: std::io::Error },

    #[error("failed to parse config file {path}: {source}")]
    Parse { path: String, #[source] source: toml::de::Error },
}

impl EngineConfig {
    /// Load config from a TOML file, falling back to defaults for any field
    /// the file omits (`#[serde(default)]` on every field).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
