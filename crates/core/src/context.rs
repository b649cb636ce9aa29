// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Context entities: the inputs and outputs of the context filter (§3, §4.3).
//!
//! The filtering policy itself lives in `orc-engine`; this module only
//! defines the shapes the filter reads and produces, so that `orc-core`
//! remains the single source of truth for the data model.

use serde::{Deserialize, Serialize};

use crate::execution::TaskStatus;
use crate::task::TaskId;

/// Which agent a context view is being prepared for (§4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    Pm,
    Worker,
    Qc,
}

/// Everything known about a task's place in the project, before filtering
/// (§3 "Context entities"). Produced by the caller, not by the core itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullContext {
    pub task_id: TaskId,
    pub title: String,
    pub requirements: String,
    pub description: String,
    pub files: Vec<String>,
    pub dependencies: Vec<TaskId>,
    pub status: TaskStatus,
    pub priority: u32,
    pub research: Option<String>,
    pub planning_notes: Option<String>,
    pub all_files: Option<Vec<String>>,
    pub full_subgraph: Option<String>,
}

/// The reduced view a worker agent receives (§3, §4.3 policy).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerContext {
    pub task_id: TaskId,
    pub title: String,
    pub requirements: String,
    pub description: String,
    pub files: Vec<String>,
    pub dependencies: Vec<TaskId>,
    pub status: TaskStatus,
    pub priority: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempt_number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_context: Option<String>,
}

/// The worker view plus the fields a QC agent additionally needs (§3, §4.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QcContext {
    #[serde(flatten)]
    pub worker: WorkerContext,
    pub original_requirements: String,
    pub verification_criteria: Vec<String>,
    pub worker_output: String,
}

/// Tunable caps and flags passed to the context filter (§4.3).
#[derive(Debug, Clone, Copy)]
pub struct FilterOptions {
    pub max_files: usize,
    pub max_dependencies: usize,
    pub include_error_context: bool,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self { max_files: 10, max_dependencies: 5, include_error_context: false }
    }
}

/// Size/field accounting returned by `metrics()` (§4.3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterMetrics {
    pub original_size: u64,
    pub filtered_size: u64,
    pub reduction_percent: f64,
    pub fields_removed: Vec<String>,
    pub fields_retained: Vec<String>,
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
