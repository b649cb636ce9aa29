// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Progress events published on the event bus (§4.1, §5, §7).

use serde::{Deserialize, Serialize};

use crate::execution::{ExecutionId, ExecutionStatus};
use crate::result::{ExecutionResult, QcVerification};
use crate::task::TaskId;

/// One progress event. `kind` is carried by the serde tag so the wire shape
/// matches §4.1's `{executionId, kind, payload, timestamp}` while staying a
/// closed Rust enum internally.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all_fields = "camelCase")]
pub enum Event {
    #[serde(rename = "workflowStarted")]
    WorkflowStarted { execution_id: ExecutionId, timestamp_ms: u64, task_count: usize },

    #[serde(rename = "taskStarted")]
    TaskStarted { execution_id: ExecutionId, timestamp_ms: u64, task_id: TaskId },

    #[serde(rename = "taskProgress")]
    TaskProgress { execution_id: ExecutionId, timestamp_ms: u64, task_id: TaskId, message: String },

    #[serde(rename = "taskCompleted")]
    TaskCompleted { execution_id: ExecutionId, timestamp_ms: u64, task_id: TaskId, result: ExecutionResult },

    #[serde(rename = "taskFailed")]
    TaskFailed { execution_id: ExecutionId, timestamp_ms: u64, task_id: TaskId, result: ExecutionResult },

    #[serde(rename = "qcStarted")]
    QcStarted { execution_id: ExecutionId, timestamp_ms: u64, task_id: TaskId, attempt_number: u32 },

    #[serde(rename = "qcCompleted")]
    QcCompleted {
        execution_id: ExecutionId,
        timestamp_ms: u64,
        task_id: TaskId,
        attempt_number: u32,
        verification: QcVerification,
    },

    #[serde(rename = "artifactCaptured")]
    ArtifactCaptured {
        execution_id: ExecutionId,
        timestamp_ms: u64,
        filename: String,
        size: u64,
        replaced: bool,
    },

    #[serde(rename = "workflowCompleted")]
    WorkflowCompleted { execution_id: ExecutionId, timestamp_ms: u64, status: ExecutionStatus },

    #[serde(rename = "workflowCancelled")]
    WorkflowCancelled { execution_id: ExecutionId, timestamp_ms: u64 },

    #[serde(rename = "persistError")]
    PersistError { execution_id: ExecutionId, timestamp_ms: u64, message: String },
}

impl Event {
    pub fn execution_id(&self) -> &ExecutionId {
        match self {
            Self::WorkflowStarted { execution_id, .. }
            | Self::TaskStarted { execution_id, .. }
            | Self::TaskProgress { execution_id, .. }
            | Self::TaskCompleted { execution_id, .. }
            | Self::TaskFailed { execution_id, .. }
            | Self::QcStarted { execution_id, .. }
            | Self::QcCompleted { execution_id, .. }
            | Self::ArtifactCaptured { execution_id, .. }
            | Self::WorkflowCompleted { execution_id, .. }
            | Self::WorkflowCancelled { execution_id, .. }
            | Self::PersistError { execution_id, .. } => execution_id,
        }
    }

    pub fn timestamp_ms(&self) -> u64 {
        match self {
            Self::WorkflowStarted { timestamp_ms, .. }
            | Self::TaskStarted { timestamp_ms, .. }
            | Self::TaskProgress { timestamp_ms, .. }
            | Self::TaskCompleted { timestamp_ms, .. }
            | Self::TaskFailed { timestamp_ms, .. }
            | Self::QcStarted { timestamp_ms, .. }
            | Self::QcCompleted { timestamp_ms, .. }
            | Self::ArtifactCaptured { timestamp_ms, .. }
            | Self::WorkflowCompleted { timestamp_ms, .. }
            | Self::WorkflowCancelled { timestamp_ms, .. }
            | Self::PersistError { timestamp_ms, .. } => *timestamp_ms,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::WorkflowStarted { .. } => "workflowStarted",
            Self::TaskStarted { .. } => "taskStarted",
            Self::TaskProgress { .. } => "taskProgress",
            Self::TaskCompleted { .. } => "taskCompleted",
            Self::TaskFailed { .. } => "taskFailed",
            Self::QcStarted { .. } => "qcStarted",
            Self::QcCompleted { .. } => "qcCompleted",
            Self::ArtifactCaptured { .. } => "artifactCaptured",
            Self::WorkflowCompleted { .. } => "workflowCompleted",
            Self::WorkflowCancelled { .. } => "workflowCancelled",
            Self::PersistError { .. } => "persistError",
        }
    }
}

/// What a subscriber actually receives: the event plus how many events were
/// dropped for this subscription since the last delivery (§4.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    pub event: Event,
    pub dropped_since_last: u64,
}

/// A subscriber's filter (§4.1, §6 `subscribe({executionId?, kinds?})`).
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub execution_id: Option<ExecutionId>,
    pub kinds: Option<Vec<String>>,
}

impl EventFilter {
    pub fn matches(&self, event: &Event) -> bool {
        if let Some(execution_id) = &self.execution_id {
            if execution_id != event.execution_id() {
                return false;
            }
        }
        if let Some(kinds) = &self.kinds {
            if !kinds.iter().any(|k| k == event.kind()) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
