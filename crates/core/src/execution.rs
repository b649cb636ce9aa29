// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-workflow execution state (§3 "Execution state", "Lifecycle").

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use thiserror::Error;

use crate::artifact::{Artifact, DeliverableSet};
use crate::result::{ExecutionResult, TaskOutcome, TokenUsage};
use crate::task::TaskId;

/// Identifies one run of one workflow. The human-readable `exec-<epoch_ms>`
/// form from §3 is kept, with a random suffix appended so that two
/// executions started within the same millisecond still get distinct ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionId(SmolStr);

impl ExecutionId {
    pub fn generate(epoch_ms: u64) -> Self {
        Self(SmolStr::new(format!("exec-{epoch_ms}-{}", nanoid::nanoid!(6))))
    }

    pub fn from_string(id: impl AsRef<str>) -> Self {
        Self(SmolStr::new(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::borrow::Borrow<str> for ExecutionId {
    fn borrow(&self) -> &str {
        self.0.as_str()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Running,
    Completed,
    Failed,
    Cancelled,
}

crate::simple_display! {
    ExecutionStatus {
        Running => "running",
        Completed => "completed",
        Failed => "failed",
        Cancelled => "cancelled",
    }
}

/// A task's position in the strict lattice `pending -> executing ->
/// (completed | failed)` (§3 "Lifecycle").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Executing,
    Completed,
    Failed,
}

crate::simple_display! {
    TaskStatus {
        Pending => "pending",
        Executing => "executing",
        Completed => "completed",
        Failed => "failed",
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    fn allows(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Executing)
                | (Self::Executing, Self::Completed)
                | (Self::Executing, Self::Failed)
        )
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TaskTransitionError {
    #[error("unknown task id: {0}")]
    UnknownTask(String),
    #[error("invalid transition for task {task}: {from} -> {to}")]
    InvalidTransition { task: String, from: TaskStatus, to: TaskStatus },
}

/// Audit-trail entry appended on every `taskStatuses` transition. Never read
/// by the scheduler; the strict lattice in §3 is the governing invariant,
/// this is purely additive instrumentation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskHistoryEntry {
    pub task_id: TaskId,
    pub status: TaskStatus,
    pub entered_at_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionState {
    pub execution_id: ExecutionId,
    pub status: ExecutionStatus,
    task_statuses: IndexMap<TaskId, TaskStatus>,
    pub current_task_id: Option<TaskId>,
    pub results: Vec<ExecutionResult>,
    pub deliverables: DeliverableSet,
    pub start_time: u64,
    pub end_time: Option<u64>,
    pub error: Option<String>,
    pub cancelled: bool,
    pub history: Vec<TaskHistoryEntry>,
}

impl ExecutionState {
    /// Create a fresh state with every task seeded `pending`, in the order
    /// they were submitted (§3 "Lifecycle": created once, at workflow start).
    pub fn new(execution_id: ExecutionId, task_ids: impl IntoIterator<Item = TaskId>, start_time: u64) -> Self {
        let task_statuses = task_ids.into_iter().map(|id| (id, TaskStatus::Pending)).collect();
        Self {
            execution_id,
            status: ExecutionStatus::Running,
            task_statuses,
            current_task_id: None,
            results: Vec::new(),
            deliverables: DeliverableSet::new(),
            start_time,
            end_time: None,
            error: None,
            cancelled: false,
            history: Vec::new(),
        }
    }

    pub fn task_status(&self, id: &TaskId) -> Option<TaskStatus> {
        self.task_statuses.get(id).copied()
    }

    pub fn task_statuses(&self) -> impl Iterator<Item = (&TaskId, TaskStatus)> {
        self.task_statuses.iter().map(|(id, status)| (id, *status))
    }

    pub fn all_terminal(&self) -> bool {
        self.task_statuses.values().all(|status| status.is_terminal())
    }

    pub fn executing_count(&self) -> usize {
        self.task_statuses.values().filter(|s| **s == TaskStatus::Executing).count()
    }

    /// Advance a task's status, enforcing the strict lattice in §3. Appends
    /// a `TaskHistoryEntry` on success.
    pub fn transition_task(
        &mut self,
        id: &TaskId,
        next: TaskStatus,
        now_ms: u64,
    ) -> Result<(), TaskTransitionError> {
        let current = *self
            .task_statuses
            .get(id)
            .ok_or_else(|| TaskTransitionError::UnknownTask(id.to_string()))?;
        if !current.allows(next) {
            return Err(TaskTransitionError::InvalidTransition { task: id.to_string(), from: current, to: next });
        }
        self.task_statuses.insert(id.clone(), next);
        if next == TaskStatus::Executing {
            self.current_task_id = Some(id.clone());
        }
        self.history.push(TaskHistoryEntry { task_id: id.clone(), status: next, entered_at_ms: now_ms });
        Ok(())
    }

    /// Append a finished task's result. Only valid while `running` (§3
    /// "Lifecycle": append-only during running, frozen after terminal).
    pub fn record_result(&mut self, result: ExecutionResult) {
        self.results.push(result);
    }

    pub fn add_artifact(&mut self, artifact: Artifact) -> bool {
        self.deliverables.upsert(artifact)
    }

    /// Set the cancellation latch. Idempotent (§5, §8): a second call is a
    /// no-op observable only in that it returns `false`.
    pub fn cancel(&mut self) -> bool {
        if self.cancelled {
            return false;
        }
        self.cancelled = true;
        true
    }

    /// Move to a terminal workflow status exactly once (§3: `endTime` set
    /// exactly once on terminal transition).
    pub fn finalize(&mut self, status: ExecutionStatus, end_time: u64, error: Option<String>) {
        if self.end_time.is_some() {
            return;
        }
        self.status = status;
        self.end_time = Some(end_time);
        self.error = error;
    }

    pub fn is_finalized(&self) -> bool {
        self.end_time.is_some()
    }

    /// Aggregate counters derived from `results` (§4.8 "Update execution
    /// progress"). The persister writes these as absolute totals rather
    /// than deltas, since the narrow graph interface (§6) has no read
    /// operation to accumulate against.
    pub fn progress(&self) -> ExecutionProgress {
        let mut progress = ExecutionProgress::default();
        for result in &self.results {
            match result.status {
                TaskOutcome::Success => progress.tasks_successful += 1,
                TaskOutcome::Failure => progress.tasks_failed += 1,
            }
            progress.tokens.add(result.tokens);
            progress.tool_calls += result.tool_calls;
        }
        progress
    }
}

/// Absolute aggregate counters for one execution (§6 `orchestration_execution`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionProgress {
    pub tasks_successful: u32,
    pub tasks_failed: u32,
    pub tokens: TokenUsage,
    pub tool_calls: u32,
}

#[cfg(test)]
#[path = "execution_tests.rs"]
mod tests;
