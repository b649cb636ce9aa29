// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Incremental, idempotent writes of execution telemetry through the graph
//! interface (§4.8, §6).

use orc_adapters::{GraphError, GraphStore, Props};
use orc_core::{ExecutionId, ExecutionProgress, ExecutionResult, ExecutionStatus, TaskOutcome};
use serde_json::json;
use thiserror::Error;
use tracing::instrument;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PersistError {
    #[error(transparent)]
    Graph(#[from] GraphError),
}

fn task_execution_id(execution_id: &ExecutionId, task_id: &str) -> String {
    format!("{execution_id}-{task_id}")
}

/// Writes against the `GraphStore` interface (§6 "Persisted state layout").
/// Every method here may fail; callers (the workflow runner) are expected to
/// log and emit `persistError` rather than propagate the failure into task
/// or workflow status (§4.8, §7).
pub struct Persister<G: GraphStore> {
    store: G,
}

impl<G: GraphStore> Persister<G> {
    pub fn new(store: G) -> Self {
        Self { store }
    }

    /// `Create execution` (§4.8). Re-issuing with the same arguments is a
    /// no-op at the store level because `create_node` on an existing id
    /// merges rather than overwrites (§6).
    #[instrument(skip(self), fields(execution_id = %execution_id))]
    pub async fn create_execution(
        &self,
        execution_id: &ExecutionId,
        tasks_total: usize,
        start_time_ms: u64,
    ) -> Result<(), PersistError> {
        let mut props = Props::new();
        props.insert("id".into(), json!(execution_id.as_str()));
        props.insert("status".into(), json!("running"));
        props.insert("tasksTotal".into(), json!(tasks_total));
        props.insert("tasksSuccessful".into(), json!(0));
        props.insert("tasksFailed".into(), json!(0));
        props.insert("tokensInput".into(), json!(0));
        props.insert("tokensOutput".into(), json!(0));
        props.insert("tokensTotal".into(), json!(0));
        props.insert("toolCalls".into(), json!(0));
        props.insert("startTime".into(), json!(start_time_ms));

        self.store.create_node("orchestration_execution", props).await?;
        Ok(())
    }

    /// `Upsert task execution` (§4.8). Also creates `HAS_TASK`, and
    /// `FAILED_TASK` when the task failed (§6 "Edges").
    #[instrument(skip(self, result), fields(execution_id = %execution_id, task_id = %result.task_id))]
    pub async fn upsert_task_execution(
        &self,
        execution_id: &ExecutionId,
        result: &ExecutionResult,
    ) -> Result<(), PersistError> {
        let node_id = task_execution_id(execution_id, result.task_id.as_str());

        let mut props = Props::new();
        props.insert("id".into(), json!(node_id));
        props.insert("executionId".into(), json!(execution_id.as_str()));
        props.insert("taskId".into(), json!(result.task_id.as_str()));
        props.insert(
            "status".into(),
            json!(match result.status {
                TaskOutcome::Success => "success",
                TaskOutcome::Failure => "failure",
            }),
        );
        props.insert("output".into(), json!(result.output));
        if let Some(error) = &result.error {
            props.insert("error".into(), json!(error));
        }
        props.insert("duration".into(), json!(result.duration_ms));
        props.insert("attemptNumber".into(), json!(result.attempt_number));
        props.insert("tokensInput".into(), json!(result.tokens.input));
        props.insert("tokensOutput".into(), json!(result.tokens.output));
        props.insert("toolCalls".into(), json!(result.tool_calls));
        if let Some(qc) = &result.qc_verification {
            props.insert("qcPassed".into(), json!(qc.passed));
            props.insert("qcScore".into(), json!(qc.score));
            props.insert("qcFeedback".into(), json!(qc.feedback));
            props.insert("qcIssues".into(), json!(qc.issues));
            props.insert("qcRequiredFixes".into(), json!(qc.required_fixes));
        }

        self.store.create_node("task_execution", props).await?;
        self.store
            .create_edge(execution_id.as_str(), &node_id, "HAS_TASK", Props::new())
            .await?;
        if matches!(result.status, TaskOutcome::Failure) {
            self.store
                .create_edge(execution_id.as_str(), &node_id, "FAILED_TASK", Props::new())
                .await?;
        }
        Ok(())
    }

    /// `Update execution progress` (§4.8): writes the current absolute
    /// aggregate counters and flips `status` to `failed` the first time any
    /// task fails. Called with the execution's recomputed `progress()` after
    /// every task's terminal transition; writing the same snapshot twice is
    /// naturally idempotent since it carries absolute values, not deltas.
    #[instrument(skip(self, progress), fields(execution_id = %execution_id))]
    pub async fn update_execution_progress(
        &self,
        execution_id: &ExecutionId,
        progress: &ExecutionProgress,
    ) -> Result<(), PersistError> {
        let mut props = Props::new();
        props.insert("tasksSuccessful".into(), json!(progress.tasks_successful));
        props.insert("tasksFailed".into(), json!(progress.tasks_failed));
        props.insert("tokensInput".into(), json!(progress.tokens.input));
        props.insert("tokensOutput".into(), json!(progress.tokens.output));
        props.insert("tokensTotal".into(), json!(progress.tokens.total()));
        props.insert("toolCalls".into(), json!(progress.tool_calls));
        if progress.tasks_failed > 0 {
            props.insert("status".into(), json!("failed"));
        }
        self.store.update_node(execution_id.as_str(), props).await?;
        Ok(())
    }

    /// `Finalize execution` (§4.8): writes `endTime`, `duration`, and the
    /// final workflow status exactly once per execution.
    #[instrument(skip(self), fields(execution_id = %execution_id))]
    pub async fn finalize_execution(
        &self,
        execution_id: &ExecutionId,
        status: ExecutionStatus,
        end_time_ms: u64,
        duration_ms: u64,
    ) -> Result<(), PersistError> {
        let mut props = Props::new();
        props.insert("status".into(), json!(status.to_string()));
        props.insert("endTime".into(), json!(end_time_ms));
        props.insert("duration".into(), json!(duration_ms));
        self.store.update_node(execution_id.as_str(), props).await?;
        Ok(())
    }

    pub async fn close(&self) -> Result<(), PersistError> {
        self.store.close().await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "persister_tests.rs"]
mod tests;
