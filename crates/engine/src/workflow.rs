// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Top-level coordinator: validates a submission, creates and registers an
//! `ExecutionState`, wires the scheduler to the QC loop and the artifact
//! collector, and finalizes (C9, §4.9).

use std::sync::Arc;

use orc_adapters::{AgentRuntime, GraphStore};
use orc_core::{
    Clock, EngineConfig, Event, ExecutionId, ExecutionState, ExecutionStatus, FullContext, Task, TaskSet, TaskStatus,
    ValidationError,
};
use orc_storage::Persister;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{instrument, warn};

use crate::artifacts::ArtifactCollector;
use crate::bus::EventBus;
use crate::context_filter::ContextFilter;
use crate::qc_loop::QcLoop;
use crate::registry::Registry;
use crate::scheduler::Scheduler;

/// Everything a workflow submission may override (§4.9, §3 "Workflow
/// submission (input format)"). `None` fields fall back to the process-wide
/// `EngineConfig`.
#[derive(Debug, Clone, Default)]
pub struct WorkflowOptions {
    pub concurrency: Option<usize>,
    /// Overrides `EngineConfig::per_task_timeout_ms` for this submission;
    /// bounds each worker call and each QC call individually (§5).
    pub per_task_timeout_ms: Option<u64>,
    /// Carried for parity with the submission format (§6); no consumer in
    /// this crate layout since the artifact collector never touches a
    /// filesystem.
    pub workflow_root: Option<String>,
}

/// Ties C1–C8 together for one workflow run (§4.9). Cheap to clone: every
/// field is itself a handle (`Arc`/`Clone` wrapper) shared with the rest of
/// the process — cloning and moving a copy into the background task that
/// drives a submission is the intended way to use this type.
pub struct WorkflowRunner<R, G, C> {
    registry: Registry,
    bus: EventBus,
    persister: Arc<Persister<G>>,
    qc_loop: Arc<QcLoop<R>>,
    artifacts: ArtifactCollector,
    clock: C,
    config: EngineConfig,
}

impl<R, G, C: Clone> Clone for WorkflowRunner<R, G, C> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            bus: self.bus.clone(),
            persister: self.persister.clone(),
            qc_loop: self.qc_loop.clone(),
            artifacts: self.artifacts,
            clock: self.clock.clone(),
            config: self.config.clone(),
        }
    }
}

impl<R, G, C> WorkflowRunner<R, G, C>
where
    R: AgentRuntime,
    G: GraphStore,
    C: Clock + 'static,
{
    pub fn new(
        registry: Registry,
        bus: EventBus,
        persister: Persister<G>,
        qc_loop: QcLoop<R>,
        artifacts: ArtifactCollector,
        clock: C,
        config: EngineConfig,
    ) -> Self {
        Self {
            registry,
            bus,
            persister: Arc::new(persister),
            qc_loop: Arc::new(qc_loop),
            artifacts,
            clock,
            config,
        }
    }

    /// Validate and start a workflow (§4.9 steps 1–3). Returns the fresh
    /// `executionId` synchronously, without waiting for any task to run
    /// (§6 "The runner returns an executionId synchronously"); the run
    /// itself proceeds on a spawned task via `drive`, observable through
    /// the event bus or by querying the registry.
    #[instrument(skip(self, tasks), fields(task_count = tasks.len()))]
    pub async fn start(
        &self,
        tasks: Vec<Task>,
        options: WorkflowOptions,
    ) -> Result<(ExecutionId, CancellationToken), ValidationError> {
        let task_set = TaskSet::validate(tasks)?;
        let start_time_ms = self.clock.epoch_ms();
        let execution_id = ExecutionId::generate(start_time_ms);

        let state = self.registry.register(ExecutionState::new(
            execution_id.clone(),
            task_set.tasks().iter().map(|t| t.id.clone()),
            start_time_ms,
        ));

        if let Err(err) = self.persister.create_execution(&execution_id, task_set.len(), start_time_ms).await {
            self.emit_persist_error(&execution_id, &err.to_string());
        }
        self.bus.publish(Event::WorkflowStarted {
            execution_id: execution_id.clone(),
            timestamp_ms: start_time_ms,
            task_count: task_set.len(),
        });

        let cancel = CancellationToken::new();
        let concurrency = options.concurrency.unwrap_or(self.config.concurrency);
        let per_task_timeout_ms = options.per_task_timeout_ms.unwrap_or(self.config.per_task_timeout_ms);

        let this = self.clone();
        let spawned_execution_id = execution_id.clone();
        let spawned_cancel = cancel.clone();
        tokio::spawn(async move {
            this.drive(spawned_execution_id, task_set, state, concurrency, per_task_timeout_ms, spawned_cancel).await;
        });

        Ok((execution_id, cancel))
    }

    /// Drives the scheduler to completion and finalizes (§4.9 steps 4–5).
    /// Takes ownership of nothing the caller needs back: progress is
    /// observed through the event bus or by querying the registry.
    async fn drive(
        &self,
        execution_id: ExecutionId,
        task_set: TaskSet,
        state: Arc<Mutex<ExecutionState>>,
        concurrency: usize,
        per_task_timeout_ms: u64,
        cancel: CancellationToken,
    ) {
        let qc_loop = self.qc_loop.clone();
        let artifacts = self.artifacts;
        let persister = self.persister.clone();
        let bus = self.bus.clone();
        let clock = self.clock.clone();
        let state_for_dispatch = state.clone();
        let execution_id_for_dispatch = execution_id.clone();

        let dispatch = move |task: Task, task_cancel: CancellationToken| {
            let qc_loop = qc_loop.clone();
            let artifacts = artifacts;
            let persister = persister.clone();
            let bus = bus.clone();
            let clock = clock.clone();
            let state = state_for_dispatch.clone();
            let execution_id = execution_id_for_dispatch.clone();

            async move {
                let full_context = build_full_context(&task);
                let timestamp_ms = clock.epoch_ms();
                let mut result = qc_loop
                    .run_task(&execution_id, &task, &full_context, timestamp_ms, per_task_timeout_ms, task_cancel)
                    .await;

                let workflow_bytes_so_far = state.lock().deliverables.total_bytes();
                match artifacts.extract(&result.output, workflow_bytes_so_far) {
                    Ok(extracted) => {
                        let mut guard = state.lock();
                        for artifact in extracted {
                            let filename = artifact.filename.clone();
                            let size = artifact.size;
                            let replaced = guard.add_artifact(artifact);
                            drop(guard);
                            bus.publish(Event::ArtifactCaptured {
                                execution_id: execution_id.clone(),
                                timestamp_ms: clock.epoch_ms(),
                                filename,
                                size,
                                replaced,
                            });
                            guard = state.lock();
                        }
                    }
                    Err(err) => {
                        warn!(task_id = %task.id, %err, "artifact extraction failed; task result kept as-is");
                        if result.is_success() {
                            result.error = Some(err.to_string());
                        }
                    }
                }

                if let Err(err) = persister.upsert_task_execution(&execution_id, &result).await {
                    bus.publish(Event::PersistError {
                        execution_id: execution_id.clone(),
                        timestamp_ms: clock.epoch_ms(),
                        message: err.to_string(),
                    });
                }
                let progress = state.lock().progress();
                if let Err(err) = persister.update_execution_progress(&execution_id, &progress).await {
                    bus.publish(Event::PersistError {
                        execution_id: execution_id.clone(),
                        timestamp_ms: clock.epoch_ms(),
                        message: err.to_string(),
                    });
                }

                result
            }
        };

        let scheduler = Scheduler::new(concurrency);
        let _results =
            scheduler.run(&execution_id, &task_set, state.clone(), &self.bus, cancel.clone(), self.clock.clone(), dispatch).await;

        let end_time_ms = self.clock.epoch_ms();
        if cancel.is_cancelled() {
            state.lock().cancel();
        }
        let any_failed = state.lock().progress().tasks_failed > 0;
        let final_status = if cancel.is_cancelled() {
            ExecutionStatus::Cancelled
        } else if any_failed {
            ExecutionStatus::Failed
        } else {
            ExecutionStatus::Completed
        };

        let duration_ms = end_time_ms.saturating_sub(state.lock().start_time);
        {
            let mut guard = state.lock();
            guard.finalize(final_status, end_time_ms, None);
        }

        if let Err(err) = self.persister.finalize_execution(&execution_id, final_status, end_time_ms, duration_ms).await
        {
            self.emit_persist_error(&execution_id, &err.to_string());
        }

        let event = if final_status == ExecutionStatus::Cancelled {
            Event::WorkflowCancelled { execution_id: execution_id.clone(), timestamp_ms: end_time_ms }
        } else {
            Event::WorkflowCompleted { execution_id: execution_id.clone(), timestamp_ms: end_time_ms, status: final_status }
        };
        self.bus.publish(event);
    }

    fn emit_persist_error(&self, execution_id: &ExecutionId, message: &str) {
        warn!(execution_id = %execution_id, message, "persist call failed");
        self.bus.publish(Event::PersistError {
            execution_id: execution_id.clone(),
            timestamp_ms: self.clock.epoch_ms(),
            message: message.to_string(),
        });
    }
}

/// Builds the `FullContext` a task's worker/QC views are filtered from.
/// Task records don't carry separate `requirements`/`description` fields
/// (§3 "Task definition"), so the instruction doubles as the requirement
/// text and the role description (when present) becomes the description.
fn build_full_context(task: &Task) -> FullContext {
    FullContext {
        task_id: task.id.clone(),
        title: task.title.clone(),
        requirements: task.prompt.clone(),
        description: task.agent_role_description.clone().unwrap_or_default(),
        files: Vec::new(),
        dependencies: task.dependencies.iter().cloned().collect(),
        status: TaskStatus::Executing,
        priority: 0,
        research: None,
        planning_notes: None,
        all_files: None,
        full_subgraph: None,
    }
}

#[cfg(test)]
#[path = "workflow_tests.rs"]
mod tests;
