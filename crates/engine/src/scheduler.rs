// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! DAG scheduler: topological readiness, bounded concurrent dispatch,
//! cooperative cancellation, completion barrier (C7, §4.7).
//!
//! Readiness is recomputed by scanning every still-pending task in input
//! order on each wake-up, rather than maintaining an incremental ready
//! queue — the task counts this orchestrator handles per workflow are small
//! enough that an O(n) rescan per completion is cheaper than the
//! bookkeeping an incremental queue would need under retries and
//! dependency-failure cascades.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use orc_core::{
    Clock, Event, ExecutionId, ExecutionResult, ExecutionState, Task, TaskId, TaskOutcome, TaskSet, TaskStatus, TokenUsage,
};
use parking_lot::Mutex;
use tokio::sync::{Notify, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::bus::EventBus;

/// Bounds concurrent dispatch and drives a `TaskSet` to a terminal state for
/// every task, honoring dependency ordering and cooperative cancellation.
pub struct Scheduler {
    concurrency: usize,
}

impl Scheduler {
    pub fn new(concurrency: usize) -> Self {
        Self { concurrency: concurrency.max(1) }
    }

    /// Runs `tasks` to completion, calling `dispatch(task, cancel)` exactly
    /// once per task that is never shadowed by a failed dependency (§4.7).
    /// Returns the finished tasks' results in completion order; tasks left
    /// `pending` by a cancellation are not represented in the return value,
    /// only in `state`'s `taskStatuses`.
    #[instrument(skip_all, fields(execution_id = %execution_id, task_count = tasks.len(), concurrency = self.concurrency))]
    pub async fn run<C, D, Fut>(
        &self,
        execution_id: &ExecutionId,
        tasks: &TaskSet,
        state: Arc<Mutex<ExecutionState>>,
        bus: &EventBus,
        cancel: CancellationToken,
        clock: C,
        dispatch: D,
    ) -> Vec<ExecutionResult>
    where
        C: Clock + 'static,
        D: Fn(Task, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = ExecutionResult> + Send + 'static,
    {
        let dispatch = Arc::new(dispatch);
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let notify = Arc::new(Notify::new());
        let in_flight = Arc::new(AtomicUsize::new(0));
        let completed = Arc::new(Mutex::new(Vec::with_capacity(tasks.len())));

        loop {
            self.propagate_dependency_failures(execution_id, tasks, &state, bus, &clock, &completed);

            if state.lock().all_terminal() {
                break;
            }

            if !cancel.is_cancelled() {
                self.dispatch_ready(
                    execution_id,
                    tasks,
                    &state,
                    bus,
                    &clock,
                    &semaphore,
                    &notify,
                    &in_flight,
                    &completed,
                    &cancel,
                    &dispatch,
                );
            }

            if in_flight.load(Ordering::SeqCst) == 0 {
                if cancel.is_cancelled() {
                    info!("cancellation observed with nothing in flight; leaving remaining tasks pending");
                    break;
                }
                warn!("no ready task and nothing in flight; stopping to avoid a hang");
                break;
            }

            tokio::select! {
                _ = notify.notified() => {}
                _ = cancel.cancelled() => {}
            }
        }

        Arc::try_unwrap(completed).map(Mutex::into_inner).unwrap_or_else(|arc| arc.lock().clone())
    }

    /// Transitions every task shadowed by a failed dependency straight to
    /// `failed`, without invoking `dispatch`. Repeats to a fixpoint so
    /// failure propagates through the transitive closure in one pass
    /// (§4.7 "transitive closure applies").
    #[allow(clippy::too_many_arguments)]
    fn propagate_dependency_failures<C: Clock>(
        &self,
        execution_id: &ExecutionId,
        tasks: &TaskSet,
        state: &Arc<Mutex<ExecutionState>>,
        bus: &EventBus,
        clock: &C,
        completed: &Arc<Mutex<Vec<ExecutionResult>>>,
    ) {
        loop {
            let mut progressed = false;
            for task in tasks.tasks() {
                let status = state.lock().task_status(&task.id);
                if status != Some(TaskStatus::Pending) {
                    continue;
                }
                let Some(failed_dep) = first_failed_dependency(task, state) else { continue };

                let timestamp_ms = clock.epoch_ms();
                {
                    let mut guard = state.lock();
                    if let Err(err) = guard.transition_task(&task.id, TaskStatus::Executing, timestamp_ms) {
                        warn!(task_id = %task.id, %err, "unexpected transition failure propagating dependency failure");
                    }
                }
                bus.publish(Event::TaskStarted {
                    execution_id: execution_id.clone(),
                    timestamp_ms,
                    task_id: task.id.clone(),
                });

                let result = dependency_failure_result(task.id.clone(), &failed_dep);
                let timestamp_ms = clock.epoch_ms();
                {
                    let mut guard = state.lock();
                    if let Err(err) = guard.transition_task(&task.id, TaskStatus::Failed, timestamp_ms) {
                        warn!(task_id = %task.id, %err, "unexpected transition failure propagating dependency failure");
                    }
                    guard.record_result(result.clone());
                }
                bus.publish(Event::TaskFailed {
                    execution_id: execution_id.clone(),
                    timestamp_ms,
                    task_id: task.id.clone(),
                    result: result.clone(),
                });
                completed.lock().push(result);
                progressed = true;
            }
            if !progressed {
                break;
            }
        }
    }

    /// Dispatches every task whose dependencies are all `completed`, up to
    /// however many semaphore permits are currently free. Stops at the
    /// first task it can't get a permit for — later ready tasks in this
    /// same pass would fail the same way, so there is no benefit in
    /// skipping ahead (§4.7 "deterministic order: input order").
    #[allow(clippy::too_many_arguments)]
    fn dispatch_ready<C, D, Fut>(
        &self,
        execution_id: &ExecutionId,
        tasks: &TaskSet,
        state: &Arc<Mutex<ExecutionState>>,
        bus: &EventBus,
        clock: &C,
        semaphore: &Arc<Semaphore>,
        notify: &Arc<Notify>,
        in_flight: &Arc<AtomicUsize>,
        completed: &Arc<Mutex<Vec<ExecutionResult>>>,
        cancel: &CancellationToken,
        dispatch: &Arc<D>,
    ) where
        C: Clock + 'static,
        D: Fn(Task, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = ExecutionResult> + Send + 'static,
    {
        for task in tasks.tasks() {
            let status = state.lock().task_status(&task.id);
            if status != Some(TaskStatus::Pending) {
                continue;
            }
            if !all_dependencies_completed(task, state) {
                continue;
            }

            let permit = match semaphore.clone().try_acquire_owned() {
                Ok(permit) => permit,
                Err(_) => break,
            };

            let timestamp_ms = clock.epoch_ms();
            {
                let mut guard = state.lock();
                if let Err(err) = guard.transition_task(&task.id, TaskStatus::Executing, timestamp_ms) {
                    warn!(task_id = %task.id, %err, "unexpected transition failure dispatching task");
                }
            }
            bus.publish(Event::TaskStarted { execution_id: execution_id.clone(), timestamp_ms, task_id: task.id.clone() });

            in_flight.fetch_add(1, Ordering::SeqCst);

            let task = task.clone();
            let task_id = task.id.clone();
            let execution_id = execution_id.clone();
            let state = state.clone();
            let bus = bus.clone();
            let clock = clock.clone();
            let notify = notify.clone();
            let in_flight = in_flight.clone();
            let completed = completed.clone();
            let cancel_for_task = cancel.clone();
            let dispatch = dispatch.clone();

            tokio::spawn(async move {
                let result = dispatch(task, cancel_for_task).await;
                let next_status = if result.is_success() { TaskStatus::Completed } else { TaskStatus::Failed };
                let timestamp_ms = clock.epoch_ms();
                {
                    let mut guard = state.lock();
                    if let Err(err) = guard.transition_task(&task_id, next_status, timestamp_ms) {
                        warn!(task_id = %task_id, %err, "unexpected transition failure completing task");
                    }
                    guard.record_result(result.clone());
                }
                let event = if result.is_success() {
                    Event::TaskCompleted { execution_id, timestamp_ms, task_id, result: result.clone() }
                } else {
                    Event::TaskFailed { execution_id, timestamp_ms, task_id, result: result.clone() }
                };
                bus.publish(event);
                completed.lock().push(result);
                drop(permit);
                in_flight.fetch_sub(1, Ordering::SeqCst);
                notify.notify_one();
            });
        }
    }
}

fn all_dependencies_completed(task: &Task, state: &Arc<Mutex<ExecutionState>>) -> bool {
    let guard = state.lock();
    task.dependencies.iter().all(|dep| guard.task_status(dep) == Some(TaskStatus::Completed))
}

fn first_failed_dependency(task: &Task, state: &Arc<Mutex<ExecutionState>>) -> Option<TaskId> {
    let guard = state.lock();
    task.dependencies.iter().find(|dep| guard.task_status(dep) == Some(TaskStatus::Failed)).cloned()
}

fn dependency_failure_result(task_id: TaskId, failed_dependency: &TaskId) -> ExecutionResult {
    ExecutionResult {
        task_id,
        status: TaskOutcome::Failure,
        output: String::new(),
        error: Some(format!("dependency failed: {failed_dependency}")),
        duration_ms: 0,
        attempt_number: 1,
        tokens: TokenUsage::default(),
        tool_calls: 0,
        qc_verification: None,
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
