// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-task state machine wrapping the agent runner with QC verification and
//! bounded feedback retries (C6, §4.6).
//!
//! States: `Idle -> WorkerRunning -> (Done | QCRunning | Retry)`,
//! `QCRunning -> (Done | Retry)`, `Retry -> WorkerRunning`. Collapsed here
//! into a single loop rather than an explicit state enum, since every
//! transition is taken unconditionally in sequence — the states describe
//! control flow, not data the rest of the system observes.

use std::time::Duration;

use orc_adapters::AgentRuntime;
use orc_core::{
    Event, ExecutionId, ExecutionResult, FullContext, QcVerification, Task, TaskError, TaskId, TaskOutcome,
    TokenUsage,
};
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::agent_runner::{assemble_qc_prompt, assemble_worker_prompt, AgentRole, AgentRunner};
use crate::bus::EventBus;
use crate::context_filter::{ContextFilter, RetryInfo};

/// Wires together the context filter, the agent runner, and the event bus
/// for one workflow's QC-retry policy.
pub struct QcLoop<R> {
    runner: AgentRunner<R>,
    context_filter: ContextFilter,
    bus: EventBus,
    worker_preamble: String,
    qc_preamble: String,
}

impl<R: AgentRuntime> QcLoop<R> {
    pub fn new(
        runner: AgentRunner<R>,
        context_filter: ContextFilter,
        bus: EventBus,
        worker_preamble: impl Into<String>,
        qc_preamble: impl Into<String>,
    ) -> Self {
        Self { runner, context_filter, bus, worker_preamble: worker_preamble.into(), qc_preamble: qc_preamble.into() }
    }

    /// Runs one task to a final `ExecutionResult` (§4.6 policy, §5
    /// timeouts). Never returns early on a recoverable failure — it always
    /// exhausts the retry budget or lands on `Done` with `status: success`.
    /// `per_task_timeout_ms` bounds each worker call and each QC call
    /// individually, not the pair combined; exceeding it surfaces as
    /// `TaskError::AgentTimeout` and is retried like any other recoverable
    /// failure.
    #[instrument(skip(self, task, full_context, cancel), fields(execution_id = %execution_id, task_id = %task.id))]
    pub async fn run_task(
        &self,
        execution_id: &ExecutionId,
        task: &Task,
        full_context: &FullContext,
        timestamp_ms: u64,
        per_task_timeout_ms: u64,
        cancel: CancellationToken,
    ) -> ExecutionResult {
        let max_attempts = task.max_retries + 1;
        let mut attempt_number: u32 = 1;
        let mut retry: Option<RetryInfo> = None;
        let mut tokens = TokenUsage::default();
        let mut tool_calls: u32 = 0;
        let mut duration_ms: u64 = 0;
        let timeout = Duration::from_millis(per_task_timeout_ms);

        loop {
            let worker_view = self.context_filter.worker_view(full_context, retry.as_ref());
            let worker_prompt = assemble_worker_prompt(&self.worker_preamble, &worker_view, task);

            let worker_result = tokio::time::timeout(
                timeout,
                self.runner.run(AgentRole::Worker, worker_prompt, task.recommended_model.clone(), cancel.clone()),
            )
            .await
            .unwrap_or(Err(TaskError::AgentTimeout(per_task_timeout_ms)));

            let worker_outcome = match worker_result {
                Ok(outcome) => outcome,
                Err(err) => {
                    if err.retryable() && attempt_number < max_attempts {
                        attempt_number += 1;
                        retry = Some(RetryInfo { attempt_number, error_context: format!("worker call failed: {err}") });
                        continue;
                    }
                    return self.terminal_failure(task.id.clone(), attempt_number, err, duration_ms, tokens, tool_calls);
                }
            };
            tokens.add(worker_outcome.tokens);
            tool_calls += worker_outcome.tool_calls;
            duration_ms += worker_outcome.duration_ms;

            if !task.qc_enabled() {
                return ExecutionResult {
                    task_id: task.id.clone(),
                    status: TaskOutcome::Success,
                    output: worker_outcome.text,
                    error: None,
                    duration_ms,
                    attempt_number,
                    tokens,
                    tool_calls,
                    qc_verification: None,
                };
            }

            self.bus.publish(Event::QcStarted {
                execution_id: execution_id.clone(),
                timestamp_ms,
                task_id: task.id.clone(),
                attempt_number,
            });

            let qc_view = self.context_filter.qc_view(
                full_context,
                retry.as_ref(),
                full_context.requirements.clone(),
                task.verification_criteria.clone(),
                worker_outcome.text.clone(),
            );
            let qc_prompt = assemble_qc_prompt(&self.qc_preamble, &qc_view);

            let qc_result = tokio::time::timeout(
                timeout,
                self.runner.run(AgentRole::Qc, qc_prompt, task.recommended_model.clone(), cancel.clone()),
            )
            .await
            .unwrap_or(Err(TaskError::AgentTimeout(per_task_timeout_ms)));

            let qc_outcome = match qc_result {
                Ok(outcome) => outcome,
                Err(err) => {
                    if err.retryable() && attempt_number < max_attempts {
                        attempt_number += 1;
                        retry = Some(RetryInfo { attempt_number, error_context: format!("QC call failed: {err}") });
                        continue;
                    }
                    return self.terminal_failure(
                        task.id.clone(),
                        attempt_number,
                        err,
                        duration_ms,
                        tokens,
                        tool_calls,
                    );
                }
            };
            tokens.add(qc_outcome.tokens);
            tool_calls += qc_outcome.tool_calls;
            duration_ms += qc_outcome.duration_ms;

            let verification = qc_outcome
                .qc_verification
                .expect("AgentRunner::run always attaches qcVerification for AgentRole::Qc");

            self.bus.publish(Event::QcCompleted {
                execution_id: execution_id.clone(),
                timestamp_ms,
                task_id: task.id.clone(),
                attempt_number,
                verification: verification.clone(),
            });

            if verification.accepted() {
                return ExecutionResult {
                    task_id: task.id.clone(),
                    status: TaskOutcome::Success,
                    output: worker_outcome.text,
                    error: None,
                    duration_ms,
                    attempt_number,
                    tokens,
                    tool_calls,
                    qc_verification: Some(verification),
                };
            }

            if attempt_number < max_attempts {
                attempt_number += 1;
                retry = Some(RetryInfo { attempt_number, error_context: retry_feedback(&verification, &worker_outcome.text) });
                continue;
            }

            return ExecutionResult {
                task_id: task.id.clone(),
                status: TaskOutcome::Failure,
                output: worker_outcome.text,
                error: Some(verification.feedback.clone()),
                duration_ms,
                attempt_number,
                tokens,
                tool_calls,
                qc_verification: Some(verification),
            };
        }
    }

    fn terminal_failure(
        &self,
        task_id: TaskId,
        attempt_number: u32,
        err: TaskError,
        duration_ms: u64,
        tokens: TokenUsage,
        tool_calls: u32,
    ) -> ExecutionResult {
        ExecutionResult {
            task_id,
            status: TaskOutcome::Failure,
            output: String::new(),
            error: Some(err.to_string()),
            duration_ms,
            attempt_number,
            tokens,
            tool_calls,
            qc_verification: None,
        }
    }
}

/// Builds the `errorContext` carried into the next retry attempt: the
/// previous worker output plus the QC's feedback, issues, and required
/// fixes (§4.6 "carry `feedback`, `issues`, `requiredFixes` and the
/// previous `workerOutput` as `errorContext`").
fn retry_feedback(verification: &QcVerification, previous_worker_output: &str) -> String {
    let mut feedback = format!("QC feedback: {}", verification.feedback);
    if !verification.issues.is_empty() {
        feedback.push_str(&format!("\nIssues: {}", verification.issues.join("; ")));
    }
    if !verification.required_fixes.is_empty() {
        feedback.push_str(&format!("\nRequired fixes: {}", verification.required_fixes.join("; ")));
    }
    feedback.push_str(&format!("\nPrevious worker output:\n{previous_worker_output}"));
    feedback
}

#[cfg(test)]
#[path = "qc_loop_tests.rs"]
mod tests;
