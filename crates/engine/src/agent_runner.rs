// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-task execution primitive: assemble a prompt, call the agent
//! runtime, interpret the reply (C5, §4.5).

use std::time::Instant;

use orc_adapters::{AgentError, AgentRequest, AgentRuntime};
use orc_core::{QcContext, QcVerification, Task, TaskError, TokenUsage, WorkerContext};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

/// Which role this invocation plays (§4.5 "role ∈ {worker, qc}").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentRole {
    Worker,
    Qc,
}

/// One agent call's outcome before the QC loop folds it into an
/// `ExecutionResult` (§4.5 step 4). Tool-call and token counts come
/// straight from the adapter's structured reply; nothing here is parsed
/// from free text except, for QC, the verification payload.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub text: String,
    pub tokens: TokenUsage,
    pub tool_calls: u32,
    pub duration_ms: u64,
    pub qc_verification: Option<QcVerification>,
}

/// Renders the worker prompt: role preamble, filtered context, task
/// instruction, and (baked into `context.error_context` by the context
/// filter on retries) prior feedback (§4.5 step 1).
pub fn assemble_worker_prompt(preamble: &str, context: &WorkerContext, task: &Task) -> String {
    let context_json = serde_json::to_string_pretty(context).unwrap_or_default();
    let mut prompt = format!("{preamble}\n\n## Context\n{context_json}\n\n## Task\n{}\n", task.prompt);
    if let Some(error_context) = &context.error_context {
        prompt.push_str("\n## Feedback from the previous attempt\n");
        prompt.push_str(error_context);
        prompt.push('\n');
    }
    prompt
}

/// Renders the QC prompt: role preamble, filtered context (already carrying
/// `originalRequirements`/`verificationCriteria`/`workerOutput`) (§4.5 step 1).
pub fn assemble_qc_prompt(preamble: &str, context: &QcContext) -> String {
    let context_json = serde_json::to_string_pretty(context).unwrap_or_default();
    let criteria = context
        .verification_criteria
        .iter()
        .map(|c| format!("- {c}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "{preamble}\n\n## Context\n{context_json}\n\n## Verification criteria\n{criteria}\n\n## Worker output\n{}\n\n\
         Respond with a single JSON object: {{\"passed\": bool, \"score\": 0-100, \"feedback\": string, \
         \"issues\": [string], \"requiredFixes\": [string]}}.\n",
        context.worker_output
    )
}

/// Invokes the agent runtime and interprets the reply (C5).
pub struct AgentRunner<R> {
    runtime: R,
}

impl<R: AgentRuntime> AgentRunner<R> {
    pub fn new(runtime: R) -> Self {
        Self { runtime }
    }

    #[instrument(skip(self, prompt, cancel), fields(role = ?role, model = ?model))]
    pub async fn run(
        &self,
        role: AgentRole,
        prompt: String,
        model: Option<String>,
        cancel: CancellationToken,
    ) -> Result<RunOutcome, TaskError> {
        let request = AgentRequest { prompt, model };
        let started = Instant::now();
        let reply = self.runtime.invoke(request, cancel).await.map_err(map_agent_error)?;
        let duration_ms = started.elapsed().as_millis() as u64;

        let qc_verification = match role {
            AgentRole::Worker => None,
            AgentRole::Qc => Some(parse_qc_verification(&reply.text)?),
        };

        Ok(RunOutcome {
            text: reply.text,
            tokens: TokenUsage { input: reply.input_tokens, output: reply.output_tokens },
            tool_calls: reply.tool_calls,
            duration_ms,
            qc_verification,
        })
    }
}

fn map_agent_error(error: AgentError) -> TaskError {
    match error {
        AgentError::Unavailable(msg) => TaskError::AgentUnavailable(msg),
        AgentError::Timeout(ms) => TaskError::AgentTimeout(ms),
        AgentError::PromptTooLarge => TaskError::PromptTooLarge,
        AgentError::Cancelled => TaskError::Cancelled,
    }
}

/// Shape accepted on the wire before validation narrows it to
/// `QcVerification` (§4.5 step 3, §3 `qcVerification`).
#[derive(Debug, Deserialize)]
struct RawQcVerification {
    passed: bool,
    score: i64,
    feedback: String,
    #[serde(default)]
    issues: Vec<String>,
    #[serde(default)]
    #[serde(rename = "requiredFixes")]
    required_fixes: Vec<String>,
}

/// Extracts and validates the QC JSON object from a free-text reply
/// (§4.5 step 3). Looks for the outermost `{...}` span rather than
/// requiring the whole reply to be bare JSON, since agents routinely wrap
/// it in prose or a fenced block.
fn parse_qc_verification(text: &str) -> Result<QcVerification, TaskError> {
    let span = extract_json_object(text).ok_or_else(|| TaskError::ParseError("no JSON object found in reply".into()))?;

    let raw: RawQcVerification =
        serde_json::from_str(span).map_err(|e| TaskError::ParseError(format!("invalid JSON: {e}")))?;

    if !(0..=100).contains(&raw.score) {
        return Err(TaskError::QcSchemaInvalid(format!("score {} out of range 0..=100", raw.score)));
    }

    Ok(QcVerification {
        passed: raw.passed,
        score: raw.score as u8,
        feedback: raw.feedback,
        issues: raw.issues,
        required_fixes: raw.required_fixes,
    })
}

/// Finds the first `{` and its matching `}` by brace depth, ignoring braces
/// inside string literals.
fn extract_json_object(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let start = text.find('{')?;

    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=offset]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
#[path = "agent_runner_tests.rs"]
mod tests;
