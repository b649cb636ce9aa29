// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use orc_adapters::{AgentReply, FakeAgentRuntime};
use orc_core::{EventFilter, TaskId};

fn full_context() -> FullContext {
    FullContext {
        task_id: TaskId::new("t1"),
        title: "Title".into(),
        requirements: "must compile".into(),
        description: "desc".into(),
        ..Default::default()
    }
}

fn task(qc: bool, max_retries: u32) -> Task {
    let mut builder = Task::builder().id("t1").prompt("write code").max_retries(max_retries);
    if qc {
        builder = builder.qc_role("reviewer");
    }
    builder.build()
}

fn reply(text: &str) -> AgentReply {
    AgentReply { text: text.into(), input_tokens: 10, output_tokens: 5, tool_calls: 1 }
}

fn qc_loop(runtime: FakeAgentRuntime) -> QcLoop<FakeAgentRuntime> {
    let runner = AgentRunner::new(runtime);
    QcLoop::new(runner, ContextFilter::default(), EventBus::new(64), "You are a worker.", "You are QC.")
}

#[tokio::test]
async fn qc_disabled_makes_exactly_one_worker_call() {
    let runtime = FakeAgentRuntime::new();
    runtime.push_response(Ok(reply("the output")));
    let calls_handle = runtime.clone();
    let loop_ = qc_loop(runtime);

    let result = loop_
        .run_task(&ExecutionId::from_string("e1"), &task(false, 2), &full_context(), 0, 60_000, CancellationToken::new())
        .await;

    assert_eq!(result.attempt_number, 1);
    assert!(result.is_success());
    assert_eq!(result.output, "the output");
    assert!(result.qc_verification.is_none());
    assert_eq!(calls_handle.call_count(), 1);
}

#[tokio::test]
async fn qc_retry_then_pass_matches_s3() {
    let runtime = FakeAgentRuntime::new();
    runtime.push_response(Ok(reply("attempt one output")));
    runtime.push_response(Ok(reply(r#"{"passed": false, "score": 40, "feedback": "needs work"}"#)));
    runtime.push_response(Ok(reply("attempt two output")));
    runtime.push_response(Ok(reply(r#"{"passed": true, "score": 85, "feedback": "looks good"}"#)));
    let calls_handle = runtime.clone();
    let loop_ = qc_loop(runtime);

    let result = loop_
        .run_task(&ExecutionId::from_string("e1"), &task(true, 2), &full_context(), 0, 60_000, CancellationToken::new())
        .await;

    assert_eq!(result.attempt_number, 2);
    assert!(result.is_success());
    assert_eq!(result.qc_verification.expect("present").score, 85);
    assert_eq!(calls_handle.call_count(), 4);

    let second_worker_call = &calls_handle.calls()[2];
    assert!(second_worker_call.prompt.contains("needs work"));
}

#[tokio::test]
async fn qc_retry_exhausted_matches_s4() {
    let runtime = FakeAgentRuntime::new();
    for _ in 0..3 {
        runtime.push_response(Ok(reply("worker output")));
        runtime.push_response(Ok(reply(r#"{"passed": false, "score": 30, "feedback": "still broken"}"#)));
    }
    let calls_handle = runtime.clone();
    let loop_ = qc_loop(runtime);

    let result = loop_
        .run_task(&ExecutionId::from_string("e1"), &task(true, 2), &full_context(), 0, 60_000, CancellationToken::new())
        .await;

    assert_eq!(result.attempt_number, 3);
    assert!(!result.is_success());
    assert_eq!(result.qc_verification.expect("present").score, 30);
    assert_eq!(calls_handle.call_count(), 6);
}

#[tokio::test]
async fn worker_failure_retries_then_fails_without_a_qc_call() {
    let runtime = FakeAgentRuntime::new();
    for _ in 0..2 {
        runtime.push_response(Err(orc_adapters::AgentError::Unavailable("down".into())));
    }
    let calls_handle = runtime.clone();
    let loop_ = qc_loop(runtime);

    let result = loop_
        .run_task(&ExecutionId::from_string("e1"), &task(true, 1), &full_context(), 0, 60_000, CancellationToken::new())
        .await;

    assert!(!result.is_success());
    assert_eq!(result.attempt_number, 2);
    assert!(result.error.expect("present").contains("unavailable"));
    assert_eq!(calls_handle.call_count(), 2);
}

#[tokio::test]
async fn emits_qc_started_and_qc_completed_events() {
    let runtime = FakeAgentRuntime::new();
    runtime.push_response(Ok(reply("output")));
    runtime.push_response(Ok(reply(r#"{"passed": true, "score": 90, "feedback": "ok"}"#)));

    let runner = AgentRunner::new(runtime);
    let bus = EventBus::new(64);
    let mut sub = bus.subscribe(EventFilter::default());
    let loop_ = QcLoop::new(runner, ContextFilter::default(), bus, "w", "q");

    let _ = loop_
        .run_task(&ExecutionId::from_string("e1"), &task(true, 2), &full_context(), 0, 60_000, CancellationToken::new())
        .await;

    let first = sub.recv().await;
    assert_eq!(first.event.kind(), "qcStarted");
    let second = sub.recv().await;
    assert_eq!(second.event.kind(), "qcCompleted");
}

#[tokio::test]
async fn max_retries_zero_with_qc_allows_exactly_one_attempt() {
    let runtime = FakeAgentRuntime::new();
    runtime.push_response(Ok(reply("output")));
    runtime.push_response(Ok(reply(r#"{"passed": false, "score": 10, "feedback": "bad"}"#)));
    let calls_handle = runtime.clone();
    let loop_ = qc_loop(runtime);

    let result = loop_
        .run_task(&ExecutionId::from_string("e1"), &task(true, 0), &full_context(), 0, 60_000, CancellationToken::new())
        .await;

    assert_eq!(result.attempt_number, 1);
    assert!(!result.is_success());
    assert_eq!(calls_handle.call_count(), 2);
}
