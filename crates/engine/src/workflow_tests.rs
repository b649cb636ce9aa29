// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::agent_runner::AgentRunner;
use orc_adapters::{AgentReply, FakeAgentRuntime, InMemoryGraphStore};
use orc_core::{EngineConfig, EventFilter, FakeClock, TaskId};

fn runner(runtime: FakeAgentRuntime, bus: EventBus) -> WorkflowRunner<FakeAgentRuntime, InMemoryGraphStore, FakeClock> {
    let agent_runner = AgentRunner::new(runtime);
    let qc_loop = QcLoop::new(agent_runner, ContextFilter::default(), bus.clone(), "You are a worker.", "You are QC.");
    let store = InMemoryGraphStore::new();
    let persister = Persister::new(store);
    let config = EngineConfig { concurrency: 3, ..EngineConfig::default() };
    WorkflowRunner::new(Registry::new(), bus, persister, qc_loop, ArtifactCollector::default(), FakeClock::new(), config)
}

fn task(id: &str, deps: &[&str]) -> Task {
    Task::builder().id(id).title(id).prompt("do it").depends_on(deps.iter().map(|d| TaskId::new(*d))).build()
}

#[tokio::test]
async fn empty_workflow_completes_immediately_with_no_results() {
    let bus = EventBus::new(64);
    let mut sub = bus.subscribe(EventFilter::default());
    let wf = runner(FakeAgentRuntime::new(), bus);

    let (execution_id, _cancel) = wf.start(Vec::new(), WorkflowOptions::default()).await.expect("valid");

    let started = sub.recv().await;
    assert_eq!(started.event.kind(), "workflowStarted");
    let completed = sub.recv().await;
    assert_eq!(completed.event.kind(), "workflowCompleted");
    assert_eq!(completed.event.execution_id(), &execution_id);
    assert!(matches!(completed.event, Event::WorkflowCompleted { status: ExecutionStatus::Completed, .. }));
}

#[tokio::test]
async fn single_task_no_qc_zero_retries_makes_exactly_one_agent_call() {
    let runtime = FakeAgentRuntime::new();
    runtime.push_response(Ok(AgentReply { text: "done".into(), input_tokens: 10, output_tokens: 5, tool_calls: 0 }));
    let calls_handle = runtime.clone();
    let bus = EventBus::new(64);
    let mut sub = bus.subscribe(EventFilter::default());
    let wf = runner(runtime, bus);

    let single = Task::builder().id("t1").prompt("write code").max_retries(0).build();
    let (_execution_id, _cancel) = wf.start(vec![single], WorkflowOptions::default()).await.expect("valid");

    let mut kinds = Vec::new();
    for _ in 0..4 {
        kinds.push(sub.recv().await.event.kind().to_string());
    }
    assert_eq!(kinds, vec!["workflowStarted", "taskStarted", "taskCompleted", "workflowCompleted"]);
    assert_eq!(calls_handle.call_count(), 1);
}

#[tokio::test]
async fn invalid_workflow_is_rejected_before_any_state_is_created() {
    let bus = EventBus::new(64);
    let wf = runner(FakeAgentRuntime::new(), bus);

    let tasks = vec![task("a", &["missing"])];
    let err = wf.start(tasks, WorkflowOptions::default()).await.unwrap_err();
    assert!(matches!(err, ValidationError::DanglingDependency { .. }));
}

#[tokio::test]
async fn linear_chain_runs_to_completion_matching_s1() {
    let runtime = FakeAgentRuntime::new();
    for _ in 0..3 {
        runtime.push_response(Ok(AgentReply { text: "ok".into(), input_tokens: 100, output_tokens: 50, tool_calls: 0 }));
    }
    let bus = EventBus::new(64);
    let mut sub = bus.subscribe(EventFilter::default());
    let wf = runner(runtime, bus);

    let tasks = vec![task("a", &[]), task("b", &["a"]), task("c", &["b"])];
    let (execution_id, _cancel) = wf.start(tasks, WorkflowOptions::default()).await.expect("valid");

    let mut kinds = Vec::new();
    loop {
        let envelope = sub.recv().await;
        let kind = envelope.event.kind().to_string();
        let done = kind == "workflowCompleted";
        kinds.push(kind);
        if done {
            match envelope.event {
                Event::WorkflowCompleted { status, execution_id: id, .. } => {
                    assert_eq!(status, ExecutionStatus::Completed);
                    assert_eq!(id, execution_id);
                }
                other => panic!("expected workflowCompleted, got {}", other.kind()),
            }
            break;
        }
    }
    assert_eq!(
        kinds,
        vec![
            "workflowStarted",
            "taskStarted", "taskCompleted",
            "taskStarted", "taskCompleted",
            "taskStarted", "taskCompleted",
            "workflowCompleted",
        ]
    );
}

#[tokio::test]
async fn dependency_failure_fails_the_workflow_matching_s5() {
    let runtime = FakeAgentRuntime::new();
    for _ in 0..3 {
        runtime.push_response(Err(orc_adapters::AgentError::Unavailable("down".into())));
    }
    let bus = EventBus::new(64);
    let mut sub = bus.subscribe(EventFilter::default());
    let wf = runner(runtime, bus);

    let tasks = vec![task("a", &[]), task("b", &["a"]), task("c", &["b"])];
    let (_execution_id, _cancel) = wf.start(tasks, WorkflowOptions::default()).await.expect("valid");

    let mut final_status = None;
    loop {
        let envelope = sub.recv().await;
        if let Event::WorkflowCompleted { status, .. } = envelope.event {
            final_status = Some(status);
            break;
        }
    }
    assert_eq!(final_status, Some(ExecutionStatus::Failed));
}
