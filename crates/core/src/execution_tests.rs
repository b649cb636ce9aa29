// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn new_state() -> ExecutionState {
    ExecutionState::new(
        ExecutionId::from_string("exec-1"),
        [TaskId::new("a"), TaskId::new("b")],
        1_000,
    )
}

#[test]
fn new_seeds_every_task_pending() {
    let state = new_state();
    assert_eq!(state.task_status(&TaskId::new("a")), Some(TaskStatus::Pending));
    assert_eq!(state.task_status(&TaskId::new("b")), Some(TaskStatus::Pending));
    assert_eq!(state.status, ExecutionStatus::Running);
}

#[test]
fn transition_task_follows_the_lattice() {
    let mut state = new_state();
    let a = TaskId::new("a");
    state.transition_task(&a, TaskStatus::Executing, 1_001).expect("pending->executing");
    state.transition_task(&a, TaskStatus::Completed, 1_002).expect("executing->completed");
    assert_eq!(state.task_status(&a), Some(TaskStatus::Completed));
    assert_eq!(state.history.len(), 2);
}

#[test]
fn transition_task_rejects_skipping_executing() {
    let mut state = new_state();
    let a = TaskId::new("a");
    let err = state.transition_task(&a, TaskStatus::Completed, 1_001).unwrap_err();
    assert!(matches!(err, TaskTransitionError::InvalidTransition { .. }));
}

#[test]
fn transition_task_rejects_leaving_a_terminal_state() {
    let mut state = new_state();
    let a = TaskId::new("a");
    state.transition_task(&a, TaskStatus::Executing, 1_001).expect("ok");
    state.transition_task(&a, TaskStatus::Failed, 1_002).expect("ok");
    let err = state.transition_task(&a, TaskStatus::Executing, 1_003).unwrap_err();
    assert!(matches!(err, TaskTransitionError::InvalidTransition { .. }));
}

#[test]
fn transition_task_rejects_unknown_task() {
    let mut state = new_state();
    let err = state.transition_task(&TaskId::new("ghost"), TaskStatus::Executing, 1_001).unwrap_err();
    assert_eq!(err, TaskTransitionError::UnknownTask("ghost".into()));
}

#[test]
fn all_terminal_false_until_every_task_is_done() {
    let mut state = new_state();
    let a = TaskId::new("a");
    let b = TaskId::new("b");
    assert!(!state.all_terminal());
    state.transition_task(&a, TaskStatus::Executing, 1_001).unwrap();
    state.transition_task(&a, TaskStatus::Completed, 1_002).unwrap();
    assert!(!state.all_terminal());
    state.transition_task(&b, TaskStatus::Executing, 1_003).unwrap();
    state.transition_task(&b, TaskStatus::Failed, 1_004).unwrap();
    assert!(state.all_terminal());
}

#[test]
fn executing_count_tracks_live_tasks() {
    let mut state = new_state();
    assert_eq!(state.executing_count(), 0);
    state.transition_task(&TaskId::new("a"), TaskStatus::Executing, 1_001).unwrap();
    assert_eq!(state.executing_count(), 1);
}

#[test]
fn cancel_is_idempotent() {
    let mut state = new_state();
    assert!(state.cancel());
    assert!(!state.cancel());
    assert!(state.cancelled);
}

#[test]
fn finalize_sets_end_time_exactly_once() {
    let mut state = new_state();
    state.finalize(ExecutionStatus::Completed, 2_000, None);
    state.finalize(ExecutionStatus::Failed, 3_000, Some("late".into()));
    assert_eq!(state.end_time, Some(2_000));
    assert_eq!(state.status, ExecutionStatus::Completed);
    assert!(state.error.is_none());
}

#[test]
fn add_artifact_delegates_to_deliverables() {
    let mut state = new_state();
    assert!(!state.add_artifact(Artifact::new("a.md", "x", "text/markdown")));
    assert_eq!(state.deliverables.len(), 1);
}

#[test]
fn execution_id_generate_embeds_epoch_ms() {
    let id = ExecutionId::generate(123_456);
    assert!(id.as_str().starts_with("exec-123456-"));
}

#[test]
fn execution_id_generate_is_unique_per_call() {
    assert_ne!(ExecutionId::generate(1), ExecutionId::generate(1));
}

#[test]
fn progress_aggregates_results() {
    let mut state = new_state();
    state.record_result(crate::result::ExecutionResult {
        task_id: TaskId::new("a"),
        status: crate::result::TaskOutcome::Success,
        output: "ok".into(),
        error: None,
        duration_ms: 10,
        attempt_number: 1,
        tokens: crate::result::TokenUsage { input: 100, output: 50 },
        tool_calls: 2,
        qc_verification: None,
    });
    state.record_result(crate::result::ExecutionResult {
        task_id: TaskId::new("b"),
        status: crate::result::TaskOutcome::Failure,
        output: String::new(),
        error: Some("boom".into()),
        duration_ms: 5,
        attempt_number: 3,
        tokens: crate::result::TokenUsage { input: 10, output: 5 },
        tool_calls: 1,
        qc_verification: None,
    });

    let progress = state.progress();
    assert_eq!(progress.tasks_successful, 1);
    assert_eq!(progress.tasks_failed, 1);
    assert_eq!(progress.tokens, crate::result::TokenUsage { input: 110, output: 55 });
    assert_eq!(progress.tool_calls, 3);

    similar_asserts::assert_eq!(
        progress,
        ExecutionProgress {
            tasks_successful: 1,
            tasks_failed: 1,
            tokens: crate::result::TokenUsage { input: 110, output: 55 },
            tool_calls: 3,
        }
    );
}
