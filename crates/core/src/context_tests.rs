// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn full_context_default_is_empty() {
    let ctx = FullContext::default();
    assert!(ctx.files.is_empty());
    assert!(ctx.dependencies.is_empty());
    assert!(ctx.research.is_none());
}

#[test]
fn filter_options_default_matches_spec() {
    let opts = FilterOptions::default();
    assert_eq!(opts.max_files, 10);
    assert_eq!(opts.max_dependencies, 5);
    assert!(!opts.include_error_context);
}

#[test]
fn worker_context_omits_attempt_fields_when_absent() {
    let ctx = WorkerContext {
        task_id: TaskId::new("a"),
        title: "t".into(),
        requirements: "r".into(),
        description: "d".into(),
        files: vec![],
        dependencies: vec![],
        status: TaskStatus::Pending,
        priority: 0,
        attempt_number: None,
        error_context: None,
    };
    let json = serde_json::to_string(&ctx).expect("serialize");
    assert!(!json.contains("attempt_number"));
    assert!(!json.contains("error_context"));
}

#[test]
fn qc_context_flattens_worker_fields() {
    let worker = WorkerContext {
        task_id: TaskId::new("a"),
        title: "t".into(),
        requirements: "r".into(),
        description: "d".into(),
        files: vec![],
        dependencies: vec![],
        status: TaskStatus::Pending,
        priority: 0,
        attempt_number: None,
        error_context: None,
    };
    let qc = QcContext {
        worker,
        original_requirements: "orig".into(),
        verification_criteria: vec!["must compile".into()],
        worker_output: "done".into(),
    };
    let json = serde_json::to_string(&qc).expect("serialize");
    assert!(json.contains("\"task_id\""));
    assert!(json.contains("\"original_requirements\""));
}
