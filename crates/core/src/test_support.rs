// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test fixtures and property-testing strategies for other crates.

use crate::task::{Task, TaskId};

/// A three-task linear chain `a -> b -> c`, handy as the default fixture for
/// scheduler and workflow-runner tests (S1 in §8).
pub fn linear_chain() -> Vec<Task> {
    vec![
        Task::builder().id("a").build(),
        Task::builder().id("b").depends_on([TaskId::new("a")]).build(),
        Task::builder().id("c").depends_on([TaskId::new("b")]).build(),
    ]
}

/// The diamond fan-out/fan-in shape from S2 in §8: `a -> {b1, b2} -> c`.
pub fn diamond() -> Vec<Task> {
    vec![
        Task::builder().id("a").build(),
        Task::builder().id("b1").depends_on([TaskId::new("a")]).build(),
        Task::builder().id("b2").depends_on([TaskId::new("a")]).build(),
        Task::builder().id("c").depends_on([TaskId::new("b1"), TaskId::new("b2")]).build(),
    ]
}

#[cfg(feature = "proptest")]
pub mod strategies {
    use crate::context::FullContext;
    use crate::execution::TaskStatus;
    use crate::task::TaskId;
    use proptest::prelude::*;

    /// Generates `FullContext` values whose `research`/`planning_notes`/
    /// `all_files`/`full_subgraph` bulk dominates the byte size, matching
    /// the distribution the §4.3 reduction-ratio property is quantified
    /// over.
    pub fn arb_bulky_full_context() -> impl Strategy<Value = FullContext> {
        (
            "[a-z]{1,8}",
            prop::collection::vec("[a-z/]{1,20}", 0..20),
            prop::collection::vec("[a-z/]{1,20}", 0..20),
            "[a-zA-Z0-9 .,\n]{2000,20000}",
            "[a-zA-Z0-9 .,\n]{2000,20000}",
        )
            .prop_map(|(task_id, files, dependencies, research, planning_notes)| FullContext {
                task_id: TaskId::new(task_id),
                title: "title".into(),
                requirements: "short requirements".into(),
                description: "short description".into(),
                files,
                dependencies: dependencies.into_iter().map(TaskId::new).collect(),
                status: TaskStatus::Pending,
                priority: 0,
                research: Some(research),
                planning_notes: Some(planning_notes),
                all_files: Some(vec!["a.rs".into(), "b.rs".into()]),
                full_subgraph: Some("x".repeat(4096)),
            })
    }
}
