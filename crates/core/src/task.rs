// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task definitions: the immutable input side of a workflow submission (§3).

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::collections::HashMap;

use crate::error::ValidationError;

/// Caller-supplied task id, unique within a workflow. Unlike the internally
/// generated ids (`define_id!`), task ids are arbitrary caller strings, so
/// this wraps `SmolStr` rather than the fixed-capacity `IdBuf`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(SmolStr);

impl TaskId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(SmolStr::new(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl std::borrow::Borrow<str> for TaskId {
    fn borrow(&self) -> &str {
        self.0.as_str()
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new("")
    }
}

/// A single DAG node (§3 "Task definition (input)"). Immutable for the
/// duration of an execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub prompt: String,
    #[serde(default)]
    pub dependencies: IndexSet<TaskId>,
    #[serde(default)]
    pub agent_role_description: Option<String>,
    #[serde(default)]
    pub qc_role: Option<String>,
    #[serde(default)]
    pub verification_criteria: Vec<String>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default)]
    pub recommended_model: Option<String>,
    /// Caller-supplied metadata; flows through to persisted records but
    /// never affects scheduling or context filtering.
    #[serde(default)]
    pub labels: HashMap<String, String>,
}

fn default_max_retries() -> u32 {
    2
}

impl Task {
    pub fn qc_enabled(&self) -> bool {
        self.qc_role.is_some()
    }
}

/// An ordered, validated set of tasks submitted as one workflow (§4.9 step 1).
#[derive(Debug, Clone)]
pub struct TaskSet {
    tasks: Vec<Task>,
}

impl TaskSet {
    /// Validate id uniqueness, dependency references, and acyclicity (§4.9
    /// step 1, §3 invariants). Order is preserved and is later used by the
    /// scheduler's deterministic-readiness tie-break (§4.7).
    pub fn validate(tasks: Vec<Task>) -> Result<Self, ValidationError> {
        if tasks.is_empty() {
            return Ok(Self { tasks });
        }

        let mut seen = std::collections::HashSet::with_capacity(tasks.len());
        for task in &tasks {
            if !seen.insert(task.id.clone()) {
                return Err(ValidationError::DuplicateTaskId(task.id.to_string()));
            }
        }
        for task in &tasks {
            for dep in &task.dependencies {
                if !seen.contains(dep) {
                    return Err(ValidationError::DanglingDependency {
                        task: task.id.to_string(),
                        dependency: dep.to_string(),
                    });
                }
            }
        }

        detect_cycle(&tasks)?;

        Ok(Self { tasks })
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| &t.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum VisitState {
    InProgress,
    Done,
}

fn detect_cycle(tasks: &[Task]) -> Result<(), ValidationError> {
    let by_id: HashMap<&TaskId, &Task> = tasks.iter().map(|t| (&t.id, t)).collect();
    let mut state: HashMap<&TaskId, VisitState> = HashMap::with_capacity(tasks.len());

    for task in tasks {
        if state.contains_key(&task.id) {
            continue;
        }
        visit(task, &by_id, &mut state)?;
    }
    Ok(())
}

fn visit<'a>(
    task: &'a Task,
    by_id: &HashMap<&'a TaskId, &'a Task>,
    state: &mut HashMap<&'a TaskId, VisitState>,
) -> Result<(), ValidationError> {
    state.insert(&task.id, VisitState::InProgress);
    for dep_id in &task.dependencies {
        match state.get(dep_id) {
            Some(VisitState::InProgress) => return Err(ValidationError::Cycle(dep_id.to_string())),
            Some(VisitState::Done) => continue,
            None => {
                let dep = by_id
                    .get(dep_id)
                    .expect("dangling dependency checked before cycle detection");
                visit(dep, by_id, state)?;
            }
        }
    }
    state.insert(&task.id, VisitState::Done);
    Ok(())
}

#[cfg(any(test, feature = "test-support"))]
crate::builder! {
    pub struct TaskBuilder => Task {
        into { id: TaskId = "task-1", title: String = "Untitled", prompt: String = "do the thing" }
        set {
            max_retries: u32 = 2,
            dependencies: IndexSet<TaskId> = IndexSet::new(),
            verification_criteria: Vec<String> = Vec::new(),
            labels: HashMap<String, String> = HashMap::new()
        }
        option { agent_role_description: String = None, qc_role: String = None, recommended_model: String = None }
    }
}

#[cfg(any(test, feature = "test-support"))]
impl TaskBuilder {
    pub fn depends_on(self, deps: impl IntoIterator<Item = TaskId>) -> Self {
        self.dependencies(deps.into_iter().collect::<IndexSet<_>>())
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
