// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-task-attempt outcomes (§3 "Execution result").

use serde::{Deserialize, Serialize};

use crate::task::TaskId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskOutcome {
    Success,
    Failure,
}

/// Non-negative token counts reported by the agent runtime (§3, §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input: u64,
    pub output: u64,
}

impl TokenUsage {
    pub fn total(&self) -> u64 {
        self.input + self.output
    }

    pub fn add(&mut self, other: TokenUsage) {
        self.input += other.input;
        self.output += other.output;
    }
}

/// QC verdict attached to a final `ExecutionResult` when QC is enabled (§3,
/// §4.6). Acceptance requires `passed == true` AND `score >= 70` (§9 open
/// question, resolved — see DESIGN.md).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QcVerification {
    pub passed: bool,
    pub score: u8,
    pub feedback: String,
    #[serde(default)]
    pub issues: Vec<String>,
    #[serde(default)]
    pub required_fixes: Vec<String>,
}

impl QcVerification {
    /// The fixed conjunction from §4.6/§9: `passed && score >= 70`.
    pub fn accepted(&self) -> bool {
        self.passed && self.score >= 70
    }
}

/// The outcome of one task attempt that became final (§3). Exactly one is
/// produced per task per execution, regardless of how many retries it took.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub task_id: TaskId,
    pub status: TaskOutcome,
    pub output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
    pub attempt_number: u32,
    pub tokens: TokenUsage,
    pub tool_calls: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qc_verification: Option<QcVerification>,
}

impl ExecutionResult {
    pub fn is_success(&self) -> bool {
        matches!(self.status, TaskOutcome::Success)
    }
}

#[cfg(any(test, feature = "test-support"))]
crate::builder! {
    pub struct ExecutionResultBuilder => ExecutionResult {
        into { task_id: TaskId = "task-1", output: String = "" }
        set {
            status: TaskOutcome = TaskOutcome::Success,
            duration_ms: u64 = 0,
            attempt_number: u32 = 1,
            tokens: TokenUsage = TokenUsage::default(),
            tool_calls: u32 = 0
        }
        option { error: String = None, qc_verification: QcVerification = None }
    }
}

#[cfg(test)]
#[path = "result_tests.rs"]
mod tests;
