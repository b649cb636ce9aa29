// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Extracts declared file artifacts from worker prose (C4, §4.4).
//!
//! A grammar-anchored scanner rather than ad-hoc regex scattered across the
//! pipeline (§9 "String-matching to extract artifacts from LLM prose").

use orc_core::Artifact;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ArtifactError {
    #[error("artifact {filename:?} is {size} bytes, exceeding the per-artifact cap of {limit} bytes")]
    ArtifactTooLarge { filename: String, size: u64, limit: u64 },
    #[error("workflow artifact budget of {limit} bytes exceeded")]
    WorkflowBudgetExceeded { limit: u64 },
    #[error("rejected artifact path {0:?}: must be relative with no `..` segments")]
    InvalidPath(String),
}

/// Size caps enforced while extracting (§4.4 "Bounds").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtifactLimits {
    pub max_artifact_bytes: u64,
    pub max_workflow_artifact_bytes: u64,
}

impl Default for ArtifactLimits {
    fn default() -> Self {
        Self { max_artifact_bytes: 16 * 1024 * 1024, max_workflow_artifact_bytes: 256 * 1024 * 1024 }
    }
}

/// Stateless scanner; holds only the size caps for one call (§4.4).
#[derive(Debug, Clone, Copy, Default)]
pub struct ArtifactCollector {
    pub limits: ArtifactLimits,
}

impl ArtifactCollector {
    pub fn new(limits: ArtifactLimits) -> Self {
        Self { limits }
    }

    /// Scan `output` for artifact declarations and return a normalized list
    /// (§4.4 contract). `workflow_bytes_so_far` is the running deliverable
    /// total for the workflow before this call, so the per-workflow cap can
    /// be enforced without the caller re-summing `DeliverableSet`.
    pub fn extract(&self, output: &str, workflow_bytes_so_far: u64) -> Result<Vec<Artifact>, ArtifactError> {
        let mut artifacts = Vec::new();
        let mut running_total = workflow_bytes_so_far;
        let lines: Vec<&str> = output.lines().collect();

        let mut pending_path: Option<String> = None;
        let mut i = 0;
        while i < lines.len() {
            let line = lines[i];

            if let Some(path) = parse_file_directive(line) {
                pending_path = Some(path);
                i += 1;
                continue;
            }

            if let Some(fence_filename) = parse_fence_open(line) {
                let declared = fence_filename.or_else(|| pending_path.take());
                let (body, next_i) = collect_fence_body(&lines, i + 1);
                i = next_i;

                if let Some(path) = declared {
                    validate_path(&path)?;
                    let content = trim_single_trailing_newline(body);
                    let size = content.len() as u64;
                    if size > self.limits.max_artifact_bytes {
                        return Err(ArtifactError::ArtifactTooLarge {
                            filename: path,
                            size,
                            limit: self.limits.max_artifact_bytes,
                        });
                    }
                    running_total += size;
                    if running_total > self.limits.max_workflow_artifact_bytes {
                        return Err(ArtifactError::WorkflowBudgetExceeded {
                            limit: self.limits.max_workflow_artifact_bytes,
                        });
                    }
                    artifacts.push(Artifact::new(path.clone(), content, mime_type_for(&path)));
                }
                continue;
            }

            // A non-directive, non-fence line clears a dangling `FILE:` that
            // was never followed by a fence.
            pending_path = None;
            i += 1;
        }

        Ok(artifacts)
    }
}

/// Matches a standalone `FILE: <path>` directive line.
fn parse_file_directive(line: &str) -> Option<String> {
    let trimmed = line.trim();
    let rest = trimmed.strip_prefix("FILE:")?;
    let path = rest.trim();
    if path.is_empty() {
        None
    } else {
        Some(path.to_string())
    }
}

/// Matches a fence-open line (three or more backticks). Returns
/// `Some(Some(path))` when the info string carries `filename=<path>`,
/// `Some(None)` for a bare fence, or `None` if the line isn't a fence at
/// all.
fn parse_fence_open(line: &str) -> Option<Option<String>> {
    let trimmed = line.trim_start();
    if !trimmed.starts_with("```") {
        return None;
    }
    let info = trimmed.trim_start_matches('`').trim();
    let filename = info.split_whitespace().find_map(|token| token.strip_prefix("filename=")).map(|p| p.to_string());
    Some(filename)
}

/// Collects lines until a closing fence (a line whose trimmed content is
/// exactly three or more backticks) or end of input. Returns the joined
/// body (with a trailing newline per original line) and the index just
/// past the closing fence.
fn collect_fence_body(lines: &[&str], start: usize) -> (String, usize) {
    let mut body = String::new();
    let mut i = start;
    while i < lines.len() {
        let trimmed = lines[i].trim();
        if !trimmed.is_empty() && trimmed.chars().all(|c| c == '`') && trimmed.len() >= 3 {
            return (body, i + 1);
        }
        body.push_str(lines[i]);
        body.push('\n');
        i += 1;
    }
    (body, i)
}

fn trim_single_trailing_newline(mut content: String) -> String {
    if content.ends_with('\n') {
        content.pop();
    }
    content
}

fn validate_path(path: &str) -> Result<(), ArtifactError> {
    if path.starts_with('/') || path.starts_with('\\') {
        return Err(ArtifactError::InvalidPath(path.to_string()));
    }
    if path.len() >= 2 && path.as_bytes()[1] == b':' {
        return Err(ArtifactError::InvalidPath(path.to_string()));
    }
    if path.split(['/', '\\']).any(|segment| segment == "..") {
        return Err(ArtifactError::InvalidPath(path.to_string()));
    }
    Ok(())
}

fn mime_type_for(path: &str) -> String {
    let extension = path.rsplit('.').next().unwrap_or("");
    match extension {
        "md" => "text/markdown",
        "json" => "application/json",
        "ts" | "js" | "go" | "rs" | "py" => "text/plain",
        "html" => "text/html",
        _ => "application/octet-stream",
    }
    .to_string()
}

#[cfg(test)]
#[path = "artifacts_tests.rs"]
mod tests;
