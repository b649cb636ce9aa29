// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deliverable artifacts captured from worker output (§3, §4.4).

use serde::{Deserialize, Serialize};

/// A named byte-string produced by a task. `size` is always
/// `byte_length(content)`; callers never set it independently of `content`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub filename: String,
    pub content: String,
    pub mime_type: String,
    pub size: u64,
}

impl Artifact {
    pub fn new(filename: impl Into<String>, content: impl Into<String>, mime_type: impl Into<String>) -> Self {
        let content = content.into();
        let size = content.len() as u64;
        Self { filename: filename.into(), content, mime_type: mime_type.into(), size }
    }
}

/// An append-only, filename-deduplicated set of artifacts for one execution
/// (§3 "Lifecycle": frozen after a terminal transition; §4.4 last-writer-wins).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeliverableSet {
    by_filename: indexmap::IndexMap<String, Artifact>,
    total_bytes: u64,
}

impl DeliverableSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an artifact by filename. Returns `true` if this
    /// replaced an existing entry (drives the `replaced: true` flag on the
    /// `artifactCaptured` event, §4.4).
    pub fn upsert(&mut self, artifact: Artifact) -> bool {
        let replaced = if let Some(existing) = self.by_filename.get(&artifact.filename) {
            self.total_bytes -= existing.size;
            true
        } else {
            false
        };
        self.total_bytes += artifact.size;
        self.by_filename.insert(artifact.filename.clone(), artifact);
        replaced
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn len(&self) -> usize {
        self.by_filename.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_filename.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Artifact> {
        self.by_filename.values()
    }

    pub fn get(&self, filename: &str) -> Option<&Artifact> {
        self.by_filename.get(filename)
    }
}

#[cfg(test)]
#[path = "artifact_tests.rs"]
mod tests;
