// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reduces a full project context to the view a particular agent kind may
//! see (C3, §4.3).

use orc_core::{FilterMetrics, FilterOptions, FullContext, QcContext, WorkerContext};
use serde::Serialize;

/// Carried on a retry attempt so the worker/QC view includes what went
/// wrong last time (§4.3 "For retry contexts where `options.includeErrorContext`
/// is set").
#[derive(Debug, Clone)]
pub struct RetryInfo {
    pub attempt_number: u32,
    pub error_context: String,
}

fn byte_size<T: Serialize>(value: &T) -> u64 {
    serde_json::to_vec(value).map(|bytes| bytes.len() as u64).unwrap_or(0)
}

/// Stateless reducer; holds only the caps/flags for one call (§4.3).
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextFilter {
    pub options: FilterOptions,
}

impl ContextFilter {
    pub fn new(options: FilterOptions) -> Self {
        Self { options }
    }

    /// `pm` returns the input unchanged (§4.3 policy).
    pub fn pm_view(&self, full: &FullContext) -> FullContext {
        full.clone()
    }

    /// `worker` retains identity+operational fields, caps `files` and
    /// `dependencies`, and omits the bulk fields (§4.3 policy).
    pub fn worker_view(&self, full: &FullContext, retry: Option<&RetryInfo>) -> WorkerContext {
        let files = full.files.iter().take(self.options.max_files).cloned().collect();
        let dependencies = full.dependencies.iter().take(self.options.max_dependencies).cloned().collect();

        let (attempt_number, error_context) = match retry {
            Some(info) if self.options.include_error_context => {
                (Some(info.attempt_number), Some(info.error_context.clone()))
            }
            Some(info) => (Some(info.attempt_number), None),
            None => (None, None),
        };

        WorkerContext {
            task_id: full.task_id.clone(),
            title: full.title.clone(),
            requirements: full.requirements.clone(),
            description: full.description.clone(),
            files,
            dependencies,
            status: full.status,
            priority: full.priority,
            attempt_number,
            error_context,
        }
    }

    /// `qc` is the worker view plus the verification-specific fields
    /// (§4.3 policy).
    pub fn qc_view(
        &self,
        full: &FullContext,
        retry: Option<&RetryInfo>,
        original_requirements: impl Into<String>,
        verification_criteria: impl Into<Vec<String>>,
        worker_output: impl Into<String>,
    ) -> QcContext {
        QcContext {
            worker: self.worker_view(full, retry),
            original_requirements: original_requirements.into(),
            verification_criteria: verification_criteria.into(),
            worker_output: worker_output.into(),
        }
    }

    /// Size/field accounting for a previously produced view (§4.3).
    pub fn worker_metrics(&self, full: &FullContext, view: &WorkerContext) -> FilterMetrics {
        let mut fields_retained = vec![
            "taskId".to_string(),
            "title".to_string(),
            "requirements".to_string(),
            "description".to_string(),
            "files".to_string(),
            "dependencies".to_string(),
            "status".to_string(),
            "priority".to_string(),
        ];
        if view.attempt_number.is_some() {
            fields_retained.push("attemptNumber".to_string());
        }
        if view.error_context.is_some() {
            fields_retained.push("errorContext".to_string());
        }
        let fields_removed =
            vec!["research".to_string(), "planningNotes".to_string(), "allFiles".to_string(), "fullSubgraph".to_string()];

        build_metrics(full, view, fields_removed, fields_retained)
    }

    pub fn qc_metrics(&self, full: &FullContext, view: &QcContext) -> FilterMetrics {
        let mut metrics = self.worker_metrics(full, &view.worker);
        metrics.fields_retained.extend([
            "originalRequirements".to_string(),
            "verificationCriteria".to_string(),
            "workerOutput".to_string(),
        ]);
        metrics.filtered_size = byte_size(view);
        metrics.reduction_percent = reduction_percent(metrics.original_size, metrics.filtered_size);
        metrics
    }
}

fn build_metrics<V: Serialize>(
    full: &FullContext,
    view: &V,
    fields_removed: Vec<String>,
    fields_retained: Vec<String>,
) -> FilterMetrics {
    let original_size = byte_size(full);
    let filtered_size = byte_size(view);
    FilterMetrics {
        original_size,
        filtered_size,
        reduction_percent: reduction_percent(original_size, filtered_size),
        fields_removed,
        fields_retained,
    }
}

fn reduction_percent(original_size: u64, filtered_size: u64) -> f64 {
    if original_size == 0 {
        return 0.0;
    }
    (1.0 - (filtered_size as f64 / original_size as f64)) * 100.0
}

#[cfg(test)]
#[path = "context_filter_tests.rs"]
mod tests;
