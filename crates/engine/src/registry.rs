// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide map from execution id to live `ExecutionState` (C2, §4.2).

use std::collections::HashMap;
use std::sync::Arc;

use orc_core::{ExecutionId, ExecutionState};
use parking_lot::{Mutex, RwLock};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("execution not found: {0}")]
    NotFound(String),
}

/// Guarded single-owner registry (§9 "Process-wide mutable registry map").
/// Consumers get an `Arc<Mutex<ExecutionState>>` snapshot handle rather than
/// a borrowed reference, so readers never block the registry itself.
#[derive(Clone, Default)]
pub struct Registry {
    states: Arc<RwLock<HashMap<ExecutionId, Arc<Mutex<ExecutionState>>>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a freshly created `ExecutionState` (§3 "Lifecycle": registered
    /// once, at workflow start).
    pub fn register(&self, state: ExecutionState) -> Arc<Mutex<ExecutionState>> {
        let handle = Arc::new(Mutex::new(state));
        let id = handle.lock().execution_id.clone();
        self.states.write().insert(id, handle.clone());
        handle
    }

    pub fn get(&self, id: &ExecutionId) -> Result<Arc<Mutex<ExecutionState>>, RegistryError> {
        self.states.read().get(id).cloned().ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    /// Snapshot of every registered execution id. Order is not meaningful.
    pub fn list(&self) -> Vec<ExecutionId> {
        self.states.read().keys().cloned().collect()
    }

    /// Remove a terminal execution. Callers are responsible for not
    /// removing a still-`running` execution (§4.2 "Capacity").
    pub fn remove(&self, id: &ExecutionId) -> Option<Arc<Mutex<ExecutionState>>> {
        self.states.write().remove(id)
    }

    pub fn len(&self) -> usize {
        self.states.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.read().is_empty()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
