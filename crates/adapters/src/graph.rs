// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The narrow graph-database interface the persister writes through (§6).

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

/// A bag of node/edge properties. Kept as a JSON object rather than a typed
/// struct since the persister's callers (the engine) own the shape of what
/// gets written; the store itself is schema-agnostic.
pub type Props = Map<String, Value>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("graph store unavailable: {0}")]
    Unavailable(String),

    #[error("graph store rejected the write: {0}")]
    Rejected(String),
}

/// The persister's view of the graph database (§6). Every write must be
/// idempotent at this interface: `create_node` on an existing id behaves
/// like `update_node`; `create_edge` with an identical `(from, to, type)` is
/// a no-op.
#[async_trait]
pub trait GraphStore: Send + Sync + 'static {
    async fn create_node(&self, node_type: &str, props: Props) -> Result<(), GraphError>;
    async fn update_node(&self, id: &str, props: Props) -> Result<(), GraphError>;
    async fn create_edge(&self, from: &str, to: &str, edge_type: &str, props: Props) -> Result<(), GraphError>;
    async fn close(&self) -> Result<(), GraphError>;
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::{HashMap, HashSet};
    use std::sync::Arc;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct RecordedNode {
        pub node_type: String,
        pub props: Props,
    }

    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    pub struct EdgeKey {
        pub from: String,
        pub to: String,
        pub edge_type: String,
    }

    #[derive(Default)]
    struct State {
        nodes: HashMap<String, RecordedNode>,
        edges: HashSet<EdgeKey>,
        closed: bool,
    }

    /// In-memory `GraphStore` used by engine/storage tests. Honors the same
    /// idempotency contract a real graph database must (§6), so tests
    /// exercising "re-issuing a write is a no-op" (§8) run against this fake
    /// rather than mocking each call individually.
    #[derive(Clone, Default)]
    pub struct InMemoryGraphStore {
        state: Arc<Mutex<State>>,
    }

    impl InMemoryGraphStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn node(&self, id: &str) -> Option<RecordedNode> {
            self.state.lock().nodes.get(id).cloned()
        }

        pub fn node_count(&self) -> usize {
            self.state.lock().nodes.len()
        }

        pub fn edge_count(&self) -> usize {
            self.state.lock().edges.len()
        }

        pub fn has_edge(&self, from: &str, to: &str, edge_type: &str) -> bool {
            self.state.lock().edges.contains(&EdgeKey {
                from: from.to_string(),
                to: to.to_string(),
                edge_type: edge_type.to_string(),
            })
        }

        pub fn is_closed(&self) -> bool {
            self.state.lock().closed
        }
    }

    #[async_trait]
    impl GraphStore for InMemoryGraphStore {
        async fn create_node(&self, node_type: &str, props: Props) -> Result<(), GraphError> {
            let id = props
                .get("id")
                .and_then(Value::as_str)
                .ok_or_else(|| GraphError::Rejected("node props missing id".into()))?
                .to_string();
            let mut state = self.state.lock();
            state
                .nodes
                .entry(id)
                .and_modify(|existing| existing.props.extend(props.clone()))
                .or_insert(RecordedNode { node_type: node_type.to_string(), props });
            Ok(())
        }

        async fn update_node(&self, id: &str, props: Props) -> Result<(), GraphError> {
            let mut state = self.state.lock();
            match state.nodes.get_mut(id) {
                Some(existing) => {
                    existing.props.extend(props);
                    Ok(())
                }
                None => Err(GraphError::Rejected(format!("no such node: {id}"))),
            }
        }

        async fn create_edge(&self, from: &str, to: &str, edge_type: &str, _props: Props) -> Result<(), GraphError> {
            let key = EdgeKey { from: from.to_string(), to: to.to_string(), edge_type: edge_type.to_string() };
            self.state.lock().edges.insert(key);
            Ok(())
        }

        async fn close(&self) -> Result<(), GraphError> {
            self.state.lock().closed = true;
            Ok(())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{EdgeKey, InMemoryGraphStore, RecordedNode};

#[cfg(test)]
#[path = "graph_tests.rs"]
mod tests;
