// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The agent runtime: the pluggable callable that actually talks to an LLM
//! (§6 "Agent runtime"). The core never invokes a model directly; it always
//! goes through this trait.

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// A prompt ready to send to a model.
#[derive(Debug, Clone)]
pub struct AgentRequest {
    pub prompt: String,
    pub model: Option<String>,
}

/// The model's reply, already reduced to the fields the core cares about
/// (§6): free text plus token/tool-call counts.
#[derive(Debug, Clone, Default)]
pub struct AgentReply {
    pub text: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub tool_calls: u32,
}

/// Adapter-level failure classification (§4.5, §6). Parsing failures
/// (`parseError`, `qcSchemaInvalid`) are not raised here — they happen one
/// layer up, while the agent runner interprets a successful `AgentReply`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AgentError {
    #[error("agent runtime unavailable: {0}")]
    Unavailable(String),

    #[error("agent call timed out after {0}ms")]
    Timeout(u64),

    #[error("assembled prompt exceeds size limit")]
    PromptTooLarge,

    #[error("cancelled")]
    Cancelled,
}

/// The pluggable LLM callable (§6). Implementations must honor `cancel` at
/// their next I/O boundary and return `AgentError::Cancelled` promptly once
/// it fires, rather than completing the call.
#[async_trait]
pub trait AgentRuntime: Send + Sync + 'static {
    async fn invoke(&self, request: AgentRequest, cancel: CancellationToken) -> Result<AgentReply, AgentError>;
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::Arc;

    /// A scripted response queue, replayed in order across `invoke` calls.
    /// Records every request it receives so tests can assert on prompts and
    /// models.
    #[derive(Clone)]
    pub struct FakeAgentRuntime {
        inner: Arc<Mutex<FakeState>>,
    }

    struct FakeState {
        responses: VecDeque<Result<AgentReply, AgentError>>,
        default_response: Result<AgentReply, AgentError>,
        calls: Vec<AgentRequest>,
    }

    impl FakeAgentRuntime {
        pub fn new() -> Self {
            Self {
                inner: Arc::new(Mutex::new(FakeState {
                    responses: VecDeque::new(),
                    default_response: Ok(AgentReply {
                        text: "ok".into(),
                        input_tokens: 0,
                        output_tokens: 0,
                        tool_calls: 0,
                    }),
                    calls: Vec::new(),
                })),
            }
        }

        /// Queue a response to be returned by the next `invoke` call.
        pub fn push_response(&self, response: Result<AgentReply, AgentError>) {
            self.inner.lock().responses.push_back(response);
        }

        /// Set the response returned once the queue is exhausted.
        pub fn set_default_response(&self, response: Result<AgentReply, AgentError>) {
            self.inner.lock().default_response = response;
        }

        pub fn calls(&self) -> Vec<AgentRequest> {
            self.inner.lock().calls.clone()
        }

        pub fn call_count(&self) -> usize {
            self.inner.lock().calls.len()
        }
    }

    impl Default for FakeAgentRuntime {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl AgentRuntime for FakeAgentRuntime {
        async fn invoke(&self, request: AgentRequest, cancel: CancellationToken) -> Result<AgentReply, AgentError> {
            if cancel.is_cancelled() {
                return Err(AgentError::Cancelled);
            }
            let mut state = self.inner.lock();
            state.calls.push(request);
            state.responses.pop_front().unwrap_or_else(|| state.default_response.clone())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeAgentRuntime;

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
