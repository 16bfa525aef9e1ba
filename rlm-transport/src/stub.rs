//! A scripted transport for tests, grounded in `agent-loop`'s
//! `MockProvider` test double (`tests/integration.rs`): pre-configured
//! responses returned in order, panicking if the script runs dry.

use crate::transport::LlmTransport;
use async_trait::async_trait;
use rlm_types::{CompletionRequest, CompletionResponse, TransportError};
use std::sync::Mutex;

/// Returns pre-scripted responses in sequence, one per call to
/// [`LlmTransport::complete`]. Used throughout the Engine/Refinement/
/// Ingestion test suites in place of a real network transport.
pub struct StubTransport {
    responses: Mutex<Vec<Result<CompletionResponse, TransportError>>>,
}

impl StubTransport {
    /// Create a stub that will return `responses` in order.
    pub fn new(responses: Vec<CompletionResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(Ok).rev().collect()),
        }
    }

    /// Create a stub whose call sequence mixes successes and failures,
    /// given in the order they should be returned.
    pub fn scripted(responses: Vec<Result<CompletionResponse, TransportError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().rev().collect()),
        }
    }

    /// Number of remaining scripted responses.
    pub fn remaining(&self) -> usize {
        self.responses.lock().expect("stub transport lock poisoned").len()
    }
}

#[async_trait]
impl LlmTransport for StubTransport {
    async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, TransportError> {
        let mut responses = self.responses.lock().expect("stub transport lock poisoned");
        responses
            .pop()
            .unwrap_or_else(|| panic!("StubTransport: no more scripted responses"))
    }
}
