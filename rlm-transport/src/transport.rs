//! The LLM transport contract (spec §6's external collaborator).
//!
//! Grounded in `layer0::state::StateStore`/`StateReader` for the
//! `#[async_trait]` object-safe shape, and in
//! `neuron-provider-anthropic::Provider` for what a transport actually
//! does: map a [`CompletionRequest`] to a wire call and back.

use async_trait::async_trait;
use rlm_types::{CompletionRequest, CompletionResponse, TransportError};

/// Sends one completion request and returns the assistant's response.
///
/// Implementations own retry/backoff; callers see only the final
/// success or [`TransportError::RetriesExhausted`].
#[async_trait]
pub trait LlmTransport: Send + Sync {
    /// Send `request` and return the model's response.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, TransportError>;
}
