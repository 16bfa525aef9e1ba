//! Shared plumbing for the six phases: each phase is one structured
//! call through [`LlmTransport`], grounded in `neuron-op-react`'s
//! one-call-per-turn shape generalized to "one call per phase".

use rlm_transport::LlmTransport;
use rlm_types::{CompletionRequest, Message, RefinementError, StructuredSpec};

/// Send `instructions` plus `spec`'s rendered schema fragment as a single
/// user message, then parse+validate the response against `spec`.
pub(crate) async fn call_structured(
    transport: &dyn LlmTransport,
    model: &str,
    instructions: &str,
    spec: &StructuredSpec,
) -> Result<serde_json::Value, RefinementError> {
    let prompt = format!("{instructions}\n\n{}", spec.render());
    let request = CompletionRequest {
        model: model.to_string(),
        messages: vec![Message::user(prompt)],
        temperature: None,
        timeout_ms: None,
    };
    let response = transport.complete(request).await?;
    spec.parse(&response.content).map_err(RefinementError::MalformedResponse)
}

/// Deserialize a parsed phase response into `T`, wrapping serde errors
/// as [`RefinementError::MalformedResponse`].
pub(crate) fn deserialize_phase<T: serde::de::DeserializeOwned>(
    value: serde_json::Value,
) -> Result<T, RefinementError> {
    serde_json::from_value(value).map_err(|e| RefinementError::MalformedResponse(e.to_string()))
}
