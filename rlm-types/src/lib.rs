#![deny(missing_docs)]
//! Shared vocabulary for the RLM agent runtime.
//!
//! Every other `rlm-*` crate depends on this one for the chat message
//! shape exchanged with the LLM transport, the completion request/response
//! envelope, and the error taxonomy used throughout the runtime.

mod error;
mod message;

pub use error::{
    EngineError, EnvError, IngestError, RefinementError, SandboxError, StoreError, ToolError,
    TransportError,
};
pub use message::{
    CompletionRequest, CompletionResponse, ContentBlock, Message, Role, StopReason,
    StructuredSpec, TokenUsage, ToolDefinition,
};
