#![deny(missing_docs)]
//! The LLM transport contract, an HTTP implementation, and a scripted
//! test stub (component design §6).
//!
//! [`LlmTransport`] is the object-safe contract the Iteration Engine and
//! Refinement Pipeline call through. [`HttpTransport`] implements it
//! over a chat-completions-style HTTP API with the retry/backoff policy
//! spec §6 specifies; [`StubTransport`] implements it with a scripted
//! response sequence for tests.

mod http;
mod mapping;
mod redact;
mod retry;
mod stub;
mod transport;

pub use http::HttpTransport;
pub use redact::redact_data_uris;
pub use retry::{with_retry, RetryPolicy};
pub use stub::StubTransport;
pub use transport::LlmTransport;
