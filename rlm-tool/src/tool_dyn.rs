//! Object-safe tool abstraction.

use rlm_types::ToolError;
use std::future::Future;
use std::pin::Pin;

/// A named function or constant exposed to the sandbox (glossary:
/// "Tool"). Any binding source — core store operations, user-registered
/// functions, future MCP/HTTP-backed tools — implements this trait.
/// Tools are stored as `Arc<dyn ToolDyn>` in [`crate::ToolRegistry`].
pub trait ToolDyn: Send + Sync {
    /// The tool's unique name, as bound in the sandbox.
    fn name(&self) -> &str;

    /// One-line human-readable description, spliced into the system
    /// prompt by the Prompt Builder (§4.4).
    fn description(&self) -> &str;

    /// JSON Schema for the tool's input parameters.
    fn input_schema(&self) -> serde_json::Value;

    /// Execute the tool with the given input.
    fn call(
        &self,
        input: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<serde_json::Value, ToolError>> + Send + '_>>;
}
