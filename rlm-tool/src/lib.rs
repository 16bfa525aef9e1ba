#![deny(missing_docs)]
//! Tool bindings for the RLM agent runtime (component design §4.3).
//!
//! A per-environment [`ToolRegistry`] holds named [`ToolDyn`] bindings
//! across three tiers — builtins (implemented directly in the sandbox
//! engine), core tools (wrapping Store operations, via [`core_tools`]),
//! and user-registered tools. [`bind_registry`] wires a registry's
//! bindings onto a sandbox's `rhai::Engine`, routing calls through a
//! [`ToolMiddleware`] chain first.

mod bridge;
mod core;
mod middleware;
mod registry;
mod tool_dyn;

pub use bridge::bind_registry;
pub use core::core_tools;
pub use middleware::{
    tool_middleware_fn, Next, OutputTruncator, ToolCall, ToolMiddleware, TracingMiddleware,
};
pub use registry::{Binding, ToolRegistry, ToolTier};
pub use tool_dyn::ToolDyn;
