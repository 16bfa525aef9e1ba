#![deny(missing_docs)]
//! The bounded iteration engine driving sandboxed exploration for the
//! RLM agent runtime (component design §4.5).
//!
//! [`Engine`] runs one query to completion: reduce the conversation to
//! budget, call the transport, execute the returned code against the
//! sandbox, detect `FINAL`, and loop with feedback otherwise.
//! [`build_sandbox`] wires a tool registry's bindings plus the
//! `llm_query`/`rlm_query` recursion bindings onto one sandbox.
//! [`DepthCounter`] is the shared recursion guard both this crate and
//! the recursion bindings consult.

mod bootstrap;
mod config;
mod depth;
mod engine;
mod feedback;
mod recursive_tools;
mod trace;

pub use bootstrap::build_sandbox;
pub use config::{
    EngineConfig, DEFAULT_MAX_ITERATIONS, DEFAULT_SUB_AGENT_MAX_ITERATIONS, DEFAULT_TOKEN_BUDGET,
};
pub use depth::{DepthCounter, DepthGuard, DEFAULT_MAX_RECURSION_DEPTH};
pub use engine::{Engine, QueryOutcome};
pub use feedback::build_feedback;
pub use recursive_tools::{RecursiveToolDeps, DEPTH_CAP_MESSAGE};
pub use trace::{pprint_trace, Execution, IterationRecord, PprintOptions, Trace};
