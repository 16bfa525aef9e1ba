#![deny(missing_docs)]
//! The restricted code evaluator for the RLM agent runtime.
//!
//! Wraps a deny-listed `rhai` engine: arithmetic, comparisons, sequence
//! and string operations, and registered tool bindings are available;
//! `eval`, module loading, and filesystem/process I/O are not
//! (component design §4.2). Top-level variable capture, wall-clock
//! timeouts, and the `FINAL`/`FINAL-VAR` sentinel are implemented here;
//! everything above the single-snippet `execute` call (the iteration
//! loop, tool registration) lives in `rlm-engine` and `rlm-tool`.

mod engine;
mod final_record;

pub use engine::{
    ExecutionResult, Sandbox, SandboxBuilder, SandboxConfig, DEFAULT_MAX_OPERATIONS,
    DEFAULT_TIMEOUT,
};
pub use final_record::{detect_final, final_answer, is_final_record, make_final_record};

/// Re-exported so downstream crates that register tool bindings don't
/// need a direct `rhai` dependency of their own version.
pub use rhai;
