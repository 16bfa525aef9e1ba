//! Engine configuration (spec §4.5, §5).

use crate::depth::DEFAULT_MAX_RECURSION_DEPTH;
use rlm_types::StructuredSpec;

/// Default cap on top-level iterations before the engine gives up and
/// salvages a best-effort answer (spec §4.5, §5: "default 50").
pub const DEFAULT_MAX_ITERATIONS: usize = 50;

/// Default cap on a sub-agent's own iterations, independent of the
/// parent's budget (spec §4.5: "its own `max-iterations`, default 10").
pub const DEFAULT_SUB_AGENT_MAX_ITERATIONS: usize = 10;

/// Default per-request token budget handed to [`rlm_context::reduce_to_budget`].
pub const DEFAULT_TOKEN_BUDGET: usize = 100_000;

/// Configuration for one top-level `query!` call.
#[derive(Clone)]
pub struct EngineConfig {
    /// Model identifier forwarded to the transport.
    pub model: String,
    /// Sampling temperature.
    pub temperature: Option<f32>,
    /// Cap on top-level loop iterations.
    pub max_iterations: usize,
    /// Cap on recursive `llm-query`/`rlm-query` depth.
    pub max_recursion_depth: usize,
    /// Cap on a spawned sub-agent's own iterations.
    pub sub_agent_max_iterations: usize,
    /// Token budget for message reduction before each request.
    pub token_budget: usize,
    /// Required output shape, if the caller asked for structured output.
    pub output_spec: Option<StructuredSpec>,
    /// Whether to splice scored examples into the system prompt.
    pub examples_enabled: bool,
    /// Whether a sub-agent spawned via `rlm_query` during this call may
    /// see user-registered bindings rather than only core tools.
    pub allow_custom_bindings: bool,
}

impl EngineConfig {
    /// A config for a given model with every other field defaulted.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: None,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_recursion_depth: DEFAULT_MAX_RECURSION_DEPTH,
            sub_agent_max_iterations: DEFAULT_SUB_AGENT_MAX_ITERATIONS,
            token_budget: DEFAULT_TOKEN_BUDGET,
            output_spec: None,
            examples_enabled: true,
            allow_custom_bindings: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_numbers() {
        let config = EngineConfig::new("gpt-4o");
        assert_eq!(config.max_iterations, 50);
        assert_eq!(config.max_recursion_depth, 5);
        assert_eq!(config.sub_agent_max_iterations, 10);
    }
}
