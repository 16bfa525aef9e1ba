//! `query!` options and result shape (spec §4.8, §6).

use rlm_engine::Trace;
use rlm_types::StructuredSpec;

/// Tunables for one [`crate::Environment::query`] call. Every field is
/// optional; unset fields fall back to the environment's or the
/// engine's own defaults.
#[derive(Default, Clone)]
pub struct RlmQueryOptions {
    /// Extra documentation spliced verbatim into the system prompt.
    pub context: Option<String>,
    /// Required output shape, if the caller wants structured output.
    pub spec: Option<StructuredSpec>,
    /// Model override for this call.
    pub model: Option<String>,
    /// Cap on top-level loop iterations.
    pub max_iterations: Option<usize>,
    /// Cap on refinement iterations, if `refine` is set.
    pub max_refinements: Option<usize>,
    /// Score threshold the refinement loop stops at, if `refine` is set.
    pub min_score: Option<f32>,
    /// Run the answer through the refinement pipeline before returning.
    pub refine: Option<bool>,
    /// Splice scored examples into the system prompt and record this
    /// query's outcome as a new example once it completes. Defaults to
    /// `true`.
    pub learn: Option<bool>,
    /// Token budget for message reduction before each request.
    pub max_context_tokens: Option<usize>,
    /// Recursion depth cap for `llm_query`/`rlm_query` made during this
    /// query, overriding the environment's default.
    pub max_recursion_depth: Option<usize>,
    /// Force per-claim citation verification during refinement, using
    /// `context` (if present) as the source excerpt.
    pub verify_claims: Option<bool>,
    /// Pre-fetched "plan" context, prepended to the conversation ahead
    /// of the triggering query turn (spec §4.5: "the optional
    /// pre-fetched 'plan' context").
    pub plan: Option<String>,
    /// Emit extra `tracing::debug!` detail about this call.
    pub debug: Option<bool>,
    /// Whether a sub-agent spawned via `rlm_query` during this call may
    /// see user-registered bindings rather than only core tools.
    /// Defaults to `false`: a sub-agent's sandbox is built from a
    /// core-tools-only copy of the registry unless this is set.
    pub allow_custom_bindings: bool,
}

/// The result of one `query!` call (spec §4.8's result map).
#[derive(Debug, Clone, serde::Serialize)]
pub struct QueryResult {
    /// The final answer, after refinement if it ran.
    pub answer: serde_json::Value,
    /// The answer the Iteration Engine produced, before refinement.
    pub raw_answer: serde_json::Value,
    /// The complete per-iteration execution trace.
    pub trace: Trace,
    /// Number of top-level iterations run.
    pub iterations: usize,
    /// Wall-clock duration of the whole call.
    pub duration_ms: u64,
    /// Per-iteration refinement scores, if refinement ran.
    pub eval_scores: Option<Vec<f32>>,
    /// Number of refinement iterations run, if refinement ran.
    pub refinement_count: Option<usize>,
    /// Estimated token count of the final message log.
    pub history_tokens: usize,
    /// Count of claims verified `Correct`, if refinement ran with
    /// verification.
    pub verified_claims: Option<usize>,
    /// `"final"` if the loop terminated via `FINAL`, `"max-iterations"`
    /// if it exhausted its iteration cap (spec §7).
    pub status: &'static str,
}
