#![deny(missing_docs)]
//! The six-phase chain-of-verification refinement pipeline for the RLM
//! agent runtime (component design §4.6).
//!
//! [`pipeline::run_refinement`] drives an answer through decompose,
//! plan-verify, per-claim verify, inconsistency detection, evaluate,
//! and revise, looping per [`policy::RefinementConfig`]'s stopping
//! policy and summarizing the score trend via [`gradient::summarize`].
//!
//! No teacher crate runs chain-of-verification directly; each phase is
//! grounded in the one-structured-call-per-turn shape the teacher's
//! operator/turn call uses, generalized to one call per phase.

mod claim;
mod evaluate;
mod gradient;
mod inconsistency;
mod pipeline;
mod policy;
mod revise;
mod support;
mod verify;

pub use claim::{decompose, Claim, ClaimCategory};
pub use evaluate::{evaluate, CriteriaScores, CriteriaWeights, Evaluation};
pub use gradient::{summarize as summarize_gradient, GradientSummary, Trend, DEFAULT_WINDOW_SIZE};
pub use inconsistency::{detect_inconsistencies, Inconsistency, MIN_VERIFIED_CLAIMS};
pub use pipeline::{run_refinement, RefinementOutcome};
pub use policy::{
    RefinementConfig, StoppingPolicy, DEFAULT_ITERATIONS, DEFAULT_MAX_CONCURRENCY, DEFAULT_THRESHOLD,
};
pub use revise::revise;
pub use verify::{
    per_claim_verify, plan_verify, truncate_source_excerpts, SourceExcerpt, Verdict,
    VerificationQuestion, VerificationResult, DEFAULT_SOURCE_EXCERPT_CAP_BYTES,
};
