//! Stopping policy and overall pipeline configuration (spec §4.6:
//! "after fixed `iterations` (default 3) or when the evaluation's
//! overall score crosses a threshold (default 0.9), per a configurable
//! policy").

use crate::evaluate::CriteriaWeights;
use crate::verify::DEFAULT_SOURCE_EXCERPT_CAP_BYTES;

/// Default number of refinement iterations under the `fixed`/`both` policies.
pub const DEFAULT_ITERATIONS: usize = 3;
/// Default overall-score threshold under the `threshold`/`both` policies.
pub const DEFAULT_THRESHOLD: f32 = 0.9;
/// Default bound on concurrent per-claim verification calls.
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// How the refinement loop decides to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoppingPolicy {
    /// Stop only once the overall score crosses the threshold.
    Threshold,
    /// Stop only once `iterations` refinement rounds have run.
    Fixed,
    /// Stop at whichever of the above happens first.
    Both,
}

impl StoppingPolicy {
    /// Whether the loop should stop after `completed_iterations` rounds
    /// produced `score` as their latest overall evaluation score.
    pub fn should_stop(self, completed_iterations: usize, max_iterations: usize, score: f32, threshold: f32) -> bool {
        let fixed_done = completed_iterations >= max_iterations;
        let threshold_met = score >= threshold;
        match self {
            Self::Fixed => fixed_done,
            Self::Threshold => threshold_met,
            Self::Both => fixed_done || threshold_met,
        }
    }
}

/// Tunables for one [`crate::pipeline::run_refinement`] call.
#[derive(Debug, Clone)]
pub struct RefinementConfig {
    /// Model used for every phase call.
    pub model: String,
    /// Max refinement rounds under `fixed`/`both` (spec default 3).
    pub iterations: usize,
    /// Score at which `threshold`/`both` stop early (spec default 0.9).
    pub threshold: f32,
    /// Which stopping rule to apply.
    pub policy: StoppingPolicy,
    /// Max concurrent per-claim verification calls.
    pub max_concurrency: usize,
    /// Total byte budget for source excerpts per verification call,
    /// shared fairly across documents.
    pub source_excerpt_cap_bytes: usize,
    /// Weights for the evaluation phase's criteria.
    pub criteria_weights: CriteriaWeights,
}

impl RefinementConfig {
    /// A config using every spec-stated default for `model`.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            iterations: DEFAULT_ITERATIONS,
            threshold: DEFAULT_THRESHOLD,
            policy: StoppingPolicy::Both,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            source_excerpt_cap_bytes: DEFAULT_SOURCE_EXCERPT_CAP_BYTES,
            criteria_weights: CriteriaWeights::default(),
        }
    }
}
