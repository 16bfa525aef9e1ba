//! Phase 5: score the answer against a weighted criteria set (spec
//! §4.6 step 5).

use crate::inconsistency::Inconsistency;
use crate::support::{call_structured, deserialize_phase};
use crate::verify::VerificationResult;
use rlm_transport::LlmTransport;
use rlm_types::{RefinementError, StructuredSpec};
use serde::{Deserialize, Serialize};

/// Per-criterion scores, each 0.0-1.0. `bias` is inverse: 0 is best.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CriteriaScores {
    /// Factual accuracy.
    pub accuracy: f32,
    /// Coverage of the question asked.
    pub completeness: f32,
    /// How on-topic the answer is.
    pub relevance: f32,
    /// Internal coherence.
    pub coherence: f32,
    /// Even-handedness.
    pub fairness: f32,
    /// Amount of bias detected; 0.0 is best, 1.0 is worst.
    pub bias: f32,
}

/// Weights applied to each criterion when computing the overall score.
/// `bias` is inverted (`1.0 - bias`) before weighting since lower is
/// better there, unlike the other five criteria.
#[derive(Debug, Clone, Copy)]
pub struct CriteriaWeights {
    /// Weight for `accuracy`.
    pub accuracy: f32,
    /// Weight for `completeness`.
    pub completeness: f32,
    /// Weight for `relevance`.
    pub relevance: f32,
    /// Weight for `coherence`.
    pub coherence: f32,
    /// Weight for `fairness`.
    pub fairness: f32,
    /// Weight for the inverted `bias` score.
    pub bias: f32,
}

impl Default for CriteriaWeights {
    fn default() -> Self {
        Self {
            accuracy: 0.3,
            completeness: 0.2,
            relevance: 0.2,
            coherence: 0.15,
            fairness: 0.1,
            bias: 0.05,
        }
    }
}

impl CriteriaScores {
    /// The weighted overall score, 0.0-1.0.
    pub fn weighted(&self, weights: &CriteriaWeights) -> f32 {
        let total_weight = weights.accuracy
            + weights.completeness
            + weights.relevance
            + weights.coherence
            + weights.fairness
            + weights.bias;
        if total_weight <= 0.0 {
            return 0.0;
        }
        (self.accuracy * weights.accuracy
            + self.completeness * weights.completeness
            + self.relevance * weights.relevance
            + self.coherence * weights.coherence
            + self.fairness * weights.fairness
            + (1.0 - self.bias) * weights.bias)
            / total_weight
    }
}

/// The result of evaluating one answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evaluation {
    /// Per-criterion scores as reported by the model.
    pub criteria: CriteriaScores,
    /// The weighted overall score, 0.0-1.0.
    pub overall_score: f32,
    /// False if any high-severity issue was found.
    pub correct: bool,
    /// Issues found, most severe first.
    pub issues: Vec<String>,
    /// A short prose summary of the evaluation.
    pub summary: String,
}

#[derive(Deserialize)]
struct RawEvaluation {
    criteria: CriteriaScores,
    correct: bool,
    issues: Vec<String>,
    summary: String,
}

fn spec() -> StructuredSpec {
    StructuredSpec::new(
        "evaluation",
        serde_json::json!({"required": ["criteria", "correct", "issues", "summary"]}),
    )
}

/// Score `answer` against the weighted criteria set, folding in the
/// per-claim verification results and any detected inconsistencies.
pub async fn evaluate(
    transport: &dyn LlmTransport,
    model: &str,
    answer: &str,
    verifications: &[VerificationResult],
    inconsistencies: &[Inconsistency],
    weights: &CriteriaWeights,
) -> Result<Evaluation, RefinementError> {
    let verification_summary = verifications
        .iter()
        .map(|v| format!("claim {}: {:?}", v.claim_index, v.verdict))
        .collect::<Vec<_>>()
        .join("\n");
    let inconsistency_summary = if inconsistencies.is_empty() {
        "none detected".to_string()
    } else {
        inconsistencies.iter().map(|i| i.description.clone()).collect::<Vec<_>>().join("\n")
    };
    let instructions = format!(
        "Score this answer against these criteria, each 0.0-1.0: \
         accuracy, completeness, relevance, coherence, fairness, and bias \
         (for bias, 0.0 is best). Report correct=false if any \
         high-severity issue exists.\n\nAnswer:\n{answer}\n\n\
         Claim verifications:\n{verification_summary}\n\n\
         Inconsistencies:\n{inconsistency_summary}"
    );
    let value = call_structured(transport, model, &instructions, &spec()).await?;
    let raw: RawEvaluation = deserialize_phase(value)?;
    let overall_score = raw.criteria.weighted(weights);
    Ok(Evaluation {
        criteria: raw.criteria,
        overall_score,
        correct: raw.correct,
        issues: raw.issues,
        summary: raw.summary,
    })
}
