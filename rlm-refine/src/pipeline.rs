//! Orchestrates the six phases into one refinement run (spec §4.6).

use crate::claim::{decompose, Claim};
use crate::evaluate::{evaluate, Evaluation};
use crate::gradient::{summarize, GradientSummary, DEFAULT_WINDOW_SIZE};
use crate::inconsistency::{detect_inconsistencies, Inconsistency, MIN_VERIFIED_CLAIMS};
use crate::policy::RefinementConfig;
use crate::revise::revise;
use crate::verify::{per_claim_verify, plan_verify, truncate_source_excerpts, SourceExcerpt, Verdict, VerificationResult};
use rlm_transport::LlmTransport;
use rlm_types::RefinementError;

/// Everything a refinement run produced, beyond the final answer
/// itself: useful for persisting claims/verifications and for
/// debugging via the gradient summary.
#[derive(Debug, Clone)]
pub struct RefinementOutcome {
    /// The answer after the last iteration's revision (or the original
    /// answer, if the very first evaluation already stopped the loop).
    pub answer: String,
    /// Claims decomposed on the final iteration.
    pub claims: Vec<Claim>,
    /// Verification results for those claims, in claim order.
    pub verifications: Vec<VerificationResult>,
    /// Inconsistencies detected on the final iteration.
    pub inconsistencies: Vec<Inconsistency>,
    /// One evaluation per iteration run, in order.
    pub evaluations: Vec<Evaluation>,
    /// Score trend across the run's evaluations.
    pub gradient: GradientSummary,
    /// Number of evaluate-and-maybe-revise rounds actually run.
    pub iterations_run: usize,
}

/// Run the refinement pipeline over `initial_answer`, decomposing it
/// into claims, verifying them, checking for cross-claim
/// inconsistencies, scoring the result, and revising until the
/// configured stopping policy is satisfied.
///
/// When `source_documents` is non-empty, the run is forced to a single
/// iteration and per-claim verification requests citation info against
/// those documents (spec §4.6).
pub async fn run_refinement(
    transport: &dyn LlmTransport,
    original_query: &str,
    initial_answer: &str,
    config: &RefinementConfig,
    source_documents: &[SourceExcerpt],
) -> Result<RefinementOutcome, RefinementError> {
    let max_iterations = if source_documents.is_empty() {
        config.iterations.max(1)
    } else {
        1
    };
    let excerpts = truncate_source_excerpts(source_documents, config.source_excerpt_cap_bytes);

    let mut answer = initial_answer.to_string();
    let mut evaluations = Vec::new();
    let mut last_claims = Vec::new();
    let mut last_verifications = Vec::new();
    let mut last_inconsistencies = Vec::new();

    for completed in 1..=max_iterations {
        let claims = decompose(transport, &config.model, &answer).await?;
        let questions = plan_verify(transport, &config.model, &claims).await?;
        let verifications = per_claim_verify(
            transport,
            &config.model,
            &claims,
            &questions,
            &excerpts,
            config.max_concurrency,
        )
        .await?;
        let verified_count = verifications.iter().filter(|v| v.verdict != Verdict::Uncertain).count();
        let inconsistencies = if verified_count >= MIN_VERIFIED_CLAIMS {
            detect_inconsistencies(transport, &config.model, &claims, &verifications).await?
        } else {
            Vec::new()
        };
        let evaluation = evaluate(
            transport,
            &config.model,
            &answer,
            &verifications,
            &inconsistencies,
            &config.criteria_weights,
        )
        .await?;

        let score = evaluation.overall_score;
        evaluations.push(evaluation.clone());
        last_claims = claims;
        last_verifications = verifications;
        last_inconsistencies = inconsistencies;

        tracing::debug!(iteration = completed, score, "refinement iteration scored");

        if config.policy.should_stop(completed, max_iterations, score, config.threshold) {
            break;
        }

        answer = revise(
            transport,
            &config.model,
            original_query,
            &answer,
            &last_verifications,
            &last_inconsistencies,
            &evaluation,
        )
        .await?;
    }

    let scores: Vec<f32> = evaluations.iter().map(|e| e.overall_score).collect();
    let gradient = summarize(&scores, DEFAULT_WINDOW_SIZE);
    let iterations_run = evaluations.len();

    Ok(RefinementOutcome {
        answer,
        claims: last_claims,
        verifications: last_verifications,
        inconsistencies: last_inconsistencies,
        evaluations,
        gradient,
        iterations_run,
    })
}
