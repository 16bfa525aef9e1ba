//! Phase 4: cross-claim inconsistency detection (spec §4.6 step 4).

use crate::claim::Claim;
use crate::support::{call_structured, deserialize_phase};
use crate::verify::{Verdict, VerificationResult};
use rlm_transport::LlmTransport;
use rlm_types::{RefinementError, StructuredSpec};
use serde::{Deserialize, Serialize};

/// A contradiction or drift detected between two or more verified claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Inconsistency {
    /// Description of the contradiction.
    pub description: String,
    /// The [`Claim::index`] values involved.
    pub claim_indices: Vec<usize>,
}

#[derive(Deserialize)]
struct RawInconsistencies {
    inconsistencies: Vec<Inconsistency>,
}

fn spec() -> StructuredSpec {
    StructuredSpec::new(
        "inconsistencies",
        serde_json::json!({"required": ["inconsistencies"]}),
    )
}

/// Minimum number of verified (non-`uncertain`) claims before this
/// phase runs at all (spec §4.6: "when ≥2 verified claims exist").
pub const MIN_VERIFIED_CLAIMS: usize = 2;

/// Detect contradictions or drift across the verified claims. Returns
/// an empty list without calling the transport when fewer than
/// [`MIN_VERIFIED_CLAIMS`] claims were actually verified.
pub async fn detect_inconsistencies(
    transport: &dyn LlmTransport,
    model: &str,
    claims: &[Claim],
    verifications: &[VerificationResult],
) -> Result<Vec<Inconsistency>, RefinementError> {
    let verified: Vec<&VerificationResult> =
        verifications.iter().filter(|v| v.verdict != Verdict::Uncertain).collect();
    if verified.len() < MIN_VERIFIED_CLAIMS {
        return Ok(Vec::new());
    }

    let listing = verified
        .iter()
        .map(|v| {
            let text = claims
                .iter()
                .find(|c| c.index == v.claim_index)
                .map(|c| c.text.as_str())
                .unwrap_or("");
            format!(
                "{}. claim: {} | verdict: {:?} | independent answer: {}",
                v.claim_index,
                text,
                v.verdict,
                v.answer.as_deref().unwrap_or("")
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    let instructions = format!(
        "Given these independently verified claims, identify any \
         contradictions, inconsistencies, or drift between them. List \
         each claim's index involved in claim_indices.\n\n{listing}"
    );
    let value = call_structured(transport, model, &instructions, &spec()).await?;
    let raw: RawInconsistencies = deserialize_phase(value)?;
    Ok(raw.inconsistencies)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claim::ClaimCategory;
    use rlm_transport::StubTransport;
    use rlm_types::{CompletionResponse, StopReason, TokenUsage};

    fn completion(json: serde_json::Value) -> CompletionResponse {
        CompletionResponse {
            content: json.to_string(),
            stop_reason: StopReason::EndTurn,
            usage: TokenUsage::default(),
        }
    }

    fn verified(claim_index: usize, verdict: Verdict) -> VerificationResult {
        VerificationResult {
            claim_index,
            question: Some("q".into()),
            answer: Some("a".into()),
            verdict,
            correction: None,
            source: None,
        }
    }

    #[tokio::test]
    async fn fewer_than_two_verified_claims_skips_the_call() {
        let transport = StubTransport::new(vec![]);
        let claims = vec![Claim {
            index: 0,
            text: "x".into(),
            category: ClaimCategory::Factual,
            confidence: 0.9,
            verifiable: true,
        }];
        let verifications = vec![verified(0, Verdict::Correct)];
        let result = detect_inconsistencies(&transport, "test-model", &claims, &verifications)
            .await
            .unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn two_or_more_verified_claims_triggers_the_call() {
        let transport = StubTransport::new(vec![completion(serde_json::json!({
            "inconsistencies": [{"description": "conflict", "claim_indices": [0, 1]}]
        }))]);
        let claims = vec![
            Claim { index: 0, text: "a".into(), category: ClaimCategory::Factual, confidence: 0.9, verifiable: true },
            Claim { index: 1, text: "b".into(), category: ClaimCategory::Factual, confidence: 0.9, verifiable: true },
        ];
        let verifications = vec![verified(0, Verdict::Correct), verified(1, Verdict::Incorrect)];
        let result = detect_inconsistencies(&transport, "test-model", &claims, &verifications)
            .await
            .unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].claim_indices, vec![0, 1]);
    }
}
