//! Phase 6: produce an improved answer (spec §4.6 step 6).

use crate::evaluate::Evaluation;
use crate::inconsistency::Inconsistency;
use crate::support::{call_structured, deserialize_phase};
use crate::verify::VerificationResult;
use rlm_transport::LlmTransport;
use rlm_types::{RefinementError, StructuredSpec};
use serde::Deserialize;

fn spec() -> StructuredSpec {
    StructuredSpec::new("revised_answer", serde_json::json!({"required": ["answer"]}))
}

#[derive(Deserialize)]
struct RawRevision {
    answer: String,
}

/// Re-ask the model for an improved answer, incorporating the
/// verification results, detected inconsistencies, and evaluation
/// issues, while preserving already-verified content.
pub async fn revise(
    transport: &dyn LlmTransport,
    model: &str,
    original_query: &str,
    answer: &str,
    verifications: &[VerificationResult],
    inconsistencies: &[Inconsistency],
    evaluation: &Evaluation,
) -> Result<String, RefinementError> {
    let corrections = verifications
        .iter()
        .filter_map(|v| v.correction.as_ref().map(|c| format!("claim {}: {c}", v.claim_index)))
        .collect::<Vec<_>>()
        .join("\n");
    let inconsistency_notes =
        inconsistencies.iter().map(|i| i.description.clone()).collect::<Vec<_>>().join("\n");
    let issue_notes = evaluation.issues.join("\n");
    let instructions = format!(
        "Original question:\n{original_query}\n\nCurrent answer:\n{answer}\n\n\
         Revise the answer to incorporate the following, while preserving \
         every part of the current answer that was already verified \
         correct. Only change what needs changing.\n\n\
         Suggested corrections:\n{corrections}\n\n\
         Detected inconsistencies:\n{inconsistency_notes}\n\n\
         Evaluation issues:\n{issue_notes}"
    );
    let value = call_structured(transport, model, &instructions, &spec()).await?;
    let raw: RawRevision = deserialize_phase(value)?;
    Ok(raw.answer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rlm_transport::StubTransport;
    use rlm_types::{CompletionResponse, StopReason, TokenUsage};

    fn completion(json: serde_json::Value) -> CompletionResponse {
        CompletionResponse {
            content: json.to_string(),
            stop_reason: StopReason::EndTurn,
            usage: TokenUsage::default(),
        }
    }

    #[tokio::test]
    async fn revise_returns_the_revised_answer_text() {
        let transport = StubTransport::new(vec![completion(
            serde_json::json!({"answer": "the corrected answer"}),
        )]);
        let evaluation = Evaluation {
            criteria: crate::evaluate::CriteriaScores {
                accuracy: 0.5,
                completeness: 0.5,
                relevance: 0.5,
                coherence: 0.5,
                fairness: 0.5,
                bias: 0.5,
            },
            overall_score: 0.5,
            correct: false,
            issues: vec!["missing detail".into()],
            summary: "needs work".into(),
        };
        let revised = revise(
            &transport,
            "test-model",
            "what is x?",
            "x is something",
            &[],
            &[],
            &evaluation,
        )
        .await
        .unwrap();
        assert_eq!(revised, "the corrected answer");
    }
}
