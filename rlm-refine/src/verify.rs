//! Phases 2 and 3: plan verification questions, then answer each one
//! independently (spec §4.6 steps 2-3).

use crate::claim::{Claim, ClaimCategory};
use crate::support::{call_structured, deserialize_phase};
use futures::stream::{self, StreamExt};
use rlm_transport::LlmTransport;
use rlm_types::{RefinementError, StructuredSpec};
use serde::{Deserialize, Serialize};

/// A standalone verification question generated for one verifiable claim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationQuestion {
    /// The [`Claim::index`] this question was generated for.
    pub claim_index: usize,
    /// The question text, answerable without having seen the claim.
    pub question: String,
}

#[derive(Deserialize)]
struct RawQuestions {
    questions: Vec<VerificationQuestion>,
}

fn plan_spec() -> StructuredSpec {
    StructuredSpec::new(
        "verification_questions",
        serde_json::json!({"required": ["questions"]}),
    )
}

/// Generate one standalone verification question per verifiable claim,
/// without answering any of them yet.
pub async fn plan_verify(
    transport: &dyn LlmTransport,
    model: &str,
    claims: &[Claim],
) -> Result<Vec<VerificationQuestion>, RefinementError> {
    let verifiable: Vec<&Claim> = claims.iter().filter(|c| c.verifiable).collect();
    if verifiable.is_empty() {
        return Ok(Vec::new());
    }
    let listing = verifiable
        .iter()
        .map(|c| format!("{}. {}", c.index, c.text))
        .collect::<Vec<_>>()
        .join("\n");
    let instructions = format!(
        "For each of the following claims, write one standalone \
         verification question that could be used to check it, without \
         answering it yet. Reference each claim by its number as \
         claim_index.\n\n{listing}"
    );
    let value = call_structured(transport, model, &instructions, &plan_spec()).await?;
    let raw: RawQuestions = deserialize_phase(value)?;
    Ok(raw.questions)
}

/// Verdict on one verification question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// The claim checks out.
    Correct,
    /// The claim is wrong.
    Incorrect,
    /// The claim is partially right.
    PartiallyCorrect,
    /// No LLM call was made, or the call could not reach a verdict.
    Uncertain,
}

/// The outcome of verifying one claim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResult {
    /// The [`Claim::index`] this result is for.
    pub claim_index: usize,
    /// The question asked, if any (absent for claims skipped without a call).
    pub question: Option<String>,
    /// The independent answer the verification call produced.
    pub answer: Option<String>,
    /// correct / incorrect / partially_correct / uncertain.
    pub verdict: Verdict,
    /// A suggested correction, when the verdict isn't `correct`.
    pub correction: Option<String>,
    /// A pointer into the supplied source material, when one was used.
    pub source: Option<String>,
}

impl VerificationResult {
    fn uncertain(claim_index: usize) -> Self {
        Self {
            claim_index,
            question: None,
            answer: None,
            verdict: Verdict::Uncertain,
            correction: None,
            source: None,
        }
    }
}

/// An excerpt of a source document made available to per-claim
/// verification, already truncated to its fair share of the byte cap.
#[derive(Debug, Clone)]
pub struct SourceExcerpt {
    /// Identifier surfaced back in [`VerificationResult::source`].
    pub document_id: String,
    /// The (possibly truncated) document text.
    pub text: String,
}

/// Default total byte budget for source excerpts handed to a single
/// per-claim verification call, split fairly across documents.
pub const DEFAULT_SOURCE_EXCERPT_CAP_BYTES: usize = 4000;

/// Truncate `documents` so their combined text fits within `cap_bytes`,
/// giving each document an equal share of the budget.
pub fn truncate_source_excerpts(documents: &[SourceExcerpt], cap_bytes: usize) -> Vec<SourceExcerpt> {
    if documents.is_empty() {
        return Vec::new();
    }
    let share = cap_bytes / documents.len();
    documents
        .iter()
        .map(|doc| {
            let mut end = doc.text.len().min(share);
            while end > 0 && !doc.text.is_char_boundary(end) {
                end -= 1;
            }
            SourceExcerpt {
                document_id: doc.document_id.clone(),
                text: doc.text[..end].to_string(),
            }
        })
        .collect()
}

fn verify_spec() -> StructuredSpec {
    StructuredSpec::new(
        "verification",
        serde_json::json!({"required": ["answer", "verdict"]}),
    )
}

#[derive(Deserialize)]
struct RawVerification {
    answer: String,
    verdict: Verdict,
    correction: Option<String>,
    source: Option<String>,
}

async fn verify_one(
    transport: &dyn LlmTransport,
    model: &str,
    claim: &Claim,
    question: &str,
    excerpts: &[SourceExcerpt],
) -> Result<VerificationResult, RefinementError> {
    let mut instructions = format!(
        "Claim: {}\nVerification question: {question}\n\nAnswer the \
         question independently, then give a verdict of correct, \
         incorrect, partially_correct, or uncertain for the claim. If \
         the claim is not fully correct, suggest a correction.",
        claim.text
    );
    if !excerpts.is_empty() {
        instructions.push_str("\n\nSource material:\n");
        for excerpt in excerpts {
            instructions.push_str(&format!("[{}]\n{}\n", excerpt.document_id, excerpt.text));
        }
        instructions.push_str(
            "\nWhen the claim is checkable against this material, cite which \
             document supports your verdict in `source`.",
        );
    }
    let value = call_structured(transport, model, &instructions, &verify_spec()).await?;
    let raw: RawVerification = deserialize_phase(value)?;
    Ok(VerificationResult {
        claim_index: claim.index,
        question: Some(question.to_string()),
        answer: Some(raw.answer),
        verdict: raw.verdict,
        correction: raw.correction,
        source: raw.source,
    })
}

/// Verify every claim: subjective or non-verifiable claims are marked
/// `uncertain` without a call; the rest are checked independently, with
/// up to `max_concurrency` calls in flight at once, preserving the
/// input claim order in the returned vector (spec §5: "total order of
/// `verifications` matches order of `claims`").
pub async fn per_claim_verify(
    transport: &dyn LlmTransport,
    model: &str,
    claims: &[Claim],
    questions: &[VerificationQuestion],
    source_excerpts: &[SourceExcerpt],
    max_concurrency: usize,
) -> Result<Vec<VerificationResult>, RefinementError> {
    let question_for = |claim_index: usize| {
        questions
            .iter()
            .find(|q| q.claim_index == claim_index)
            .map(|q| q.question.clone())
    };

    let mut pending = Vec::new();
    let mut results: Vec<Option<VerificationResult>> = Vec::with_capacity(claims.len());
    for claim in claims {
        if claim.category == ClaimCategory::Subjective || !claim.verifiable {
            results.push(Some(VerificationResult::uncertain(claim.index)));
            continue;
        }
        match question_for(claim.index) {
            Some(question) => {
                results.push(None);
                pending.push((results.len() - 1, claim, question));
            }
            None => results.push(Some(VerificationResult::uncertain(claim.index))),
        }
    }

    let max_concurrency = max_concurrency.max(1);
    let outcomes: Vec<(usize, Result<VerificationResult, RefinementError>)> = stream::iter(pending)
        .map(|(slot, claim, question)| async move {
            let outcome = verify_one(transport, model, claim, &question, source_excerpts).await;
            (slot, outcome)
        })
        .buffer_unordered(max_concurrency)
        .collect()
        .await;

    for (slot, outcome) in outcomes {
        results[slot] = Some(outcome?);
    }

    Ok(results.into_iter().map(|r| r.expect("every slot filled")).collect())
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

    fn claim(index: usize, category: ClaimCategory, verifiable: bool) -> Claim {
        Claim {
            index,
            text: format!("claim {index}"),
            category,
            confidence: 0.8,
            verifiable,
        }
    }

    #[tokio::test]
    async fn plan_verify_skips_when_nothing_is_verifiable() {
        let transport = StubTransport::new(vec![]);
        let claims = vec![claim(0, ClaimCategory::Subjective, false)];
        let questions = plan_verify(&transport, "test-model", &claims).await.unwrap();
        assert!(questions.is_empty());
    }

    #[tokio::test]
    async fn plan_verify_returns_generated_questions() {
        let transport = StubTransport::new(vec![completion(serde_json::json!({
            "questions": [{"claim_index": 0, "question": "is this true?"}]
        }))]);
        let claims = vec![claim(0, ClaimCategory::Factual, true)];
        let questions = plan_verify(&transport, "test-model", &claims).await.unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].claim_index, 0);
    }

    #[tokio::test]
    async fn per_claim_verify_marks_subjective_claims_uncertain_without_a_call() {
        let transport = StubTransport::new(vec![]);
        let claims = vec![claim(0, ClaimCategory::Subjective, false)];
        let results = per_claim_verify(&transport, "test-model", &claims, &[], &[], 4)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].verdict, Verdict::Uncertain);
    }

    #[tokio::test]
    async fn per_claim_verify_preserves_claim_order_despite_concurrency() {
        let transport = StubTransport::new(vec![
            completion(serde_json::json!({"answer": "ok0", "verdict": "correct"})),
            completion(serde_json::json!({"answer": "ok1", "verdict": "incorrect"})),
        ]);
        let claims = vec![
            claim(0, ClaimCategory::Factual, true),
            claim(1, ClaimCategory::Factual, true),
        ];
        let questions = vec![
            VerificationQuestion { claim_index: 0, question: "q0".into() },
            VerificationQuestion { claim_index: 1, question: "q1".into() },
        ];
        let results = per_claim_verify(&transport, "test-model", &claims, &questions, &[], 4)
            .await
            .unwrap();
        assert_eq!(results[0].claim_index, 0);
        assert_eq!(results[1].claim_index, 1);
    }

    #[test]
    fn source_excerpts_split_the_cap_fairly() {
        let docs = vec![
            SourceExcerpt { document_id: "a".into(), text: "x".repeat(100) },
            SourceExcerpt { document_id: "b".into(), text: "y".repeat(100) },
        ];
        let truncated = truncate_source_excerpts(&docs, 40);
        assert_eq!(truncated[0].text.len(), 20);
        assert_eq!(truncated[1].text.len(), 20);
    }
}
