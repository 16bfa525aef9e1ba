//! Phase 1: decompose an answer into atomic claims (spec §4.6 step 1).

use crate::support::{call_structured, deserialize_phase};
use rlm_transport::LlmTransport;
use rlm_types::{RefinementError, StructuredSpec};
use serde::{Deserialize, Serialize};

/// How a claim relates to the source material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimCategory {
    /// A checkable statement of fact.
    Factual,
    /// A conclusion drawn from other statements.
    Inference,
    /// An opinion or value judgment with no fact of the matter.
    Subjective,
}

/// One atomic claim extracted from an answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claim {
    /// Position in the decomposed list; stable across later phases.
    pub index: usize,
    /// The claim text, standalone and out of context.
    pub text: String,
    /// factual / inference / subjective.
    pub category: ClaimCategory,
    /// Model-reported confidence, 0.0-1.0.
    pub confidence: f32,
    /// Whether this claim can be checked at all (subjective claims
    /// usually cannot).
    pub verifiable: bool,
}

#[derive(Deserialize)]
struct RawClaim {
    text: String,
    category: ClaimCategory,
    confidence: f32,
    verifiable: bool,
}

#[derive(Deserialize)]
struct RawClaims {
    claims: Vec<RawClaim>,
}

fn spec() -> StructuredSpec {
    StructuredSpec::new(
        "claims",
        serde_json::json!({
            "required": ["claims"],
            "properties": {
                "claims": {
                    "type": "array",
                    "minItems": 3,
                    "maxItems": 10,
                    "items": {
                        "required": ["text", "category", "confidence", "verifiable"]
                    }
                }
            }
        }),
    )
}

/// Extract 3-10 atomic claims from `answer`, each categorized and
/// scored for confidence and verifiability.
pub async fn decompose(
    transport: &dyn LlmTransport,
    model: &str,
    answer: &str,
) -> Result<Vec<Claim>, RefinementError> {
    let instructions = format!(
        "Decompose the following answer into 3 to 10 atomic claims. Each \
         claim must stand on its own, out of context. Categorize each as \
         factual, inference, or subjective, report your confidence in it \
         (0.0-1.0), and mark whether it is verifiable against external \
         sources.\n\nAnswer:\n{answer}"
    );
    let value = call_structured(transport, model, &instructions, &spec()).await?;
    let raw: RawClaims = deserialize_phase(value)?;
    Ok(raw
        .claims
        .into_iter()
        .enumerate()
        .map(|(index, c)| Claim {
            index,
            text: c.text,
            category: c.category,
            confidence: c.confidence,
            verifiable: c.verifiable,
        })
        .collect())
}
