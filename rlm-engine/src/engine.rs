//! The bounded iteration loop driving one query (spec §4.5).
//!
//! Grounded on `muninn-rlm`'s `run_exploration_loop`: reduce messages to
//! budget, call the backend, check the response for a `FINAL` pattern,
//! otherwise execute code and loop. Generalized here to rhai snippets,
//! dual-path `FINAL` detection (result or stdout), and a salvage path
//! when the iteration cap is reached without one.

use crate::config::EngineConfig;
use crate::feedback::build_feedback;
use crate::trace::{Execution, IterationRecord, Trace};
use rlm_context::{reduce_to_budget, DEFAULT_TAIL_WINDOW};
use rlm_sandbox::Sandbox;
use rlm_transport::LlmTransport;
use rlm_types::{CompletionRequest, EngineError, Message, StructuredSpec};
use std::sync::Arc;

use crate::depth::DepthCounter;

/// The result of running one query to completion (by `FINAL`, or by
/// exhausting `max_iterations` and salvaging a best-effort value).
pub struct QueryOutcome {
    /// The `FINAL` answer payload, or a salvaged local on exhaustion.
    pub answer: serde_json::Value,
    /// The complete per-iteration execution trace.
    pub trace: Trace,
    /// The full message log this query produced, including the turns
    /// the model saw and the feedback fed back to it.
    pub messages: Vec<Message>,
    /// Whether the query ended via `FINAL` rather than exhausting the
    /// iteration cap.
    pub reached_final: bool,
}

/// Drives the turn loop for one query: request, execute, detect
/// `FINAL`, feed back, repeat.
#[derive(Clone)]
pub struct Engine {
    transport: Arc<dyn LlmTransport>,
    sandbox: Sandbox,
    depth: DepthCounter,
}

impl Engine {
    /// Build an engine over a transport, a sealed sandbox (with tool
    /// bindings already registered), and a shared recursion depth
    /// counter.
    pub fn new(transport: Arc<dyn LlmTransport>, sandbox: Sandbox, depth: DepthCounter) -> Self {
        Self {
            transport,
            sandbox,
            depth,
        }
    }

    /// The shared depth counter this engine reads/writes.
    pub fn depth(&self) -> &DepthCounter {
        &self.depth
    }

    /// Run the loop to completion against `messages` (conversation so
    /// far, ending in the triggering user turn).
    pub async fn run(
        &self,
        mut messages: Vec<Message>,
        config: &EngineConfig,
    ) -> Result<QueryOutcome, EngineError> {
        if config.max_iterations == 0 {
            return Err(EngineError::InvalidConfig("max_iterations must be > 0".into()));
        }

        let mut scope = rhai::Scope::new();
        let mut trace = Trace::new();
        let mut last_local: Option<(String, serde_json::Value)> = None;

        for index in 0..config.max_iterations {
            let reduced = reduce_to_budget(&messages, config.token_budget, DEFAULT_TAIL_WINDOW);
            let request = CompletionRequest {
                model: config.model.clone(),
                messages: reduced,
                temperature: config.temperature,
                timeout_ms: None,
            };
            let response = self.transport.complete(request).await?;
            messages.push(Message::assistant(response.content.clone()));

            let (thinking, code_snippets) = parse_turn(&response.content);

            let mut executions = Vec::new();
            let mut final_answer = None;
            for (i, code) in code_snippets.iter().enumerate() {
                if code.trim().is_empty() {
                    continue;
                }
                let result = self.sandbox.execute(code, &mut scope).await;
                for (name, value) in &result.new_locals {
                    if !value.is_null() {
                        last_local = Some((name.clone(), value.clone()));
                    }
                }
                if final_answer.is_none() {
                    final_answer = rlm_sandbox::detect_final(&result.result, &result.stdout);
                }
                executions.push(Execution {
                    id: i,
                    code: code.clone(),
                    result: result.result,
                    stdout: result.stdout,
                    error: result.error,
                    duration_ms: result.duration_ms,
                });
                if final_answer.is_some() {
                    // further snippets in this turn are moot once FINAL fires.
                    break;
                }
            }

            let is_final = final_answer.is_some();
            trace.push(IterationRecord {
                index,
                thinking,
                executions: executions.clone(),
                is_final,
            });

            if let Some(answer) = final_answer {
                return Ok(QueryOutcome {
                    answer,
                    trace,
                    messages,
                    reached_final: true,
                });
            }

            let feedback = build_feedback(&executions);
            messages.push(Message::user(feedback));
        }

        let answer = last_local
            .map(|(name, value)| serde_json::json!({"salvaged_local": name, "value": value}))
            .unwrap_or(serde_json::Value::Null);
        Ok(QueryOutcome {
            answer,
            trace,
            messages,
            reached_final: false,
        })
    }
}

fn turn_spec() -> StructuredSpec {
    StructuredSpec::new(
        "turn",
        serde_json::json!({"required": ["thinking", "code"]}),
    )
}

/// Parse one assistant turn into `(thinking, code snippets)`. Falls
/// back to extracting fenced code blocks when the response doesn't
/// parse as the `{thinking, code}` contract at all (spec §4.5 step 2).
fn parse_turn(content: &str) -> (String, Vec<String>) {
    match turn_spec().parse(content) {
        Ok(value) => {
            let thinking = value
                .get("thinking")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            let code = value
                .get("code")
                .and_then(|v| v.as_array())
                .map(|arr| arr.iter().filter_map(|v| v.as_str().map(String::from)).collect())
                .unwrap_or_default();
            (thinking, code)
        }
        Err(_) => (content.trim().to_string(), extract_fenced_blocks(content)),
    }
}

/// Extract the body of each ` ```lang? ... ``` ` block in `text`, in order.
fn extract_fenced_blocks(text: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find("```") {
        let after_fence = &rest[start + 3..];
        let body_start = after_fence.find('\n').map(|i| i + 1).unwrap_or(0);
        let body = &after_fence[body_start..];
        match body.find("```") {
            Some(end) => {
                blocks.push(body[..end].trim().to_string());
                rest = &body[end + 3..];
            }
            None => break,
        }
    }
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;
    use rlm_sandbox::{SandboxBuilder, SandboxConfig};
    use rlm_transport::StubTransport;
    use rlm_types::{CompletionResponse, StopReason, TokenUsage};

    fn turn(thinking: &str, code: &[&str]) -> CompletionResponse {
        CompletionResponse {
            content: serde_json::json!({"thinking": thinking, "code": code}).to_string(),
            stop_reason: StopReason::EndTurn,
            usage: TokenUsage::default(),
        }
    }

    #[tokio::test]
    async fn final_call_terminates_the_loop_immediately() {
        let transport = Arc::new(StubTransport::new(vec![turn(
            "answering",
            &["FINAL(\"42\")"],
        )]));
        let sandbox = SandboxBuilder::new(SandboxConfig::default()).build();
        let engine = Engine::new(transport, sandbox, DepthCounter::new(5));
        let outcome = engine
            .run(vec![Message::user("what is the answer")], &EngineConfig::new("test-model"))
            .await
            .unwrap();
        assert!(outcome.reached_final);
        assert_eq!(outcome.answer["result"], "42");
        assert_eq!(outcome.trace.iterations.len(), 1);
    }

    #[tokio::test]
    async fn non_final_turn_appends_feedback_and_continues() {
        let transport = Arc::new(StubTransport::new(vec![
            turn("looking around", &["1 + 1"]),
            turn("done", &["FINAL(3)"]),
        ]));
        let sandbox = SandboxBuilder::new(SandboxConfig::default()).build();
        let engine = Engine::new(transport, sandbox, DepthCounter::new(5));
        let outcome = engine
            .run(vec![Message::user("compute")], &EngineConfig::new("test-model"))
            .await
            .unwrap();
        assert!(outcome.reached_final);
        assert_eq!(outcome.trace.iterations.len(), 2);
        assert!(outcome
            .messages
            .iter()
            .any(|m| m.text().contains("<result_0>")));
    }

    #[tokio::test]
    async fn exhausting_iterations_salvages_last_useful_local() {
        let transport = Arc::new(StubTransport::new(vec![
            turn("step", &["let answer = 7;"]),
            turn("stuck", &["let answer = 8;"]),
        ]));
        let sandbox = SandboxBuilder::new(SandboxConfig::default()).build();
        let engine = Engine::new(transport, sandbox, DepthCounter::new(5));
        let mut config = EngineConfig::new("test-model");
        config.max_iterations = 2;
        let outcome = engine
            .run(vec![Message::user("compute")], &config)
            .await
            .unwrap();
        assert!(!outcome.reached_final);
        assert_eq!(outcome.answer["salvaged_local"], "answer");
        assert_eq!(outcome.answer["value"], 8);
    }

    #[tokio::test]
    async fn fenced_code_block_is_used_when_json_parse_fails() {
        let transport = Arc::new(StubTransport::new(vec![CompletionResponse {
            content: "here goes:\n```rhai\nFINAL(5)\n```".to_string(),
            stop_reason: StopReason::EndTurn,
            usage: TokenUsage::default(),
        }]));
        let sandbox = SandboxBuilder::new(SandboxConfig::default()).build();
        let engine = Engine::new(transport, sandbox, DepthCounter::new(5));
        let outcome = engine
            .run(vec![Message::user("compute")], &EngineConfig::new("test-model"))
            .await
            .unwrap();
        assert!(outcome.reached_final);
        assert_eq!(outcome.answer["result"], 5);
    }

    #[tokio::test]
    async fn zero_max_iterations_is_rejected() {
        let transport = Arc::new(StubTransport::new(vec![]));
        let sandbox = SandboxBuilder::new(SandboxConfig::default()).build();
        let engine = Engine::new(transport, sandbox, DepthCounter::new(5));
        let mut config = EngineConfig::new("test-model");
        config.max_iterations = 0;
        let result = engine.run(vec![Message::user("x")], &config).await;
        assert!(matches!(result, Err(EngineError::InvalidConfig(_))));
    }
}
