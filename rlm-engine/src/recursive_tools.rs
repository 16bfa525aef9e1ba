//! `llm_query`/`rlm_query` bindings, registered directly onto the
//! sandbox's `rhai::Engine` rather than through [`rlm_tool::ToolRegistry`]
//! (spec §4.5 "Recursion"): unlike the Store-backed core tools, these
//! two need the transport and the Iteration Engine itself, and must
//! consult the shared recursion depth counter.
//!
//! Bridges async calls into rhai's synchronous native functions the
//! same way `rlm_tool::bridge::bind_registry` does: a captured
//! `tokio::runtime::Handle::block_on`, sound only because sandbox
//! evaluation runs inside `tokio::task::spawn_blocking`.

use crate::config::EngineConfig;
use crate::depth::DepthCounter;
use crate::engine::Engine;
use rlm_sandbox::Sandbox;
use rlm_transport::LlmTransport;
use rlm_types::{CompletionRequest, Message};
use std::sync::{Arc, OnceLock};

/// Fixed message returned in place of a recursive call once the depth
/// cap is reached. Never thrown (spec §7: "Recursion errors... are
/// returned as a fixed string/record from the tool itself").
pub const DEPTH_CAP_MESSAGE: &str = "recursion depth cap reached";

/// Dependencies needed to register `llm_query`/`rlm_query`.
pub struct RecursiveToolDeps {
    /// The LLM transport both bindings call through.
    pub transport: Arc<dyn LlmTransport>,
    /// The recursion depth counter shared with the parent engine.
    pub depth: DepthCounter,
    /// Set once the enclosing sandbox is sealed, so `rlm_query` can
    /// recurse into the same bound engine (tie-the-knot: the sandbox
    /// doesn't exist yet at registration time, only at call time).
    pub sandbox_cell: Arc<OnceLock<Sandbox>>,
    /// Model used for `llm_query`'s one-shot call and `rlm_query`'s
    /// sub-agent loop.
    pub model: String,
    /// Iteration cap for sub-agents spawned via `rlm_query`.
    pub sub_agent_max_iterations: usize,
    /// Token budget for sub-agents spawned via `rlm_query`.
    pub token_budget: usize,
}

/// Register both bindings onto `engine`.
pub fn register_recursive_tools(engine: &mut rhai::Engine, deps: RecursiveToolDeps) {
    let handle = tokio::runtime::Handle::current();

    {
        let transport = Arc::clone(&deps.transport);
        let depth = deps.depth.clone();
        let model = deps.model.clone();
        let handle = handle.clone();
        engine.register_fn(
            "llm_query",
            move |prompt: &str| -> Result<String, Box<rhai::EvalAltResult>> {
                let Some(_guard) = depth.try_enter() else {
                    return Ok(DEPTH_CAP_MESSAGE.to_string());
                };
                let request = CompletionRequest {
                    model: model.clone(),
                    messages: vec![Message::user(prompt)],
                    temperature: None,
                    timeout_ms: None,
                };
                let transport = Arc::clone(&transport);
                let result = handle.block_on(async move { transport.complete(request).await });
                result
                    .map(|response| response.content)
                    .map_err(|e| e.to_string().into())
            },
        );
    }

    {
        let transport = Arc::clone(&deps.transport);
        let depth = deps.depth.clone();
        let sandbox_cell = Arc::clone(&deps.sandbox_cell);
        let model = deps.model.clone();
        let max_iterations = deps.sub_agent_max_iterations;
        let token_budget = deps.token_budget;
        let handle = handle.clone();
        engine.register_fn(
            "rlm_query",
            move |prompt: &str| -> Result<rhai::Dynamic, Box<rhai::EvalAltResult>> {
                let Some(guard) = depth.try_enter() else {
                    return Ok(rhai::serde::to_dynamic(DEPTH_CAP_MESSAGE).unwrap_or(rhai::Dynamic::UNIT));
                };
                let sandbox = sandbox_cell
                    .get()
                    .expect("sandbox not yet bootstrapped when rlm_query was called")
                    .clone();
                let sub_engine = Engine::new(Arc::clone(&transport), sandbox, depth.clone());
                let mut sub_config = EngineConfig::new(model.clone());
                sub_config.max_iterations = max_iterations;
                sub_config.token_budget = token_budget;
                let prompt = prompt.to_string();
                let result =
                    handle.block_on(async move { sub_engine.run(vec![Message::user(prompt)], &sub_config).await });
                drop(guard);
                match result {
                    Ok(outcome) => Ok(rhai::serde::to_dynamic(outcome.answer).unwrap_or(rhai::Dynamic::UNIT)),
                    Err(e) => Err(e.to_string().into()),
                }
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rlm_sandbox::SandboxConfig;
    use rlm_transport::StubTransport;
    use rlm_types::{CompletionResponse, StopReason, TokenUsage};

    fn completion(text: &str) -> CompletionResponse {
        CompletionResponse {
            content: text.to_string(),
            stop_reason: StopReason::EndTurn,
            usage: TokenUsage::default(),
        }
    }

    #[tokio::test]
    async fn llm_query_returns_fixed_message_at_depth_cap() {
        let mut builder = rlm_sandbox::SandboxBuilder::new(SandboxConfig::default());
        let depth = DepthCounter::new(1);
        let _held = depth.try_enter().unwrap();
        register_recursive_tools(
            builder.engine_mut(),
            RecursiveToolDeps {
                transport: Arc::new(StubTransport::new(vec![completion("unused")])),
                depth: depth.clone(),
                sandbox_cell: Arc::new(OnceLock::new()),
                model: "test-model".to_string(),
                sub_agent_max_iterations: 10,
                token_budget: 1000,
            },
        );
        let sandbox = builder.build();
        let mut scope = rhai::Scope::new();
        let result = sandbox.execute(r#"llm_query("hi")"#, &mut scope).await;
        assert_eq!(result.result, serde_json::json!(DEPTH_CAP_MESSAGE));
    }

    #[tokio::test]
    async fn llm_query_returns_transport_content_when_under_cap() {
        let mut builder = rlm_sandbox::SandboxBuilder::new(SandboxConfig::default());
        let depth = DepthCounter::new(5);
        register_recursive_tools(
            builder.engine_mut(),
            RecursiveToolDeps {
                transport: Arc::new(StubTransport::new(vec![completion("the answer is 9")])),
                depth,
                sandbox_cell: Arc::new(OnceLock::new()),
                model: "test-model".to_string(),
                sub_agent_max_iterations: 10,
                token_budget: 1000,
            },
        );
        let sandbox = builder.build();
        let mut scope = rhai::Scope::new();
        let result = sandbox.execute(r#"llm_query("what is it?")"#, &mut scope).await;
        assert_eq!(result.result, serde_json::json!("the answer is 9"));
    }

    #[tokio::test]
    async fn rlm_query_runs_a_bounded_sub_agent_and_returns_its_final_answer() {
        let mut builder = rlm_sandbox::SandboxBuilder::new(SandboxConfig::default());
        let depth = DepthCounter::new(5);
        let sandbox_cell: Arc<OnceLock<Sandbox>> = Arc::new(OnceLock::new());
        register_recursive_tools(
            builder.engine_mut(),
            RecursiveToolDeps {
                transport: Arc::new(StubTransport::new(vec![completion(
                    &serde_json::json!({"thinking": "done", "code": ["FINAL(11)"]}).to_string(),
                )])),
                depth,
                sandbox_cell: Arc::clone(&sandbox_cell),
                model: "test-model".to_string(),
                sub_agent_max_iterations: 10,
                token_budget: 1000,
            },
        );
        let sandbox = builder.build();
        sandbox_cell.set(sandbox.clone()).ok();
        let mut scope = rhai::Scope::new();
        let result = sandbox.execute(r#"rlm_query("sub question")"#, &mut scope).await;
        assert_eq!(result.result["result"], 11);
    }
}
