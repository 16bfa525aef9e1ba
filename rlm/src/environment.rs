//! The Environment Facade (spec §4.8): `create-env`, `register-fn!`,
//! `register-def!`, `ingest!`, `query!`, `dispose!`.
//!
//! One [`Environment`] owns a store, a transport, and a tool binding
//! table, and serializes `ingest!`/`query!` calls against itself
//! through `call_lock` (§5: "a single logical writer per environment").
//! `query!` builds a fresh sandbox on every call from the registry's
//! current contents, so newly `register-fn!`/`register-def!`-ed
//! bindings take effect on the very next query without re-creating the
//! environment.

use crate::config::EnvConfig;
use crate::ingest::RlmIngestOptions;
use crate::query::{QueryResult, RlmQueryOptions};
use crate::registration::{validate_doc, validate_symbol, UserDef, UserFn};
use rlm_engine::{build_sandbox, DepthCounter, Engine, EngineConfig};
use rlm_ingest::{DocumentIngestResult, InputDocument};
use rlm_refine::{run_refinement, RefinementConfig, SourceExcerpt, Verdict};
use rlm_sandbox::SandboxConfig;
use rlm_store::{Claim, Store, VerificationVerdict};
use rlm_tool::{core_tools, OutputTruncator, ToolDyn, ToolMiddleware, ToolRegistry, ToolTier, TracingMiddleware};
use rlm_transport::{HttpTransport, LlmTransport};
use rlm_types::{EnvError, Message, ToolError};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use uuid::Uuid;

/// Tool output strings above this length are truncated before reaching
/// the model (mirrors the teacher's output-formatting cap).
const DEFAULT_TOOL_OUTPUT_CHARS: usize = 4_000;

/// A running RLM environment: a store, a transport, and a tool binding
/// table, plus the configuration `query!` falls back to.
pub struct Environment {
    store: Arc<Store>,
    transport: Arc<dyn LlmTransport>,
    default_model: String,
    registry: tokio::sync::Mutex<ToolRegistry>,
    middleware: Arc<Vec<Arc<dyn ToolMiddleware>>>,
    sandbox_config: SandboxConfig,
    max_recursion_depth: usize,
    call_lock: tokio::sync::Mutex<()>,
}

impl Environment {
    pub(crate) async fn new(config: EnvConfig, transport: Arc<dyn LlmTransport>) -> Result<Self, EnvError> {
        if config.api_key.trim().is_empty() {
            return Err(EnvError::InvalidConfig("api_key must not be blank".to_string()));
        }
        if config.base_url.trim().is_empty() {
            return Err(EnvError::InvalidConfig("base_url must not be blank".to_string()));
        }
        if config.default_model.trim().is_empty() {
            return Err(EnvError::InvalidConfig("default_model must not be blank".to_string()));
        }

        let store = open_store(&config).await?;
        let store = Arc::new(store);

        let mut registry = ToolRegistry::new();
        for tool in core_tools(Arc::clone(&store)) {
            registry.register(tool, ToolTier::Core);
        }

        let middleware: Vec<Arc<dyn ToolMiddleware>> = vec![
            Arc::new(TracingMiddleware),
            Arc::new(OutputTruncator { max_chars: DEFAULT_TOOL_OUTPUT_CHARS }),
        ];

        Ok(Self {
            store,
            transport,
            default_model: config.default_model,
            registry: tokio::sync::Mutex::new(registry),
            middleware: Arc::new(middleware),
            sandbox_config: config.sandbox,
            max_recursion_depth: config.max_recursion_depth,
            call_lock: tokio::sync::Mutex::new(()),
        })
    }

    /// Register a callable function under `symbol`, documented by `doc`
    /// and described by a JSON Schema (spec §4.8's `register-fn!`).
    pub async fn register_fn<F, Fut>(
        &self,
        symbol: impl Into<String>,
        doc: impl Into<String>,
        schema: Value,
        f: F,
    ) -> Result<(), EnvError>
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ToolError>> + Send + 'static,
    {
        let symbol = symbol.into();
        let doc = doc.into();
        validate_symbol(&symbol)?;
        validate_doc(&doc)?;
        let tool: Arc<dyn ToolDyn> = Arc::new(UserFn { name: symbol, description: doc, schema, f });
        self.registry.lock().await.register(tool, ToolTier::UserRegistered);
        Ok(())
    }

    /// Register a constant value under `symbol` (spec §4.8's
    /// `register-def!`), exposed to the sandbox as a zero-argument
    /// binding that always returns it.
    pub async fn register_def(
        &self,
        symbol: impl Into<String>,
        doc: impl Into<String>,
        value: Value,
    ) -> Result<(), EnvError> {
        let symbol = symbol.into();
        let doc = doc.into();
        validate_symbol(&symbol)?;
        validate_doc(&doc)?;
        let tool: Arc<dyn ToolDyn> = Arc::new(UserDef { name: symbol, description: doc, value });
        self.registry.lock().await.register(tool, ToolTier::UserRegistered);
        Ok(())
    }

    /// Run the ingestion pipeline over `documents` (spec §4.8's
    /// `ingest!`), flushing the store once on completion.
    pub async fn ingest(
        &self,
        documents: Vec<InputDocument>,
        opts: RlmIngestOptions,
    ) -> Result<Vec<DocumentIngestResult>, EnvError> {
        let _gate = self.call_lock.lock().await;
        let model = opts.extraction_model.clone().unwrap_or_else(|| self.default_model.clone());
        let results = rlm_ingest::ingest(
            &self.store,
            self.transport.as_ref(),
            &model,
            documents,
            &opts.into_ingest_options(),
        )
        .await?;
        Ok(results)
    }

    /// Run one query to completion (spec §4.8's `query!`): build a
    /// fresh sandbox from the current registration table, drive the
    /// Iteration Engine, optionally refine the answer, persist any
    /// claims produced, record an example, and flush once.
    pub async fn query(&self, query_str: &str, opts: &RlmQueryOptions) -> Result<QueryResult, EnvError> {
        let _gate = self.call_lock.lock().await;
        let started = std::time::Instant::now();
        let model = opts.model.clone().unwrap_or_else(|| self.default_model.clone());

        let mut engine_config = EngineConfig::new(model.clone());
        if let Some(max_iterations) = opts.max_iterations {
            engine_config.max_iterations = max_iterations;
        }
        if let Some(token_budget) = opts.max_context_tokens {
            engine_config.token_budget = token_budget;
        }
        engine_config.max_recursion_depth = opts.max_recursion_depth.unwrap_or(self.max_recursion_depth);
        engine_config.output_spec = opts.spec.clone();
        engine_config.examples_enabled = opts.learn.unwrap_or(true);
        engine_config.allow_custom_bindings = opts.allow_custom_bindings;

        let depth = DepthCounter::new(engine_config.max_recursion_depth);

        let (system_prompt, sandbox) = {
            let registry = self.registry.lock().await;
            let sandbox = build_sandbox(
                self.sandbox_config.clone(),
                &registry,
                Arc::clone(&self.middleware),
                Arc::clone(&self.transport),
                depth.clone(),
                &engine_config,
            );
            let prompt_options = rlm_context::PromptOptions {
                output_spec: engine_config.output_spec.as_ref(),
                examples_enabled: engine_config.examples_enabled,
                history_enabled: opts.plan.is_some(),
                custom_docs: opts.context.as_deref(),
            };
            let system_prompt = rlm_context::build_system_prompt(&registry, &prompt_options);
            (system_prompt, sandbox)
        };

        if opts.debug.unwrap_or(false) {
            tracing::debug!(model = %model, query = query_str, "starting query");
        }

        let mut messages = vec![Message::system(system_prompt)];
        if let Some(plan) = &opts.plan {
            messages.push(Message::user(format!("Pre-fetched plan context:\n{plan}")));
        }
        messages.push(Message::user(query_str));

        let engine = Engine::new(Arc::clone(&self.transport), sandbox, depth);
        let run_outcome = engine.run(messages, &engine_config).await?;

        let raw_answer = run_outcome.answer.clone();
        let mut final_answer = run_outcome.answer.clone();
        let mut eval_scores = None;
        let mut refinement_count = None;
        let mut verified_claims = None;

        if opts.refine.unwrap_or(false) {
            let mut refine_config = RefinementConfig::new(model.clone());
            if let Some(max_refinements) = opts.max_refinements {
                refine_config.iterations = max_refinements;
            }
            if let Some(min_score) = opts.min_score {
                refine_config.threshold = min_score;
            }

            let source_excerpts: Vec<SourceExcerpt> = if opts.verify_claims.unwrap_or(false) {
                opts.context
                    .as_ref()
                    .map(|text| vec![SourceExcerpt { document_id: "context".to_string(), text: text.clone() }])
                    .unwrap_or_default()
            } else {
                Vec::new()
            };

            let answer_text = render_answer_text(&raw_answer);
            let refinement = run_refinement(
                self.transport.as_ref(),
                query_str,
                &answer_text,
                &refine_config,
                &source_excerpts,
            )
            .await?;

            let now = chrono::Utc::now();
            for claim in &refinement.claims {
                let verdict = refinement
                    .verifications
                    .iter()
                    .find(|v| v.claim_index == claim.index)
                    .map(|v| v.verdict);
                self.store
                    .insert_claim(Claim {
                        id: Uuid::new_v4().to_string(),
                        text: claim.text.clone(),
                        document_id: None,
                        page: None,
                        section: None,
                        quote: None,
                        confidence: claim.confidence as f64,
                        query_id: None,
                        verified: verdict.is_some(),
                        verification_verdict: verdict.map(map_verdict),
                        created_at: now,
                    })
                    .await;
            }

            eval_scores = Some(refinement.evaluations.iter().map(|e| e.overall_score).collect());
            refinement_count = Some(refinement.iterations_run);
            verified_claims = Some(
                refinement
                    .verifications
                    .iter()
                    .filter(|v| v.verdict == Verdict::Correct)
                    .count(),
            );
            final_answer = Value::String(refinement.answer);
        }

        if opts.learn.unwrap_or(true) {
            record_example(query_str, opts.context.as_deref(), &final_answer, &eval_scores, run_outcome.reached_final);
        }

        self.store.flush_now().await?;

        let history_tokens = rlm_context::estimate_messages(&run_outcome.messages);
        let status = if run_outcome.reached_final { "final" } else { "max-iterations" };
        let iterations = run_outcome.trace.iterations.len();

        Ok(QueryResult {
            answer: final_answer,
            raw_answer,
            trace: run_outcome.trace,
            iterations,
            duration_ms: started.elapsed().as_millis() as u64,
            eval_scores,
            refinement_count,
            history_tokens,
            verified_claims,
            status,
        })
    }

    /// Flush and tear down this environment's store (spec §4.8's
    /// `dispose!`), removing a disposable store's backing directory.
    pub async fn dispose(self) -> Result<(), EnvError> {
        drop(self.registry);
        drop(self.middleware);
        let store = Arc::try_unwrap(self.store)
            .map_err(|_| EnvError::InvalidConfig("store still referenced by in-flight bindings".to_string()))?;
        store.dispose().await?;
        Ok(())
    }
}

/// Open an environment's backing store per `config.persistent_dir`.
async fn open_store(config: &EnvConfig) -> Result<Store, EnvError> {
    let store = match &config.persistent_dir {
        Some(dir) => Store::open_persistent(dir.clone(), config.store.clone()).await?,
        None => Store::open_disposable(config.store.clone())?,
    };
    Ok(store)
}

/// Build an [`Environment`] against the real HTTP transport (spec
/// §4.8's `create-env`).
pub async fn create_env(config: EnvConfig) -> Result<Environment, EnvError> {
    let transport: Arc<dyn LlmTransport> = Arc::new(HttpTransport::new(config.api_key.clone(), config.base_url.clone()));
    Environment::new(config, transport).await
}

fn render_answer_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

fn map_verdict(verdict: Verdict) -> VerificationVerdict {
    match verdict {
        Verdict::Correct => VerificationVerdict::Correct,
        Verdict::Incorrect => VerificationVerdict::Incorrect,
        Verdict::PartiallyCorrect => VerificationVerdict::PartiallyCorrect,
        Verdict::Uncertain => VerificationVerdict::Uncertain,
    }
}

/// Record this query's outcome in the process-wide example bank (spec
/// §4.8: "`learn` ... records this query's outcome as a new example").
/// Scores on the bank's 0-40 scale; when refinement didn't run, a
/// completed query via `FINAL` is treated as a middling-good example
/// and an exhausted one as a bad one, since no evaluator score exists
/// to ground a finer number.
fn record_example(
    query: &str,
    context: Option<&str>,
    answer: &Value,
    eval_scores: &Option<Vec<f32>>,
    reached_final: bool,
) {
    let score = match eval_scores.as_ref().and_then(|scores| scores.last()) {
        Some(last) => (last * 40.0).round().clamp(0.0, 40.0) as u8,
        None if reached_final => 32,
        None => 10,
    };
    rlm_store::ExampleBank::global().record(rlm_store::Example {
        query: query.to_string(),
        context_summary: context.unwrap_or("(no additional context)").to_string(),
        answer: render_answer_text(answer),
        score,
        feedback: None,
        timestamp: chrono::Utc::now(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use rlm_transport::StubTransport;
    use rlm_types::{CompletionResponse, StopReason, TokenUsage};
    use rlm_types::ToolError;

    fn turn(thinking: &str, code: &[&str]) -> CompletionResponse {
        CompletionResponse {
            content: serde_json::json!({"thinking": thinking, "code": code}).to_string(),
            stop_reason: StopReason::EndTurn,
            usage: TokenUsage::default(),
        }
    }

    async fn test_env(responses: Vec<CompletionResponse>) -> Environment {
        let transport: Arc<dyn LlmTransport> = Arc::new(StubTransport::new(responses));
        Environment::new(EnvConfig::new("key", "http://localhost", "test-model"), transport)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn create_env_rejects_a_blank_api_key() {
        let transport: Arc<dyn LlmTransport> = Arc::new(StubTransport::new(vec![]));
        let result = Environment::new(EnvConfig::new("", "http://localhost", "test-model"), transport).await;
        assert!(matches!(result, Err(EnvError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn register_fn_rejects_a_blank_symbol() {
        let env = test_env(vec![]).await;
        let result = env
            .register_fn("  ", "does a thing", serde_json::json!({}), |_: Value| async {
                Ok::<Value, ToolError>(Value::Null)
            })
            .await;
        assert!(matches!(result, Err(EnvError::InvalidSymbol(_))));
    }

    #[tokio::test]
    async fn a_registered_binding_appears_in_the_next_query_prompt() {
        let env = test_env(vec![turn("done", &["FINAL(1)"])]).await;
        env.register_def("pi", "an approximation of pi", serde_json::json!(3.14))
            .await
            .unwrap();
        let opts = RlmQueryOptions { learn: Some(false), ..Default::default() };
        let result = env.query("what is pi", &opts).await.unwrap();
        assert_eq!(result.status, "final");
        assert!(result
            .trace
            .iterations
            .first()
            .is_some());
    }

    #[tokio::test]
    async fn query_reaches_final_and_records_an_example_by_default() {
        let env = test_env(vec![turn("done", &["FINAL(\"42\")"])]).await;
        let before = rlm_store::ExampleBank::global().len();
        let result = env.query("what is the answer", &RlmQueryOptions::default()).await.unwrap();
        assert_eq!(result.status, "final");
        assert_eq!(result.answer, serde_json::json!("42"));
        assert!(rlm_store::ExampleBank::global().len() >= before);
    }

    #[tokio::test]
    async fn dispose_flushes_and_consumes_the_environment() {
        let env = test_env(vec![]).await;
        env.dispose().await.unwrap();
    }
}
