//! The restricted evaluator (component design §4.2).

use crate::final_record::make_final_record;
use rlm_types::SandboxError;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Default wall-clock deadline for one `execute` call (§4.2).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default operation-count cap, a cheaper backstop checked far more
/// often than the wall-clock deadline.
pub const DEFAULT_MAX_OPERATIONS: u64 = 5_000_000;

/// Sandbox configuration.
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    /// Wall-clock deadline per `execute` call.
    pub timeout: Duration,
    /// Operation-count cap enforced by the rhai engine itself.
    pub max_operations: u64,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_operations: DEFAULT_MAX_OPERATIONS,
        }
    }
}

/// One `execute(code)` outcome (§4.2's `{result, stdout, error?,
/// duration-ms, timed-out}` contract), plus the top-level names this
/// snippet newly defined (for locals capture, §4.3).
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// The evaluated value, forced to a concrete JSON value (lazy
    /// sequences are realized as part of the rhai -> JSON conversion).
    pub result: serde_json::Value,
    /// Everything written via `print`/`debug` during this execution.
    pub stdout: String,
    /// The exception message, if evaluation failed.
    pub error: Option<String>,
    /// Wall-clock duration of this call.
    pub duration_ms: u64,
    /// Whether the deadline was hit.
    pub timed_out: bool,
    /// Names defined at the top level of this snippet, not present
    /// before it ran.
    pub new_locals: HashMap<String, serde_json::Value>,
    /// Whether the evaluated value was a bare function pointer rather
    /// than a called result (e.g. the snippet named a function without
    /// invoking it). `rlm-engine`'s feedback builder uses this to offer
    /// a "did you mean to call it?" hint (§4.5 step 7).
    pub is_function: bool,
}

/// Builds a [`Sandbox`], exposing the underlying `rhai::Engine` for
/// tool-binding registration before the engine is sealed behind an
/// `Arc`.
pub struct SandboxBuilder {
    engine: rhai::Engine,
    config: SandboxConfig,
    stdout: Arc<Mutex<String>>,
    cancelled: Arc<AtomicBool>,
}

impl SandboxBuilder {
    /// Start building a sandbox with the given configuration. Applies
    /// the deny-list: disables `eval`, disables module resolution
    /// (`import`), and caps max operations and expression depth.
    /// Filesystem I/O and process control are denied by omission —
    /// nothing registers them, so no such functions ever exist on the
    /// engine (§4.2's allow-list-only surface).
    pub fn new(config: SandboxConfig) -> Self {
        let mut engine = rhai::Engine::new();
        engine.set_max_operations(config.max_operations);
        engine.set_max_expr_depths(64, 64);
        engine.disable_symbol("eval");
        engine.set_module_resolver(rhai::module_resolvers::DummyModuleResolver::new());

        let stdout = Arc::new(Mutex::new(String::new()));
        let cancelled = Arc::new(AtomicBool::new(false));

        let stdout_for_print = Arc::clone(&stdout);
        engine.on_print(move |text| {
            let mut buf = stdout_for_print.lock().expect("sandbox stdout lock poisoned");
            buf.push_str(text);
            buf.push('\n');
        });

        let cancelled_for_progress = Arc::clone(&cancelled);
        engine.on_progress(move |_ops| {
            if cancelled_for_progress.load(Ordering::Relaxed) {
                Some(rhai::Dynamic::UNIT)
            } else {
                None
            }
        });

        register_final_functions(&mut engine);

        Self {
            engine,
            config,
            stdout,
            cancelled,
        }
    }

    /// Mutable access to the underlying engine, for registering tool
    /// bindings and built-ins (§4.3) before sealing.
    pub fn engine_mut(&mut self) -> &mut rhai::Engine {
        &mut self.engine
    }

    /// Seal the engine behind an `Arc` and produce a runnable sandbox.
    pub fn build(self) -> Sandbox {
        Sandbox {
            engine: Arc::new(self.engine),
            config: self.config,
            stdout: self.stdout,
            cancelled: self.cancelled,
        }
    }
}

fn register_final_functions(engine: &mut rhai::Engine) {
    engine.register_fn("FINAL", |value: rhai::Dynamic| -> rhai::Dynamic {
        let json = rhai::serde::from_dynamic::<serde_json::Value>(&value)
            .unwrap_or(serde_json::Value::Null);
        rhai::serde::to_dynamic(make_final_record(json)).unwrap_or(rhai::Dynamic::UNIT)
    });

    engine.register_fn(
        "FINAL_VAR",
        |context: rhai::NativeCallContext, name: &str| -> Result<rhai::Dynamic, Box<rhai::EvalAltResult>> {
            let value = context
                .scope()
                .get_value::<rhai::Dynamic>(name)
                .ok_or_else(|| format!("no such local: {name}"))?;
            let json = rhai::serde::from_dynamic::<serde_json::Value>(&value)
                .unwrap_or(serde_json::Value::Null);
            Ok(rhai::serde::to_dynamic(make_final_record(json)).unwrap_or(rhai::Dynamic::UNIT))
        },
    );
}

/// A sealed, runnable sandbox. Cheaply cloneable (the engine is
/// behind an `Arc`); each clone shares the deny-list and registered
/// bindings but should own its own `rhai::Scope` per query.
#[derive(Clone)]
pub struct Sandbox {
    engine: Arc<rhai::Engine>,
    config: SandboxConfig,
    stdout: Arc<Mutex<String>>,
    cancelled: Arc<AtomicBool>,
}

impl Sandbox {
    /// Evaluate one code snippet against `scope`, capturing stdout,
    /// enforcing the wall-clock deadline, and diffing `scope`'s
    /// top-level names to report newly-defined locals.
    ///
    /// Evaluation runs on a blocking thread (rhai's `Engine::eval_*`
    /// is synchronous); the call races that thread against the
    /// deadline. On timeout the blocking task is abandoned rather than
    /// killed — `scope` is left untouched, so its mutations never
    /// become visible to the rest of the query, and the shared
    /// `cancelled` flag asks the abandoned evaluation's progress
    /// callback to abort at the next op-count check.
    pub async fn execute(
        &self,
        code: &str,
        scope: &mut rhai::Scope<'static>,
    ) -> ExecutionResult {
        self.cancelled.store(false, Ordering::Relaxed);
        self.stdout
            .lock()
            .expect("sandbox stdout lock poisoned")
            .clear();

        let before_names: HashSet<String> =
            scope.iter().map(|(name, _, _)| name.to_string()).collect();

        let engine = Arc::clone(&self.engine);
        let code_owned = code.to_string();
        let pre_execution_scope = scope.clone();
        let mut owned_scope = std::mem::replace(scope, rhai::Scope::new());
        let start = Instant::now();

        let join = tokio::task::spawn_blocking(move || {
            let result = engine.eval_with_scope::<rhai::Dynamic>(&mut owned_scope, &code_owned);
            (result, owned_scope)
        });

        match tokio::time::timeout(self.config.timeout, join).await {
            Ok(Ok((eval_result, returned_scope))) => {
                *scope = returned_scope;
                let duration_ms = start.elapsed().as_millis() as u64;
                let stdout = self
                    .stdout
                    .lock()
                    .expect("sandbox stdout lock poisoned")
                    .clone();
                match eval_result {
                    Ok(dynamic) => {
                        let is_function = dynamic.is::<rhai::FnPtr>();
                        let result = rhai::serde::from_dynamic::<serde_json::Value>(&dynamic)
                            .unwrap_or(serde_json::Value::Null);
                        let new_locals = diff_locals(scope, &before_names);
                        ExecutionResult {
                            result,
                            stdout,
                            error: None,
                            duration_ms,
                            timed_out: false,
                            new_locals,
                            is_function,
                        }
                    }
                    Err(e) => ExecutionResult {
                        result: serde_json::Value::Null,
                        stdout,
                        error: Some(e.to_string()),
                        duration_ms,
                        timed_out: false,
                        new_locals: HashMap::new(),
                        is_function: false,
                    },
                }
            }
            Ok(Err(join_err)) => {
                *scope = pre_execution_scope;
                ExecutionResult {
                    result: serde_json::Value::Null,
                    stdout: String::new(),
                    error: Some(format!("evaluator thread failed: {join_err}")),
                    duration_ms: start.elapsed().as_millis() as u64,
                    timed_out: false,
                    new_locals: HashMap::new(),
                    is_function: false,
                }
            }
            Err(_elapsed) => {
                self.cancelled.store(true, Ordering::Relaxed);
                tracing::warn!(timeout_ms = self.config.timeout.as_millis() as u64, "sandbox execution timed out");
                *scope = pre_execution_scope;
                ExecutionResult {
                    result: serde_json::Value::Null,
                    stdout: String::new(),
                    error: Some(SandboxError::Timeout.to_string()),
                    duration_ms: self.config.timeout.as_millis() as u64,
                    timed_out: true,
                    new_locals: HashMap::new(),
                    is_function: false,
                }
            }
        }
    }
}

fn diff_locals(
    scope: &rhai::Scope<'static>,
    before: &HashSet<String>,
) -> HashMap<String, serde_json::Value> {
    let mut locals = HashMap::new();
    for (name, _, value) in scope.iter() {
        if before.contains(name) {
            continue;
        }
        let json = rhai::serde::from_dynamic::<serde_json::Value>(&value)
            .unwrap_or(serde_json::Value::Null);
        locals.insert(name.to_string(), json);
    }
    locals
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn arithmetic_is_allowed() {
        let sandbox = SandboxBuilder::new(SandboxConfig::default()).build();
        let mut scope = rhai::Scope::new();
        let result = sandbox.execute("1 + 2", &mut scope).await;
        assert_eq!(result.result, serde_json::json!(3));
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn top_level_assignment_is_captured_as_local() {
        let sandbox = SandboxBuilder::new(SandboxConfig::default()).build();
        let mut scope = rhai::Scope::new();
        let result = sandbox.execute("let x = 10;", &mut scope).await;
        assert_eq!(result.new_locals.get("x"), Some(&serde_json::json!(10)));
    }

    #[tokio::test]
    async fn locals_persist_across_executions() {
        let sandbox = SandboxBuilder::new(SandboxConfig::default()).build();
        let mut scope = rhai::Scope::new();
        sandbox.execute("let x = 10;", &mut scope).await;
        let result = sandbox.execute("x + 5", &mut scope).await;
        assert_eq!(result.result, serde_json::json!(15));
    }

    #[tokio::test]
    async fn print_is_captured_as_stdout() {
        let sandbox = SandboxBuilder::new(SandboxConfig::default()).build();
        let mut scope = rhai::Scope::new();
        let result = sandbox.execute(r#"print("hello")"#, &mut scope).await;
        assert!(result.stdout.contains("hello"));
    }

    #[tokio::test]
    async fn eval_is_denied() {
        let sandbox = SandboxBuilder::new(SandboxConfig::default()).build();
        let mut scope = rhai::Scope::new();
        let result = sandbox.execute(r#"eval("1 + 1")"#, &mut scope).await;
        assert!(result.error.is_some());
    }

    #[tokio::test]
    async fn import_is_denied() {
        let sandbox = SandboxBuilder::new(SandboxConfig::default()).build();
        let mut scope = rhai::Scope::new();
        let result = sandbox.execute(r#"import "whatever" as x;"#, &mut scope).await;
        assert!(result.error.is_some());
    }

    #[tokio::test]
    async fn timeout_produces_contract_shape() {
        let config = SandboxConfig {
            timeout: Duration::from_millis(50),
            ..SandboxConfig::default()
        };
        let sandbox = SandboxBuilder::new(config).build();
        let mut scope = rhai::Scope::new();
        let result = sandbox.execute("loop {}", &mut scope).await;
        assert!(result.timed_out);
        assert_eq!(result.stdout, "");
        assert_eq!(result.error.as_deref(), Some("timeout"));
    }

    #[tokio::test]
    async fn locals_survive_a_later_timeout() {
        let config = SandboxConfig {
            timeout: Duration::from_millis(50),
            ..SandboxConfig::default()
        };
        let sandbox = SandboxBuilder::new(config).build();
        let mut scope = rhai::Scope::new();
        sandbox.execute("let xs = [1, 2, 3];", &mut scope).await;

        let timed_out = sandbox.execute("loop {}", &mut scope).await;
        assert!(timed_out.timed_out);

        let result = sandbox.execute("xs.len()", &mut scope).await;
        assert_eq!(result.result, serde_json::json!(3));
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn final_wraps_value_in_tagged_record() {
        let sandbox = SandboxBuilder::new(SandboxConfig::default()).build();
        let mut scope = rhai::Scope::new();
        let result = sandbox.execute(r#"FINAL("the answer")"#, &mut scope).await;
        assert!(crate::final_record::is_final_record(&result.result));
    }

    #[tokio::test]
    async fn bare_function_reference_is_flagged() {
        let sandbox = SandboxBuilder::new(SandboxConfig::default()).build();
        let mut scope = rhai::Scope::new();
        sandbox
            .execute("fn double(x) { x * 2 }", &mut scope)
            .await;
        let result = sandbox.execute("Fn(\"double\")", &mut scope).await;
        assert!(result.is_function);
    }

    #[tokio::test]
    async fn final_var_resolves_named_local() {
        let sandbox = SandboxBuilder::new(SandboxConfig::default()).build();
        let mut scope = rhai::Scope::new();
        sandbox.execute(r#"let total = 42;"#, &mut scope).await;
        let result = sandbox.execute(r#"FINAL_VAR("total")"#, &mut scope).await;
        let answer = crate::final_record::final_answer(&result.result).unwrap();
        assert_eq!(answer["result"], 42);
    }
}
