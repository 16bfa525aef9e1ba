//! Middleware chain wrapping tool execution.
//!
//! Mirrors axum's `from_fn`: each middleware receives the call and a
//! [`Next`] it can delegate to, or short-circuit by not calling.

use crate::tool_dyn::ToolDyn;
use rlm_types::ToolError;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// A tool call in flight through the middleware pipeline.
#[derive(Debug, Clone)]
pub struct ToolCall {
    /// Name of the tool being called.
    pub name: String,
    /// JSON input arguments.
    pub input: serde_json::Value,
}

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Middleware wrapping tool execution with a cross-cutting concern
/// (logging, output truncation, permission checks).
pub trait ToolMiddleware: Send + Sync {
    /// Process a call, optionally delegating to the next middleware or
    /// the tool itself via `next`.
    fn process<'a>(
        &'a self,
        call: &'a ToolCall,
        next: Next<'a>,
    ) -> BoxFuture<'a, Result<serde_json::Value, ToolError>>;
}

/// The remaining middleware chain plus the underlying tool. Consumed
/// on `run` to prevent double invocation.
pub struct Next<'a> {
    tool: &'a dyn ToolDyn,
    middleware: &'a [Arc<dyn ToolMiddleware>],
}

impl<'a> Next<'a> {
    /// Build a `Next` over the given tool and remaining middleware.
    pub fn new(tool: &'a dyn ToolDyn, middleware: &'a [Arc<dyn ToolMiddleware>]) -> Self {
        Self { tool, middleware }
    }

    /// Continue the chain, eventually calling the tool once all
    /// middleware has run.
    pub async fn run(self, call: &'a ToolCall) -> Result<serde_json::Value, ToolError> {
        if let Some((head, tail)) = self.middleware.split_first() {
            let next = Next::new(self.tool, tail);
            head.process(call, next).await
        } else {
            self.tool.call(call.input.clone()).await
        }
    }
}

struct MiddlewareFn<F> {
    f: F,
}

impl<F> ToolMiddleware for MiddlewareFn<F>
where
    F: for<'a> Fn(&'a ToolCall, Next<'a>) -> BoxFuture<'a, Result<serde_json::Value, ToolError>>
        + Send
        + Sync,
{
    fn process<'a>(
        &'a self,
        call: &'a ToolCall,
        next: Next<'a>,
    ) -> BoxFuture<'a, Result<serde_json::Value, ToolError>> {
        (self.f)(call, next)
    }
}

/// Build middleware from a closure, like axum's `from_fn`.
#[must_use]
pub fn tool_middleware_fn<F>(f: F) -> impl ToolMiddleware
where
    F: for<'a> Fn(&'a ToolCall, Next<'a>) -> BoxFuture<'a, Result<serde_json::Value, ToolError>>
        + Send
        + Sync,
{
    MiddlewareFn { f }
}

/// Logs each call's name and duration at `debug` level.
pub struct TracingMiddleware;

impl ToolMiddleware for TracingMiddleware {
    fn process<'a>(
        &'a self,
        call: &'a ToolCall,
        next: Next<'a>,
    ) -> BoxFuture<'a, Result<serde_json::Value, ToolError>> {
        Box::pin(async move {
            let start = std::time::Instant::now();
            let result = next.run(call).await;
            tracing::debug!(
                tool = %call.name,
                ok = result.is_ok(),
                duration_ms = start.elapsed().as_millis() as u64,
                "tool call"
            );
            result
        })
    }
}

/// Truncates string-shaped tool outputs above `max_chars`, appending a
/// `"... [truncated]"` marker. Protects the context budget from a
/// single oversized tool result (modeled on the teacher's output
/// formatting layer, generalized to a middleware stage).
pub struct OutputTruncator {
    /// Maximum characters retained in a string result.
    pub max_chars: usize,
}

impl ToolMiddleware for OutputTruncator {
    fn process<'a>(
        &'a self,
        call: &'a ToolCall,
        next: Next<'a>,
    ) -> BoxFuture<'a, Result<serde_json::Value, ToolError>> {
        Box::pin(async move {
            let result = next.run(call).await?;
            Ok(truncate_strings(result, self.max_chars))
        })
    }
}

fn truncate_strings(value: serde_json::Value, max_chars: usize) -> serde_json::Value {
    match value {
        serde_json::Value::String(s) if s.chars().count() > max_chars => {
            let truncated: String = s.chars().take(max_chars).collect();
            serde_json::Value::String(format!("{truncated}... [truncated]"))
        }
        serde_json::Value::Array(items) => serde_json::Value::Array(
            items.into_iter().map(|v| truncate_strings(v, max_chars)).collect(),
        ),
        serde_json::Value::Object(map) => serde_json::Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, truncate_strings(v, max_chars)))
                .collect(),
        ),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::Future;

    struct EchoTool;

    impl ToolDyn for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echoes input back"
        }
        fn input_schema(&self) -> serde_json::Value {
            serde_json::json!({"type": "object"})
        }
        fn call(
            &self,
            input: serde_json::Value,
        ) -> Pin<Box<dyn Future<Output = Result<serde_json::Value, ToolError>> + Send + '_>>
        {
            Box::pin(async move { Ok(input) })
        }
    }

    #[tokio::test]
    async fn empty_chain_calls_tool_directly() {
        let tool = EchoTool;
        let call = ToolCall {
            name: "echo".into(),
            input: serde_json::json!("hi"),
        };
        let next = Next::new(&tool, &[]);
        let result = next.run(&call).await.unwrap();
        assert_eq!(result, serde_json::json!("hi"));
    }

    #[tokio::test]
    async fn output_truncator_shortens_long_strings() {
        let tool = EchoTool;
        let call = ToolCall {
            name: "echo".into(),
            input: serde_json::Value::String("a".repeat(100)),
        };
        let middleware: Vec<Arc<dyn ToolMiddleware>> =
            vec![Arc::new(OutputTruncator { max_chars: 10 })];
        let next = Next::new(&tool, &middleware);
        let result = next.run(&call).await.unwrap();
        let s = result.as_str().unwrap();
        assert!(s.len() < 100);
        assert!(s.ends_with("[truncated]"));
    }

    #[tokio::test]
    async fn middleware_chain_runs_in_order() {
        let tool = EchoTool;
        let call = ToolCall {
            name: "echo".into(),
            input: serde_json::json!(1),
        };
        let log = Arc::new(std::sync::Mutex::new(Vec::<&'static str>::new()));
        let log_a = Arc::clone(&log);
        let a = tool_middleware_fn(move |call, next| {
            let log_a = Arc::clone(&log_a);
            Box::pin(async move {
                log_a.lock().unwrap().push("a-before");
                let r = next.run(call).await;
                log_a.lock().unwrap().push("a-after");
                r
            })
        });
        let log_b = Arc::clone(&log);
        let b = tool_middleware_fn(move |call, next| {
            let log_b = Arc::clone(&log_b);
            Box::pin(async move {
                log_b.lock().unwrap().push("b-before");
                let r = next.run(call).await;
                log_b.lock().unwrap().push("b-after");
                r
            })
        });
        let middleware: Vec<Arc<dyn ToolMiddleware>> = vec![Arc::new(a), Arc::new(b)];
        let next = Next::new(&tool, &middleware);
        next.run(&call).await.unwrap();
        let order = log.lock().unwrap().clone();
        assert_eq!(order, vec!["a-before", "b-before", "b-after", "a-after"]);
    }
}
