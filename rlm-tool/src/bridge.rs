//! Wires a [`ToolRegistry`] into a sandbox's `rhai::Engine`.
//!
//! Tool bindings are async (they call the Store); `rhai::Engine::eval_*`
//! is synchronous. Each binding is registered as a native rhai function
//! that blocks the sandbox's evaluator thread on the async call via the
//! captured runtime `Handle`. This only works because sandbox
//! evaluation already runs inside `tokio::task::spawn_blocking`
//! (`rlm_sandbox::Sandbox::execute`) — a dedicated blocking-pool
//! thread, not a worker thread driving other tasks — so blocking it
//! here cannot stall the runtime.

use crate::middleware::{Next, ToolCall, ToolMiddleware};
use crate::registry::ToolRegistry;
use std::sync::Arc;

/// Register every binding in `registry` onto `engine`, routing calls
/// through `middleware` in order before reaching the tool.
pub fn bind_registry(
    engine: &mut rhai::Engine,
    registry: &ToolRegistry,
    middleware: Arc<Vec<Arc<dyn ToolMiddleware>>>,
) {
    let handle = tokio::runtime::Handle::current();
    for binding in registry.iter() {
        let tool = Arc::clone(&binding.tool);
        let name = tool.name().to_string();
        let middleware = Arc::clone(&middleware);
        let handle = handle.clone();
        engine.register_fn(
            name.clone(),
            move |input: rhai::Dynamic| -> Result<rhai::Dynamic, Box<rhai::EvalAltResult>> {
                let json = rhai::serde::from_dynamic::<serde_json::Value>(&input)
                    .unwrap_or(serde_json::Value::Null);
                let tool = Arc::clone(&tool);
                let middleware = Arc::clone(&middleware);
                let name = name.clone();
                let call = ToolCall { name, input: json };
                let result = handle.block_on(async {
                    let next = Next::new(tool.as_ref(), middleware.as_slice());
                    next.run(&call).await
                });
                match result {
                    Ok(value) => Ok(rhai::serde::to_dynamic(value).unwrap_or(rhai::Dynamic::UNIT)),
                    Err(e) => Err(e.to_string().into()),
                }
            },
        );
    }
}
