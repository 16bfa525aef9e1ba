//! Wires a [`ToolRegistry`]'s bindings and the `llm_query`/`rlm_query`
//! recursion bindings onto one sandbox, tying the knot so `rlm_query`
//! can recurse into the very sandbox it's being registered on.

use crate::config::EngineConfig;
use crate::recursive_tools::{register_recursive_tools, RecursiveToolDeps};
use rlm_sandbox::{Sandbox, SandboxBuilder, SandboxConfig};
use rlm_tool::{ToolRegistry, ToolTier};
use rlm_transport::LlmTransport;
use std::sync::{Arc, OnceLock};

use crate::depth::DepthCounter;

/// Build a sealed [`Sandbox`] with `registry`'s tool bindings and the
/// recursion bindings registered on it.
///
/// When `config.allow_custom_bindings` is `false`, `llm_query`/`rlm_query`
/// tie their recursion not to this sandbox but to a second, core-tools-only
/// sandbox built from a filtered copy of `registry` — so a sub-agent spawned
/// from this query never sees bindings the caller registered itself.
pub fn build_sandbox(
    sandbox_config: SandboxConfig,
    registry: &ToolRegistry,
    middleware: Arc<Vec<Arc<dyn rlm_tool::ToolMiddleware>>>,
    transport: Arc<dyn LlmTransport>,
    depth: DepthCounter,
    config: &EngineConfig,
) -> Sandbox {
    let mut builder = SandboxBuilder::new(sandbox_config.clone());
    rlm_tool::bind_registry(builder.engine_mut(), registry, Arc::clone(&middleware));

    let sandbox_cell: Arc<OnceLock<Sandbox>> = Arc::new(OnceLock::new());

    let recursion_cell = if config.allow_custom_bindings {
        Arc::clone(&sandbox_cell)
    } else {
        let core_registry = core_only_registry(registry);
        let mut restricted_config = config.clone();
        restricted_config.allow_custom_bindings = true;
        let restricted_sandbox = build_sandbox(
            sandbox_config,
            &core_registry,
            Arc::clone(&middleware),
            Arc::clone(&transport),
            depth.clone(),
            &restricted_config,
        );
        let cell: Arc<OnceLock<Sandbox>> = Arc::new(OnceLock::new());
        cell.set(restricted_sandbox)
            .unwrap_or_else(|_| unreachable!("cell set exactly once"));
        cell
    };

    register_recursive_tools(
        builder.engine_mut(),
        RecursiveToolDeps {
            transport,
            depth,
            sandbox_cell: recursion_cell,
            model: config.model.clone(),
            sub_agent_max_iterations: config.sub_agent_max_iterations,
            token_budget: config.token_budget,
        },
    );

    let sandbox = builder.build();
    sandbox_cell
        .set(sandbox.clone())
        .unwrap_or_else(|_| unreachable!("sandbox_cell set exactly once"));
    sandbox
}

/// Copy of `registry` containing only its [`ToolTier::Core`] bindings,
/// used to build the restricted sandbox sub-agents see when custom
/// bindings are not allowed to leak into recursion.
fn core_only_registry(registry: &ToolRegistry) -> ToolRegistry {
    let mut core = ToolRegistry::new();
    for binding in registry.iter_tier(ToolTier::Core) {
        core.register(Arc::clone(&binding.tool), ToolTier::Core);
    }
    core
}
