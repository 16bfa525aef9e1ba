//! Per-environment tool binding table (§4.3).

use crate::tool_dyn::ToolDyn;
use std::collections::HashMap;
use std::sync::Arc;

/// Which tier a binding belongs to, for prompt rendering order and for
/// distinguishing core tools (which mirror store operations) from
/// user-registered ones (§4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolTier {
    /// Standard allowed functions, implemented directly in the sandbox
    /// engine rather than as `ToolDyn` bindings.
    Builtin,
    /// Functions bound by the engine over the Store and context.
    Core,
    /// Functions registered by the caller, with their own doc string.
    UserRegistered,
}

/// A registered binding: the tool itself, its tier, and (for
/// user-registered tools) the doc string the Prompt Builder splices
/// into the system prompt.
pub struct Binding {
    /// The callable tool.
    pub tool: Arc<dyn ToolDyn>,
    /// Which tier this binding belongs to.
    pub tier: ToolTier,
}

/// The binding table owned by one environment.
///
/// Registration is a pure side effect on this table; it never touches
/// the store (§4.3).
pub struct ToolRegistry {
    bindings: HashMap<String, Binding>,
    /// Registration order, preserved for the Prompt Builder's "stable
    /// order" requirement (§4.4) — a `HashMap` alone would not do.
    order: Vec<String>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            bindings: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Register a tool under the given tier. Overwrites any existing
    /// binding with the same name, keeping that name's original
    /// position in the stable order.
    pub fn register(&mut self, tool: Arc<dyn ToolDyn>, tier: ToolTier) {
        let name = tool.name().to_string();
        if !self.bindings.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.bindings.insert(name, Binding { tool, tier });
    }

    /// Look up a binding by name.
    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.bindings.get(name)
    }

    /// Iterate over all bindings in stable registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Binding> {
        self.order.iter().filter_map(|name| self.bindings.get(name))
    }

    /// Iterate over bindings of a single tier, in stable order.
    pub fn iter_tier(&self, tier: ToolTier) -> impl Iterator<Item = &Binding> {
        self.iter().filter(move |b| b.tier == tier)
    }

    /// Number of registered bindings.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rlm_types::ToolError;
    use std::future::Future;
    use std::pin::Pin;

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
            Box::pin(async move { Ok(serde_json::json!({"echoed": input})) })
        }
    }

    #[test]
    fn registration_preserves_stable_order() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool), ToolTier::Core);
        let names: Vec<&str> = registry.iter().map(|b| b.tool.name()).collect();
        assert_eq!(names, vec!["echo"]);
    }

    #[test]
    fn reregistration_does_not_move_position() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool), ToolTier::Core);
        registry.register(Arc::new(EchoTool), ToolTier::UserRegistered);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("echo").unwrap().tier, ToolTier::UserRegistered);
    }

    #[tokio::test]
    async fn call_through_registry() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool), ToolTier::Core);
        let binding = registry.get("echo").unwrap();
        let result = binding.tool.call(serde_json::json!(1)).await.unwrap();
        assert_eq!(result, serde_json::json!({"echoed": 1}));
    }
}
