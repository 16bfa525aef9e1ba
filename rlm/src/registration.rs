//! `register-fn!`/`register-def!` (spec §4.8): mutate the bindings and
//! docs tables, validating that the symbol is non-blank, the doc string
//! is non-blank, and (for `register-fn!`) the value is callable.

use rlm_tool::ToolDyn;
use rlm_types::{EnvError, ToolError};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;

/// A user-registered function binding, built from a plain async closure
/// (mirrors `rlm_tool::core`'s private `FnTool`, made public here since
/// caller-supplied tools live outside that crate).
pub(crate) struct UserFn<F> {
    pub name: String,
    pub description: String,
    pub schema: Value,
    pub f: F,
}

impl<F, Fut> ToolDyn for UserFn<F>
where
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, ToolError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn input_schema(&self) -> Value {
        self.schema.clone()
    }

    fn call(&self, input: Value) -> Pin<Box<dyn Future<Output = Result<Value, ToolError>> + Send + '_>> {
        Box::pin((self.f)(input))
    }
}

/// A user-registered constant value, exposed to the sandbox as a
/// zero-argument tool that always returns the same value.
pub(crate) struct UserDef {
    pub name: String,
    pub description: String,
    pub value: Value,
}

impl ToolDyn for UserDef {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({"type": "object", "properties": {}})
    }

    fn call(&self, _input: Value) -> Pin<Box<dyn Future<Output = Result<Value, ToolError>> + Send + '_>> {
        let value = self.value.clone();
        Box::pin(async move { Ok(value) })
    }
}

/// Reject a blank symbol name (spec §7: "invalid symbol/doc" is a
/// validation error, raised synchronously at the call site).
pub(crate) fn validate_symbol(symbol: &str) -> Result<(), EnvError> {
    if symbol.trim().is_empty() {
        return Err(EnvError::InvalidSymbol("symbol must not be blank".to_string()));
    }
    Ok(())
}

/// Reject a blank doc string.
pub(crate) fn validate_doc(doc: &str) -> Result<(), EnvError> {
    if doc.trim().is_empty() {
        return Err(EnvError::InvalidDoc("doc string must not be blank".to_string()));
    }
    Ok(())
}
