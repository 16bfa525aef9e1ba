//! Core tools — bindings over the Store and the environment's context
//! (§4.3 tier 2). Behaviors mirror the Store operations in §4.1.

use crate::tool_dyn::ToolDyn;
use rlm_store::{
    DocumentFilter, EntityFilter, LearningFilter, LearningVote, PageNodeFilter, Store,
    TocEntryFilter,
};
use rlm_types::ToolError;
use serde::Deserialize;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// A [`ToolDyn`] built from a plain async closure, so each core
/// binding doesn't need its own named struct.
struct FnTool<F> {
    name: &'static str,
    description: &'static str,
    schema: Value,
    f: F,
}

impl<F, Fut> ToolDyn for FnTool<F>
where
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, ToolError>> + Send + 'static,
{
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        self.description
    }

    fn input_schema(&self) -> Value {
        self.schema.clone()
    }

    fn call(&self, input: Value) -> Pin<Box<dyn Future<Output = Result<Value, ToolError>> + Send + '_>> {
        Box::pin((self.f)(input))
    }
}

#[derive(Deserialize, Default)]
struct SearchArgs {
    query: Option<String>,
    document_id: Option<String>,
    r#type: Option<String>,
    limit: Option<usize>,
    include_decayed: Option<bool>,
}

fn parse_args(input: Value) -> SearchArgs {
    serde_json::from_value(input).unwrap_or_default()
}

fn invalid(field: &str) -> ToolError {
    ToolError::InvalidInput(format!("missing or malformed field: {field}"))
}

/// Build the complete set of core tools bound over `store`. Registered
/// under [`crate::ToolTier::Core`] by the caller.
pub fn core_tools(store: Arc<Store>) -> Vec<Arc<dyn ToolDyn>> {
    let mut tools: Vec<Arc<dyn ToolDyn>> = Vec::new();

    {
        let store = Arc::clone(&store);
        tools.push(Arc::new(FnTool {
            name: "search_documents",
            description: "Search or list documents; blank query lists with filters.",
            schema: serde_json::json!({"type": "object", "properties": {"query": {"type": "string"}, "limit": {"type": "integer"}}}),
            f: move |input: Value| {
                let store = Arc::clone(&store);
                async move {
                    let args = parse_args(input);
                    let docs = store
                        .search_documents(
                            args.query.as_deref(),
                            DocumentFilter { limit: args.limit },
                        )
                        .await;
                    Ok(serde_json::to_value(docs).unwrap_or(Value::Null))
                }
            },
        }));
    }

    {
        let store = Arc::clone(&store);
        tools.push(Arc::new(FnTool {
            name: "get_document",
            description: "Fetch a document by id.",
            schema: serde_json::json!({"type": "object", "properties": {"id": {"type": "string"}}, "required": ["id"]}),
            f: move |input: Value| {
                let store = Arc::clone(&store);
                async move {
                    let id = input
                        .get("id")
                        .and_then(Value::as_str)
                        .ok_or_else(|| invalid("id"))?
                        .to_string();
                    Ok(serde_json::to_value(store.get_document(&id).await).unwrap_or(Value::Null))
                }
            },
        }));
    }

    {
        let store = Arc::clone(&store);
        tools.push(Arc::new(FnTool {
            name: "search_page_nodes",
            description: "Search or list page nodes for a document; blank query lists with filters.",
            schema: serde_json::json!({"type": "object", "properties": {"query": {"type": "string"}, "document_id": {"type": "string"}, "type": {"type": "string"}, "limit": {"type": "integer"}}}),
            f: move |input: Value| {
                let store = Arc::clone(&store);
                async move {
                    let args = parse_args(input);
                    let nodes = store
                        .search_page_nodes(
                            args.query.as_deref(),
                            PageNodeFilter {
                                document_id: args.document_id,
                                r#type: args.r#type,
                                limit: args.limit,
                            },
                        )
                        .await;
                    Ok(serde_json::to_value(nodes).unwrap_or(Value::Null))
                }
            },
        }));
    }

    {
        let store = Arc::clone(&store);
        tools.push(Arc::new(FnTool {
            name: "get_page_node",
            description: "Fetch a page node by id.",
            schema: serde_json::json!({"type": "object", "properties": {"id": {"type": "string"}}, "required": ["id"]}),
            f: move |input: Value| {
                let store = Arc::clone(&store);
                async move {
                    let id = input
                        .get("id")
                        .and_then(Value::as_str)
                        .ok_or_else(|| invalid("id"))?
                        .to_string();
                    Ok(serde_json::to_value(store.get_page_node(&id).await).unwrap_or(Value::Null))
                }
            },
        }));
    }

    {
        let store = Arc::clone(&store);
        tools.push(Arc::new(FnTool {
            name: "search_toc_entries",
            description: "Search or list a document's table of contents; blank query lists with filters.",
            schema: serde_json::json!({"type": "object", "properties": {"query": {"type": "string"}, "document_id": {"type": "string"}, "limit": {"type": "integer"}}}),
            f: move |input: Value| {
                let store = Arc::clone(&store);
                async move {
                    let args = parse_args(input);
                    let entries = store
                        .search_toc_entries(
                            args.query.as_deref(),
                            TocEntryFilter {
                                document_id: args.document_id,
                                limit: args.limit,
                            },
                        )
                        .await;
                    Ok(serde_json::to_value(entries).unwrap_or(Value::Null))
                }
            },
        }));
    }

    {
        let store = Arc::clone(&store);
        tools.push(Arc::new(FnTool {
            name: "get_toc_entry",
            description: "Fetch a TOC entry by id.",
            schema: serde_json::json!({"type": "object", "properties": {"id": {"type": "string"}}, "required": ["id"]}),
            f: move |input: Value| {
                let store = Arc::clone(&store);
                async move {
                    let id = input
                        .get("id")
                        .and_then(Value::as_str)
                        .ok_or_else(|| invalid("id"))?
                        .to_string();
                    Ok(serde_json::to_value(store.get_toc_entry(&id).await).unwrap_or(Value::Null))
                }
            },
        }));
    }

    {
        let store = Arc::clone(&store);
        tools.push(Arc::new(FnTool {
            name: "search_entities",
            description: "Search or list entities; blank query lists with filters.",
            schema: serde_json::json!({"type": "object", "properties": {"query": {"type": "string"}, "document_id": {"type": "string"}, "type": {"type": "string"}, "limit": {"type": "integer"}}}),
            f: move |input: Value| {
                let store = Arc::clone(&store);
                async move {
                    let args = parse_args(input);
                    let entities = store
                        .search_entities(
                            args.query.as_deref(),
                            EntityFilter {
                                document_id: args.document_id,
                                r#type: args.r#type,
                                limit: args.limit,
                            },
                        )
                        .await;
                    Ok(serde_json::to_value(entities).unwrap_or(Value::Null))
                }
            },
        }));
    }

    {
        let store = Arc::clone(&store);
        tools.push(Arc::new(FnTool {
            name: "get_entity",
            description: "Fetch an entity by id.",
            schema: serde_json::json!({"type": "object", "properties": {"id": {"type": "string"}}, "required": ["id"]}),
            f: move |input: Value| {
                let store = Arc::clone(&store);
                async move {
                    let id = input
                        .get("id")
                        .and_then(Value::as_str)
                        .ok_or_else(|| invalid("id"))?
                        .to_string();
                    Ok(serde_json::to_value(store.get_entity(&id).await).unwrap_or(Value::Null))
                }
            },
        }));
    }

    {
        let store = Arc::clone(&store);
        tools.push(Arc::new(FnTool {
            name: "search_learnings",
            description: "Search or list accumulated learnings; decayed learnings are excluded by default.",
            schema: serde_json::json!({"type": "object", "properties": {"query": {"type": "string"}, "limit": {"type": "integer"}, "include_decayed": {"type": "boolean"}}}),
            f: move |input: Value| {
                let store = Arc::clone(&store);
                async move {
                    let args = parse_args(input);
                    let learnings = store
                        .search_learnings(
                            args.query.as_deref(),
                            LearningFilter {
                                include_decayed: args.include_decayed.unwrap_or(false),
                                limit: args.limit,
                            },
                        )
                        .await;
                    Ok(serde_json::to_value(learnings).unwrap_or(Value::Null))
                }
            },
        }));
    }

    {
        let store = Arc::clone(&store);
        tools.push(Arc::new(FnTool {
            name: "vote_learning",
            description: "Vote a learning useful or not-useful.",
            schema: serde_json::json!({"type": "object", "properties": {"id": {"type": "string"}, "vote": {"type": "string", "enum": ["useful", "not-useful"]}}, "required": ["id", "vote"]}),
            f: move |input: Value| {
                let store = Arc::clone(&store);
                async move {
                    let id = input
                        .get("id")
                        .and_then(Value::as_str)
                        .ok_or_else(|| invalid("id"))?
                        .to_string();
                    let vote = match input.get("vote").and_then(Value::as_str) {
                        Some("useful") => LearningVote::Useful,
                        Some("not-useful") => LearningVote::NotUseful,
                        _ => return Err(invalid("vote")),
                    };
                    Ok(serde_json::to_value(store.vote_learning(&id, vote).await).unwrap_or(Value::Null))
                }
            },
        }));
    }

    {
        let store = Arc::clone(&store);
        tools.push(Arc::new(FnTool {
            name: "increment_applied_count",
            description: "Record that a learning was surfaced and applied.",
            schema: serde_json::json!({"type": "object", "properties": {"id": {"type": "string"}}, "required": ["id"]}),
            f: move |input: Value| {
                let store = Arc::clone(&store);
                async move {
                    let id = input
                        .get("id")
                        .and_then(Value::as_str)
                        .ok_or_else(|| invalid("id"))?
                        .to_string();
                    Ok(serde_json::to_value(store.increment_applied_count(&id).await).unwrap_or(Value::Null))
                }
            },
        }));
    }

    {
        let store = Arc::clone(&store);
        tools.push(Arc::new(FnTool {
            name: "stats",
            description: "Type-count frequencies and vote/application totals for the store.",
            schema: serde_json::json!({"type": "object", "properties": {}}),
            f: move |_input: Value| {
                let store = Arc::clone(&store);
                async move { Ok(serde_json::to_value(store.stats().await).unwrap_or(Value::Null)) }
            },
        }));
    }

    tools
}
