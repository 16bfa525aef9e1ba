#![deny(missing_docs)]
//! The Environment Facade for the RLM agent runtime (component design
//! §4.8): the single entry point wiring the store, sandbox, tool
//! registry, context builder, transport, iteration engine, refinement
//! pipeline, and ingestion pipeline behind five operations —
//! `create-env`, `register-fn!`/`register-def!`, `ingest!`, `query!`,
//! and `dispose!` — plus `pprint-trace` for inspecting a query's trace.

mod config;
mod environment;
mod ingest;
mod query;
mod registration;

pub use config::EnvConfig;
pub use environment::{create_env, Environment};
pub use ingest::RlmIngestOptions;
pub use query::{QueryResult, RlmQueryOptions};

pub use rlm_engine::{pprint_trace, PprintOptions, Trace};
pub use rlm_ingest::{DocumentIngestResult, InputDocument, InputPage, InputPageNode, InputTocEntry};
pub use rlm_types::{EnvError, StructuredSpec};
