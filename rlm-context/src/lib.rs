#![deny(missing_docs)]
//! Prompt assembly and token-budget message reduction for the RLM agent
//! runtime (component design §4.4, §4.5 step 1).
//!
//! [`reduce_to_budget`] implements the Iteration Engine's message
//! reduction policy; [`build_system_prompt`] implements the Prompt
//! Builder, splicing the tool catalog, an optional output schema, bounded
//! examples from [`rlm_store::ExampleBank`], and the fixed workflow and
//! response-format blocks into one system prompt string.

mod prompt;
mod reduce;
mod token_counter;

pub use prompt::{build_system_prompt, PromptOptions, DEFAULT_EXAMPLE_COUNT};
pub use reduce::{reduce_to_budget, DEFAULT_TAIL_WINDOW};
pub use token_counter::{estimate_message, estimate_messages, estimate_text};
