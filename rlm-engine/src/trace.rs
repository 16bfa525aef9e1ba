//! The per-query execution trace (spec §4.5 state: `{messages, iteration,
//! trace}`) and its pretty-printer (spec §6: `pprint-trace`).

use serde::{Deserialize, Serialize};

/// One `execute(code)` call within an iteration, and its outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Execution {
    /// Index of this execution within its iteration (`result_{id}` tag).
    pub id: usize,
    /// The code snippet that ran.
    pub code: String,
    /// The evaluated value.
    pub result: serde_json::Value,
    /// Captured stdout.
    pub stdout: String,
    /// The exception message, if evaluation failed.
    pub error: Option<String>,
    /// Wall-clock duration of this call.
    pub duration_ms: u64,
}

/// One turn of the loop: the model's free-text reasoning, the snippets
/// it ran, and whether this iteration terminated the query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationRecord {
    /// 0-based iteration index.
    pub index: usize,
    /// The model's `thinking` field for this turn.
    pub thinking: String,
    /// Snippets executed this turn, in order.
    pub executions: Vec<Execution>,
    /// Whether this iteration produced the final answer.
    pub is_final: bool,
}

/// The complete iteration-by-iteration record of one query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Trace {
    /// Iterations in order.
    pub iterations: Vec<IterationRecord>,
}

impl Trace {
    /// An empty trace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one iteration.
    pub fn push(&mut self, iteration: IterationRecord) {
        self.iterations.push(iteration);
    }
}

/// Options for [`pprint_trace`].
#[derive(Debug, Clone)]
pub struct PprintOptions {
    /// Truncate the `thinking` text to this many characters.
    pub max_response_length: usize,
    /// Truncate each code snippet to this many characters.
    pub max_code_length: usize,
    /// Truncate each rendered result to this many characters.
    pub max_result_length: usize,
    /// Whether to include captured stdout.
    pub show_stdout: bool,
}

impl Default for PprintOptions {
    fn default() -> Self {
        Self {
            max_response_length: 500,
            max_code_length: 500,
            max_result_length: 500,
            show_stdout: true,
        }
    }
}

fn truncated(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        text.to_string()
    } else {
        let head: String = text.chars().take(max_len).collect();
        format!("{head}... [truncated]")
    }
}

const BANNER: &str = "================================================================";

/// Render a human-readable, banner-separated listing of `trace`.
pub fn pprint_trace(trace: &Trace, options: &PprintOptions) -> String {
    let mut out = String::new();
    for iteration in &trace.iterations {
        out.push_str(BANNER);
        out.push('\n');
        out.push_str(&format!(
            "Iteration {}{}\n",
            iteration.index,
            if iteration.is_final { " (final)" } else { "" }
        ));
        out.push_str(BANNER);
        out.push('\n');
        out.push_str("thinking:\n");
        out.push_str(&truncated(&iteration.thinking, options.max_response_length));
        out.push('\n');
        for execution in &iteration.executions {
            out.push_str(&format!("\n--- code[{}] ---\n", execution.id));
            out.push_str(&truncated(&execution.code, options.max_code_length));
            out.push('\n');
            if let Some(error) = &execution.error {
                out.push_str(&format!("error: {error}\n"));
            } else {
                let rendered = serde_json::to_string(&execution.result).unwrap_or_default();
                out.push_str(&format!(
                    "result: {}\n",
                    truncated(&rendered, options.max_result_length)
                ));
            }
            if options.show_stdout && !execution.stdout.is_empty() {
                out.push_str(&format!("stdout: {}\n", truncated(&execution.stdout, options.max_result_length)));
            }
        }
        out.push('\n');
    }
    out
}
