//! Builds the feedback message appended after a non-final iteration
//! (spec §4.5 step 7).

use rlm_sandbox::ExecutionResult;

/// Build the feedback text for one iteration's executions.
///
/// When `executions` is empty (the turn's structured response carried
/// no code to run, or failed to parse at all), nudges the model back
/// toward the required `{thinking, code}` shape. Otherwise renders
/// each execution's code and outcome under a `<result_i>` tag, in
/// order, so the model can address each one by number in its next
/// turn.
pub fn build_feedback(executions: &[ExecutionResult]) -> String {
    if executions.is_empty() {
        return no_code_nudge();
    }
    let mut out = String::new();
    for (i, execution) in executions.iter().enumerate() {
        out.push_str(&format!("<result_{i}>\n"));
        if let Some(error) = &execution.error {
            out.push_str(&format!("error: {error}\n"));
        } else {
            let rendered = serde_json::to_string(&execution.result).unwrap_or_default();
            out.push_str(&format!("result: {rendered}\n"));
            if execution.is_function {
                out.push_str(
                    "note: this result is a function reference, not a called value. \
                     Did you mean to invoke it, e.g. `double(3)` instead of `Fn(\"double\")`?\n",
                );
            }
        }
        if !execution.stdout.is_empty() {
            out.push_str(&format!("stdout: {}\n", execution.stdout));
        }
        out.push_str(&format!("</result_{i}>\n"));
    }
    out
}

fn no_code_nudge() -> &'static str {
    "No runnable code was found in your last response. Respond with a single JSON object \
     containing `thinking` (a string) and `code` (an array of one or more rhai snippets to \
     run), or a fenced ```rhai code block if you cannot produce JSON directly."
}
