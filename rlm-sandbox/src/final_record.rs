//! The tagged `FINAL` / `FINAL-VAR` sentinel record (component design §4.2,
//! §4.3) and its detection in both the evaluated result and captured
//! stdout.

use rlm_types::extract_json;
use serde_json::{json, Value};

/// Build the tagged record returned by `FINAL`/`FINAL_VAR`:
/// `{final: true, answer: {result, type}}`.
pub fn make_final_record(value: Value) -> Value {
    let type_name = json_type_name(&value);
    json!({
        "final": true,
        "answer": {
            "result": value,
            "type": type_name,
        }
    })
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "map",
    }
}

/// Whether `value` is a tagged `FINAL` record.
pub fn is_final_record(value: &Value) -> bool {
    value.get("final").and_then(Value::as_bool) == Some(true)
}

/// The `answer` payload of a tagged `FINAL` record, if it is one.
pub fn final_answer(value: &Value) -> Option<&Value> {
    if is_final_record(value) {
        value.get("answer")
    } else {
        None
    }
}

/// Dual-path final-value detection (§4.5 step 5): an execution's
/// `result` may itself be the tagged record, or its `stdout` may
/// contain a parseable serialized copy of one. Checks `result` first.
pub fn detect_final<'a>(result: &'a Value, stdout: &str) -> Option<Value> {
    if let Some(answer) = final_answer(result) {
        return Some(answer.clone());
    }
    let parsed = extract_json(stdout)?;
    final_answer(&parsed).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_final_from_result() {
        let record = make_final_record(json!(42));
        let answer = detect_final(&record, "").unwrap();
        assert_eq!(answer["result"], 42);
    }

    #[test]
    fn detects_final_from_stdout() {
        let record = make_final_record(json!("done"));
        let stdout = format!("some log line\n{record}\nmore log");
        let answer = detect_final(&json!(null), &stdout).unwrap();
        assert_eq!(answer["result"], "done");
    }

    #[test]
    fn plain_value_is_not_final() {
        assert!(detect_final(&json!({"ok": true}), "no final here").is_none());
    }
}
