//! Token-budget message reduction (spec §4.5 step 1).
//!
//! Grounded in `neuron-context::SlidingWindowStrategy` (system-message
//! preservation plus a windowed tail of recent messages) and the
//! teacher's `truncate_to_last_n_user_messages` helper
//! (`other_examples/.../muninn-rlm-src-engine-mod.rs`), generalized to
//! the exact policy spec.md §4.5 step 1 names: always keep the system
//! prompt and the last *k* messages; fill whatever budget remains with
//! the most recent earlier messages, skipping ones that would overflow
//! it; restore chronological order at the end.

use crate::token_counter::estimate_message;
use rlm_types::{Message, Role};

/// Default tail window size (`k` in spec §4.5 step 1).
pub const DEFAULT_TAIL_WINDOW: usize = 4;

/// Reduce `messages` to fit within `token_budget`, per spec §4.5 step 1.
///
/// The system prompt (first message, if present) and the last `tail`
/// messages are always kept regardless of budget. Remaining budget is
/// filled with the most recent of the earlier messages; any that would
/// overflow it are skipped rather than truncating the whole pass, so a
/// single oversized message doesn't starve the rest. Output is restored
/// to chronological order.
pub fn reduce_to_budget(messages: &[Message], token_budget: usize, tail: usize) -> Vec<Message> {
    if messages.is_empty() {
        return Vec::new();
    }

    let has_system = messages[0].role == Role::System;
    let (system, rest): (Option<&Message>, &[Message]) = if has_system {
        (Some(&messages[0]), &messages[1..])
    } else {
        (None, messages)
    };

    let tail_start = rest.len().saturating_sub(tail);
    let (earlier, kept_tail) = rest.split_at(tail_start);

    let mut budget = token_budget;
    if let Some(sys) = system {
        budget = budget.saturating_sub(estimate_message(sys));
    }
    for m in kept_tail {
        budget = budget.saturating_sub(estimate_message(m));
    }

    let mut filled_earlier: Vec<&Message> = Vec::new();
    for m in earlier.iter().rev() {
        let cost = estimate_message(m);
        if cost <= budget {
            budget -= cost;
            filled_earlier.push(m);
        }
    }
    filled_earlier.reverse();

    let mut result = Vec::with_capacity(
        system.is_some() as usize + filled_earlier.len() + kept_tail.len(),
    );
    if let Some(sys) = system {
        result.push(sys.clone());
    }
    result.extend(filled_earlier.into_iter().cloned());
    result.extend(kept_tail.iter().cloned());
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msgs(n: usize) -> Vec<Message> {
        let mut v = vec![Message::system("system prompt")];
        for i in 0..n {
            v.push(Message::user(format!("message {i}")));
        }
        v
    }

    #[test]
    fn system_and_tail_survive_a_zero_budget() {
        let messages = msgs(10);
        let reduced = reduce_to_budget(&messages, 0, DEFAULT_TAIL_WINDOW);
        assert_eq!(reduced.first().unwrap().role, Role::System);
        assert_eq!(reduced.len(), 1 + DEFAULT_TAIL_WINDOW);
        let tail_texts: Vec<String> = reduced[1..].iter().map(Message::text).collect();
        assert_eq!(
            tail_texts,
            vec!["message 6", "message 7", "message 8", "message 9"]
        );
    }

    #[test]
    fn ample_budget_keeps_everything_in_order() {
        let messages = msgs(5);
        let reduced = reduce_to_budget(&messages, 100_000, DEFAULT_TAIL_WINDOW);
        assert_eq!(reduced.len(), messages.len());
        for (a, b) in reduced.iter().zip(messages.iter()) {
            assert_eq!(a.text(), b.text());
        }
    }

    #[test]
    fn earlier_messages_backfill_in_recency_order_then_restore_chronology() {
        let messages = msgs(8);
        // system (~5 tok) + tail of 4 (~6 tok each) leaves a small
        // remainder that only fits one or two of the earlier messages.
        let reduced = reduce_to_budget(&messages, 5 + 4 * 6 + 6, DEFAULT_TAIL_WINDOW);
        let texts: Vec<String> = reduced.iter().map(Message::text).collect();
        assert_eq!(texts[0], "system prompt");
        // Whatever earlier messages got pulled in must be the most
        // recent ones available, and still in chronological order.
        let earlier: Vec<&String> = texts[1..texts.len() - DEFAULT_TAIL_WINDOW].iter().collect();
        assert!(earlier.iter().all(|t| t.starts_with("message")));
        // last 4 are always the tail
        assert_eq!(
            &texts[texts.len() - 4..],
            &["message 4", "message 5", "message 6", "message 7"]
        );
    }

    #[test]
    fn no_system_message_is_handled() {
        let messages = vec![Message::user("only message")];
        let reduced = reduce_to_budget(&messages, 1000, DEFAULT_TAIL_WINDOW);
        assert_eq!(reduced.len(), 1);
    }
}
