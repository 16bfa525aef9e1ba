//! Token estimation for budgeting.
//!
//! The teacher's `neuron-context` estimates tokens via a `TokenCounter`
//! whose body isn't available in this tree (only its call sites and
//! tests were retrieved, not its source). We fall back to the standard
//! chars-divided-by-4 heuristic used across the ecosystem for rough
//! budgeting when no tokenizer is wired in.

use rlm_types::Message;

/// Rough token estimate for one block of text: one token per four bytes,
/// rounded up, with a one-token floor for any non-empty text.
pub fn estimate_text(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }
    text.len().div_ceil(4).max(1)
}

/// Rough token estimate for a single message, summing its text blocks
/// plus a small per-message overhead for role/framing tokens.
pub fn estimate_message(message: &Message) -> usize {
    const MESSAGE_OVERHEAD: usize = 4;
    MESSAGE_OVERHEAD + estimate_text(&message.text())
}

/// Rough token estimate for a whole message list.
pub fn estimate_messages(messages: &[Message]) -> usize {
    messages.iter().map(estimate_message).sum()
}
