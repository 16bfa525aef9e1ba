//! Process-wide bank of scored few-shot examples.
//!
//! Unlike every other collection, [`Example`] records are not scoped to
//! one store: data model §3 and design notes §9 call this out as an
//! acknowledged piece of process-global state, since good/bad examples
//! are useful across environments, not just within the one that
//! produced them. [`ExampleBank`] is a singleton obtained via
//! [`ExampleBank::global`].

use crate::records::Example;
use std::collections::VecDeque;
use std::sync::{Mutex, OnceLock};

/// Hard cap on the number of retained examples (data model §3).
pub const MAX_EXAMPLES: usize = 100;

/// A size-bounded, LRU-by-timestamp collection of scored examples,
/// shared process-wide.
pub struct ExampleBank {
    entries: Mutex<VecDeque<Example>>,
}

impl ExampleBank {
    fn new() -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(MAX_EXAMPLES)),
        }
    }

    /// The process-wide singleton instance.
    pub fn global() -> &'static ExampleBank {
        static INSTANCE: OnceLock<ExampleBank> = OnceLock::new();
        INSTANCE.get_or_init(ExampleBank::new)
    }

    /// Record a new example, evicting the oldest entry by timestamp if
    /// the bank is at capacity.
    pub fn record(&self, example: Example) {
        let mut entries = self.entries.lock().expect("example bank lock poisoned");
        entries.push_back(example);
        if entries.len() > MAX_EXAMPLES {
            if let Some((idx, _)) = entries
                .iter()
                .enumerate()
                .min_by_key(|(_, e)| e.timestamp)
            {
                entries.remove(idx);
            }
        }
    }

    /// The `n` most recent good examples (score >= 32), most recent first.
    pub fn recent_good(&self, n: usize) -> Vec<Example> {
        self.recent_matching(n, Example::good)
    }

    /// The `n` most recent bad examples (score < 32), most recent first.
    pub fn recent_bad(&self, n: usize) -> Vec<Example> {
        self.recent_matching(n, |e| !e.good())
    }

    fn recent_matching(&self, n: usize, pred: impl Fn(&Example) -> bool) -> Vec<Example> {
        let entries = self.entries.lock().expect("example bank lock poisoned");
        let mut matched: Vec<Example> = entries.iter().filter(|e| pred(e)).cloned().collect();
        matched.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        matched.truncate(n);
        matched
    }

    /// Current number of retained examples.
    pub fn len(&self) -> usize {
        self.entries.lock().expect("example bank lock poisoned").len()
    }

    /// Whether the bank is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
