//! Run-scoped deduplication

use std::collections::HashSet;

use crate::models::ThreadId;

/// Threads already handled during the current run
#[derive(Debug, Default)]
pub struct RunLedger {
    seen: HashSet<ThreadId>,
}

impl RunLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the thread was already handled by an earlier query
    pub fn seen_this_run(&self, id: &ThreadId) -> bool {
        self.seen.contains(id)
    }

    /// Record the thread as handled; returns `false` if it already was
    pub fn mark_seen_this_run(&mut self, id: &ThreadId) -> bool {
        self.seen.insert(id.clone())
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_and_check() {
        let mut ledger = RunLedger::new();
        let id = ThreadId::new("t1");

        assert!(!ledger.seen_this_run(&id));
        assert!(ledger.mark_seen_this_run(&id));
        assert!(ledger.seen_this_run(&id));
        assert!(!ledger.mark_seen_this_run(&id));
        assert_eq!(ledger.len(), 1);
    }
}
