//! Holder for the current rule set
//!
//! Scans take an `Arc<RuleSet>` snapshot once and use it for their whole
//! lifetime. A reload swaps the pointer; scans already in flight keep the
//! snapshot they started with.

use std::sync::{Arc, RwLock};

use crate::rules::compiler::RuleSet;

#[derive(Debug)]
pub struct RuleStore {
    current: RwLock<Arc<RuleSet>>,
}

impl RuleStore {
    pub fn new(initial: RuleSet) -> Self {
        Self {
            current: RwLock::new(Arc::new(initial)),
        }
    }

    /// Snapshot of the installed rule set
    pub fn current(&self) -> Arc<RuleSet> {
        // The lock only guards a pointer swap, so a poisoned lock still holds
        // a complete value.
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Install `next` and return the set it replaced
    pub fn replace(&self, next: RuleSet) -> Arc<RuleSet> {
        let next = Arc::new(next);
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        let previous = std::mem::replace(&mut *guard, next);
        log::info!(
            "Rule set replaced: {} -> {} ({} rules)",
            previous.version(),
            guard.version(),
            guard.len()
        );
        previous
    }

    /// Version identifier of the installed rule set
    pub fn version(&self) -> String {
        self.current().version().to_string()
    }
}

impl Default for RuleStore {
    fn default() -> Self {
        Self::new(RuleSet::empty())
    }
}
