//! Incremental byte accounting
//!
//! Every chunk is charged before it is stored, so a consumer that stops on the
//! first failed charge never holds more than `limit` bytes.

/// Returned when a charge would take the budget past its limit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudgetExceeded {
    pub limit: u64,
    pub attempted: u64,
}

#[derive(Debug, Clone)]
pub struct ByteBudget {
    limit: u64,
    consumed: u64,
}

impl ByteBudget {
    pub fn new(limit: u64) -> Self {
        Self { limit, consumed: 0 }
    }

    /// Account for `bytes` more; on failure nothing is recorded
    pub fn charge(&mut self, bytes: usize) -> Result<(), BudgetExceeded> {
        let attempted = self.consumed.saturating_add(bytes as u64);
        if attempted > self.limit {
            return Err(BudgetExceeded {
                limit: self.limit,
                attempted,
            });
        }
        self.consumed = attempted;
        Ok(())
    }

    /// Whether a declared size already rules the artifact out
    pub fn admits(&self, declared: u64) -> bool {
        self.consumed.saturating_add(declared) <= self.limit
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    pub fn remaining(&self) -> u64 {
        self.limit - self.consumed
    }
}
