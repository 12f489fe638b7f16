//! Iteration budget shared by every bounded loop in a run.

use crate::error::{GenResult, GenerationFailure, Stage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IterationBudget {
    limit: usize,
}

impl IterationBudget {
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Counter for one loop. `what` names the loop in the failure reason.
    pub fn guard(&self, stage: Stage, what: &'static str) -> BudgetGuard {
        BudgetGuard {
            stage,
            what,
            used: 0,
            limit: self.limit,
        }
    }
}

#[derive(Debug)]
pub struct BudgetGuard {
    stage: Stage,
    what: &'static str,
    used: usize,
    limit: usize,
}

impl BudgetGuard {
    /// Count one iteration; fails once the ceiling is exceeded.
    #[inline]
    pub fn tick(&mut self) -> GenResult<()> {
        self.used += 1;
        if self.used > self.limit {
            return Err(GenerationFailure::new(
                self.stage,
                format!(
                    "{} exceeded the iteration budget of {}",
                    self.what, self.limit
                ),
            ));
        }
        Ok(())
    }

    pub fn used(&self) -> usize {
        self.used
    }
}
