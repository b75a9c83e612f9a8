//! Per-intent retry budget

use std::time::Duration;

use crate::types::ExecutorConfig;

/// Retries left for one intent, with exponential backoff.
///
/// Created fresh for every execution; never shared between intents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryBudget {
    max_retries: u32,
    backoff: Duration,
    used: u32,
}

impl RetryBudget {
    pub fn new(max_retries: u32, backoff: Duration) -> Self {
        Self {
            max_retries,
            backoff,
            used: 0,
        }
    }

    pub fn from_config(config: &ExecutorConfig) -> Self {
        Self::new(config.max_retries, config.backoff)
    }

    /// Spends one retry; `None` once the budget is exhausted.
    ///
    /// The n-th retry waits `backoff * 2^(n-1)`.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.used >= self.max_retries {
            return None;
        }
        self.used += 1;
        let factor = 1u32.checked_shl(self.used - 1).unwrap_or(u32::MAX);
        Some(self.backoff.saturating_mul(factor))
    }

    pub fn used(&self) -> u32 {
        self.used
    }

    pub fn remaining(&self) -> u32 {
        self.max_retries.saturating_sub(self.used)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_until_exhausted() {
        let mut budget = RetryBudget::new(3, Duration::from_millis(500));
        assert_eq!(budget.next_delay(), Some(Duration::from_millis(500)));
        assert_eq!(budget.next_delay(), Some(Duration::from_millis(1000)));
        assert_eq!(budget.remaining(), 1);
        assert_eq!(budget.next_delay(), Some(Duration::from_millis(2000)));
        assert_eq!(budget.next_delay(), None);
        assert_eq!(budget.used(), 3);
    }

    #[test]
    fn zero_budget_never_retries() {
        let mut budget = RetryBudget::from_config(&ExecutorConfig {
            max_retries: 0,
            ..ExecutorConfig::default()
        });
        assert_eq!(budget.next_delay(), None);
    }
}
