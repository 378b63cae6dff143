//! Bounded retry for completions, with token-budget escalation.

use std::future::Future;

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry,
    GiveUp,
}

/// Inputs for one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempt {
    /// 1-based.
    pub number: u32,
    pub max_tokens: u32,
}

impl Attempt {
    #[must_use]
    pub fn is_retry(&self) -> bool {
        self.number > 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Upper bound for escalated budgets. Never lowers a budget already
    /// above it.
    pub max_tokens_ceiling: u32,
}

impl RetryPolicy {
    /// One retry, as used for truncated completions.
    #[must_use]
    pub fn single_retry(max_tokens_ceiling: u32) -> Self {
        Self {
            max_attempts: 2,
            max_tokens_ceiling,
        }
    }

    /// Budget for the next attempt: half again as much, capped at the
    /// ceiling, never below the previous budget.
    #[must_use]
    pub fn escalate(&self, previous: u32) -> u32 {
        let raised = previous.saturating_add(previous / 2);
        raised.min(self.max_tokens_ceiling).max(previous)
    }

    /// Runs `operation` until it succeeds, `classify` says to give up, or
    /// `max_attempts` is reached. The last error is returned.
    ///
    /// # Errors
    ///
    /// Returns the error of the final attempt.
    pub async fn attempt<T, E, F, Fut, C>(
        &self,
        initial_max_tokens: u32,
        classify: C,
        mut operation: F,
    ) -> Result<T, E>
    where
        F: FnMut(Attempt) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        C: Fn(&E) -> RetryDecision,
    {
        let mut attempt = Attempt {
            number: 1,
            max_tokens: initial_max_tokens,
        };
        loop {
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if attempt.number >= self.max_attempts.max(1)
                        || classify(&err) == RetryDecision::GiveUp
                    {
                        return Err(err);
                    }
                    let next = Attempt {
                        number: attempt.number + 1,
                        max_tokens: self.escalate(attempt.max_tokens),
                    };
                    tracing::warn!(
                        attempt = next.number,
                        max_attempts = self.max_attempts,
                        max_tokens = next.max_tokens,
                        "completion retry with escalated token budget"
                    );
                    attempt = next;
                }
            }
        }
    }
}
