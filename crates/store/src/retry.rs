//! Bounded fixed-backoff retry for transient storage errors.

use std::time::Duration;

use crate::error::{StoreError, StoreResult};

/// Retry budget for one connector call: `retries` extra attempts with a
/// fixed `delay` between them, so total blocking time is bounded by
/// `retries × delay` plus the attempts themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn new(retries: u32, delay: Duration) -> Self {
        Self { retries, delay }
    }

    /// Run `op`, retrying while `is_transient` approves the error and the
    /// budget lasts. The last error is surfaced once attempts are exhausted.
    pub fn run<T>(
        &self,
        is_transient: impl Fn(&StoreError) -> bool,
        mut op: impl FnMut() -> StoreResult<T>,
    ) -> StoreResult<T> {
        let mut attempt = 0u32;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.retries && is_transient(&err) => {
                    attempt += 1;
                    tracing::warn!(
                        attempt,
                        max = self.retries,
                        error = %err,
                        "transient storage error, backing off"
                    );
                    std::thread::sleep(self.delay);
                }
                Err(err) => return Err(err),
            }
        }
    }
}
