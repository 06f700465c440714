// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Time-budgeted retries.
//!
//! A call may keep retrying while its total elapsed time, plus the next
//! backoff sleep, leaves at least [`MIN_REMAINING_FOR_RETRY`] of the budget.
//! The first attempt is unbounded; every retry is bounded by what is left of
//! the budget, so a call that always fails gives up within the budget plus
//! one attempt.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::Backoff;
use crate::error::RpcError;

/// Retrying is pointless with less than this much budget left.
pub const MIN_REMAINING_FOR_RETRY: Duration = Duration::from_secs(1);

/// Passed to the `on_retry` callback before each backoff sleep
#[derive(Debug)]
pub struct RetryEvent<'a> {
    pub error: &'a RpcError,
    /// 1-based number of the retry about to happen
    pub retry_count: u32,
    pub sleep: Duration,
    pub elapsed: Duration,
    pub retry_timeout: Duration,
}

impl RetryEvent<'_> {
    pub fn remaining(&self) -> Duration {
        self.retry_timeout.saturating_sub(self.elapsed)
    }
}

/// Passed to the `on_timeout` callback when the budget is spent
#[derive(Debug, Clone, Copy)]
pub struct TimeoutEvent {
    pub retry_timeout: Duration,
    pub elapsed: Duration,
    pub retry_count: u32,
}

#[derive(Debug, Clone)]
pub struct RpcCallRetryHandler {
    retry_timeout: Duration,
    backoff: Backoff,
}

impl RpcCallRetryHandler {
    pub fn new(retry_timeout: Duration, backoff: Backoff) -> Self {
        Self { retry_timeout, backoff }
    }

    pub fn retry_timeout(&self) -> Duration {
        self.retry_timeout
    }

    /// Run `action` until it succeeds, the budget is spent, or `cancel` fires.
    ///
    /// `action` receives the time it may take: `None` for the first attempt,
    /// the remaining budget for retries. An attempt that reports
    /// [`RpcError::TimedOut`] ends the call; the error from the previous
    /// attempt is returned instead, being the more meaningful of the two.
    pub async fn execute_with_retries<T, F, Fut>(
        &self,
        mut action: F,
        mut on_retry: impl FnMut(&RetryEvent<'_>),
        mut on_timeout: impl FnMut(&TimeoutEvent),
        cancel: &CancellationToken,
    ) -> Result<T, RpcError>
    where
        F: FnMut(Option<Duration>) -> Fut,
        Fut: Future<Output = Result<T, RpcError>>,
    {
        let started = Instant::now();
        let mut retry_count = 0;
        let mut last_error: Option<RpcError> = None;

        loop {
            let budget = if retry_count == 0 {
                None
            } else {
                Some(self.retry_timeout.saturating_sub(started.elapsed()))
            };
            let error = match action(budget).await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            let timeout = TimeoutEvent { retry_timeout: self.retry_timeout, elapsed: started.elapsed(), retry_count };
            if matches!(error, RpcError::TimedOut(_)) {
                on_timeout(&timeout);
                return Err(last_error.unwrap_or(error));
            }
            if cancel.is_cancelled() || error.is_cancellation() {
                return Err(error);
            }

            let sleep = self.backoff.delay(retry_count + 1);
            let remaining = self.retry_timeout.saturating_sub(timeout.elapsed).saturating_sub(sleep);
            if remaining <= MIN_REMAINING_FOR_RETRY {
                on_timeout(&timeout);
                return Err(error);
            }

            retry_count += 1;
            on_retry(&RetryEvent {
                error: &error,
                retry_count,
                sleep,
                elapsed: timeout.elapsed,
                retry_timeout: self.retry_timeout,
            });
            tokio::select! {
                _ = cancel.cancelled() => return Err(error),
                _ = tokio::time::sleep(sleep) => {}
            }
            last_error = Some(error);
        }
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
