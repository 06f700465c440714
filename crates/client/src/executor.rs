// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Uniform timing, retry, and metrics plumbing for remote calls.
//!
//! Every path through [`RpcCallExecutor`] builds exactly one
//! [`RpcCallMetrics`](tend_core::RpcCallMetrics), appends it to the
//! operation's collector, and hands it to the observer, whether the call
//! succeeded or not.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tend_core::{ClientOperationMetricsBuilder, Clock, RpcCall, RpcCallMetrics, RpcCallMetricsBuilder, TimedOperation};
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::config::ClientOptions;
use crate::error::RpcError;
use crate::observer::ClientObserver;
use crate::retry::RpcCallRetryHandler;

/// What to do with an in-flight attempt when the caller cancels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnCancel {
    /// Wait up to the grace period, then return and let the attempt finish alone
    Abandon,
    /// Wait for the attempt to observe cancellation itself
    WaitForAction,
}

pub struct RpcCallExecutor<C: Clock> {
    retry: RpcCallRetryHandler,
    observer: Arc<dyn ClientObserver>,
    clock: C,
    abandon_grace: Duration,
}

impl<C: Clock> RpcCallExecutor<C> {
    pub fn new(options: &ClientOptions, observer: Arc<dyn ClientObserver>, clock: C) -> Self {
        Self {
            retry: RpcCallRetryHandler::new(options.retry_timeout, options.backoff),
            observer,
            clock,
            abandon_grace: options.abandon_grace,
        }
    }

    pub fn retry_timeout(&self) -> Duration {
        self.retry.retry_timeout()
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn observer(&self) -> &Arc<dyn ClientObserver> {
        &self.observer
    }

    /// Retry when `retries_enabled`, otherwise make a single attempt.
    pub async fn execute<T, F, Fut>(
        &self,
        retries_enabled: bool,
        call: RpcCall,
        action: F,
        on_cancel: OnCancel,
        operation: &ClientOperationMetricsBuilder,
        cancel: &CancellationToken,
    ) -> Result<T, RpcError>
    where
        T: Send + 'static,
        F: FnMut(CancellationToken) -> Fut,
        Fut: Future<Output = Result<T, RpcError>> + Send + 'static,
    {
        if retries_enabled {
            self.execute_with_retries(call, action, on_cancel, operation, cancel).await
        } else {
            self.execute_without_retries(call, action, on_cancel, operation, cancel).await
        }
    }

    pub async fn execute_with_retries<T, F, Fut>(
        &self,
        call: RpcCall,
        mut action: F,
        on_cancel: OnCancel,
        operation: &ClientOperationMetricsBuilder,
        cancel: &CancellationToken,
    ) -> Result<T, RpcError>
    where
        T: Send + 'static,
        F: FnMut(CancellationToken) -> Fut,
        Fut: Future<Output = Result<T, RpcError>> + Send + 'static,
    {
        let builder =
            Mutex::new(RpcCallMetricsBuilder::with_retries(call.clone(), self.retry_timeout(), self.clock.utc_now()));
        let (builder_ref, call_ref) = (&builder, &call);

        let result = self
            .retry
            .execute_with_retries(
                move |budget| {
                    let attempt = action(cancel.child_token());
                    async move {
                        let start = self.clock.utc_now();
                        let result = self.run_attempt(call_ref, attempt, on_cancel, budget, cancel).await;
                        builder_ref.lock().attempt(self.timed(start, &result, cancel));
                        result
                    }
                },
                |event| {
                    tracing::info!(
                        rpc = %call,
                        attempt = event.retry_count,
                        sleep_secs = event.sleep.as_secs(),
                        remaining_secs = event.remaining().as_secs(),
                        error = %event.error,
                        "An error occurred communicating with the agent; retrying"
                    );
                },
                |event| {
                    tracing::warn!(
                        rpc = %call,
                        elapsed_secs = event.elapsed.as_secs(),
                        retries = event.retry_count,
                        "Could not communicate with the agent; no more retries will be attempted"
                    );
                },
                cancel,
            )
            .await;

        self.finish(builder.into_inner(), &result, operation, cancel);
        result
    }

    pub async fn execute_without_retries<T, F, Fut>(
        &self,
        call: RpcCall,
        mut action: F,
        on_cancel: OnCancel,
        operation: &ClientOperationMetricsBuilder,
        cancel: &CancellationToken,
    ) -> Result<T, RpcError>
    where
        T: Send + 'static,
        F: FnMut(CancellationToken) -> Fut,
        Fut: Future<Output = Result<T, RpcError>> + Send + 'static,
    {
        let mut builder = RpcCallMetricsBuilder::without_retries(call.clone(), self.clock.utc_now());
        let start = self.clock.utc_now();
        let result = self.run_attempt(&call, action(cancel.child_token()), on_cancel, None, cancel).await;
        builder.attempt(self.timed(start, &result, cancel));
        self.finish(builder, &result, operation, cancel);
        result
    }

    /// Run one attempt within `budget`.
    ///
    /// With [`OnCancel::Abandon`] the attempt runs on its own task. If the
    /// caller stops waiting for it (grace period or budget spent) the task is
    /// left to finish and its result goes to the observer.
    async fn run_attempt<T, Fut>(
        &self,
        call: &RpcCall,
        attempt: Fut,
        on_cancel: OnCancel,
        budget: Option<Duration>,
        cancel: &CancellationToken,
    ) -> Result<T, RpcError>
    where
        T: Send + 'static,
        Fut: Future<Output = Result<T, RpcError>> + Send + 'static,
    {
        let deadline = async move {
            match budget {
                Some(budget) => tokio::time::sleep(budget).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(deadline);
        let timed_out = || RpcError::TimedOut(budget.unwrap_or_default());

        if on_cancel == OnCancel::WaitForAction {
            return tokio::select! {
                result = attempt => result,
                _ = &mut deadline => Err(timed_out()),
            };
        }

        let start = self.clock.utc_now();
        let mut handle = tokio::spawn(attempt);
        tokio::select! {
            joined = &mut handle => return flatten(joined),
            _ = cancel.cancelled() => {}
            _ = &mut deadline => {
                self.detach(call, start, handle, false);
                return Err(timed_out());
            }
        }
        tokio::select! {
            joined = &mut handle => flatten(joined),
            _ = tokio::time::sleep(self.abandon_grace) => {
                tracing::warn!(
                    rpc = %call,
                    grace_ms = self.abandon_grace.as_millis() as u64,
                    "abandoning call that did not stop after cancellation"
                );
                self.detach(call, start, handle, true);
                Err(RpcError::Abandoned(self.abandon_grace))
            }
            _ = &mut deadline => {
                self.detach(call, start, handle, true);
                Err(timed_out())
            }
        }
    }

    /// Report the attempt's eventual result once it finishes.
    fn detach<T>(&self, call: &RpcCall, start: DateTime<Utc>, handle: JoinHandle<Result<T, RpcError>>, cancelled: bool)
    where
        T: Send + 'static,
    {
        let (observer, clock, call) = (Arc::clone(&self.observer), self.clock.clone(), call.clone());
        tokio::spawn(async move {
            let result = flatten(handle.await);
            let end = clock.utc_now();
            let attempt = match &result {
                Ok(_) => TimedOperation::success(start, end),
                Err(e) => TimedOperation::failure(start, end, e, cancelled),
            };
            if let Err(e) = observer.abandoned_attempt_finished(&call, &attempt) {
                tracing::warn!(rpc = %call, error = %e, "observer failed");
            }
        });
    }

    fn timed<T>(&self, start: DateTime<Utc>, result: &Result<T, RpcError>, cancel: &CancellationToken) -> TimedOperation {
        let end = self.clock.utc_now();
        match result {
            // A success that raced with cancellation is still a success
            Ok(_) => TimedOperation::success(start, end),
            Err(e) => TimedOperation::failure(start, end, e, cancel.is_cancelled()),
        }
    }

    fn finish<T>(
        &self,
        mut builder: RpcCallMetricsBuilder,
        result: &Result<T, RpcError>,
        operation: &ClientOperationMetricsBuilder,
        cancel: &CancellationToken,
    ) {
        if let Err(e) = result {
            builder.failure(e, cancel.is_cancelled());
        }
        let metrics = builder.build(self.clock.utc_now());
        operation.rpc_call(metrics.clone());
        self.notify(&metrics);
    }

    fn notify(&self, metrics: &RpcCallMetrics) {
        if let Err(e) = self.observer.rpc_call_completed(metrics) {
            tracing::warn!(rpc = %metrics.rpc_call, error = %e, "observer failed");
        }
    }
}

fn flatten<T>(joined: Result<Result<T, RpcError>, JoinError>) -> Result<T, RpcError> {
    joined.unwrap_or_else(|e| Err(RpcError::TaskFailed(e.to_string())))
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
