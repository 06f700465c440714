// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sinks for call and operation metrics.

use std::error::Error;

use tend_core::{ClientOperationMetrics, RpcCall, RpcCallMetrics, TimedOperation};

pub type ObserverResult = Result<(), Box<dyn Error + Send + Sync>>;

/// Receives every metrics record the client produces.
///
/// Errors are logged by the caller and never change the outcome of the
/// operation being observed.
pub trait ClientObserver: Send + Sync {
    fn rpc_call_completed(&self, metrics: &RpcCallMetrics) -> ObserverResult;

    fn operation_completed(&self, metrics: &ClientOperationMetrics) -> ObserverResult;

    /// An attempt the caller stopped waiting for has finished in the background.
    fn abandoned_attempt_finished(&self, _call: &RpcCall, _attempt: &TimedOperation) -> ObserverResult {
        Ok(())
    }
}

pub struct NoopObserver;

impl ClientObserver for NoopObserver {
    fn rpc_call_completed(&self, _metrics: &RpcCallMetrics) -> ObserverResult {
        Ok(())
    }

    fn operation_completed(&self, _metrics: &ClientOperationMetrics) -> ObserverResult {
        Ok(())
    }
}

/// Logs successes at debug and failures at warn.
pub struct TracingObserver;

impl ClientObserver for TracingObserver {
    fn rpc_call_completed(&self, metrics: &RpcCallMetrics) -> ObserverResult {
        let rpc = &metrics.rpc_call;
        let elapsed_ms = metrics.duration().as_millis() as u64;
        let attempts = metrics.attempts.len();
        if metrics.succeeded() {
            tracing::debug!(%rpc, attempts, elapsed_ms, "rpc call succeeded");
        } else {
            tracing::warn!(
                %rpc,
                attempts,
                elapsed_ms,
                was_cancelled = metrics.was_cancelled,
                error = metrics.error.as_deref().unwrap_or_default(),
                "rpc call failed"
            );
        }
        Ok(())
    }

    fn operation_completed(&self, metrics: &ClientOperationMetrics) -> ObserverResult {
        let elapsed_ms = (metrics.end - metrics.start).num_milliseconds();
        tracing::info!(
            operation = %metrics.operation,
            rpc_calls = metrics.rpc_calls.len(),
            elapsed_ms,
            succeeded = metrics.succeeded(),
            was_cancelled = metrics.was_cancelled,
            "client operation complete"
        );
        Ok(())
    }

    fn abandoned_attempt_finished(&self, call: &RpcCall, attempt: &TimedOperation) -> ObserverResult {
        tracing::info!(
            rpc = %call,
            succeeded = attempt.succeeded(),
            error = attempt.error.as_deref().unwrap_or_default(),
            "abandoned rpc attempt finished"
        );
        Ok(())
    }
}

#[cfg(any(test, feature = "test-support"))]
mod recording {
    use super::*;
    use parking_lot::Mutex;

    /// Keeps every record for assertions.
    #[derive(Default)]
    pub struct RecordingObserver {
        rpc_calls: Mutex<Vec<RpcCallMetrics>>,
        operations: Mutex<Vec<ClientOperationMetrics>>,
        abandoned: Mutex<Vec<(RpcCall, TimedOperation)>>,
        fail: bool,
    }

    impl RecordingObserver {
        pub fn new() -> Self {
            Self::default()
        }

        /// Records, then reports an error from every callback.
        pub fn failing() -> Self {
            Self { fail: true, ..Self::default() }
        }

        pub fn rpc_calls(&self) -> Vec<RpcCallMetrics> {
            self.rpc_calls.lock().clone()
        }

        pub fn operations(&self) -> Vec<ClientOperationMetrics> {
            self.operations.lock().clone()
        }

        pub fn abandoned(&self) -> Vec<(RpcCall, TimedOperation)> {
            self.abandoned.lock().clone()
        }

        fn result(&self) -> ObserverResult {
            if self.fail {
                return Err("observer failure".into());
            }
            Ok(())
        }
    }

    impl ClientObserver for RecordingObserver {
        fn rpc_call_completed(&self, metrics: &RpcCallMetrics) -> ObserverResult {
            self.rpc_calls.lock().push(metrics.clone());
            self.result()
        }

        fn operation_completed(&self, metrics: &ClientOperationMetrics) -> ObserverResult {
            self.operations.lock().push(metrics.clone());
            self.result()
        }

        fn abandoned_attempt_finished(&self, call: &RpcCall, attempt: &TimedOperation) -> ObserverResult {
            self.abandoned.lock().push((call.clone(), attempt.clone()));
            self.result()
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use recording::RecordingObserver;
