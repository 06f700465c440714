// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Timing and outcome records for RPC calls and client operations.
//!
//! Records are immutable once built. Builders are owned by a single call
//! (or, for [`ClientOperationMetricsBuilder`], shared by the calls of one
//! operation) and never outlive it.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Identity of one remote procedure: `service.name`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RpcCall {
    pub service: String,
    pub name: String,
}

impl RpcCall {
    pub fn new(service: impl Into<String>, name: impl Into<String>) -> Self {
        Self { service: service.into(), name: name.into() }
    }
}

impl fmt::Display for RpcCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.service, self.name)
    }
}

/// One attempt of a call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedOperation {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub error: Option<String>,
    pub was_cancelled: bool,
}

impl TimedOperation {
    pub fn success(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end, error: None, was_cancelled: false }
    }

    pub fn failure(
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        error: impl fmt::Display,
        was_cancelled: bool,
    ) -> Self {
        Self { start, end, error: Some(error.to_string()), was_cancelled }
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }

    pub fn duration(&self) -> Duration {
        (self.end - self.start).to_std().unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcCallMetrics {
    pub rpc_call: RpcCall,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub with_retries: bool,
    pub retry_timeout: Option<Duration>,
    pub error: Option<String>,
    pub was_cancelled: bool,
    pub attempts: Vec<TimedOperation>,
}

impl RpcCallMetrics {
    /// No call-level error and the final attempt succeeded.
    pub fn succeeded(&self) -> bool {
        self.error.is_none() && self.attempts.last().is_some_and(TimedOperation::succeeded)
    }

    pub fn duration(&self) -> Duration {
        (self.end - self.start).to_std().unwrap_or_default()
    }
}

/// Accumulates attempts for one call.
#[derive(Debug)]
pub struct RpcCallMetricsBuilder {
    rpc_call: RpcCall,
    start: DateTime<Utc>,
    with_retries: bool,
    retry_timeout: Option<Duration>,
    error: Option<String>,
    was_cancelled: bool,
    attempts: Vec<TimedOperation>,
}

impl RpcCallMetricsBuilder {
    pub fn with_retries(rpc_call: RpcCall, retry_timeout: Duration, start: DateTime<Utc>) -> Self {
        Self::new(rpc_call, true, Some(retry_timeout), start)
    }

    pub fn without_retries(rpc_call: RpcCall, start: DateTime<Utc>) -> Self {
        Self::new(rpc_call, false, None, start)
    }

    fn new(rpc_call: RpcCall, with_retries: bool, retry_timeout: Option<Duration>, start: DateTime<Utc>) -> Self {
        Self { rpc_call, start, with_retries, retry_timeout, error: None, was_cancelled: false, attempts: Vec::new() }
    }

    pub fn attempt(&mut self, attempt: TimedOperation) {
        self.attempts.push(attempt);
    }

    pub fn failure(&mut self, error: impl fmt::Display, was_cancelled: bool) {
        self.error = Some(error.to_string());
        self.was_cancelled = was_cancelled;
    }

    pub fn attempt_count(&self) -> usize {
        self.attempts.len()
    }

    pub fn build(self, end: DateTime<Utc>) -> RpcCallMetrics {
        RpcCallMetrics {
            rpc_call: self.rpc_call,
            start: self.start,
            end,
            with_retries: self.with_retries,
            retry_timeout: self.retry_timeout,
            error: self.error,
            was_cancelled: self.was_cancelled,
            attempts: self.attempts,
        }
    }
}

/// Everything one logical client operation did
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientOperationMetrics {
    pub operation: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub error: Option<String>,
    pub was_cancelled: bool,
    pub rpc_calls: Vec<RpcCallMetrics>,
}

impl ClientOperationMetrics {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Shared collector for the calls of one client operation.
///
/// Clones append to the same list.
#[derive(Debug, Clone)]
pub struct ClientOperationMetricsBuilder {
    operation: String,
    start: DateTime<Utc>,
    rpc_calls: Arc<Mutex<Vec<RpcCallMetrics>>>,
}

impl ClientOperationMetricsBuilder {
    pub fn start(operation: impl Into<String>, start: DateTime<Utc>) -> Self {
        Self { operation: operation.into(), start, rpc_calls: Arc::default() }
    }

    pub fn rpc_call(&self, metrics: RpcCallMetrics) {
        self.rpc_calls.lock().push(metrics);
    }

    pub fn rpc_call_count(&self) -> usize {
        self.rpc_calls.lock().len()
    }

    pub fn success(&self, end: DateTime<Utc>) -> ClientOperationMetrics {
        self.build(end, None, false)
    }

    pub fn failure(&self, end: DateTime<Utc>, error: impl fmt::Display, was_cancelled: bool) -> ClientOperationMetrics {
        self.build(end, Some(error.to_string()), was_cancelled)
    }

    fn build(&self, end: DateTime<Utc>, error: Option<String>, was_cancelled: bool) -> ClientOperationMetrics {
        ClientOperationMetrics {
            operation: self.operation.clone(),
            start: self.start,
            end,
            error,
            was_cancelled,
            rpc_calls: self.rpc_calls.lock().clone(),
        }
    }
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
