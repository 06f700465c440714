// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::at_secs;

fn call() -> RpcCall {
    RpcCall::new("ScriptServiceV2", "GetStatus")
}

#[test]
fn rpc_call_display() {
    assert_eq!(call().to_string(), "ScriptServiceV2.GetStatus");
}

#[test]
fn succeeded_requires_last_attempt_success() {
    let mut builder = RpcCallMetricsBuilder::with_retries(call(), Duration::from_secs(60), at_secs(0));
    builder.attempt(TimedOperation::failure(at_secs(0), at_secs(1), "refused", false));
    builder.attempt(TimedOperation::success(at_secs(2), at_secs(3)));
    let metrics = builder.build(at_secs(3));

    assert!(metrics.succeeded());
    assert_eq!(metrics.attempts.len(), 2);
    assert!(!metrics.attempts[0].succeeded());
    assert_eq!(metrics.duration(), Duration::from_secs(3));
}

#[test]
fn call_level_error_fails_metrics() {
    let mut builder = RpcCallMetricsBuilder::without_retries(call(), at_secs(0));
    builder.attempt(TimedOperation::failure(at_secs(0), at_secs(1), "refused", true));
    builder.failure("refused", true);
    let metrics = builder.build(at_secs(1));

    assert!(!metrics.succeeded());
    assert!(metrics.was_cancelled);
    assert!(!metrics.with_retries);
    assert_eq!(metrics.retry_timeout, None);
}

#[test]
fn no_attempts_is_not_success() {
    let metrics = RpcCallMetricsBuilder::without_retries(call(), at_secs(0)).build(at_secs(0));
    assert!(!metrics.succeeded());
}

#[test]
fn operation_builder_clones_share_calls() {
    let builder = ClientOperationMetricsBuilder::start("ExecuteScript", at_secs(0));
    let clone = builder.clone();
    let mut rpc = RpcCallMetricsBuilder::without_retries(call(), at_secs(0));
    rpc.attempt(TimedOperation::success(at_secs(0), at_secs(1)));
    clone.rpc_call(rpc.build(at_secs(1)));

    let success = builder.success(at_secs(2));
    assert!(success.succeeded());
    assert_eq!(success.rpc_calls.len(), 1);

    let failure = builder.failure(at_secs(2), "cancelled", true);
    assert!(!failure.succeeded());
    assert!(failure.was_cancelled);
}

#[test]
fn timed_operation_duration_never_negative() {
    let op = TimedOperation::success(at_secs(5), at_secs(1));
    assert_eq!(op.duration(), Duration::ZERO);
}
