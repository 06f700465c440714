// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::cell::Cell;

fn handler(retry_timeout: Duration) -> RpcCallRetryHandler {
    RpcCallRetryHandler::new(retry_timeout, Backoff::new(Duration::from_millis(100), Duration::from_secs(1), 2.0))
}

fn transport_error() -> RpcError {
    RpcError::Remote("agent busy".to_string())
}

#[tokio::test(start_paused = true)]
async fn succeeds_after_transient_failures() {
    for k in [1u32, 2, 5] {
        let calls = Cell::new(0u32);
        let mut retries = Vec::new();
        let result = handler(Duration::from_secs(60))
            .execute_with_retries(
                |_| {
                    calls.set(calls.get() + 1);
                    let n = calls.get();
                    async move {
                        if n < k {
                            Err(transport_error())
                        } else {
                            Ok(n)
                        }
                    }
                },
                |event| retries.push(event.retry_count),
                |_| panic!("budget should not run out"),
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(result.unwrap(), k);
        assert_eq!(calls.get(), k);
        assert_eq!(retries, (1..k).collect::<Vec<_>>());
    }
}

#[tokio::test(start_paused = true)]
async fn always_failing_call_gives_up_within_budget() {
    let budget = Duration::from_secs(10);
    let started = Instant::now();
    let mut timeouts = 0;
    let mut budgets = Vec::new();

    let result: Result<(), _> = handler(budget)
        .execute_with_retries(
            |b| {
                budgets.push(b);
                async { Err(transport_error()) }
            },
            |_| {},
            |_| timeouts += 1,
            &CancellationToken::new(),
        )
        .await;

    assert!(matches!(result, Err(RpcError::Remote(_))));
    assert!(started.elapsed() <= budget, "{:?}", started.elapsed());
    assert_eq!(timeouts, 1);
    assert_eq!(budgets[0], None);
    assert!(budgets[1..].iter().all(|b| b.is_some_and(|b| b <= budget)));
    assert!(budgets.len() > 3);
}

#[tokio::test(start_paused = true)]
async fn timed_out_retry_reports_previous_error() {
    let calls = Cell::new(0);
    let result: Result<(), _> = handler(Duration::from_secs(10))
        .execute_with_retries(
            |budget| {
                calls.set(calls.get() + 1);
                let first = calls.get() == 1;
                async move {
                    if first {
                        Err(RpcError::Remote("first".to_string()))
                    } else {
                        Err(RpcError::TimedOut(budget.unwrap_or_default()))
                    }
                }
            },
            |_| {},
            |_| {},
            &CancellationToken::new(),
        )
        .await;

    assert!(matches!(result, Err(RpcError::Remote(m)) if m == "first"));
    assert_eq!(calls.get(), 2);
}

#[tokio::test(start_paused = true)]
async fn budget_below_minimum_never_retries() {
    let calls = Cell::new(0);
    let mut timed_out = None;
    let result: Result<(), _> = handler(Duration::from_millis(900))
        .execute_with_retries(
            |_| {
                calls.set(calls.get() + 1);
                async { Err(transport_error()) }
            },
            |_| panic!("no retry expected"),
            |event| timed_out = Some(event.retry_count),
            &CancellationToken::new(),
        )
        .await;

    assert!(result.is_err());
    assert_eq!(calls.get(), 1);
    assert_eq!(timed_out, Some(0));
}

#[tokio::test(start_paused = true)]
async fn cancellation_during_backoff_stops_retrying() {
    let cancel = CancellationToken::new();
    let calls = Cell::new(0);
    let trigger = cancel.clone();
    let result: Result<(), _> = handler(Duration::from_secs(60))
        .execute_with_retries(
            |_| {
                calls.set(calls.get() + 1);
                async { Err(transport_error()) }
            },
            |_| trigger.cancel(),
            |_| panic!("budget should not run out"),
            &cancel,
        )
        .await;

    assert!(matches!(result, Err(RpcError::Remote(_))));
    assert_eq!(calls.get(), 1);
}

#[tokio::test(start_paused = true)]
async fn cancellation_errors_are_not_retried() {
    let calls = Cell::new(0);
    let result: Result<(), _> = handler(Duration::from_secs(60))
        .execute_with_retries(
            |_| {
                calls.set(calls.get() + 1);
                async { Err(RpcError::Cancelled) }
            },
            |_| panic!("no retry expected"),
            |_| {},
            &CancellationToken::new(),
        )
        .await;
    assert!(matches!(result, Err(RpcError::Cancelled)));
    assert_eq!(calls.get(), 1);
}
