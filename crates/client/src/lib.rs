// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! tend-client: runs scripts on an agent over an unreliable link.
//!
//! Every remote call goes through [`RpcCallExecutor`], which bounds retries
//! by a wall-clock budget, abandons calls that ignore cancellation, and
//! reports metrics. [`ScriptExecutor`] negotiates a script service version
//! and drives one script to completion.

mod capabilities;
mod config;
mod error;
mod executor;
mod observer;
mod orchestrator;
mod retry;
mod transport;

pub use capabilities::{select_script_service, CapabilitiesCache, CapabilityNegotiator};
pub use config::{Backoff, ClientOptions};
pub use error::{NegotiationError, RpcError, ScriptExecutionError};
pub use executor::{OnCancel, RpcCallExecutor};
pub use observer::{ClientObserver, NoopObserver, ObserverResult, TracingObserver};
pub use orchestrator::{ScriptExecutionResult, ScriptExecutor, EXECUTE_SCRIPT_OPERATION};
pub use retry::{RetryEvent, RpcCallRetryHandler, TimeoutEvent, MIN_REMAINING_FOR_RETRY};
pub use transport::{LocalTransport, SocketTransport, Transport};

#[cfg(any(test, feature = "test-support"))]
pub use observer::RecordingObserver;
#[cfg(any(test, feature = "test-support"))]
pub use transport::FakeTransport;
