// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! tend-core: domain types shared by the agent and its clients

pub mod macros;

pub mod clock;
pub mod exit_codes;
pub mod isolation;
pub mod metrics;
pub mod output;
pub mod script;
pub mod state;
pub mod ticket;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, FakeClock, SystemClock};
pub use isolation::{IsolationConfiguration, ScriptIsolationLevel, DEFAULT_MUTEX_NAME};
pub use metrics::{
    ClientOperationMetrics, ClientOperationMetricsBuilder, RpcCall, RpcCallMetrics,
    RpcCallMetricsBuilder, TimedOperation,
};
pub use output::{ProcessOutput, ProcessOutputSource};
pub use script::{ScriptFile, ScriptOutcome, ScriptType};
pub use state::{ProcessState, ScriptState, TransitionError};
pub use ticket::{ScriptTicket, TicketError, TicketFactory};
