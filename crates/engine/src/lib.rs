// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! tend-engine: the agent side of script execution.
//!
//! [`ScriptService`] owns the ticket map and drives each [`RunningScript`]
//! through Pending, Running and Complete. [`AgentDispatcher`] maps protocol
//! requests onto it.

mod cleanup;
mod handler;
mod isolation;
mod running_script;
mod service;

pub use cleanup::{WorkspaceCleaner, DEFAULT_RETENTION};
pub use handler::{request_ticket, AgentDispatcher, HOSTED_SERVICES};
pub use isolation::{IsolationError, IsolationGuard, IsolationMutexRegistry};
pub use running_script::{ExecutionDeps, RunningScript, ScriptExecution};
pub use service::{ScriptService, ServiceError, StartScriptRequest};
