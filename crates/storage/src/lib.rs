// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! On-disk state for script executions: one workspace directory per ticket
//! holding the persisted [`ScriptState`](tend_core::ScriptState), the
//! append-only output log, and the script files.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod masker;
mod script_log;
mod state_store;
mod workspace;

pub use masker::SensitiveValueMasker;
pub use script_log::{ScriptLog, ScriptLogError, ScriptLogWriter, LOG_FILE};
pub use state_store::{ScriptStateStore, StateStoreError, STATE_FILE};
pub use workspace::{ScriptWorkspace, WorkspaceError, WorkspaceFactory, WorkspaceMetadata, WorkspaceSpec};
