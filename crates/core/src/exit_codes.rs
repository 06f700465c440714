// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reserved exit codes.
//!
//! A script that exits normally never reports one of these, so callers can tell
//! agent-side failures apart from the script's own result.

/// Unhandled failure inside the execution pipeline (state I/O, log I/O, ...)
pub const FATAL: i32 = -41;
/// The shell could not be invoked
pub const INVOCATION_ERROR: i32 = -42;
/// Cooperative cancellation
pub const CANCELED: i32 = -43;
/// The isolation mutex was not acquired within its timeout
pub const TIMEOUT: i32 = -44;
/// State exists but the agent lost the process that was running it
pub const UNKNOWN_RESULT: i32 = -45;
/// No state exists for the ticket
pub const UNKNOWN_SCRIPT: i32 = -46;
/// Client-side: the script could not be started on the agent
pub const COULD_NOT_START: i32 = -47;

/// Whether `code` is one of the reserved values.
pub fn is_reserved(code: i32) -> bool {
    (COULD_NOT_START..=FATAL).contains(&code)
}
