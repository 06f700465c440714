// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! tend-agent: hosts the script service on a Unix socket.

pub mod env;
pub mod lifecycle;
pub mod listener;

pub use lifecycle::{serve, startup, Config, LifecycleError, StartupResult};
