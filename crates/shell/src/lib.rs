// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process spawning for script executions.
//!
//! A [`Shell`] turns a bootstrap script into a program and argument list; a
//! [`ProcessRunner`] runs it, streaming each output line to a sink and
//! honouring cooperative cancellation.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod runner;
mod shell;

#[cfg(any(test, feature = "test-support"))]
mod fake;

pub use runner::{Invocation, OutputSink, ProcessRunner, RunError, TokioProcessRunner};
pub use shell::{Bash, Shell};

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeExit, FakeProcessRunner, FakeRun};
