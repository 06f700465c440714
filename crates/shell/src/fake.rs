// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scripted process runner for tests.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tend_core::ProcessOutputSource;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::runner::{Invocation, OutputSink, ProcessRunner, RunError};

/// How a scripted run ends
#[derive(Debug, Clone)]
pub enum FakeExit {
    Code(i32),
    /// Exit with the code after sleeping (tokio time, so pausable)
    After(Duration, i32),
    /// Exit with the code once the notify fires
    OnNotify(Arc<Notify>, i32),
    /// Never exits on its own
    Hang,
    /// The program cannot be started
    SpawnError(String),
}

/// One scripted run: lines to emit, then how it ends
#[derive(Debug, Clone)]
pub struct FakeRun {
    pub lines: Vec<(ProcessOutputSource, String)>,
    pub exit: FakeExit,
}

impl FakeRun {
    pub fn exits(code: i32) -> Self {
        Self { lines: Vec::new(), exit: FakeExit::Code(code) }
    }

    pub fn ends(exit: FakeExit) -> Self {
        Self { lines: Vec::new(), exit }
    }

    pub fn stdout(mut self, text: &str) -> Self {
        self.lines.push((ProcessOutputSource::StdOut, text.to_string()));
        self
    }

    pub fn stderr(mut self, text: &str) -> Self {
        self.lines.push((ProcessOutputSource::StdErr, text.to_string()));
        self
    }
}

/// Plays back queued [`FakeRun`]s in order, then repeats the default.
#[derive(Debug, Clone)]
pub struct FakeProcessRunner {
    inner: Arc<Mutex<FakeState>>,
}

#[derive(Debug)]
struct FakeState {
    queued: VecDeque<FakeRun>,
    default: FakeRun,
    invocations: Vec<Invocation>,
}

impl Default for FakeProcessRunner {
    fn default() -> Self {
        Self::new(FakeRun::exits(0))
    }
}

impl FakeProcessRunner {
    pub fn new(default: FakeRun) -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeState {
                queued: VecDeque::new(),
                default,
                invocations: Vec::new(),
            })),
        }
    }

    pub fn push(&self, run: FakeRun) {
        self.inner.lock().queued.push_back(run);
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.inner.lock().invocations.clone()
    }
}

#[async_trait]
impl ProcessRunner for FakeProcessRunner {
    async fn run(
        &self,
        invocation: &Invocation,
        sink: OutputSink<'_>,
        cancel: CancellationToken,
    ) -> Result<i32, RunError> {
        let run = {
            let mut state = self.inner.lock();
            state.invocations.push(invocation.clone());
            state.queued.pop_front().unwrap_or_else(|| state.default.clone())
        };

        if let FakeExit::SpawnError(message) = &run.exit {
            return Err(RunError::Spawn {
                program: invocation.program.display().to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, message.clone()),
            });
        }
        for (source, text) in &run.lines {
            sink(*source, text);
        }

        let code = match run.exit {
            FakeExit::Code(code) => Some(code),
            FakeExit::After(delay, code) => tokio::select! {
                _ = tokio::time::sleep(delay) => Some(code),
                _ = cancel.cancelled() => None,
            },
            FakeExit::OnNotify(notify, code) => tokio::select! {
                _ = notify.notified() => Some(code),
                _ = cancel.cancelled() => None,
            },
            FakeExit::Hang | FakeExit::SpawnError(_) => {
                cancel.cancelled().await;
                None
            }
        };
        code.ok_or(RunError::Cancelled)
    }
}
