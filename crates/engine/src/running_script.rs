// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One script execution, from Pending to Complete.
//!
//! Every transition is saved to the workspace's state store before it is
//! published on the watch channel, so a poller never observes a state that a
//! restart could lose. Whatever goes wrong, the execution ends in Complete.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tend_core::{Clock, IsolationConfiguration, ProcessOutputSource, ScriptOutcome, ScriptState};
use tend_shell::{Invocation, ProcessRunner, RunError, Shell};
use tend_storage::{ScriptLogWriter, ScriptWorkspace};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::isolation::{IsolationError, IsolationMutexRegistry};

/// What to run and where
#[derive(Debug, Clone)]
pub struct ScriptExecution {
    pub workspace: ScriptWorkspace,
    pub isolation: IsolationConfiguration,
    pub arguments: Vec<String>,
    pub task_id: String,
}

/// Collaborators shared by every execution on one agent
pub struct ExecutionDeps<R: ProcessRunner, C: Clock> {
    pub shell: Arc<dyn Shell>,
    pub runner: Arc<R>,
    pub mutexes: Arc<IsolationMutexRegistry>,
    pub clock: C,
}

impl<R: ProcessRunner, C: Clock> Clone for ExecutionDeps<R, C> {
    fn clone(&self) -> Self {
        Self {
            shell: Arc::clone(&self.shell),
            runner: Arc::clone(&self.runner),
            mutexes: Arc::clone(&self.mutexes),
            clock: self.clock.clone(),
        }
    }
}

pub struct RunningScript<R: ProcessRunner, C: Clock> {
    execution: ScriptExecution,
    deps: ExecutionDeps<R, C>,
    cancel: CancellationToken,
    state: watch::Sender<ScriptState>,
}

impl<R: ProcessRunner, C: Clock> RunningScript<R, C> {
    /// `initial` is the state already persisted for this workspace.
    pub fn new(
        execution: ScriptExecution,
        deps: ExecutionDeps<R, C>,
        initial: ScriptState,
        cancel: CancellationToken,
    ) -> (Self, watch::Receiver<ScriptState>) {
        let (state, rx) = watch::channel(initial);
        (Self { execution, deps, cancel, state }, rx)
    }

    /// Run to completion. Never fails: every error becomes an outcome.
    pub async fn execute(self) -> ScriptOutcome {
        let ticket = self.execution.workspace.ticket().clone();
        let outcome = match self.execution.workspace.log().writer() {
            Ok(mut writer) => {
                let outcome = self.run_with_log(&mut writer).await;
                self.record_completed(outcome, Some(&mut writer));
                outcome
            }
            Err(e) => {
                tracing::error!(ticket = %ticket, error = %e, "could not open script log");
                self.record_completed(ScriptOutcome::Fatal, None);
                ScriptOutcome::Fatal
            }
        };
        tracing::info!(ticket = %ticket, %outcome, exit_code = outcome.exit_code(), "script complete");
        outcome
    }

    async fn run_with_log(&self, writer: &mut ScriptLogWriter) -> ScriptOutcome {
        let clock = self.deps.clock.clone();
        let mut task_log = |source: ProcessOutputSource, message: &str| write_line(writer, source, message, clock.utc_now());
        let acquired = self
            .deps
            .mutexes
            .acquire(&self.execution.isolation, &self.execution.task_id, &mut task_log, &self.cancel)
            .await;

        let _guard = match acquired {
            Ok(guard) => guard,
            Err(IsolationError::Cancelled) => {
                self.write(writer, ProcessOutputSource::StdOut, "Script execution canceled.");
                return ScriptOutcome::Canceled;
            }
            Err(IsolationError::TimedOut(_)) => {
                self.write(writer, ProcessOutputSource::StdOut, "Script execution timed out.");
                return ScriptOutcome::MutexTimedOut;
            }
        };

        if let Err(e) = self.record_started() {
            self.write(
                writer,
                ProcessOutputSource::StdOut,
                &format!("Warning: An exception occurred saving the ScriptState: {e}"),
            );
            return ScriptOutcome::Fatal;
        }
        self.run_process(writer).await
    }

    async fn run_process(&self, writer: &mut ScriptLogWriter) -> ScriptOutcome {
        let workspace = &self.execution.workspace;
        let invocation = Invocation::script(
            self.deps.shell.as_ref(),
            &workspace.bootstrap_script_path(),
            &self.execution.arguments,
            workspace.working_directory(),
        );

        let clock = self.deps.clock.clone();
        let mut sink = |source: ProcessOutputSource, text: &str| write_line(writer, source, text, clock.utc_now());
        let result = self.deps.runner.run(&invocation, &mut sink, self.cancel.clone()).await;

        match result {
            Ok(code) => ScriptOutcome::Exited(code),
            Err(RunError::Cancelled) => {
                self.write(writer, ProcessOutputSource::StdOut, "Script execution canceled.");
                ScriptOutcome::Canceled
            }
            Err(e) => {
                self.write(
                    writer,
                    ProcessOutputSource::StdErr,
                    &format!("An exception was thrown when invoking {}: {e}", invocation.program.display()),
                );
                ScriptOutcome::InvocationFailed
            }
        }
    }

    fn record_started(&self) -> Result<(), tend_storage::StateStoreError> {
        let mut state = self.state.borrow().clone();
        if state.start(self.deps.clock.utc_now()).is_err() {
            // Already past Pending; nothing to persist
            return Ok(());
        }
        self.execution.workspace.state_store().save(&state)?;
        self.state.send_replace(state);
        Ok(())
    }

    fn record_completed(&self, outcome: ScriptOutcome, writer: Option<&mut ScriptLogWriter>) {
        let mut state = self.state.borrow().clone();
        if state.complete_with(outcome, self.deps.clock.utc_now()).is_err() {
            return;
        }
        if let Err(e) = self.execution.workspace.state_store().save(&state) {
            tracing::error!(ticket = %self.execution.workspace.ticket(), error = %e, "failed to save completed state");
            if let Some(writer) = writer {
                self.write(
                    writer,
                    ProcessOutputSource::StdOut,
                    &format!("Warning: An exception occurred saving the ScriptState: {e}"),
                );
            }
        }
        // Published even when the save failed so pollers still see Complete
        self.state.send_replace(state);
    }

    fn write(&self, writer: &mut ScriptLogWriter, source: ProcessOutputSource, text: &str) {
        write_line(writer, source, text, self.deps.clock.utc_now());
    }
}

fn write_line(writer: &mut ScriptLogWriter, source: ProcessOutputSource, text: &str, at: DateTime<Utc>) {
    if let Err(e) = writer.write_output(source, text, at) {
        tracing::warn!(error = %e, "failed to write script log");
    }
}

#[cfg(test)]
#[path = "running_script_tests.rs"]
mod tests;
