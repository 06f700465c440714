// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ticket-addressed script operations.
//!
//! Starting is idempotent per ticket: a repeat StartScript for a ticket that
//! is already running (or has run) reports its status instead of running it
//! again. Status for a ticket this process never launched comes from the
//! persisted state, so an agent restart is visible to callers as
//! [`exit_codes::UNKNOWN_RESULT`] rather than a missing script.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tend_core::{exit_codes, Clock, ProcessState, ScriptState, ScriptTicket, TicketFactory};
use tend_shell::ProcessRunner;
use tend_storage::{
    ScriptLogError, ScriptWorkspace, StateStoreError, WorkspaceError, WorkspaceFactory, WorkspaceSpec,
};
use tend_wire::ScriptStatusResponse;
use thiserror::Error;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::running_script::{ExecutionDeps, RunningScript, ScriptExecution};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("workspace error: {0}")]
    Workspace(#[from] WorkspaceError),
    #[error("state error: {0}")]
    State(#[from] StateStoreError),
    #[error("log error: {0}")]
    Log(#[from] ScriptLogError),
}

/// A start request in version-neutral form
#[derive(Debug, Clone)]
pub struct StartScriptRequest {
    pub ticket: ScriptTicket,
    pub task_id: String,
    pub spec: WorkspaceSpec,
    /// Hold the response until the script completes, up to this long
    pub wait_for_completion: Option<Duration>,
}

#[derive(Default)]
struct ScriptEntry {
    start_lock: tokio::sync::Mutex<()>,
    launched: Mutex<Option<Launched>>,
}

#[derive(Clone)]
struct Launched {
    workspace: ScriptWorkspace,
    cancel: CancellationToken,
    state: watch::Receiver<ScriptState>,
}

pub struct ScriptService<R: ProcessRunner, C: Clock> {
    workspaces: WorkspaceFactory,
    deps: ExecutionDeps<R, C>,
    tickets: TicketFactory,
    running: Mutex<HashMap<ScriptTicket, Arc<ScriptEntry>>>,
}

impl<R: ProcessRunner, C: Clock> ScriptService<R, C> {
    pub fn new(workspaces: WorkspaceFactory, deps: ExecutionDeps<R, C>) -> Self {
        Self { workspaces, deps, tickets: TicketFactory::new(), running: Mutex::new(HashMap::new()) }
    }

    pub fn workspaces(&self) -> &WorkspaceFactory {
        &self.workspaces
    }

    pub fn clock(&self) -> &C {
        &self.deps.clock
    }

    /// Server-side ticket for callers that do not supply their own.
    pub fn allocate_ticket(&self, task_id: &str) -> ScriptTicket {
        self.tickets.next(&self.deps.clock, task_id)
    }

    /// Tickets launched by this process and not yet completed by the caller.
    pub fn active_tickets(&self) -> Vec<ScriptTicket> {
        self.running.lock().keys().cloned().collect()
    }

    pub async fn start_script(&self, request: StartScriptRequest) -> Result<ScriptStatusResponse, ServiceError> {
        let ticket = request.ticket.clone();
        let entry = Arc::clone(self.running.lock().entry(ticket.clone()).or_default());
        let start_guard = entry.start_lock.lock().await;

        let launched = entry.launched.lock().clone();
        let launched = match launched {
            Some(launched) => {
                tracing::debug!(ticket = %ticket, "start requested for running script");
                launched
            }
            None => match self.launch(&request) {
                Ok(Some(launched)) => {
                    *entry.launched.lock() = Some(launched.clone());
                    launched
                }
                Ok(None) => {
                    drop(start_guard);
                    self.forget_unlaunched(&ticket, &entry);
                    return self.get_status(&ticket, 0);
                }
                Err(e) => {
                    drop(start_guard);
                    self.forget_unlaunched(&ticket, &entry);
                    tracing::error!(ticket = %ticket, error = %e, "failed to start script");
                    return Err(e);
                }
            },
        };
        drop(start_guard);

        if let Some(wait) = request.wait_for_completion {
            let mut state = launched.state.clone();
            let _ = tokio::time::timeout(wait, state.wait_for(ScriptState::has_completed)).await;
        }
        self.status_of(&ticket, &launched, 0)
    }

    /// Prepare (or reuse) the workspace and spawn the execution. `None` when
    /// persisted state shows the script already started in an earlier life.
    fn launch(&self, request: &StartScriptRequest) -> Result<Option<Launched>, ServiceError> {
        let ticket = &request.ticket;
        let existing = self.workspaces.get(ticket);
        let (workspace, initial) = if existing.state_store().exists() {
            let state = existing.state_store().load()?;
            if state.has_started() {
                return Ok(None);
            }
            tracing::info!(ticket = %ticket, "reusing prepared workspace");
            (existing, state)
        } else {
            let workspace = self.workspaces.prepare(ticket, &request.spec)?;
            let state = ScriptState::new(self.deps.clock.utc_now());
            workspace.state_store().create(&state)?;
            (workspace, state)
        };

        let metadata = workspace.metadata()?;
        let execution = ScriptExecution {
            workspace: workspace.clone(),
            isolation: metadata.isolation,
            arguments: metadata.arguments,
            task_id: request.task_id.clone(),
        };
        let cancel = CancellationToken::new();
        let (script, state) = RunningScript::new(execution, self.deps.clone(), initial, cancel.clone());
        tracing::info!(ticket = %ticket, task_id = %request.task_id, "launching script");
        tokio::spawn(script.execute());
        Ok(Some(Launched { workspace, cancel, state }))
    }

    fn forget_unlaunched(&self, ticket: &ScriptTicket, entry: &Arc<ScriptEntry>) {
        let mut running = self.running.lock();
        if let Some(current) = running.get(ticket) {
            if Arc::ptr_eq(current, entry) && entry.launched.lock().is_none() {
                running.remove(ticket);
            }
        }
    }

    fn launched(&self, ticket: &ScriptTicket) -> Option<Launched> {
        let entry = self.running.lock().get(ticket).cloned()?;
        let launched = entry.launched.lock().clone();
        launched
    }

    /// Status and logs after `last_log_sequence`.
    pub fn get_status(&self, ticket: &ScriptTicket, last_log_sequence: i64) -> Result<ScriptStatusResponse, ServiceError> {
        let entry = self.running.lock().get(ticket).cloned();
        let Some(entry) = entry else {
            return self.persisted_status(ticket, last_log_sequence, true);
        };
        let launched = entry.launched.lock().clone();
        match launched {
            Some(launched) => self.status_of(ticket, &launched, last_log_sequence),
            // A start is in progress; its state is not orphaned
            None => self.persisted_status(ticket, last_log_sequence, false),
        }
    }

    /// Request cooperative cancellation and report status.
    pub fn cancel_script(&self, ticket: &ScriptTicket, last_log_sequence: i64) -> Result<ScriptStatusResponse, ServiceError> {
        if let Some(launched) = self.launched(ticket) {
            tracing::info!(ticket = %ticket, "cancel requested");
            launched.cancel.cancel();
        }
        self.get_status(ticket, last_log_sequence)
    }

    /// Final status, then forget the ticket and delete its workspace.
    pub fn complete_script(&self, ticket: &ScriptTicket, last_log_sequence: i64) -> Result<ScriptStatusResponse, ServiceError> {
        let status = self.get_status(ticket, last_log_sequence)?;
        if let Some(entry) = self.running.lock().remove(ticket) {
            if let Some(launched) = entry.launched.lock().as_ref() {
                // Releasing a script the caller has given up on
                launched.cancel.cancel();
            }
        }
        self.workspaces.get(ticket).delete()?;
        tracing::info!(ticket = %ticket, state = %status.state, exit_code = status.exit_code, "script completed by caller");
        Ok(status)
    }

    fn status_of(
        &self,
        ticket: &ScriptTicket,
        launched: &Launched,
        last_log_sequence: i64,
    ) -> Result<ScriptStatusResponse, ServiceError> {
        // Read state before logs: a Complete state then guarantees every line is visible
        let state = launched.state.borrow().clone();
        let (logs, next_log_sequence) =
            launched.workspace.log().get_output(last_log_sequence, self.deps.clock.utc_now())?;
        Ok(ScriptStatusResponse {
            ticket: ticket.clone(),
            state: state.state,
            exit_code: state.exit_code.unwrap_or(0),
            logs,
            next_log_sequence,
        })
    }

    /// Status from disk. With `recover`, a state left incomplete by an
    /// earlier agent process is completed as [`exit_codes::UNKNOWN_RESULT`].
    fn persisted_status(
        &self,
        ticket: &ScriptTicket,
        last_log_sequence: i64,
        recover: bool,
    ) -> Result<ScriptStatusResponse, ServiceError> {
        let workspace = self.workspaces.get(ticket);
        let store = workspace.state_store();
        if !store.exists() {
            return Ok(ScriptStatusResponse {
                ticket: ticket.clone(),
                state: ProcessState::Complete,
                exit_code: exit_codes::UNKNOWN_SCRIPT,
                logs: Vec::new(),
                next_log_sequence: last_log_sequence,
            });
        }

        let mut state = store.load()?;
        if recover && !state.has_completed() {
            tracing::warn!(ticket = %ticket, state = %state.state, "no running process for persisted script");
            if state.complete(exit_codes::UNKNOWN_RESULT, false, self.deps.clock.utc_now()).is_ok() {
                store.save(&state)?;
            }
        }
        let (logs, next_log_sequence) = workspace.log().get_output(last_log_sequence, self.deps.clock.utc_now())?;
        Ok(ScriptStatusResponse {
            ticket: ticket.clone(),
            state: state.state,
            exit_code: state.exit_code.unwrap_or(0),
            logs,
            next_log_sequence,
        })
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
