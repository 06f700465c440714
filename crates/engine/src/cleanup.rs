// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Removes workspaces that callers never completed.

use std::collections::HashSet;
use std::time::Duration;

use tend_core::{Clock, ScriptTicket};
use tend_storage::{WorkspaceError, WorkspaceFactory};

pub const DEFAULT_RETENTION: Duration = Duration::from_secs(24 * 60 * 60);

pub struct WorkspaceCleaner<C: Clock> {
    workspaces: WorkspaceFactory,
    clock: C,
    retention: Duration,
}

impl<C: Clock> WorkspaceCleaner<C> {
    pub fn new(workspaces: WorkspaceFactory, clock: C, retention: Duration) -> Self {
        Self { workspaces, clock, retention }
    }

    /// Delete every workspace whose state completed more than the retention
    /// window ago. Workspaces in `active`, without state, or not yet complete
    /// are left alone. Returns the tickets removed.
    pub fn clean(&self, active: &HashSet<ScriptTicket>) -> Result<Vec<ScriptTicket>, WorkspaceError> {
        let retention = chrono::Duration::from_std(self.retention).unwrap_or(chrono::Duration::MAX);
        let cutoff = self.clock.utc_now().checked_sub_signed(retention);
        let mut removed = Vec::new();

        for workspace in self.workspaces.enumerate()? {
            if active.contains(workspace.ticket()) {
                continue;
            }
            let state = match workspace.state_store().load() {
                Ok(state) => state,
                Err(e) => {
                    tracing::debug!(ticket = %workspace.ticket(), error = %e, "skipping workspace without readable state");
                    continue;
                }
            };
            let expired = match (state.completed, cutoff) {
                (Some(completed), Some(cutoff)) => completed < cutoff,
                _ => false,
            };
            if expired {
                workspace.delete()?;
                tracing::info!(ticket = %workspace.ticket(), "removed expired workspace");
                removed.push(workspace.ticket().clone());
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
#[path = "cleanup_tests.rs"]
mod tests;
