// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tend_core::Clock;
use tend_engine::{ScriptService, WorkspaceCleaner};
use tend_shell::ProcessRunner;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Periodically delete expired workspaces the service is not tracking.
///
/// The first sweep runs immediately, which clears leftovers from a previous run.
pub fn spawn_workspace_sweeper<R, C>(
    service: Arc<ScriptService<R, C>>,
    cleaner: WorkspaceCleaner<C>,
    interval: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()>
where
    R: ProcessRunner,
    C: Clock,
{
    tokio::spawn(async move {
        let mut ticks = tokio::time::interval(interval);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticks.tick() => {}
                _ = shutdown.cancelled() => break,
            }
            let active: HashSet<_> = service.active_tickets().into_iter().collect();
            match cleaner.clean(&active) {
                Ok(removed) if removed.is_empty() => debug!("no expired workspaces"),
                Ok(removed) => info!(removed = removed.len(), "swept expired workspaces"),
                Err(e) => warn!(error = %e, "workspace sweep failed"),
            }
        }
    })
}

#[cfg(test)]
#[path = "sweeper_tests.rs"]
mod tests;
