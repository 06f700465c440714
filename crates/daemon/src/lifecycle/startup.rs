// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent startup and initialization logic.

use std::io::Write;
use std::sync::Arc;
use std::time::Instant;

use fs2::FileExt;
use tend_core::SystemClock;
use tend_engine::{ExecutionDeps, IsolationMutexRegistry, ScriptService};
use tend_shell::{Bash, Shell, TokioProcessRunner};
use tend_storage::WorkspaceFactory;
use tokio::net::UnixListener;
use tracing::info;

use super::{AgentState, Config, LifecycleError, StartupResult};

/// Start the agent
pub async fn startup(config: &Config) -> Result<StartupResult, LifecycleError> {
    match startup_inner(config).await {
        Ok(result) => Ok(result),
        Err(e) => {
            // Files behind a held lock belong to the running agent
            if !matches!(e, LifecycleError::LockFailed(_)) {
                cleanup_on_failure(config);
            }
            Err(e)
        }
    }
}

async fn startup_inner(config: &Config) -> Result<StartupResult, LifecycleError> {
    // 1. Create state directory (needed for socket, lock, etc.)
    std::fs::create_dir_all(&config.state_dir)?;

    // 2. Acquire lock file FIRST - prevents races
    // Open without truncating so a running agent's PID survives a failed attempt
    let lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&config.lock_path)?;
    lock_file.try_lock_exclusive().map_err(LifecycleError::LockFailed)?;

    let mut lock_file = lock_file;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;
    let lock_file = lock_file;

    // 3. Create directories
    if let Some(parent) = config.socket_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::create_dir_all(&config.workspaces_path)?;
    std::fs::create_dir_all(&config.log_dir)?;

    // 4. Workspaces left by a previous run are served from their persisted state
    let workspaces = WorkspaceFactory::new(&config.workspaces_path);
    let existing = workspaces.enumerate()?.len();
    if existing > 0 {
        info!(workspaces = existing, "found workspaces from a previous run");
    }

    let shell: Arc<dyn Shell> = match &config.shell {
        Some(path) => Arc::new(Bash::new(path)),
        None => Arc::new(Bash::default()),
    };
    let deps = ExecutionDeps {
        shell,
        runner: Arc::new(TokioProcessRunner),
        mutexes: Arc::new(IsolationMutexRegistry::new()),
        clock: SystemClock,
    };
    let service = Arc::new(ScriptService::new(workspaces, deps));

    // 5. Remove stale socket and bind (LAST - only after all validation passes)
    if config.socket_path.exists() {
        std::fs::remove_file(&config.socket_path)?;
    }
    let listener = UnixListener::bind(&config.socket_path)
        .map_err(|e| LifecycleError::BindFailed(config.socket_path.clone(), e))?;

    info!(socket = %config.socket_path.display(), "Agent started");

    Ok(StartupResult {
        agent: AgentState { config: config.clone(), lock_file, service, start_time: Instant::now() },
        listener,
    })
}

/// Clean up resources on startup failure
fn cleanup_on_failure(config: &Config) {
    if config.socket_path.exists() {
        let _ = std::fs::remove_file(&config.socket_path);
    }
    if config.lock_path.exists() {
        let _ = std::fs::remove_file(&config.lock_path);
    }
}

#[cfg(test)]
#[path = "startup_tests.rs"]
mod tests;
