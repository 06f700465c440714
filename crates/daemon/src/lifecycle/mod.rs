// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent lifecycle management: startup, serving, shutdown.

mod logging;
mod startup;
mod sweeper;

pub use logging::init_logging;
pub use startup::startup;
pub use sweeper::spawn_workspace_sweeper;

use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tend_core::SystemClock;
use tend_engine::{AgentDispatcher, ScriptService, WorkspaceCleaner, DEFAULT_RETENTION};
use tend_shell::TokioProcessRunner;
use tend_wire::Codec;
use thiserror::Error;
use tokio::net::UnixListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::env;
use crate::listener::{ListenCtx, Listener};

/// Script service with the real process runner
pub type AgentService = ScriptService<TokioProcessRunner, SystemClock>;

/// Agent configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (e.g. ~/.local/state/tend)
    pub state_dir: PathBuf,
    /// Path to Unix socket
    pub socket_path: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Directory for agent log files
    pub log_dir: PathBuf,
    /// One subdirectory per script ticket
    pub workspaces_path: PathBuf,
    /// Socket read/write timeout
    pub ipc_timeout: Duration,
    pub workspace_retention: Duration,
    pub cleanup_interval: Duration,
    /// Shell override; `bash` on the PATH when unset
    pub shell: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the environment.
    pub fn load() -> Result<Self, LifecycleError> {
        let mut config = Self::for_state_dir(env::state_dir()?);
        if let Some(socket_path) = env::socket_path() {
            config.socket_path = socket_path;
        }
        config.ipc_timeout = env::ipc_timeout();
        config.workspace_retention = env::workspace_retention();
        config.cleanup_interval = env::cleanup_interval();
        config.shell = env::shell_path();
        Ok(config)
    }

    /// Default layout under `state_dir`.
    pub fn for_state_dir(state_dir: impl Into<PathBuf>) -> Self {
        let state_dir = state_dir.into();
        Self {
            socket_path: state_dir.join("agent.sock"),
            lock_path: state_dir.join("agent.pid"),
            log_dir: state_dir.join("logs"),
            workspaces_path: state_dir.join("workspaces"),
            ipc_timeout: Duration::from_secs(5),
            workspace_retention: DEFAULT_RETENTION,
            cleanup_interval: Duration::from_secs(60 * 60),
            shell: None,
            state_dir,
        }
    }
}

/// Agent state during operation.
pub struct AgentState {
    pub config: Config,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    pub service: Arc<AgentService>,
    pub start_time: Instant,
}

/// Result of agent startup: the state plus the bound socket.
pub struct StartupResult {
    pub agent: AgentState,
    pub listener: UnixListener,
}

impl AgentState {
    pub fn listen_ctx(&self) -> Arc<ListenCtx> {
        Arc::new(ListenCtx {
            handler: Arc::new(AgentDispatcher::new(Arc::clone(&self.service))),
            codec: Codec::default(),
            timeout: self.config.ipc_timeout,
        })
    }

    pub fn cleaner(&self) -> WorkspaceCleaner<SystemClock> {
        WorkspaceCleaner::new(self.service.workspaces().clone(), SystemClock, self.config.workspace_retention)
    }

    /// Remove the socket and PID file.
    ///
    /// Running scripts are not cancelled. Their state stays on disk and a
    /// later GetStatus reports the outcome as unknown.
    pub fn shutdown(&self) {
        info!("Shutting down agent...");
        let running = self.service.active_tickets().len();
        if running > 0 {
            warn!(running, "scripts still running at shutdown");
        }

        if self.config.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.socket_path) {
                warn!("Failed to remove socket file: {}", e);
            }
        }
        if self.config.lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.lock_path) {
                warn!("Failed to remove PID file: {}", e);
            }
        }

        info!(uptime_secs = self.start_time.elapsed().as_secs(), "Agent shutdown complete");
    }
}

/// Serve requests and sweep workspaces until `shutdown` fires, then shut down.
pub async fn serve(startup: StartupResult, shutdown: CancellationToken) {
    let StartupResult { agent, listener } = startup;
    let listen = tokio::spawn(Listener::new(listener, agent.listen_ctx()).run(shutdown.clone()));
    let sweep = spawn_workspace_sweeper(
        Arc::clone(&agent.service),
        agent.cleaner(),
        agent.config.cleanup_interval,
        shutdown.clone(),
    );

    shutdown.cancelled().await;
    for (task, result) in [("listener", listen.await), ("sweeper", sweep.await)] {
        if let Err(e) = result {
            warn!(task, error = %e, "background task failed");
        }
    }
    agent.shutdown();
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("Failed to acquire lock: agent already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Failed to bind socket at {0}: {1}")]
    BindFailed(PathBuf, std::io::Error),

    #[error("Failed to initialise logging: {0}")]
    Logging(String),

    #[error("Workspace error: {0}")]
    Workspace(#[from] tend_storage::WorkspaceError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
