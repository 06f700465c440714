// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the agent.

use std::path::PathBuf;
use std::time::Duration;

use crate::lifecycle::LifecycleError;

/// Resolve state directory: TEND_STATE_DIR > XDG_STATE_HOME/tend > ~/.local/state/tend
pub fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("TEND_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("tend"));
    }
    let home = std::env::var("HOME").map_err(|_| LifecycleError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/tend"))
}

/// Socket path override; `<state_dir>/agent.sock` when unset
pub fn socket_path() -> Option<PathBuf> {
    std::env::var("TEND_SOCKET").ok().filter(|s| !s.is_empty()).map(PathBuf::from)
}

/// Socket read/write timeout
pub fn ipc_timeout() -> Duration {
    duration_ms("TEND_IPC_TIMEOUT_MS").unwrap_or(Duration::from_secs(5))
}

/// How long completed workspaces the caller never released are kept
pub fn workspace_retention() -> Duration {
    duration_ms("TEND_WORKSPACE_RETENTION_MS").unwrap_or(tend_engine::DEFAULT_RETENTION)
}

/// How often expired workspaces are swept
pub fn cleanup_interval() -> Duration {
    duration_ms("TEND_CLEANUP_INTERVAL_MS").unwrap_or(Duration::from_secs(60 * 60))
}

/// Shell used to run bootstrap scripts
pub fn shell_path() -> Option<PathBuf> {
    std::env::var("TEND_SHELL").ok().filter(|s| !s.is_empty()).map(PathBuf::from)
}

/// Log filter, `RUST_LOG` syntax: TEND_LOG > RUST_LOG > info
pub fn log_filter() -> String {
    ["TEND_LOG", "RUST_LOG"]
        .into_iter()
        .find_map(|var| std::env::var(var).ok().filter(|s| !s.is_empty()))
        .unwrap_or_else(|| "info".to_string())
}

fn duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var).ok().and_then(|s| s.parse::<u64>().ok()).map(Duration::from_millis)
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
