// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Crash-safe persistence of one execution's [`ScriptState`].
//!
//! `save` writes `scriptstate.json.tmp`, copies the current file to
//! `scriptstate.json.bak`, then renames the temp file over the canonical one.
//! A crash at any point leaves either the old or the new document readable.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use parking_lot::Mutex;
use tend_core::ScriptState;
use thiserror::Error;
use tracing::warn;

pub const STATE_FILE: &str = "scriptstate.json";

/// Upper bound on waiting for another save/load on the same store
const LOCK_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum StateStoreError {
    #[error("script state already exists at {0}")]
    AlreadyExists(PathBuf),
    #[error("no script state at {0}")]
    NotFound(PathBuf),
    #[error("timed out waiting for lock on {0}")]
    LockTimeout(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug)]
pub struct ScriptStateStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl ScriptStateStore {
    /// Store for the state file inside `dir`.
    pub fn new(dir: &Path) -> Self {
        Self { path: dir.join(STATE_FILE), lock: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        self.path.with_extension("json.tmp")
    }

    fn bak_path(&self) -> PathBuf {
        self.path.with_extension("json.bak")
    }

    /// True if a state document (or its backup) is present.
    pub fn exists(&self) -> bool {
        self.path.exists() || self.bak_path().exists()
    }

    /// Write the initial state; fails if one already exists.
    pub fn create(&self, state: &ScriptState) -> Result<(), StateStoreError> {
        let _guard = self.acquire()?;
        if self.exists() {
            return Err(StateStoreError::AlreadyExists(self.path.clone()));
        }
        self.write_atomic(state)
    }

    pub fn load(&self) -> Result<ScriptState, StateStoreError> {
        let _guard = self.acquire()?;
        self.read()
    }

    pub fn save(&self, state: &ScriptState) -> Result<(), StateStoreError> {
        let _guard = self.acquire()?;
        self.write_atomic(state)
    }

    fn acquire(&self) -> Result<parking_lot::MutexGuard<'_, ()>, StateStoreError> {
        self.lock.try_lock_for(LOCK_TIMEOUT).ok_or_else(|| StateStoreError::LockTimeout(self.path.clone()))
    }

    fn read(&self) -> Result<ScriptState, StateStoreError> {
        match read_state(&self.path) {
            Ok(Some(state)) => return Ok(state),
            Ok(None) => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "unreadable script state, trying backup"),
        }
        match read_state(&self.bak_path())? {
            Some(state) => Ok(state),
            None => Err(StateStoreError::NotFound(self.path.clone())),
        }
    }

    fn write_atomic(&self, state: &ScriptState) -> Result<(), StateStoreError> {
        let tmp = self.tmp_path();
        {
            let mut file = fs::File::create(&tmp)?;
            serde_json::to_writer(&mut file, state)?;
            file.flush()?;
            file.sync_all()?;
        }
        if self.path.exists() {
            fs::copy(&self.path, self.bak_path())?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

fn read_state(path: &Path) -> Result<Option<ScriptState>, StateStoreError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(serde_json::from_slice(&bytes)?))
}

#[cfg(test)]
#[path = "state_store_tests.rs"]
mod tests;
