// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-ticket working directories.
//!
//! Layout of `<root>/<ticket>`:
//! - `Bootstrap.sh`: the main script body
//! - `Script.<ext>`: additional bodies, one per [`ScriptType`]
//! - attached files, at their relative names
//! - `isolation.json`: [`WorkspaceMetadata`]
//! - `scriptstate.json` and `output.log`

use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tend_core::{IsolationConfiguration, ScriptFile, ScriptTicket, ScriptType};
use thiserror::Error;

use crate::masker::SensitiveValueMasker;
use crate::script_log::ScriptLog;
use crate::state_store::{ScriptStateStore, StateStoreError};

pub const BOOTSTRAP_SCRIPT: &str = "Bootstrap.sh";
pub const METADATA_FILE: &str = "isolation.json";

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("state error: {0}")]
    State(#[from] StateStoreError),
    #[error("file name {0:?} escapes the workspace")]
    InvalidPath(String),
    #[error("workspace metadata not found at {0}")]
    MissingMetadata(PathBuf),
}

/// Everything needed to lay out a workspace before the script runs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkspaceSpec {
    pub script_body: String,
    pub arguments: Vec<String>,
    pub scripts: BTreeMap<ScriptType, String>,
    pub files: Vec<ScriptFile>,
    pub isolation: IsolationConfiguration,
}

/// Persisted alongside the scripts so a restarted agent can rebuild the
/// execution without the original command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceMetadata {
    pub isolation: IsolationConfiguration,
    #[serde(default)]
    pub arguments: Vec<String>,
}

/// Creates and locates workspaces under one root directory
#[derive(Debug, Clone)]
pub struct WorkspaceFactory {
    root: PathBuf,
}

impl WorkspaceFactory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Lay out the workspace for `ticket`. Script files are overwritten;
    /// an existing state file and log are left alone.
    pub fn prepare(&self, ticket: &ScriptTicket, spec: &WorkspaceSpec) -> Result<ScriptWorkspace, WorkspaceError> {
        let passwords = spec.files.iter().filter_map(|f| f.encryption_password.as_deref());
        let workspace = ScriptWorkspace::open(ticket.clone(), self.dir_for(ticket), SensitiveValueMasker::new(passwords));
        fs::create_dir_all(&workspace.dir)?;

        fs::write(workspace.bootstrap_script_path(), &spec.script_body)?;
        for (script_type, body) in &spec.scripts {
            fs::write(workspace.dir.join(format!("Script.{}", script_type.file_extension())), body)?;
        }
        for file in &spec.files {
            let path = workspace.resolve_path(&file.name)?;
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, &file.contents)?;
        }

        let metadata = WorkspaceMetadata { isolation: spec.isolation.clone(), arguments: spec.arguments.clone() };
        fs::write(workspace.dir.join(METADATA_FILE), serde_json::to_vec_pretty(&metadata)?)?;

        tracing::debug!(ticket = %ticket, dir = %workspace.dir.display(), "prepared workspace");
        Ok(workspace)
    }

    /// Handle to an existing (or absent) workspace. Does no I/O.
    pub fn get(&self, ticket: &ScriptTicket) -> ScriptWorkspace {
        ScriptWorkspace::open(ticket.clone(), self.dir_for(ticket), SensitiveValueMasker::default())
    }

    /// All workspace directories whose names are valid tickets.
    pub fn enumerate(&self) -> Result<Vec<ScriptWorkspace>, WorkspaceError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut workspaces = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if let Ok(ticket) = ScriptTicket::parse(name) {
                workspaces.push(self.get(&ticket));
            }
        }
        Ok(workspaces)
    }

    // Tickets compare case-insensitively, so their directories do too.
    fn dir_for(&self, ticket: &ScriptTicket) -> PathBuf {
        self.root.join(ticket.as_str().to_ascii_lowercase())
    }
}

/// One ticket's working directory
#[derive(Debug, Clone)]
pub struct ScriptWorkspace {
    ticket: ScriptTicket,
    dir: PathBuf,
    state_store: Arc<ScriptStateStore>,
    log: ScriptLog,
}

impl ScriptWorkspace {
    fn open(ticket: ScriptTicket, dir: PathBuf, masker: SensitiveValueMasker) -> Self {
        let state_store = Arc::new(ScriptStateStore::new(&dir));
        let log = ScriptLog::with_masker(&dir, masker);
        Self { ticket, dir, state_store, log }
    }

    pub fn ticket(&self) -> &ScriptTicket {
        &self.ticket
    }

    pub fn working_directory(&self) -> &Path {
        &self.dir
    }

    pub fn bootstrap_script_path(&self) -> PathBuf {
        self.dir.join(BOOTSTRAP_SCRIPT)
    }

    pub fn exists(&self) -> bool {
        self.dir.is_dir()
    }

    pub fn state_store(&self) -> &ScriptStateStore {
        &self.state_store
    }

    pub fn log(&self) -> &ScriptLog {
        &self.log
    }

    pub fn metadata(&self) -> Result<WorkspaceMetadata, WorkspaceError> {
        let path = self.dir.join(METADATA_FILE);
        match fs::read(&path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(WorkspaceError::MissingMetadata(path)),
            Err(e) => Err(e.into()),
        }
    }

    /// Path of a workspace-relative file. Absolute paths and `..` are rejected.
    pub fn resolve_path(&self, name: &str) -> Result<PathBuf, WorkspaceError> {
        let mut path = self.dir.clone();
        let mut depth = 0;
        for component in Path::new(name).components() {
            match component {
                Component::Normal(part) => {
                    path.push(part);
                    depth += 1;
                }
                Component::CurDir => {}
                _ => return Err(WorkspaceError::InvalidPath(name.to_string())),
            }
        }
        if depth == 0 {
            return Err(WorkspaceError::InvalidPath(name.to_string()));
        }
        Ok(path)
    }

    /// Remove the directory and everything in it. Missing is not an error.
    pub fn delete(&self) -> Result<(), WorkspaceError> {
        match fs::remove_dir_all(&self.dir) {
            Ok(()) => {
                tracing::debug!(ticket = %self.ticket, "deleted workspace");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[path = "workspace_tests.rs"]
mod tests;
