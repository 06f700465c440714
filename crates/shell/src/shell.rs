// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::{Path, PathBuf};

/// Interpreter used to run a workspace's bootstrap script
pub trait Shell: Send + Sync {
    /// Program to spawn.
    fn full_path(&self) -> &Path;

    /// Argument list that runs `bootstrap` with the script's own arguments.
    fn format_arguments(&self, bootstrap: &Path, arguments: &[String]) -> Vec<String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bash {
    path: PathBuf,
}

impl Bash {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Default for Bash {
    fn default() -> Self {
        Self::new("bash")
    }
}

impl Shell for Bash {
    fn full_path(&self) -> &Path {
        &self.path
    }

    fn format_arguments(&self, bootstrap: &Path, arguments: &[String]) -> Vec<String> {
        std::iter::once(bootstrap.display().to_string()).chain(arguments.iter().cloned()).collect()
    }
}

#[cfg(test)]
#[path = "shell_tests.rs"]
mod tests;
