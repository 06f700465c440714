// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Script bodies, attached files, and execution outcomes.

use serde::{Deserialize, Serialize};

use crate::exit_codes;

/// Language of an additional script body shipped alongside the bootstrap script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ScriptType {
    Bash,
    PowerShell,
    Python,
    CSharp,
    FSharp,
}

impl ScriptType {
    pub fn file_extension(self) -> &'static str {
        match self {
            Self::Bash => "sh",
            Self::PowerShell => "ps1",
            Self::Python => "py",
            Self::CSharp => "csx",
            Self::FSharp => "fsx",
        }
    }
}

crate::simple_display! {
    ScriptType {
        Bash => "bash",
        PowerShell => "powershell",
        Python => "python",
        CSharp => "csharp",
        FSharp => "fsharp",
    }
}

/// A file copied into the script's workspace before it runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptFile {
    pub name: String,
    pub contents: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption_password: Option<String>,
}

impl ScriptFile {
    pub fn new(name: impl Into<String>, contents: impl Into<String>) -> Self {
        Self { name: name.into(), contents: contents.into(), encryption_password: None }
    }
}

/// How a script execution ended.
///
/// Mutex timeouts and cancellation are expected outcomes, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptOutcome {
    /// The process ran and exited with this code
    Exited(i32),
    Canceled,
    MutexTimedOut,
    InvocationFailed,
    Fatal,
}

impl ScriptOutcome {
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Exited(code) => code,
            Self::Canceled => exit_codes::CANCELED,
            Self::MutexTimedOut => exit_codes::TIMEOUT,
            Self::InvocationFailed => exit_codes::INVOCATION_ERROR,
            Self::Fatal => exit_codes::FATAL,
        }
    }

    /// True only when the script's process ran and exited on its own.
    pub fn ran_to_completion(self) -> bool {
        matches!(self, Self::Exited(_))
    }
}

crate::simple_display! {
    ScriptOutcome {
        Exited(..) => "exited",
        Canceled => "canceled",
        MutexTimedOut => "mutex timed out",
        InvocationFailed => "invocation failed",
        Fatal => "fatal",
    }
}

#[cfg(test)]
#[path = "script_tests.rs"]
mod tests;
