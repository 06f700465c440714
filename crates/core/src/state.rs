// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persisted lifecycle record for one script execution.
//!
//! `Pending → Running → Complete`, never backward. `started` is set iff the
//! state is Running or Complete; `completed` and `exit_code` iff Complete.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::script::ScriptOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProcessState {
    Pending,
    Running,
    Complete,
}

crate::simple_display! {
    ProcessState {
        Pending => "pending",
        Running => "running",
        Complete => "complete",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("cannot start a script that is already {0}")]
    NotPending(ProcessState),
    #[error("script is already complete")]
    AlreadyComplete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptState {
    pub created: DateTime<Utc>,
    pub started: Option<DateTime<Utc>>,
    pub completed: Option<DateTime<Utc>>,
    pub state: ProcessState,
    pub exit_code: Option<i32>,
    pub ran_to_completion: Option<bool>,
}

impl ScriptState {
    pub fn new(created: DateTime<Utc>) -> Self {
        Self {
            created,
            started: None,
            completed: None,
            state: ProcessState::Pending,
            exit_code: None,
            ran_to_completion: None,
        }
    }

    pub fn has_started(&self) -> bool {
        self.state != ProcessState::Pending
    }

    pub fn has_completed(&self) -> bool {
        self.state == ProcessState::Complete
    }

    /// Pending → Running
    pub fn start(&mut self, at: DateTime<Utc>) -> Result<(), TransitionError> {
        if self.state != ProcessState::Pending {
            return Err(TransitionError::NotPending(self.state));
        }
        self.state = ProcessState::Running;
        self.started = Some(at);
        Ok(())
    }

    /// Pending or Running → Complete.
    ///
    /// Completing straight from Pending (mutex timeout, lost process) stamps
    /// `started` with the completion time.
    pub fn complete(
        &mut self,
        exit_code: i32,
        ran_to_completion: bool,
        at: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        if self.state == ProcessState::Complete {
            return Err(TransitionError::AlreadyComplete);
        }
        self.started.get_or_insert(at);
        self.completed = Some(at);
        self.exit_code = Some(exit_code);
        self.ran_to_completion = Some(ran_to_completion);
        self.state = ProcessState::Complete;
        Ok(())
    }

    pub fn complete_with(&mut self, outcome: ScriptOutcome, at: DateTime<Utc>) -> Result<(), TransitionError> {
        self.complete(outcome.exit_code(), outcome.ran_to_completion(), at)
    }

    /// Whether the optional fields agree with `state`.
    pub fn is_consistent(&self) -> bool {
        let started = self.started.is_some() == self.has_started();
        let complete = self.has_completed();
        started
            && self.completed.is_some() == complete
            && self.exit_code.is_some() == complete
            && self.ran_to_completion.is_some() == complete
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
