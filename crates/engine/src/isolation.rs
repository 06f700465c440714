// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Named isolation mutexes.
//!
//! Each mutex name maps to a reader-writer lock: scripts with
//! [`ScriptIsolationLevel::NoIsolation`] share it as readers, a
//! [`ScriptIsolationLevel::FullIsolation`] script holds it alone. Different
//! names never contend.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tend_core::{IsolationConfiguration, ProcessOutputSource, ScriptIsolationLevel};
use thiserror::Error;
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};
use tokio_util::sync::CancellationToken;

/// First attempt is short so the script log can say who it is waiting on.
pub const INITIAL_WAIT: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum IsolationError {
    #[error("could not acquire isolation mutex within {0:?}")]
    TimedOut(Duration),
    #[error("cancelled while waiting for isolation mutex")]
    Cancelled,
}

/// Receives mutex progress lines destined for the script log.
pub type TaskLog<'a> = dyn FnMut(ProcessOutputSource, &str) + Send + 'a;

/// Registry of named locks. One per agent, shared by all executions.
#[derive(Debug, Default)]
pub struct IsolationMutexRegistry {
    locks: Mutex<HashMap<String, Arc<NamedLock>>>,
}

#[derive(Debug, Default)]
struct NamedLock {
    lock: Arc<RwLock<()>>,
    holders: Mutex<Holders>,
}

#[derive(Debug, Default)]
struct Holders {
    writer: Option<String>,
    readers: BTreeMap<String, usize>,
}

#[derive(Debug)]
enum HeldLock {
    Read(#[allow(dead_code)] OwnedRwLockReadGuard<()>),
    Write(#[allow(dead_code)] OwnedRwLockWriteGuard<()>),
}

/// Held isolation mutex; released on drop.
#[derive(Debug)]
pub struct IsolationGuard {
    named: Arc<NamedLock>,
    task_id: String,
    held: Option<HeldLock>,
}

impl IsolationMutexRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the mutex named in `config` for `task_id`.
    ///
    /// Progress messages are passed to `task_log` so they reach the script's
    /// own output. The intent line is Debug; waiting, timeout and cancellation
    /// notices are StdOut so the caller sees why the script has not started.
    pub async fn acquire(
        &self,
        config: &IsolationConfiguration,
        task_id: &str,
        task_log: &mut TaskLog<'_>,
        cancel: &CancellationToken,
    ) -> Result<IsolationGuard, IsolationError> {
        task_log(
            ProcessOutputSource::Debug,
            &format!("Acquiring isolation mutex {} with {} in {task_id}", config.mutex_name, config.level),
        );
        let named = Arc::clone(self.locks.lock().entry(config.mutex_name.clone()).or_default());
        let exclusive = config.level == ScriptIsolationLevel::FullIsolation;
        let lock_type = if exclusive { "write lock" } else { "read lock" };
        tracing::trace!(task_id, mutex = %config.mutex_name, lock_type, holders = %named.report(), "trying to acquire lock");

        let initial = INITIAL_WAIT.min(config.mutex_timeout);
        if let Some(held) = named.try_acquire(exclusive, initial, cancel).await {
            return Ok(named.taken(held, task_id));
        }
        if cancel.is_cancelled() {
            return Err(named.cancelled(task_id, task_log));
        }

        task_log(ProcessOutputSource::StdOut, &named.busy_message(task_id, exclusive));
        tracing::trace!(task_id, mutex = %config.mutex_name, timeout = ?config.mutex_timeout, "waiting for lock");

        if let Some(held) = named.try_acquire(exclusive, config.mutex_timeout, cancel).await {
            return Ok(named.taken(held, task_id));
        }
        if cancel.is_cancelled() {
            return Err(named.cancelled(task_id, task_log));
        }
        task_log(ProcessOutputSource::StdOut, &named.timed_out_message(task_id, config.mutex_timeout));
        tracing::info!(task_id, mutex = %config.mutex_name, lock_type, "timed out waiting for isolation mutex");
        Err(IsolationError::TimedOut(config.mutex_timeout))
    }
}

impl NamedLock {
    async fn try_acquire(&self, exclusive: bool, wait: Duration, cancel: &CancellationToken) -> Option<HeldLock> {
        let lock = Arc::clone(&self.lock);
        let acquire = async move {
            if exclusive {
                HeldLock::Write(lock.write_owned().await)
            } else {
                HeldLock::Read(lock.read_owned().await)
            }
        };
        tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            held = tokio::time::timeout(wait, acquire) => held.ok(),
        }
    }

    fn taken(self: &Arc<Self>, held: HeldLock, task_id: &str) -> IsolationGuard {
        {
            let mut holders = self.holders.lock();
            match held {
                HeldLock::Write(_) => holders.writer = Some(task_id.to_string()),
                HeldLock::Read(_) => *holders.readers.entry(task_id.to_string()).or_default() += 1,
            }
        }
        tracing::trace!(task_id, "lock taken");
        IsolationGuard { named: Arc::clone(self), task_id: task_id.to_string(), held: Some(held) }
    }

    fn cancelled(&self, task_id: &str, task_log: &mut TaskLog<'_>) -> IsolationError {
        let (tasks, multiple, _) = self.list_holders(task_id);
        let message = if multiple {
            format!("This task was canceled before it could start. Tasks {tasks} are still running.")
        } else {
            format!("This task was canceled before it could start. Task {tasks} is still running.")
        };
        task_log(ProcessOutputSource::StdOut, &message);
        IsolationError::Cancelled
    }

    fn busy_message(&self, task_id: &str, exclusive: bool) -> String {
        let (tasks, multiple, this_task_holds) = self.list_holders(task_id);
        if multiple {
            format!(
                "Waiting on scripts in tasks {tasks} to finish. This script requires that no other scripts are executing on this target at the same time."
            )
        } else if this_task_holds {
            format!(
                "Waiting on another script in this task to finish as {} task requires that no other scripts are executing on this target at the same time.",
                if exclusive { "this" } else { "another" }
            )
        } else {
            format!(
                "Waiting for the script in task {tasks} to finish as {} script requires that no other scripts are executing on this target at the same time.",
                if exclusive { "this" } else { "that" }
            )
        }
    }

    fn timed_out_message(&self, task_id: &str, timeout: Duration) -> String {
        let (tasks, multiple, _) = self.list_holders(task_id);
        let minutes = timeout.as_secs() / 60;
        if multiple {
            format!("This task waited more than {minutes} minutes and timed out. Tasks {tasks} are still running.")
        } else {
            format!("This task waited more than {minutes} minutes and timed out. Task {tasks} is still running.")
        }
    }

    /// Holders as readable text, whether there is more than one, and whether
    /// `task_id` is among them.
    fn list_holders(&self, task_id: &str) -> (String, bool, bool) {
        let holders = self.holders.lock();
        if let Some(writer) = &holders.writer {
            return (writer.clone(), false, writer == task_id);
        }
        if holders.readers.is_empty() {
            return ("(none)".to_string(), false, false);
        }
        let names: Vec<&str> =
            holders.readers.keys().map(|id| if id == task_id { "This Task" } else { id.as_str() }).collect();
        (readable_join(&names), holders.readers.len() > 1, holders.readers.contains_key(task_id))
    }

    fn report(&self) -> String {
        let holders = self.holders.lock();
        match (&holders.writer, holders.readers.len()) {
            (Some(writer), _) => format!("{writer:?} (has a write lock)"),
            (None, 0) => "no locks".to_string(),
            (None, 1) => format!("{:?} (has a read lock)", holders.readers.keys().cloned().collect::<Vec<_>>().join(", ")),
            (None, _) => format!("{:?} (have read locks)", holders.readers.keys().cloned().collect::<Vec<_>>().join(", ")),
        }
    }
}

fn readable_join(items: &[&str]) -> String {
    match items {
        [] => String::new(),
        [one] => one.to_string(),
        [init @ .., last] => format!("{} and {last}", init.join(", ")),
    }
}

impl IsolationGuard {
    pub fn is_exclusive(&self) -> bool {
        matches!(self.held, Some(HeldLock::Write(_)))
    }
}

impl Drop for IsolationGuard {
    fn drop(&mut self) {
        {
            let mut holders = self.named.holders.lock();
            match self.held {
                Some(HeldLock::Write(_)) => holders.writer = None,
                Some(HeldLock::Read(_)) => {
                    if let Some(count) = holders.readers.get_mut(&self.task_id) {
                        *count -= 1;
                        if *count == 0 {
                            holders.readers.remove(&self.task_id);
                        }
                    }
                }
                None => {}
            }
        }
        // Release only after the holder list no longer names us
        self.held.take();
        tracing::trace!(task_id = %self.task_id, "lock released");
    }
}

#[cfg(test)]
#[path = "isolation_tests.rs"]
mod tests;
