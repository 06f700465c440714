// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Script tickets: short, filesystem-safe identifiers for one script execution.
//!
//! A generated ticket has the shape `{epoch36}-{task}-{seq36}`:
//! - `epoch36`: wall-clock milliseconds in lowercase base36 (8 chars until 2059)
//! - `task`: up to 6 trailing alphanumerics of the caller's task id (omitted when empty)
//! - `seq36`: per-factory counter in base36, wrapping at 36^6
//!
//! Tickets compare and hash case-insensitively.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clock::Clock;

/// Longest ticket accepted from the wire.
pub const MAX_TICKET_LEN: usize = 128;

const TASK_PART_LEN: usize = 6;
const SEQ_MODULUS: u64 = 36u64.pow(6);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TicketError {
    #[error("ticket is empty")]
    Empty,
    #[error("ticket exceeds {MAX_TICKET_LEN} characters")]
    TooLong,
    #[error("ticket {0:?} contains characters that are not filesystem-safe")]
    Unsafe(String),
}

/// Identifier for one script execution
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ScriptTicket(String);

impl ScriptTicket {
    /// Parse a ticket, rejecting anything unusable as a single directory name.
    pub fn parse(value: impl Into<String>) -> Result<Self, TicketError> {
        let value = value.into();
        if value.is_empty() {
            return Err(TicketError::Empty);
        }
        if value.len() > MAX_TICKET_LEN {
            return Err(TicketError::TooLong);
        }
        if value == "." || value == ".." || !value.chars().all(is_safe_char) {
            return Err(TicketError::Unsafe(value));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_safe_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')
}

impl PartialEq for ScriptTicket {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for ScriptTicket {}

impl Hash for ScriptTicket {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for b in self.0.bytes() {
            state.write_u8(b.to_ascii_lowercase());
        }
        state.write_u8(0xff);
    }
}

impl PartialEq<str> for ScriptTicket {
    fn eq(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other)
    }
}

impl PartialEq<&str> for ScriptTicket {
    fn eq(&self, other: &&str) -> bool {
        self.0.eq_ignore_ascii_case(other)
    }
}

impl fmt::Display for ScriptTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ScriptTicket {
    type Error = TicketError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<ScriptTicket> for String {
    fn from(ticket: ScriptTicket) -> Self {
        ticket.0
    }
}

/// Allocates tickets that are unique for the lifetime of the factory.
#[derive(Debug, Default)]
pub struct TicketFactory {
    seq: AtomicU64,
}

impl TicketFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next ticket for `task_id`.
    pub fn next(&self, clock: &impl Clock, task_id: &str) -> ScriptTicket {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed) % SEQ_MODULUS;
        let task = task_part(task_id);
        let mut ticket = base36(clock.epoch_ms());
        if !task.is_empty() {
            ticket.push('-');
            ticket.push_str(&task);
        }
        ticket.push('-');
        ticket.push_str(&base36(seq));
        ScriptTicket(ticket)
    }
}

/// Trailing alphanumerics of the task id; the tail carries the distinguishing digits
/// for ids such as `ServerTasks-12345`.
fn task_part(task_id: &str) -> String {
    let cleaned: Vec<char> =
        task_id.chars().filter(char::is_ascii_alphanumeric).map(|c| c.to_ascii_lowercase()).collect();
    let skip = cleaned.len().saturating_sub(TASK_PART_LEN);
    cleaned[skip..].iter().collect()
}

fn base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
#[path = "ticket_tests.rs"]
mod tests;
