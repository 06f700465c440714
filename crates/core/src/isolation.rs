// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Mutex name used when a command does not name one
pub const DEFAULT_MUTEX_NAME: &str = "RunningScript";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ScriptIsolationLevel {
    /// Shares the named mutex with other non-isolated scripts
    #[default]
    NoIsolation,
    /// Holds the named mutex exclusively
    FullIsolation,
}

crate::simple_display! {
    ScriptIsolationLevel {
        NoIsolation => "no isolation",
        FullIsolation => "full isolation",
    }
}

/// How a script execution synchronises with others sharing a target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IsolationConfiguration {
    pub level: ScriptIsolationLevel,
    pub mutex_name: String,
    #[serde(with = "duration_ms")]
    pub mutex_timeout: Duration,
}

impl IsolationConfiguration {
    pub fn new(level: ScriptIsolationLevel, mutex_name: Option<&str>, mutex_timeout: Duration) -> Self {
        Self {
            level,
            mutex_name: mutex_name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or(DEFAULT_MUTEX_NAME)
                .to_string(),
            mutex_timeout,
        }
    }
}

impl Default for IsolationConfiguration {
    fn default() -> Self {
        Self::new(ScriptIsolationLevel::NoIsolation, None, Duration::MAX)
    }
}

/// Serialize a `Duration` as integer milliseconds, saturating at `u64::MAX`.
pub mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

/// `Option<Duration>` as optional integer milliseconds.
pub mod opt_duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match d {
            Some(d) => s.serialize_some(&u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_millis))
    }
}

#[cfg(test)]
#[path = "isolation_tests.rs"]
mod tests;
