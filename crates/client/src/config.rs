// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client tuning knobs.

use std::time::Duration;

/// Exponential backoff with a cap
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    pub initial: Duration,
    pub max: Duration,
    pub factor: f64,
}

impl Backoff {
    pub const fn new(initial: Duration, max: Duration, factor: f64) -> Self {
        Self { initial, max, factor }
    }

    /// Delay before the `attempt`th retry (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(64) as i32;
        let scaled = self.initial.as_secs_f64() * self.factor.max(1.0).powi(exponent);
        if !scaled.is_finite() || scaled >= self.max.as_secs_f64() {
            return self.max;
        }
        Duration::from_secs_f64(scaled)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClientOptions {
    /// Total wall-clock budget for one call including retries
    pub retry_timeout: Duration,
    /// How long a cancelled call may keep running before the caller moves on
    pub abandon_grace: Duration,
    /// How long a capabilities response is reused per endpoint
    pub capabilities_ttl: Duration,
    /// Delay between status polls
    pub poll: Backoff,
    /// Delay between retry attempts
    pub backoff: Backoff,
    pub rpc_retries_enabled: bool,
    pub disable_v3_alpha: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            retry_timeout: Duration::from_secs(150),
            abandon_grace: Duration::from_secs(5),
            capabilities_ttl: Duration::from_secs(600),
            poll: Backoff::new(Duration::from_millis(50), Duration::from_secs(1), 2.0),
            backoff: Backoff::new(Duration::from_millis(500), Duration::from_secs(10), 2.0),
            rpc_retries_enabled: true,
            disable_v3_alpha: false,
        }
    }
}

impl ClientOptions {
    tend_core::setters! {
        set {
            retry_timeout: Duration,
            abandon_grace: Duration,
            capabilities_ttl: Duration,
            poll: Backoff,
            backoff: Backoff,
            rpc_retries_enabled: bool,
            disable_v3_alpha: bool,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
