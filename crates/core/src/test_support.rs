// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use chrono::{DateTime, Utc};

use crate::{ProcessOutput, ProcessOutputSource};

// ── Proptest strategies ─────────────────────────────────────────────────

/// Proptest strategies for lifecycle types.
pub mod strategies {
    use crate::{ProcessOutputSource, ScriptState};
    use chrono::{DateTime, Duration, Utc};
    use proptest::prelude::*;

    pub fn arb_timestamp() -> impl Strategy<Value = DateTime<Utc>> {
        (1_500_000_000_000i64..2_500_000_000_000i64)
            .prop_map(|ms| DateTime::from_timestamp_millis(ms).unwrap_or_default())
    }

    pub fn arb_source() -> impl Strategy<Value = ProcessOutputSource> {
        prop_oneof![
            Just(ProcessOutputSource::Debug),
            Just(ProcessOutputSource::StdOut),
            Just(ProcessOutputSource::StdErr),
        ]
    }

    /// Any state reachable through `start`/`complete`.
    pub fn arb_script_state() -> impl Strategy<Value = ScriptState> {
        (arb_timestamp(), 0u8..4, 0i64..600_000, 0i64..600_000, any::<i32>(), any::<bool>()).prop_map(
            |(created, stage, to_start, to_end, code, ran)| {
                let mut state = ScriptState::new(created);
                let started = created + Duration::milliseconds(to_start);
                let completed = started + Duration::milliseconds(to_end);
                match stage {
                    0 => {}
                    1 => {
                        let _ = state.start(started);
                    }
                    2 => {
                        let _ = state.start(started);
                        let _ = state.complete(code, ran, completed);
                    }
                    _ => {
                        let _ = state.complete(code, ran, completed);
                    }
                }
                state
            },
        )
    }
}

/// Fixed timestamp offset from 2026-01-01T00:00:00Z.
pub fn at_secs(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(1_767_225_600 + secs, 0).unwrap_or_default()
}

pub fn stdout(text: &str, secs: i64) -> ProcessOutput {
    ProcessOutput::new(ProcessOutputSource::StdOut, text, at_secs(secs))
}
