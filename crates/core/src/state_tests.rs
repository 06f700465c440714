// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::exit_codes;
use crate::test_support::strategies::arb_script_state;
use chrono::Duration;
use proptest::prelude::*;

fn t0() -> DateTime<Utc> {
    DateTime::from_timestamp_millis(1_767_225_600_000).unwrap_or_default()
}

#[test]
fn new_state_is_pending_and_consistent() {
    let state = ScriptState::new(t0());
    assert_eq!(state.state, ProcessState::Pending);
    assert!(!state.has_started());
    assert!(state.is_consistent());
}

#[test]
fn start_then_complete() {
    let mut state = ScriptState::new(t0());
    state.start(t0() + Duration::seconds(1)).unwrap();
    assert_eq!(state.state, ProcessState::Running);
    assert!(state.is_consistent());

    state.complete(0, true, t0() + Duration::seconds(5)).unwrap();
    assert_eq!(state.state, ProcessState::Complete);
    assert_eq!(state.started, Some(t0() + Duration::seconds(1)));
    assert_eq!(state.exit_code, Some(0));
    assert_eq!(state.ran_to_completion, Some(true));
    assert!(state.is_consistent());
}

#[test]
fn complete_from_pending_stamps_started() {
    let mut state = ScriptState::new(t0());
    let at = t0() + Duration::seconds(3);
    state.complete_with(ScriptOutcome::MutexTimedOut, at).unwrap();

    assert_eq!(state.started, Some(at));
    assert_eq!(state.exit_code, Some(exit_codes::TIMEOUT));
    assert_eq!(state.ran_to_completion, Some(false));
    assert!(state.is_consistent());
}

#[test]
fn transitions_never_go_backward() {
    let mut state = ScriptState::new(t0());
    state.start(t0()).unwrap();
    assert_eq!(state.start(t0()), Err(TransitionError::NotPending(ProcessState::Running)));

    state.complete(1, true, t0()).unwrap();
    assert_eq!(state.start(t0()), Err(TransitionError::NotPending(ProcessState::Complete)));
    assert_eq!(state.complete(2, true, t0()), Err(TransitionError::AlreadyComplete));
    assert_eq!(state.exit_code, Some(1));
}

#[test]
fn process_state_orders_by_progress() {
    assert!(ProcessState::Pending < ProcessState::Running);
    assert!(ProcessState::Running < ProcessState::Complete);
}

proptest! {
    #[test]
    fn generated_states_are_consistent(state in arb_script_state()) {
        prop_assert!(state.is_consistent());
    }

    #[test]
    fn json_round_trip_is_identity(state in arb_script_state()) {
        let json = serde_json::to_string(&state).unwrap();
        let back: ScriptState = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(back, state);
    }
}
