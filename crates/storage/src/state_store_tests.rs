// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use proptest::prelude::*;
use tempfile::tempdir;
use tend_core::test_support::{at_secs, strategies::arb_script_state};

fn pending() -> ScriptState {
    ScriptState::new(at_secs(0))
}

fn running() -> ScriptState {
    let mut state = pending();
    state.start(at_secs(1)).unwrap();
    state
}

#[test]
fn create_then_load() {
    let dir = tempdir().unwrap();
    let store = ScriptStateStore::new(dir.path());
    assert!(!store.exists());

    store.create(&pending()).unwrap();
    assert!(store.exists());
    assert_eq!(store.load().unwrap(), pending());
    assert_eq!(store.path(), dir.path().join(STATE_FILE));
}

#[test]
fn create_fails_when_state_exists() {
    let dir = tempdir().unwrap();
    let store = ScriptStateStore::new(dir.path());
    store.create(&pending()).unwrap();

    let err = store.create(&pending()).unwrap_err();
    assert!(matches!(err, StateStoreError::AlreadyExists(_)), "{err}");
}

#[test]
fn load_fails_when_missing() {
    let dir = tempdir().unwrap();
    let err = ScriptStateStore::new(dir.path()).load().unwrap_err();
    assert!(matches!(err, StateStoreError::NotFound(_)), "{err}");
}

#[test]
fn save_keeps_backup_of_previous_state() {
    let dir = tempdir().unwrap();
    let store = ScriptStateStore::new(dir.path());
    store.create(&pending()).unwrap();
    store.save(&running()).unwrap();

    assert_eq!(store.load().unwrap(), running());
    let bak: ScriptState = serde_json::from_slice(&fs::read(dir.path().join("scriptstate.json.bak")).unwrap()).unwrap();
    assert_eq!(bak, pending());
    assert!(!dir.path().join("scriptstate.json.tmp").exists());
}

#[test]
fn crash_after_temp_write_leaves_old_state() {
    let dir = tempdir().unwrap();
    let store = ScriptStateStore::new(dir.path());
    store.create(&pending()).unwrap();

    // Half-written temp file, rename never happened
    fs::write(dir.path().join("scriptstate.json.tmp"), b"{\"created\":\"2026-").unwrap();
    assert_eq!(store.load().unwrap(), pending());

    // A later save overwrites the leftover temp file
    store.save(&running()).unwrap();
    assert_eq!(store.load().unwrap(), running());
}

#[test]
fn crash_between_backup_and_rename_leaves_old_state() {
    let dir = tempdir().unwrap();
    let store = ScriptStateStore::new(dir.path());
    store.create(&pending()).unwrap();

    fs::write(dir.path().join("scriptstate.json.tmp"), serde_json::to_vec(&running()).unwrap()).unwrap();
    fs::copy(dir.path().join(STATE_FILE), dir.path().join("scriptstate.json.bak")).unwrap();
    assert_eq!(store.load().unwrap(), pending());
}

#[test]
fn corrupt_canonical_file_falls_back_to_backup() {
    let dir = tempdir().unwrap();
    let store = ScriptStateStore::new(dir.path());
    store.create(&pending()).unwrap();
    store.save(&running()).unwrap();

    fs::write(dir.path().join(STATE_FILE), b"not json").unwrap();
    assert_eq!(store.load().unwrap(), pending());
}

#[test]
fn missing_canonical_file_falls_back_to_backup() {
    let dir = tempdir().unwrap();
    let store = ScriptStateStore::new(dir.path());
    store.create(&pending()).unwrap();
    store.save(&running()).unwrap();

    fs::remove_file(dir.path().join(STATE_FILE)).unwrap();
    assert!(store.exists());
    assert_eq!(store.load().unwrap(), pending());
}

#[test]
fn concurrent_saves_never_tear() {
    let dir = tempdir().unwrap();
    let store = std::sync::Arc::new(ScriptStateStore::new(dir.path()));
    store.create(&pending()).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = std::sync::Arc::clone(&store);
            std::thread::spawn(move || {
                for _ in 0..20 {
                    let state = if i % 2 == 0 { pending() } else { running() };
                    store.save(&state).unwrap();
                    let loaded = store.load().unwrap();
                    assert!(loaded == pending() || loaded == running());
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
}

proptest! {
    #[test]
    fn save_then_load_is_identity(state in arb_script_state()) {
        let dir = tempdir().unwrap();
        let store = ScriptStateStore::new(dir.path());
        store.save(&state).unwrap();
        prop_assert_eq!(store.load().unwrap(), state);
    }
}
