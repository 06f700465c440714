// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;
use tend_core::{FakeClock, ScriptState};
use tend_storage::WorkspaceSpec;

fn ticket(s: &str) -> ScriptTicket {
    ScriptTicket::parse(s).unwrap()
}

#[test]
fn removes_only_expired_complete_workspaces() {
    let root = tempdir().unwrap();
    let factory = WorkspaceFactory::new(root.path());
    let clock = FakeClock::new();
    let start = clock.utc_now();

    let add = |name: &str, state: ScriptState| {
        let workspace = factory.prepare(&ticket(name), &WorkspaceSpec::default()).unwrap();
        workspace.state_store().create(&state).unwrap();
    };
    let mut old_complete = ScriptState::new(start);
    old_complete.complete(0, true, start).unwrap();
    add("old-complete", old_complete);
    add("old-pending", ScriptState::new(start));
    let mut old_running = ScriptState::new(start);
    old_running.start(start).unwrap();
    add("old-running", old_running);
    let mut old_active = ScriptState::new(start);
    old_active.complete(0, true, start).unwrap();
    add("old-active", old_active);
    factory.prepare(&ticket("no-state"), &WorkspaceSpec::default()).unwrap();

    clock.advance(Duration::from_secs(2 * 24 * 60 * 60));
    let mut recent = ScriptState::new(clock.utc_now());
    recent.complete(0, true, clock.utc_now()).unwrap();
    add("recent-complete", recent);

    let cleaner = WorkspaceCleaner::new(factory.clone(), clock, DEFAULT_RETENTION);
    let removed = cleaner.clean(&HashSet::from([ticket("old-active")])).unwrap();

    assert_eq!(removed, [ticket("old-complete")]);
    let mut left: Vec<String> = factory.enumerate().unwrap().iter().map(|w| w.ticket().to_string()).collect();
    left.sort();
    assert_eq!(left, ["no-state", "old-active", "old-pending", "old-running", "recent-complete"]);
}

#[test]
fn missing_root_is_nothing_to_do() {
    let root = tempdir().unwrap();
    let cleaner = WorkspaceCleaner::new(WorkspaceFactory::new(root.path().join("absent")), FakeClock::new(), DEFAULT_RETENTION);
    assert!(cleaner.clean(&HashSet::new()).unwrap().is_empty());
}
