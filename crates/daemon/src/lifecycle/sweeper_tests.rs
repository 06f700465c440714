// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Duration;
use tempfile::tempdir;
use tend_core::{FakeClock, ScriptState, ScriptTicket};
use tend_engine::{ExecutionDeps, IsolationMutexRegistry, StartScriptRequest, DEFAULT_RETENTION};
use tend_shell::{Bash, FakeProcessRunner};
use tend_storage::{WorkspaceFactory, WorkspaceSpec};

fn ticket(s: &str) -> ScriptTicket {
    ScriptTicket::parse(s).unwrap()
}

#[tokio::test(start_paused = true)]
async fn sweeps_expired_workspaces_but_keeps_tracked_ones() {
    let root = tempdir().unwrap();
    let factory = WorkspaceFactory::new(root.path());
    let clock = FakeClock::new();
    let deps = ExecutionDeps {
        shell: Arc::new(Bash::default()),
        runner: Arc::new(FakeProcessRunner::default()),
        mutexes: Arc::new(IsolationMutexRegistry::new()),
        clock: clock.clone(),
    };
    let service = Arc::new(ScriptService::new(factory.clone(), deps));

    // Left behind by a previous run
    let orphan = factory.prepare(&ticket("orphan"), &WorkspaceSpec::default()).unwrap();
    let mut state = ScriptState::new(clock.utc_now());
    state.complete(0, true, clock.utc_now()).unwrap();
    orphan.state_store().create(&state).unwrap();

    // Finished, but the caller has not sent CompleteScript yet
    let request = StartScriptRequest {
        ticket: ticket("tracked"),
        task_id: "ServerTasks-1".to_string(),
        spec: WorkspaceSpec::default(),
        wait_for_completion: Some(Duration::from_secs(5)),
    };
    service.start_script(request).await.unwrap();

    clock.advance(DEFAULT_RETENTION + Duration::from_secs(60));
    let shutdown = CancellationToken::new();
    let cleaner = WorkspaceCleaner::new(factory.clone(), clock, DEFAULT_RETENTION);
    let sweeper = spawn_workspace_sweeper(Arc::clone(&service), cleaner, Duration::from_secs(3600), shutdown.clone());

    for _ in 0..100 {
        if !orphan.exists() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(!orphan.exists());
    assert!(factory.get(&ticket("tracked")).exists());

    shutdown.cancel();
    sweeper.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn stops_on_shutdown() {
    let root = tempdir().unwrap();
    let factory = WorkspaceFactory::new(root.path());
    let deps = ExecutionDeps {
        shell: Arc::new(Bash::default()),
        runner: Arc::new(FakeProcessRunner::default()),
        mutexes: Arc::new(IsolationMutexRegistry::new()),
        clock: FakeClock::new(),
    };
    let service = Arc::new(ScriptService::new(factory.clone(), deps));
    let cleaner = WorkspaceCleaner::new(factory, FakeClock::new(), DEFAULT_RETENTION);
    let shutdown = CancellationToken::new();
    shutdown.cancel();

    let sweeper = spawn_workspace_sweeper(service, cleaner, Duration::from_millis(1), shutdown);
    tokio::time::timeout(Duration::from_secs(1), sweeper).await.unwrap().unwrap();
}
