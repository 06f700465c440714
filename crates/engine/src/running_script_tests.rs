// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Duration;
use tempfile::{tempdir, TempDir};
use tend_core::{exit_codes, FakeClock, ProcessState, ScriptIsolationLevel, ScriptTicket};
use tend_shell::{Bash, FakeExit, FakeProcessRunner, FakeRun};
use tend_storage::{WorkspaceFactory, WorkspaceSpec};

struct Harness {
    _root: TempDir,
    factory: WorkspaceFactory,
    deps: ExecutionDeps<FakeProcessRunner, FakeClock>,
    runner: FakeProcessRunner,
}

impl Harness {
    fn new(runner: FakeProcessRunner) -> Self {
        let root = tempdir().unwrap();
        let factory = WorkspaceFactory::new(root.path());
        let deps = ExecutionDeps {
            shell: Arc::new(Bash::default()),
            runner: Arc::new(runner.clone()),
            mutexes: Arc::new(IsolationMutexRegistry::new()),
            clock: FakeClock::new(),
        };
        Self { _root: root, factory, deps, runner }
    }

    fn script(
        &self,
        ticket: &str,
        isolation: IsolationConfiguration,
        cancel: CancellationToken,
    ) -> (RunningScript<FakeProcessRunner, FakeClock>, watch::Receiver<ScriptState>, ScriptWorkspace) {
        let ticket = ScriptTicket::parse(ticket).unwrap();
        let spec = WorkspaceSpec {
            script_body: "echo hi".to_string(),
            arguments: vec!["arg".to_string()],
            isolation: isolation.clone(),
            ..Default::default()
        };
        let workspace = self.factory.prepare(&ticket, &spec).unwrap();
        let initial = ScriptState::new(self.deps.clock.utc_now());
        workspace.state_store().create(&initial).unwrap();
        let execution = ScriptExecution {
            workspace: workspace.clone(),
            isolation,
            arguments: spec.arguments,
            task_id: format!("task-{ticket}"),
        };
        let (script, rx) = RunningScript::new(execution, self.deps.clone(), initial, cancel);
        (script, rx, workspace)
    }
}

fn texts(workspace: &ScriptWorkspace) -> Vec<(ProcessOutputSource, String)> {
    let (entries, _) = workspace.log().get_output(0, Utc::now()).unwrap();
    entries.into_iter().map(|e| (e.source, e.text)).collect()
}

fn full(timeout: Duration) -> IsolationConfiguration {
    IsolationConfiguration::new(ScriptIsolationLevel::FullIsolation, Some("target"), timeout)
}

#[tokio::test(start_paused = true)]
async fn successful_run_persists_each_transition() {
    let harness = Harness::new(FakeProcessRunner::new(FakeRun::exits(0).stdout("hello")));
    let (script, rx, workspace) = harness.script("t1", IsolationConfiguration::default(), CancellationToken::new());

    let outcome = script.execute().await;

    assert_eq!(outcome, ScriptOutcome::Exited(0));
    let persisted = workspace.state_store().load().unwrap();
    assert_eq!(persisted.state, ProcessState::Complete);
    assert_eq!(persisted.exit_code, Some(0));
    assert_eq!(persisted.ran_to_completion, Some(true));
    assert!(persisted.started.is_some());
    assert!(persisted.is_consistent());
    assert_eq!(*rx.borrow(), persisted);

    let lines = texts(&workspace);
    let stdout: Vec<&str> =
        lines.iter().filter(|(source, _)| *source == ProcessOutputSource::StdOut).map(|(_, t)| t.as_str()).collect();
    assert_eq!(stdout, ["hello"], "{lines:?}");
    assert!(
        lines.iter().any(|(source, t)| *source == ProcessOutputSource::Debug && t.starts_with("Acquiring isolation mutex")),
        "{lines:?}"
    );
}

#[tokio::test(start_paused = true)]
async fn invokes_bootstrap_with_arguments_in_workspace() {
    let harness = Harness::new(FakeProcessRunner::default());
    let (script, _rx, workspace) = harness.script("t1", IsolationConfiguration::default(), CancellationToken::new());
    script.execute().await;

    let invocations = harness.runner.invocations();
    assert_eq!(invocations.len(), 1);
    assert_eq!(invocations[0].program, std::path::Path::new("bash"));
    assert_eq!(
        invocations[0].args,
        [workspace.bootstrap_script_path().display().to_string(), "arg".to_string()]
    );
    assert_eq!(invocations[0].working_dir, workspace.working_directory());
}

#[tokio::test(start_paused = true)]
async fn nonzero_exit_still_ran_to_completion() {
    let harness = Harness::new(FakeProcessRunner::new(FakeRun::exits(3)));
    let (script, rx, _) = harness.script("t1", IsolationConfiguration::default(), CancellationToken::new());
    assert_eq!(script.execute().await, ScriptOutcome::Exited(3));
    assert_eq!(rx.borrow().ran_to_completion, Some(true));
}

#[tokio::test(start_paused = true)]
async fn cancel_during_run_reports_canceled() {
    let harness = Harness::new(FakeProcessRunner::new(FakeRun::ends(FakeExit::Hang)));
    let cancel = CancellationToken::new();
    let (script, mut rx, workspace) = harness.script("t1", IsolationConfiguration::default(), cancel.clone());
    let task = tokio::spawn(script.execute());

    rx.wait_for(|s| s.state == ProcessState::Running).await.unwrap();
    cancel.cancel();
    assert_eq!(task.await.unwrap(), ScriptOutcome::Canceled);

    let persisted = workspace.state_store().load().unwrap();
    assert_eq!(persisted.exit_code, Some(exit_codes::CANCELED));
    assert_eq!(persisted.ran_to_completion, Some(false));
    assert!(texts(&workspace).contains(&(ProcessOutputSource::StdOut, "Script execution canceled.".to_string())));
}

#[tokio::test(start_paused = true)]
async fn spawn_failure_is_invocation_error() {
    let harness = Harness::new(FakeProcessRunner::new(FakeRun::ends(FakeExit::SpawnError("no such file".into()))));
    let (script, rx, workspace) = harness.script("t1", IsolationConfiguration::default(), CancellationToken::new());

    assert_eq!(script.execute().await, ScriptOutcome::InvocationFailed);
    assert_eq!(rx.borrow().exit_code, Some(exit_codes::INVOCATION_ERROR));
    let stderr: Vec<String> = texts(&workspace)
        .into_iter()
        .filter(|(s, _)| *s == ProcessOutputSource::StdErr)
        .map(|(_, t)| t)
        .collect();
    assert_eq!(stderr.len(), 1);
    assert!(stderr[0].starts_with("An exception was thrown when invoking bash: failed to start bash"), "{}", stderr[0]);
}

#[tokio::test(start_paused = true)]
async fn mutex_timeout_completes_without_running() {
    let release = Arc::new(tokio::sync::Notify::new());
    let runner = FakeProcessRunner::new(FakeRun::exits(0));
    runner.push(FakeRun::ends(FakeExit::OnNotify(Arc::clone(&release), 0)));
    let harness = Harness::new(runner);

    let (first, mut first_rx, _) = harness.script("t1", full(Duration::ZERO), CancellationToken::new());
    let first = tokio::spawn(first.execute());
    first_rx.wait_for(|s| s.state == ProcessState::Running).await.unwrap();

    let (second, mut second_rx, workspace) = harness.script("t2", full(Duration::ZERO), CancellationToken::new());
    let observed = tokio::spawn(async move {
        let mut seen = vec![second_rx.borrow().state];
        while second_rx.changed().await.is_ok() {
            seen.push(second_rx.borrow().state);
        }
        seen
    });
    assert_eq!(second.execute().await, ScriptOutcome::MutexTimedOut);

    let persisted = workspace.state_store().load().unwrap();
    assert_eq!(persisted.state, ProcessState::Complete);
    assert_eq!(persisted.exit_code, Some(exit_codes::TIMEOUT));
    assert_eq!(persisted.ran_to_completion, Some(false));
    assert_eq!(persisted.started, persisted.completed);
    assert!(!observed.await.unwrap().contains(&ProcessState::Running));
    assert!(texts(&workspace).contains(&(ProcessOutputSource::StdOut, "Script execution timed out.".to_string())));

    release.notify_one();
    assert_eq!(first.await.unwrap(), ScriptOutcome::Exited(0));
    assert_eq!(harness.runner.invocations().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn cancel_while_waiting_for_mutex() {
    let release = Arc::new(tokio::sync::Notify::new());
    let runner = FakeProcessRunner::new(FakeRun::ends(FakeExit::OnNotify(Arc::clone(&release), 0)));
    let harness = Harness::new(runner);
    let (first, mut first_rx, _) = harness.script("t1", full(Duration::MAX), CancellationToken::new());
    let first = tokio::spawn(first.execute());
    first_rx.wait_for(|s| s.state == ProcessState::Running).await.unwrap();

    let cancel = CancellationToken::new();
    let (second, _rx, workspace) = harness.script("t2", full(Duration::MAX), cancel.clone());
    let second = tokio::spawn(second.execute());
    tokio::time::sleep(Duration::from_secs(30)).await;
    cancel.cancel();

    assert_eq!(second.await.unwrap(), ScriptOutcome::Canceled);
    let lines = texts(&workspace);
    assert!(lines.iter().any(|(_, t)| t.starts_with("This task was canceled before it could start.")), "{lines:?}");
    release.notify_one();
    first.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn lost_state_file_is_fatal_but_still_publishes_complete() {
    let harness = Harness::new(FakeProcessRunner::default());
    let (script, rx, workspace) = harness.script("t1", IsolationConfiguration::default(), CancellationToken::new());
    // A directory where the state file should go makes every save fail
    std::fs::remove_file(workspace.state_store().path()).unwrap();
    std::fs::create_dir(workspace.state_store().path()).unwrap();

    assert_eq!(script.execute().await, ScriptOutcome::Fatal);
    assert_eq!(rx.borrow().state, ProcessState::Complete);
    assert_eq!(rx.borrow().exit_code, Some(exit_codes::FATAL));
    let warnings = texts(&workspace)
        .into_iter()
        .filter(|(_, t)| t.starts_with("Warning: An exception occurred saving the ScriptState"))
        .count();
    assert_eq!(warnings, 2);
    assert!(harness.runner.invocations().is_empty());
}
