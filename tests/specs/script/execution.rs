// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Script execution specs
//!
//! Run real bash scripts on an in-process agent, through the in-process
//! transport and through the Unix socket.

use crate::prelude::*;

fn assert_single_stdout_line(logs: &[ProcessOutput], text: &str) {
    let stdout: Vec<_> = logs.iter().filter(|l| l.source == ProcessOutputSource::StdOut).collect();
    assert_eq!(stdout.len(), 1, "logs: {logs:?}");
    assert_eq!(stdout[0].text, text);
    assert!(logs.iter().all(|l| l.source != ProcessOutputSource::StdErr), "logs: {logs:?}");
}

#[tokio::test]
async fn one_line_script_completes_locally() {
    let agent = Agent::start().await;
    let (executor, observer) = client(agent.local());

    let (result, logs) = run_script(&executor, command("local-echo", "echo hello"), &CancellationToken::new()).await;

    let result = result.unwrap();
    assert_eq!(result.state, ProcessState::Complete);
    assert_eq!(result.exit_code, 0);
    assert_single_stdout_line(&logs, "hello");

    let operations = observer.operations();
    assert_eq!(operations.len(), 1);
    assert!(operations[0].succeeded());
    // CompleteScript removed the workspace
    assert_eq!(agent.status(&ticket("local-echo")).await.exit_code, exit_codes::UNKNOWN_SCRIPT);
}

#[tokio::test]
async fn one_line_script_completes_over_socket() {
    let mut agent = Agent::start().await;
    let (shutdown, serving) = agent.serve();
    let (executor, _observer) = client(agent.socket());

    let (result, logs) = run_script(&executor, command("socket-echo", "echo hello"), &CancellationToken::new()).await;

    let result = result.unwrap();
    assert_eq!((result.state, result.exit_code), (ProcessState::Complete, 0));
    assert_single_stdout_line(&logs, "hello");

    shutdown.cancel();
    serving.await.unwrap();
    assert!(!agent.config.socket_path.exists());
}

#[tokio::test]
async fn exit_code_and_stderr_are_reported() {
    let agent = Agent::start().await;
    let (executor, _observer) = client(agent.local());

    let (result, logs) =
        run_script(&executor, command("exit-three", "echo oops >&2\nexit 3"), &CancellationToken::new()).await;

    assert_eq!(result.unwrap().exit_code, 3);
    assert!(logs.iter().any(|l| l.source == ProcessOutputSource::StdErr && l.text == "oops"), "logs: {logs:?}");
}

#[tokio::test]
async fn cancelling_the_caller_cancels_the_script() {
    let agent = Agent::start().await;
    let (executor, observer) = client(agent.local());
    let cancel = CancellationToken::new();
    let body = command("long-sleep", "echo started\nsleep 60");

    let trigger = cancel.clone();
    let result = executor
        .execute(
            body,
            move |status: &ScriptStatusResponse| {
                if status.logs.iter().any(|l| l.text == "started") {
                    trigger.cancel();
                }
            },
            &cancel,
        )
        .await;

    let result = result.unwrap();
    assert_eq!(result.state, ProcessState::Complete);
    assert_eq!(result.exit_code, exit_codes::CANCELED);
    assert!(observer.operations()[0].was_cancelled);
}

#[tokio::test]
async fn v1_agent_allocates_the_ticket() {
    let agent = Agent::start().await;
    let ticket = match agent
        .call(Request::StartScript(StartScriptCommand {
            script_body: "echo legacy".to_string(),
            isolation: ScriptIsolationLevel::NoIsolation,
            mutex_timeout: std::time::Duration::from_secs(5),
            isolation_mutex_name: None,
            arguments: vec![],
            task_id: "ServerTasks-9".to_string(),
            scripts: Default::default(),
            files: vec![],
        }))
        .await
    {
        Response::Ticket(t) => t.ticket,
        other => panic!("expected ticket, got {other:?}"),
    };

    let mut status = agent.status(&ticket).await;
    for _ in 0..200 {
        if status.state == ProcessState::Complete {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(25)).await;
        status = agent.status(&ticket).await;
    }
    assert_eq!((status.state, status.exit_code), (ProcessState::Complete, 0));
    assert!(status.logs.iter().any(|l| l.text == "legacy"));
}
