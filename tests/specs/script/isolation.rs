// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Isolation mutex specs

use std::time::Duration;

use crate::prelude::*;

fn isolated(ticket_name: &str, body: &str, timeout: Duration) -> StartScriptCommandV2 {
    let mut command = command(ticket_name, body);
    command.isolation = ScriptIsolationLevel::FullIsolation;
    command.isolation_mutex_name = Some("deploy-target".to_string());
    command.mutex_timeout = timeout;
    command
}

async fn start(agent: &Agent, command: StartScriptCommandV2) -> ScriptStatusResponse {
    match agent.call(Request::StartScriptV2(command)).await {
        Response::Status { status, .. } => status,
        other => panic!("expected status, got {other:?}"),
    }
}

async fn wait_until(agent: &Agent, ticket: &ScriptTicket, state: ProcessState) -> ScriptStatusResponse {
    for _ in 0..400 {
        let status = agent.status(ticket).await;
        if status.state == state {
            return status;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("{ticket} never reached {state:?}");
}

#[tokio::test]
async fn busy_mutex_with_zero_timeout_completes_with_timeout() {
    let agent = Agent::start().await;
    let holder = ticket("holder");
    start(&agent, isolated("holder", "sleep 30", Duration::from_secs(5))).await;
    wait_until(&agent, &holder, ProcessState::Running).await;

    let mut second = isolated("waiter", "echo never", Duration::ZERO);
    second.duration_to_wait_for_script_to_finish = Some(Duration::from_secs(10));
    let status = start(&agent, second).await;

    assert_eq!(status.state, ProcessState::Complete);
    assert_eq!(status.exit_code, exit_codes::TIMEOUT);
    assert!(status.logs.iter().all(|l| l.text != "never"));
    // Never reported Running afterwards either
    let again = agent.status(&ticket("waiter")).await;
    assert_eq!((again.state, again.exit_code), (ProcessState::Complete, exit_codes::TIMEOUT));

    let cancel = Request::status(
        ScriptServiceVersion::V2,
        StatusMethod::Cancel,
        ScriptStatusRequest::new(holder.clone(), 0),
    );
    agent.call(cancel).await;
    let done = wait_until(&agent, &holder, ProcessState::Complete).await;
    assert_eq!(done.exit_code, exit_codes::CANCELED);
}

#[tokio::test]
async fn waiter_runs_once_the_holder_finishes() {
    let agent = Agent::start().await;
    start(&agent, isolated("first", "sleep 0.3", Duration::from_secs(10))).await;

    let mut second = isolated("second", "echo ran", Duration::from_secs(10));
    second.duration_to_wait_for_script_to_finish = Some(Duration::from_secs(10));
    let status = start(&agent, second).await;

    assert_eq!((status.state, status.exit_code), (ProcessState::Complete, 0));
    assert_eq!(agent.status(&ticket("first")).await.state, ProcessState::Complete);
}
