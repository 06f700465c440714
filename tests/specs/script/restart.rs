// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent restart specs
//!
//! Scripts are not cancelled when the agent stops. A restarted agent serves
//! their persisted state and reports the outcome as unknown.

use std::time::Duration;

use crate::prelude::*;

async fn wait_for_running(agent: &Agent, ticket: &ScriptTicket) {
    for _ in 0..400 {
        if agent.status(ticket).await.state == ProcessState::Running {
            return;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("{ticket} never started");
}

#[tokio::test]
async fn restarted_agent_reports_unknown_result_for_interrupted_script() {
    let agent = Agent::start().await;
    let interrupted = ticket("interrupted");
    agent.call(Request::StartScriptV2(command("interrupted", "sleep 30"))).await;
    wait_for_running(&agent, &interrupted).await;

    let agent = Agent::start_in(agent.stop()).await;

    let status = agent.status(&interrupted).await;
    assert_eq!(status.state, ProcessState::Complete);
    assert_eq!(status.exit_code, exit_codes::UNKNOWN_RESULT);

    // Starting the same ticket again does not re-run it
    let again = match agent.call(Request::StartScriptV2(command("interrupted", "sleep 30"))).await {
        Response::Status { status, .. } => status,
        other => panic!("expected status, got {other:?}"),
    };
    assert_eq!((again.state, again.exit_code), (ProcessState::Complete, exit_codes::UNKNOWN_RESULT));
}

#[tokio::test]
async fn unknown_ticket_is_reported_as_unknown_script() {
    let agent = Agent::start().await;
    let status = agent.status(&ticket("never-started")).await;
    assert_eq!((status.state, status.exit_code), (ProcessState::Complete, exit_codes::UNKNOWN_SCRIPT));
}

#[tokio::test]
async fn completed_output_survives_restart() {
    let agent = Agent::start().await;
    let mut finished = command("finished", "echo kept");
    finished.duration_to_wait_for_script_to_finish = Some(Duration::from_secs(10));
    agent.call(Request::StartScriptV2(finished)).await;

    let agent = Agent::start_in(agent.stop()).await;

    let status = agent.status(&ticket("finished")).await;
    assert_eq!((status.state, status.exit_code), (ProcessState::Complete, 0));
    assert!(status.logs.iter().any(|l| l.text == "kept"), "logs: {:?}", status.logs);
}
