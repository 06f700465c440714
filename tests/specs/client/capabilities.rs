// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Capability negotiation specs

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tend_wire::capabilities::CAPABILITIES_SERVICE_V2;

use crate::prelude::*;

/// Forwards to a real agent, counting capability requests. In legacy mode it
/// behaves like an agent that only hosts the v1 script service.
struct CountingAgent {
    inner: Arc<dyn RequestHandler>,
    legacy: bool,
    capability_calls: AtomicUsize,
}

#[async_trait]
impl RequestHandler for CountingAgent {
    async fn handle(&self, request: Request, cancel: CancellationToken) -> Response {
        if matches!(request, Request::GetCapabilities) {
            self.capability_calls.fetch_add(1, Ordering::SeqCst);
            if self.legacy {
                return Response::service_not_found(CAPABILITIES_SERVICE_V2);
            }
        }
        if self.legacy && !matches!(request.script_version(), None | Some(ScriptServiceVersion::V1)) {
            return Response::service_not_found(request.service());
        }
        self.inner.handle(request, cancel).await
    }
}

fn counting_agent(agent: &Agent, legacy: bool) -> Arc<CountingAgent> {
    Arc::new(CountingAgent { inner: Arc::clone(&agent.handler), legacy, capability_calls: AtomicUsize::new(0) })
}

#[tokio::test]
async fn second_execution_uses_cached_capabilities() {
    let agent = Agent::start().await;
    let agent_view = counting_agent(&agent, false);
    let (executor, _observer) = client(Arc::new(LocalTransport::new("counting", Arc::clone(&agent_view) as Arc<dyn RequestHandler>)));

    for name in ["cached-1", "cached-2"] {
        let (result, _logs) = run_script(&executor, command(name, "true"), &CancellationToken::new()).await;
        assert_eq!(result.unwrap().exit_code, 0);
    }

    assert_eq!(agent_view.capability_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn v1_only_agent_still_runs_scripts() {
    let agent = Agent::start().await;
    let agent_view = counting_agent(&agent, true);
    let (executor, observer) = client(Arc::new(LocalTransport::new("legacy", Arc::clone(&agent_view) as Arc<dyn RequestHandler>)));

    let (result, logs) = run_script(&executor, command("ignored-by-v1", "echo from-v1"), &CancellationToken::new()).await;

    let result = result.unwrap();
    assert_eq!((result.state, result.exit_code), (ProcessState::Complete, 0));
    assert_ne!(result.ticket, ticket("ignored-by-v1"));
    assert!(logs.iter().any(|l| l.text == "from-v1"), "logs: {logs:?}");
    assert!(observer.rpc_calls().iter().any(|m| m.rpc_call.service == "ScriptService"));
}
