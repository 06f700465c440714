// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared harness: a real agent in a temp state dir, driven by the client.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub use tempfile::TempDir;
pub use tend_agent::{serve, startup, Config, StartupResult};
pub use tend_client::{
    ClientObserver, ClientOptions, LocalTransport, RecordingObserver, ScriptExecutionError, ScriptExecutionResult,
    ScriptExecutor, SocketTransport, Transport,
};
pub use tend_core::{exit_codes, ProcessOutput, ProcessOutputSource, ProcessState, ScriptIsolationLevel, ScriptTicket, SystemClock};
pub use tend_engine::AgentDispatcher;
pub use tend_wire::{
    Request, RequestHandler, Response, ScriptServiceVersion, ScriptStatusRequest, ScriptStatusResponse,
    StartScriptCommand, StartScriptCommandV2, StatusMethod,
};
pub use tokio_util::sync::CancellationToken;

pub const SOCKET_TIMEOUT: Duration = Duration::from_secs(5);

/// An agent started in its own state directory, not yet serving its socket.
pub struct Agent {
    pub dir: TempDir,
    pub config: Config,
    pub handler: Arc<dyn RequestHandler>,
    startup: Option<StartupResult>,
}

impl Agent {
    pub async fn start() -> Self {
        Self::start_in(tempfile::tempdir().unwrap()).await
    }

    pub async fn start_in(dir: TempDir) -> Self {
        let config = Config::for_state_dir(dir.path());
        let started = startup(&config).await.unwrap();
        let handler: Arc<dyn RequestHandler> = Arc::new(AgentDispatcher::new(Arc::clone(&started.agent.service)));
        Self { dir, config, handler, startup: Some(started) }
    }

    /// Serve the Unix socket until the returned token is cancelled.
    pub fn serve(&mut self) -> (CancellationToken, tokio::task::JoinHandle<()>) {
        let shutdown = CancellationToken::new();
        let started = self.startup.take().unwrap();
        (shutdown.clone(), tokio::spawn(serve(started, shutdown)))
    }

    /// Shut down and hand back the state directory for a restart.
    pub fn stop(mut self) -> TempDir {
        if let Some(started) = self.startup.take() {
            started.agent.shutdown();
        }
        self.dir
    }

    pub fn local(&self) -> Arc<dyn Transport> {
        Arc::new(LocalTransport::new("local", Arc::clone(&self.handler)))
    }

    pub fn socket(&self) -> Arc<dyn Transport> {
        socket_transport(&self.config.socket_path)
    }

    pub async fn call(&self, request: Request) -> Response {
        self.handler.handle(request, CancellationToken::new()).await
    }

    pub async fn status(&self, ticket: &ScriptTicket) -> ScriptStatusResponse {
        let request = Request::status(
            ScriptServiceVersion::V2,
            StatusMethod::GetStatus,
            ScriptStatusRequest::new(ticket.clone(), 0),
        );
        match self.call(request).await {
            Response::Status { status, .. } => status,
            other => panic!("expected status, got {other:?}"),
        }
    }
}

pub fn socket_transport(path: &Path) -> Arc<dyn Transport> {
    Arc::new(SocketTransport::new(path, SOCKET_TIMEOUT))
}

pub fn ticket(s: &str) -> ScriptTicket {
    ScriptTicket::parse(s).unwrap()
}

pub fn command(ticket_name: &str, body: &str) -> StartScriptCommandV2 {
    StartScriptCommand {
        script_body: body.to_string(),
        isolation: ScriptIsolationLevel::NoIsolation,
        mutex_timeout: Duration::from_secs(5),
        isolation_mutex_name: None,
        arguments: vec![],
        task_id: "ServerTasks-1".to_string(),
        scripts: Default::default(),
        files: vec![],
    }
    .to_v2(ticket(ticket_name))
}

pub fn client(transport: Arc<dyn Transport>) -> (ScriptExecutor<SystemClock>, Arc<RecordingObserver>) {
    let observer = Arc::new(RecordingObserver::new());
    let options = ClientOptions::default().retry_timeout(Duration::from_secs(10));
    let executor =
        ScriptExecutor::new(transport, options, Arc::clone(&observer) as Arc<dyn ClientObserver>, SystemClock);
    (executor, observer)
}

/// Run one script to completion, collecting every forwarded log line.
pub async fn run_script(
    executor: &ScriptExecutor<SystemClock>,
    command: StartScriptCommandV2,
    cancel: &CancellationToken,
) -> (Result<ScriptExecutionResult, ScriptExecutionError>, Vec<ProcessOutput>) {
    let mut logs = Vec::new();
    let result = executor.execute(command, |status: &ScriptStatusResponse| logs.extend(status.logs.iter().cloned()), cancel).await;
    (result, logs)
}
