// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Routes decoded requests to the script service.
//!
//! Every script service version is served by the same [`ScriptService`];
//! versions differ only in who allocates the ticket and what
//! CompleteScript returns. Kubernetes versions are not hosted.

use std::sync::Arc;

use async_trait::async_trait;
use tend_core::{Clock, ScriptTicket};
use tend_shell::ProcessRunner;
use tend_storage::WorkspaceSpec;
use tend_wire::capabilities::{
    CAPABILITIES_SERVICE_V2, SCRIPT_SERVICE, SCRIPT_SERVICE_V2, SCRIPT_SERVICE_V3_ALPHA,
};
use tend_wire::{
    CapabilitiesResponseV2, ExecutionContext, RemoteErrorKind, Request, RequestHandler, Response,
    ScriptServiceVersion, ScriptStatusRequest, StartScriptCommandV2, StatusMethod, TicketResponse,
};
use tokio_util::sync::CancellationToken;

use crate::service::{ScriptService, ServiceError, StartScriptRequest};

/// Services this agent advertises through the capabilities service
pub const HOSTED_SERVICES: [&str; 4] =
    [CAPABILITIES_SERVICE_V2, SCRIPT_SERVICE, SCRIPT_SERVICE_V2, SCRIPT_SERVICE_V3_ALPHA];

pub struct AgentDispatcher<R: ProcessRunner, C: Clock> {
    service: Arc<ScriptService<R, C>>,
}

impl<R: ProcessRunner, C: Clock> AgentDispatcher<R, C> {
    pub fn new(service: Arc<ScriptService<R, C>>) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &Arc<ScriptService<R, C>> {
        &self.service
    }

    async fn start_v2(
        &self,
        version: ScriptServiceVersion,
        command: StartScriptCommandV2,
    ) -> Result<Response, ServiceError> {
        let status = self.service.start_script(start_request(&command)).await?;
        Ok(Response::Status { version, status })
    }

    fn status(&self, version: ScriptServiceVersion, method: StatusMethod, request: ScriptStatusRequest) -> Result<Response, ServiceError> {
        let ScriptStatusRequest { ticket, last_log_sequence } = request;
        let status = match method {
            StatusMethod::GetStatus => self.service.get_status(&ticket, last_log_sequence)?,
            StatusMethod::Cancel => self.service.cancel_script(&ticket, last_log_sequence)?,
            StatusMethod::Complete => {
                let status = self.service.complete_script(&ticket, last_log_sequence)?;
                if version == ScriptServiceVersion::V2 {
                    return Ok(Response::Acknowledged);
                }
                status
            }
        };
        Ok(Response::Status { version, status })
    }
}

#[async_trait]
impl<R: ProcessRunner, C: Clock> RequestHandler for AgentDispatcher<R, C> {
    async fn handle(&self, request: Request, _cancel: CancellationToken) -> Response {
        let rpc = request.rpc_call();
        if let Some(version) = request.script_version() {
            if version.is_kubernetes() {
                tracing::debug!(%rpc, "request for service not hosted");
                return Response::service_not_found(version.service_name());
            }
        }

        let result = match request {
            Request::GetCapabilities => Ok(Response::Capabilities(CapabilitiesResponseV2::new(HOSTED_SERVICES))),
            Request::StartScript(command) => {
                let ticket = self.service.allocate_ticket(&command.task_id);
                self.service
                    .start_script(start_request(&command.to_v2(ticket.clone())))
                    .await
                    .map(|_| Response::Ticket(TicketResponse { ticket }))
            }
            Request::StartScriptV2(command) => self.start_v2(ScriptServiceVersion::V2, command).await,
            Request::StartScriptV3Alpha(command) => match &command.execution_context {
                ExecutionContext::LocalShell => self.start_v2(ScriptServiceVersion::V3Alpha, command.to_v2()).await,
                ExecutionContext::KubernetesJob { .. } => {
                    return Response::error(
                        RemoteErrorKind::Failure,
                        "this agent only runs scripts in the local shell execution context",
                    );
                }
            },
            Request::Status { version, method, request } => self.status(version, method, request),
            // Rejected above
            Request::StartKubernetesScriptV1Alpha(_) | Request::StartKubernetesScriptV1(_) => {
                return Response::service_not_found(rpc.service.as_str());
            }
        };

        match result {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(%rpc, error = %e, "request failed");
                Response::error(RemoteErrorKind::Failure, e.to_string())
            }
        }
    }
}

fn start_request(command: &StartScriptCommandV2) -> StartScriptRequest {
    StartScriptRequest {
        ticket: command.script_ticket.clone(),
        task_id: command.task_id.clone(),
        spec: WorkspaceSpec {
            script_body: command.script_body.clone(),
            arguments: command.arguments.clone(),
            scripts: command.scripts.clone(),
            files: command.files.clone(),
            isolation: command.isolation_configuration(),
        },
        wait_for_completion: command.duration_to_wait_for_script_to_finish,
    }
}

/// Ticket named by a request, for log context.
pub fn request_ticket(request: &Request) -> Option<&ScriptTicket> {
    match request {
        Request::StartScriptV2(c) => Some(&c.script_ticket),
        Request::StartScriptV3Alpha(c) => Some(&c.script_ticket),
        Request::StartKubernetesScriptV1Alpha(c) => Some(&c.script_ticket),
        Request::StartKubernetesScriptV1(c) => Some(&c.script_ticket),
        Request::Status { request, .. } => Some(&request.ticket),
        Request::GetCapabilities | Request::StartScript(_) => None,
    }
}

#[cfg(test)]
#[path = "handler_tests.rs"]
mod tests;
