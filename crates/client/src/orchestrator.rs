// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Drives one script from start to completion against an agent.
//!
//! negotiate -> StartScript -> GetStatus until Complete -> CompleteScript
//!
//! Once the caller cancels, the remote script is cancelled with CancelScript
//! until the agent reports it Complete. Those calls, and CompleteScript, run
//! on their own token so they still reach the agent.

use std::sync::Arc;

use tend_core::{ClientOperationMetricsBuilder, Clock, ProcessState, RpcCall, ScriptTicket};
use tend_wire::{
    ExecutionContext, Request, Response, ScriptServiceVersion, ScriptStatusRequest, ScriptStatusResponse,
    StartScriptCommandV2, StatusMethod,
};
use tokio_util::sync::CancellationToken;

use crate::capabilities::CapabilityNegotiator;
use crate::config::ClientOptions;
use crate::error::{NegotiationError, RpcError, ScriptExecutionError};
use crate::executor::{OnCancel, RpcCallExecutor};
use crate::observer::ClientObserver;
use crate::transport::Transport;

pub const EXECUTE_SCRIPT_OPERATION: &str = "ExecuteScript";

/// Final outcome as reported by the agent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptExecutionResult {
    pub ticket: ScriptTicket,
    pub state: ProcessState,
    pub exit_code: i32,
}

pub struct ScriptExecutor<C: Clock> {
    transport: Arc<dyn Transport>,
    executor: RpcCallExecutor<C>,
    negotiator: CapabilityNegotiator,
    options: ClientOptions,
}

impl<C: Clock> ScriptExecutor<C> {
    pub fn new(transport: Arc<dyn Transport>, options: ClientOptions, observer: Arc<dyn ClientObserver>, clock: C) -> Self {
        Self {
            executor: RpcCallExecutor::new(&options, observer, clock),
            negotiator: CapabilityNegotiator::new(&options),
            transport,
            options,
        }
    }

    /// Replace the negotiator, e.g. to share a capabilities cache.
    pub fn with_negotiator(mut self, negotiator: CapabilityNegotiator) -> Self {
        self.negotiator = negotiator;
        self
    }

    pub fn negotiator(&self) -> &CapabilityNegotiator {
        &self.negotiator
    }

    /// Run `command` to completion, passing every status received to `on_status`.
    ///
    /// Emits one operation metrics record whatever the outcome.
    pub async fn execute<F>(
        &self,
        command: StartScriptCommandV2,
        mut on_status: F,
        cancel: &CancellationToken,
    ) -> Result<ScriptExecutionResult, ScriptExecutionError>
    where
        F: FnMut(&ScriptStatusResponse) + Send,
    {
        let clock = self.executor.clock();
        let operation = ClientOperationMetricsBuilder::start(EXECUTE_SCRIPT_OPERATION, clock.utc_now());
        let result = self.run(command, &mut on_status, &operation, cancel).await;

        let end = clock.utc_now();
        let metrics = match &result {
            // The agent finished the script, but not as the caller asked
            Ok(_) if cancel.is_cancelled() => operation.failure(end, ScriptExecutionError::Cancelled, true),
            Ok(_) => operation.success(end),
            Err(e) => operation.failure(end, e, cancel.is_cancelled()),
        };
        if let Err(e) = self.executor.observer().operation_completed(&metrics) {
            tracing::warn!(operation = EXECUTE_SCRIPT_OPERATION, error = %e, "observer failed");
        }
        result
    }

    async fn run<F>(
        &self,
        command: StartScriptCommandV2,
        on_status: &mut F,
        operation: &ClientOperationMetricsBuilder,
        cancel: &CancellationToken,
    ) -> Result<ScriptExecutionResult, ScriptExecutionError>
    where
        F: FnMut(&ScriptStatusResponse) + Send,
    {
        let version = self
            .negotiator
            .negotiate(&self.executor, &self.transport, self.options.rpc_retries_enabled, operation, cancel)
            .await
            .map_err(|e| match e {
                NegotiationError::Rpc(e) if e.is_cancellation() => ScriptExecutionError::Cancelled,
                e => e.into(),
            })?;
        // A v1 start allocates a new ticket on every call so it must not be retried
        let retries = self.options.rpc_retries_enabled && version.has_client_ticket();

        let status = match self.start(version, &command, retries, operation, cancel).await {
            Ok(status) => status,
            Err(e) if e.is_cancellation() && version.has_client_ticket() => {
                // The agent may have received the start; cancel by ticket
                tracing::info!(ticket = %command.script_ticket, "cancelled while starting script");
                pending(command.script_ticket.clone())
            }
            Err(e) if e.is_cancellation() => return Err(ScriptExecutionError::Cancelled),
            Err(e) => return Err(ScriptExecutionError::CouldNotStart(e)),
        };
        tracing::info!(ticket = %status.ticket, %version, state = %status.state, "script started");
        on_status(&status);

        let status = self.observe_until_complete(version, status, retries, on_status, operation, cancel).await?;
        let status = self.complete(version, status, on_status, operation).await;
        tracing::info!(ticket = %status.ticket, exit_code = status.exit_code, "script finished");
        Ok(ScriptExecutionResult { ticket: status.ticket, state: status.state, exit_code: status.exit_code })
    }

    async fn start(
        &self,
        version: ScriptServiceVersion,
        command: &StartScriptCommandV2,
        retries: bool,
        operation: &ClientOperationMetricsBuilder,
        cancel: &CancellationToken,
    ) -> Result<ScriptStatusResponse, RpcError> {
        let request = match version {
            ScriptServiceVersion::V1 => Request::StartScript(command.to_v1()),
            ScriptServiceVersion::V2 => Request::StartScriptV2(command.clone()),
            ScriptServiceVersion::V3Alpha => Request::StartScriptV3Alpha(command.to_v3_alpha(ExecutionContext::LocalShell)),
            ScriptServiceVersion::KubernetesV1Alpha => {
                Request::StartKubernetesScriptV1Alpha(command.to_kubernetes_v1(None, None).to_v1_alpha())
            }
            ScriptServiceVersion::KubernetesV1 => Request::StartKubernetesScriptV1(command.to_kubernetes_v1(None, None)),
        };
        let service = version.service_name();
        self.call(request, retries, OnCancel::Abandon, operation, cancel, move |response| match response {
            Response::Status { status, .. } => Ok(status),
            Response::Ticket(t) => Ok(pending(t.ticket)),
            other => Err(RpcError::from_response(service, other)),
        })
        .await
    }

    async fn observe_until_complete<F>(
        &self,
        version: ScriptServiceVersion,
        mut status: ScriptStatusResponse,
        retries: bool,
        on_status: &mut F,
        operation: &ClientOperationMetricsBuilder,
        cancel: &CancellationToken,
    ) -> Result<ScriptStatusResponse, ScriptExecutionError>
    where
        F: FnMut(&ScriptStatusResponse) + Send,
    {
        let mut polls = 0u32;
        while status.state != ProcessState::Complete {
            if cancel.is_cancelled() {
                return self.cancel_until_complete(version, status, retries, on_status, operation).await;
            }

            polls = polls.saturating_add(1);
            tokio::select! {
                _ = tokio::time::sleep(self.options.poll.delay(polls)) => {}
                _ = cancel.cancelled() => continue,
            }

            let request = status_request(version, StatusMethod::GetStatus, &status);
            match self.status_call(request, retries, operation, cancel).await {
                Ok(next) => {
                    status = next;
                    on_status(&status);
                }
                Err(e) if cancel.is_cancelled() => {
                    tracing::debug!(ticket = %status.ticket, error = %e, "status poll interrupted by cancellation");
                    status.logs.clear();
                }
                Err(e) => return Err(ScriptExecutionError::rpc(rpc_call(version, StatusMethod::GetStatus), e)),
            }
        }
        Ok(status)
    }

    async fn cancel_until_complete<F>(
        &self,
        version: ScriptServiceVersion,
        mut status: ScriptStatusResponse,
        retries: bool,
        on_status: &mut F,
        operation: &ClientOperationMetricsBuilder,
    ) -> Result<ScriptStatusResponse, ScriptExecutionError>
    where
        F: FnMut(&ScriptStatusResponse) + Send,
    {
        tracing::info!(ticket = %status.ticket, "cancelling script");
        let token = CancellationToken::new();
        let mut attempts = 0u32;
        loop {
            let request = status_request(version, StatusMethod::Cancel, &status);
            status = self
                .status_call(request, retries, operation, &token)
                .await
                .map_err(|e| ScriptExecutionError::rpc(rpc_call(version, StatusMethod::Cancel), e))?;
            on_status(&status);
            if status.state == ProcessState::Complete {
                return Ok(status);
            }
            attempts = attempts.saturating_add(1);
            tokio::time::sleep(self.options.poll.delay(attempts)).await;
        }
    }

    /// Release the script on the agent with a single attempt. Failure here
    /// does not change the outcome.
    async fn complete<F>(
        &self,
        version: ScriptServiceVersion,
        status: ScriptStatusResponse,
        on_status: &mut F,
        operation: &ClientOperationMetricsBuilder,
    ) -> ScriptStatusResponse
    where
        F: FnMut(&ScriptStatusResponse) + Send,
    {
        let request = status_request(version, StatusMethod::Complete, &status);
        let service = version.service_name();
        let token = CancellationToken::new();
        let result = self
            .call(request, false, OnCancel::Abandon, operation, &token, move |response| match response {
                Response::Status { status, .. } => Ok(Some(status)),
                Response::Acknowledged => Ok(None),
                other => Err(RpcError::from_response(service, other)),
            })
            .await;

        match result {
            Ok(Some(last)) => {
                if !last.logs.is_empty() {
                    on_status(&last);
                }
                ScriptStatusResponse { logs: Vec::new(), ..last }
            }
            Ok(None) => status,
            Err(e) => {
                tracing::warn!(ticket = %status.ticket, error = %e, "could not complete script on the agent");
                status
            }
        }
    }

    async fn status_call(
        &self,
        request: Request,
        retries: bool,
        operation: &ClientOperationMetricsBuilder,
        cancel: &CancellationToken,
    ) -> Result<ScriptStatusResponse, RpcError> {
        let service = request.service();
        self.call(request, retries, OnCancel::Abandon, operation, cancel, move |response| match response {
            Response::Status { status, .. } => Ok(status),
            other => Err(RpcError::from_response(service, other)),
        })
        .await
    }

    async fn call<T, P>(
        &self,
        request: Request,
        retries: bool,
        on_cancel: OnCancel,
        operation: &ClientOperationMetricsBuilder,
        cancel: &CancellationToken,
        parse: P,
    ) -> Result<T, RpcError>
    where
        T: Send + 'static,
        P: Fn(Response) -> Result<T, RpcError> + Clone + Send + Sync + 'static,
    {
        let call = request.rpc_call();
        let transport = Arc::clone(&self.transport);
        let action = move |token: CancellationToken| {
            let (transport, request, parse) = (Arc::clone(&transport), request.clone(), parse.clone());
            async move { parse(transport.send(request, token).await?) }
        };
        self.executor.execute(retries, call, action, on_cancel, operation, cancel).await
    }
}

fn pending(ticket: ScriptTicket) -> ScriptStatusResponse {
    ScriptStatusResponse { ticket, state: ProcessState::Pending, exit_code: 0, logs: Vec::new(), next_log_sequence: 0 }
}

fn status_request(version: ScriptServiceVersion, method: StatusMethod, status: &ScriptStatusResponse) -> Request {
    Request::status(version, method, ScriptStatusRequest::new(status.ticket.clone(), status.next_log_sequence))
}

fn rpc_call(version: ScriptServiceVersion, method: StatusMethod) -> RpcCall {
    RpcCall::new(version.service_name(), method.to_string())
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
