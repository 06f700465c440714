// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use tend_core::exit_codes;
use tend_wire::{ProtocolError, RemoteErrorKind, Response};
use thiserror::Error;

/// Failure of one remote call
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("transport error: {0}")]
    Transport(#[from] ProtocolError),

    #[error("service {0} is not hosted by the agent")]
    ServiceNotFound(String),

    #[error("agent reported an error: {0}")]
    Remote(String),

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("call was cancelled")]
    Cancelled,

    #[error("call was abandoned after waiting {0:?} for it to stop")]
    Abandoned(Duration),

    #[error("attempt did not complete within the remaining {0:?} of the retry budget")]
    TimedOut(Duration),

    #[error("call task failed: {0}")]
    TaskFailed(String),
}

impl RpcError {
    /// Map an error response; anything else is unexpected for the caller.
    pub fn from_response(service: &str, response: Response) -> Self {
        match response {
            Response::Error(e) => match e.kind {
                RemoteErrorKind::ServiceNotFound => Self::ServiceNotFound(service.to_string()),
                RemoteErrorKind::Failure => Self::Remote(e.message),
            },
            other => Self::UnexpectedResponse(other.wire_type().short_name()),
        }
    }

    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Abandoned(_))
    }
}

#[derive(Debug, Error)]
pub enum NegotiationError {
    #[error("capabilities query failed: {0}")]
    Rpc(#[from] RpcError),

    #[error("agent supports none of the known script services (advertised: {})", .0.join(", "))]
    NoCompatibleService(Vec<String>),
}

/// Failure of a whole script execution
#[derive(Debug, Error)]
pub enum ScriptExecutionError {
    #[error(transparent)]
    Negotiation(#[from] NegotiationError),

    #[error("script could not be started: {0}")]
    CouldNotStart(#[source] RpcError),

    #[error("{rpc} failed: {source}")]
    Rpc { rpc: String, source: RpcError },

    #[error("script execution was cancelled")]
    Cancelled,
}

impl ScriptExecutionError {
    pub(crate) fn rpc(rpc: impl std::fmt::Display, source: RpcError) -> Self {
        Self::Rpc { rpc: rpc.to_string(), source }
    }

    /// Reserved exit code to report for a script that ended this way.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Negotiation(_) | Self::CouldNotStart(_) => exit_codes::COULD_NOT_START,
            Self::Rpc { .. } => exit_codes::FATAL,
            Self::Cancelled => exit_codes::CANCELED,
        }
    }
}
