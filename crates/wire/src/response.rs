// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Responses from the agent to clients

use serde_json::Value;

use crate::binder::WireType;
use crate::capabilities::{CapabilitiesResponseV2, ScriptServiceVersion};
use crate::contracts::{ErrorResponse, RemoteErrorKind, ScriptStatusResponse, TicketResponse};
use crate::wire::ProtocolError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Capabilities(CapabilitiesResponseV2),
    /// v1 StartScript result
    Ticket(TicketResponse),
    Status { version: ScriptServiceVersion, status: ScriptStatusResponse },
    /// v2 CompleteScript result
    Acknowledged,
    Error(ErrorResponse),
}

impl Response {
    pub fn error(kind: RemoteErrorKind, message: impl Into<String>) -> Self {
        Self::Error(ErrorResponse { kind, message: message.into() })
    }

    pub fn service_not_found(service: &str) -> Self {
        Self::error(RemoteErrorKind::ServiceNotFound, format!("service {service} is not hosted by this agent"))
    }

    pub fn wire_type(&self) -> WireType {
        match self {
            Self::Capabilities(_) => WireType::CapabilitiesResponse,
            Self::Ticket(_) => WireType::Ticket,
            Self::Status { version, .. } => WireType::StatusResponse(*version),
            Self::Acknowledged => WireType::Acknowledged,
            Self::Error(_) => WireType::Error,
        }
    }

    pub(crate) fn payload(&self) -> Result<Value, serde_json::Error> {
        match self {
            Self::Capabilities(c) => serde_json::to_value(c),
            Self::Ticket(t) => serde_json::to_value(t),
            Self::Status { status, .. } => serde_json::to_value(status),
            Self::Acknowledged => Ok(Value::Object(Default::default())),
            Self::Error(e) => serde_json::to_value(e),
        }
    }

    pub(crate) fn from_payload(ty: WireType, payload: Value) -> Result<Self, ProtocolError> {
        Ok(match ty {
            WireType::CapabilitiesResponse => Self::Capabilities(serde_json::from_value(payload)?),
            WireType::Ticket => Self::Ticket(serde_json::from_value(payload)?),
            WireType::StatusResponse(version) => Self::Status { version, status: serde_json::from_value(payload)? },
            WireType::Acknowledged => Self::Acknowledged,
            WireType::Error => Self::Error(serde_json::from_value(payload)?),
            other => return Err(ProtocolError::UnexpectedType(other.short_name())),
        })
    }
}
